//! Text grammar for command sequences.
//!
//! ```text
//! sequence := command ("," command)*
//! command  := keyword name arg* | name arg*
//! keyword  := "set" | "query" | "for"
//! ```
//!
//! Input arrives as shell words.  Every word is re-split on `,` so that
//! `tile,switch_layout`, `tile , switch_layout` and `tile, switch_layout`
//! all read the same.  Each command consumes at most as many arguments as
//! its registry entry allows and stops early at a separator.

use crate::command::{Command, CommandKind};
use crate::registry::{self, ArityError};

pub const SEPARATOR: &str = ",";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("too few arguments: {kind} name is not provided")]
    MissingName { kind: CommandKind },
    #[error("unknown command: {kind} {name}")]
    UnknownCommand { kind: CommandKind, name: String },
    #[error("too few arguments for {kind} {name}: {source}")]
    TooFewArguments {
        kind: CommandKind,
        name: String,
        source: ArityError,
    },
}

/// Split `word` around every separator, keeping the separators as tokens.
///
/// `"a,b,"` yields `"a"`, `","`, `"b"`, `","`.
fn split_word(word: &str) -> impl Iterator<Item = &str> {
    let mut rest = word;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match rest.find(SEPARATOR) {
            Some(0) => {
                rest = &rest[SEPARATOR.len()..];
                Some(SEPARATOR)
            }
            Some(i) => {
                let (token, tail) = rest.split_at(i);
                rest = tail;
                Some(token)
            }
            None => {
                let token = rest;
                rest = "";
                Some(token)
            }
        }
    })
}

/// Token stream over a list of words.
struct Tokens<'a> {
    tokens: Vec<&'a str>,
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new<S: AsRef<str>>(words: &'a [S]) -> Self {
        let tokens = words
            .iter()
            .flat_map(|w| split_word(w.as_ref()))
            .filter(|t| !t.is_empty())
            .collect();
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<&'a str> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }
}

/// Parse shell words into a command sequence.
///
/// Either every command parses or nothing is returned.  No command is
/// executed here; names and argument counts are checked against the
/// [`registry`] only.
pub fn parse<S: AsRef<str>>(words: &[S]) -> Result<Vec<Command>, ParseError> {
    let mut tokens = Tokens::new(words);
    let mut commands = Vec::new();

    while let Some(token) = tokens.advance() {
        if token == SEPARATOR {
            continue;
        }
        let (kind, name) = match CommandKind::from_keyword(token) {
            Some(kind) => match tokens.advance() {
                Some(name) if name != SEPARATOR => (kind, name),
                _ => return Err(ParseError::MissingName { kind }),
            },
            None => (CommandKind::Action, token),
        };
        commands.push(parse_command(kind, name, &mut tokens)?);
    }

    Ok(commands)
}

fn parse_command(
    kind: CommandKind,
    name: &str,
    tokens: &mut Tokens<'_>,
) -> Result<Command, ParseError> {
    let spec = registry::lookup(kind, name).ok_or_else(|| ParseError::UnknownCommand {
        kind,
        name: name.to_string(),
    })?;

    let mut args = Vec::new();
    while args.len() < spec.arity.max {
        match tokens.peek() {
            Some(token) if token != SEPARATOR => {
                args.push(token.to_string());
                tokens.advance();
            }
            _ => break,
        }
    }

    spec.arity
        .validate(args.len())
        .map_err(|source| ParseError::TooFewArguments {
            kind,
            name: name.to_string(),
            source,
        })?;

    Ok(Command::new(kind, name, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn split_keeps_separators() {
        let parts: Vec<&str> = split_word("a,b,").collect();
        assert_eq!(parts, vec!["a", ",", "b", ","]);
        let parts: Vec<&str> = split_word(",,x").collect();
        assert_eq!(parts, vec![",", ",", "x"]);
        assert_eq!(split_word("").count(), 0);
    }

    #[test]
    fn parses_set_layout() {
        let cmds = parse(&words("set layout vertical")).unwrap();
        assert_eq!(
            cmds,
            vec![Command::new(CommandKind::Set, "layout", vec!["vertical".into()])]
        );
    }

    #[test]
    fn parses_query_without_args() {
        let cmds = parse(&words("query layout")).unwrap();
        assert_eq!(cmds, vec![Command::new(CommandKind::Query, "layout", vec![])]);
    }

    #[test]
    fn parses_action_with_args() {
        let cmds = parse(&words("swap 5 7")).unwrap();
        assert_eq!(
            cmds,
            vec![Command::new(
                CommandKind::Action,
                "swap",
                vec!["5".into(), "7".into()]
            )]
        );
    }

    #[test]
    fn separators_split_commands_in_any_spacing() {
        let expected = vec![Command::action("tile"), Command::action("switch_layout")];
        for input in [
            "tile,switch_layout",
            "tile , switch_layout",
            "tile, switch_layout",
            "tile ,switch_layout",
        ] {
            assert_eq!(parse(&words(input)).unwrap(), expected, "input {:?}", input);
        }
    }

    #[test]
    fn separator_stops_argument_collection() {
        let cmds = parse(&words("swap 5, tile")).unwrap();
        assert_eq!(
            cmds,
            vec![
                Command::new(CommandKind::Action, "swap", vec!["5".into()]),
                Command::action("tile"),
            ]
        );
    }

    #[test]
    fn extra_tokens_start_a_new_command() {
        // `tile` takes no argument, so `switch_layout` is read as the next command.
        let cmds = parse(&words("tile switch_layout")).unwrap();
        assert_eq!(cmds, vec![Command::action("tile"), Command::action("switch_layout")]);
    }

    #[test]
    fn for_modifiers_chain_with_actions() {
        let cmds = parse(&words("for workspace 2, for window 0x2a, tile")).unwrap();
        assert_eq!(
            cmds,
            vec![
                Command::new(CommandKind::For, "workspace", vec!["2".into()]),
                Command::new(CommandKind::For, "window", vec!["0x2a".into()]),
                Command::action("tile"),
            ]
        );
    }

    #[test]
    fn stray_separators_are_ignored() {
        assert_eq!(parse(&words(", , tile ,")).unwrap(), vec![Command::action("tile")]);
        assert!(parse(&words(",")).unwrap().is_empty());
        assert!(parse::<String>(&[]).unwrap().is_empty());
    }

    #[test]
    fn unknown_command_rejects_whole_sequence() {
        let err = parse(&words("tile, bogus")).unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownCommand {
                kind: CommandKind::Action,
                name: "bogus".into()
            }
        );
        assert_eq!(err.to_string(), "unknown command: action bogus");
    }

    #[test]
    fn keyword_without_name_is_rejected() {
        assert_eq!(
            parse(&words("query")).unwrap_err(),
            ParseError::MissingName {
                kind: CommandKind::Query
            }
        );
        assert_eq!(
            parse(&words("set , tile")).unwrap_err(),
            ParseError::MissingName {
                kind: CommandKind::Set
            }
        );
    }

    #[test]
    fn too_few_arguments_is_rejected() {
        let err = parse(&words("set layout")).unwrap_err();
        assert!(matches!(err, ParseError::TooFewArguments { .. }));
        assert_eq!(
            err.to_string(),
            "too few arguments for set layout: got 0, expected 1"
        );
        assert!(parse(&words("swap, tile")).is_err());
    }
}
