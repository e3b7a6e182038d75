//! Key chords bound to command sequences.
//!
//! Every configured binding is parsed once at startup with the command
//! grammar.  Bindings that do not parse are logged and dropped, so a typo in
//! one entry never disables the others.

use crate::command::Command;
use crate::parser;
use crate::traits::WindowSystem;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: HashMap<String, Vec<Command>>,
}

impl Keymap {
    /// Parse `chord → sequence` entries.
    pub fn parse(entries: &BTreeMap<String, String>) -> Self {
        let mut bindings = HashMap::new();
        for (chord, text) in entries {
            let words: Vec<&str> = text.split_whitespace().collect();
            match parser::parse(&words) {
                Ok(commands) if commands.is_empty() => {
                    warn!("keybinding {} has no commands, skipping", chord);
                }
                Ok(commands) => {
                    debug!("keybinding {} -> {}", chord, text);
                    bindings.insert(chord.clone(), commands);
                }
                Err(e) => {
                    warn!("keybinding {} ({:?}): {}, skipping", chord, text, e);
                }
            }
        }
        Self { bindings }
    }

    pub fn get(&self, chord: &str) -> Option<&[Command]> {
        self.bindings.get(chord).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Register every chord with the window system.  Returns how many were
    /// accepted.
    pub fn register<W: WindowSystem>(&self, wm: &W) -> usize {
        let mut chords: Vec<&String> = self.bindings.keys().collect();
        chords.sort();
        let mut registered = 0;
        for chord in chords {
            match wm.bind_key(chord) {
                Ok(()) => registered += 1,
                Err(e) => warn!("failed to bind {}: {}", chord, e),
            }
        }
        info!("registered {} of {} keybinding(s)", registered, self.bindings.len());
        registered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{ClientId, CommandKind};
    use crate::traits::{Arrangement, ClientInfo};
    use std::cell::RefCell;

    #[derive(Debug, Default)]
    struct BindingWm {
        bound: RefCell<Vec<String>>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("chord rejected")]
    struct Rejected;

    impl WindowSystem for BindingWm {
        type Error = Rejected;

        fn active_client(&self) -> Result<Option<ClientId>, Rejected> {
            Ok(None)
        }

        fn current_workspace(&self) -> Result<usize, Rejected> {
            Ok(0)
        }

        fn workspace_count(&self) -> usize {
            1
        }

        fn clients(&self) -> Result<Vec<ClientInfo>, Rejected> {
            Ok(Vec::new())
        }

        fn bind_key(&self, chord: &str) -> Result<(), Rejected> {
            if chord.contains("Hyper") {
                return Err(Rejected);
            }
            self.bound.borrow_mut().push(chord.to_string());
            Ok(())
        }

        fn focus(&self, _client: ClientId) -> Result<(), Rejected> {
            Ok(())
        }

        fn arrange(&self, _ws: usize, _a: &Arrangement<'_>) -> Result<(), Rejected> {
            Ok(())
        }

        fn release(&self, _ws: usize, _clients: &[ClientId]) -> Result<(), Rejected> {
            Ok(())
        }
    }

    fn entries(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_sequences_once() {
        let keymap = Keymap::parse(&entries(&[
            ("Control-Shift-t", "tile"),
            ("Control-Shift-w", "for workspace 1, set layout fullscreen"),
        ]));
        assert_eq!(keymap.len(), 2);
        assert_eq!(keymap.get("Control-Shift-t"), Some(&[Command::action("tile")][..]));
        let seq = keymap.get("Control-Shift-w").unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[1].kind, CommandKind::Set);
        assert_eq!(keymap.get("Control-Shift-x"), None);
    }

    #[test]
    fn malformed_bindings_are_skipped() {
        let keymap = Keymap::parse(&entries(&[
            ("Control-Shift-t", "tile"),
            ("Control-Shift-b", "bogus"),
            ("Control-Shift-l", "set layout"),
            ("Control-Shift-e", " , "),
        ]));
        assert_eq!(keymap.len(), 1);
        assert!(keymap.get("Control-Shift-b").is_none());
    }

    #[test]
    fn register_reports_accepted_chords() {
        let keymap = Keymap::parse(&entries(&[
            ("Control-Shift-t", "tile"),
            ("Hyper-t", "untile"),
        ]));
        let wm = BindingWm::default();
        assert_eq!(keymap.register(&wm), 1);
        assert_eq!(*wm.bound.borrow(), vec!["Control-Shift-t".to_string()]);
    }
}
