//! Commands and types used throughout zentile.
//!
//! This module defines the vocabulary that all components share:
//! [`Command`] is one parsed request, [`CommandKind`] groups commands into
//! actions, setters, queries and context modifiers, [`ClientId`] names a
//! window, and [`CommandContext`] carries the per-sequence target state.

use crate::registry::CommandError;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// The four command groups.
///
/// On the wire each kind is the upper-case envelope kind (`ACTION`, `SET`,
/// `QUERY`, `FOR`); in the text grammar setters, queries and modifiers are
/// introduced by a lower-case keyword while actions have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Action,
    Set,
    Query,
    For,
}

impl CommandKind {
    pub const ALL: [CommandKind; 4] = [
        CommandKind::Action,
        CommandKind::Set,
        CommandKind::Query,
        CommandKind::For,
    ];

    /// Envelope kind used on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            CommandKind::Action => "ACTION",
            CommandKind::Set => "SET",
            CommandKind::Query => "QUERY",
            CommandKind::For => "FOR",
        }
    }

    /// Parse an envelope kind.
    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.wire_name() == s)
    }

    /// Grammar keyword that introduces this kind, `None` for actions.
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            CommandKind::Action => None,
            CommandKind::Set => Some("set"),
            CommandKind::Query => Some("query"),
            CommandKind::For => Some("for"),
        }
    }

    /// Map a grammar keyword back to its kind.
    pub fn from_keyword(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.keyword() == Some(s))
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Action => write!(f, "action"),
            CommandKind::Set => write!(f, "set"),
            CommandKind::Query => write!(f, "query"),
            CommandKind::For => write!(f, "for"),
        }
    }
}

/// One command, as produced by the [`parser`](crate::parser) or decoded from
/// a socket envelope.  Consumed exactly once by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn new(kind: CommandKind, name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            args,
        }
    }

    /// Shorthand for an argument-less action.
    pub fn action(name: impl Into<String>) -> Self {
        Self::new(CommandKind::Action, name, Vec::new())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(keyword) = self.kind.keyword() {
            write!(f, "{} ", keyword)?;
        }
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Outcome of dispatching one [`Command`]: the reply messages, or the error.
pub type CommandResult = Result<Vec<String>, CommandError>;

/// Window-system identifier of a client window.
///
/// Parsed from decimal (`"1234"`) or `0x`-prefixed hexadecimal
/// (`"0x4d2"`); always printed as hexadecimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

/// A client identifier that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid client id: {0}")]
pub struct ClientIdError(#[from] ParseIntError);

impl FromStr for ClientId {
    type Err = ClientIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let id = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16)?,
            None => s.parse::<u64>()?,
        };
        Ok(ClientId(id))
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Ambient target state of one command sequence.
///
/// A fresh context is built from the live window system at the start of
/// every sequence and threaded through each command of that sequence.
/// `for` commands change the `target_*` fields; the `queried_*` fields keep
/// the live values seen when the sequence started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandContext {
    pub target_client: Option<ClientId>,
    pub target_workspace: usize,
    pub queried_client: Option<ClientId>,
    pub queried_workspace: usize,
}

impl CommandContext {
    /// Context whose targets are the live active client and workspace.
    pub fn live(active_client: Option<ClientId>, current_workspace: usize) -> Self {
        Self {
            target_client: active_client,
            target_workspace: current_workspace,
            queried_client: active_client,
            queried_workspace: current_workspace,
        }
    }
}
