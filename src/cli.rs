//! Command-line surface.
//!
//! `zentile` with no command words runs the daemon.  With command words it
//! is a client: the words are parsed locally, sent over one connection to a
//! running daemon and answered one reply per command.

use crate::ipc::client::Client;
use crate::ipc::codec::Message;
use crate::parser::{self, ParseError};
use crate::registry;
use clap::Parser;
use log::{debug, error, info};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// zentile - master/stack tiling for Hyprland
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log at debug level
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Control socket path (overrides `socket_path` from the config)
    #[arg(long)]
    pub socket: Option<PathBuf>,

    /// Configuration file (default: $XDG_CONFIG_HOME/zentile/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Commands to send to the daemon
    ///
    /// Example: zentile for workspace 2, set layout fullscreen
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl Args {
    /// Whether to run as the daemon rather than as a client.
    pub fn is_daemon(&self) -> bool {
        self.command.is_empty()
    }
}

/// How a client invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    /// At least one command reached the daemon and failed.
    CommandFailed,
    ParseError,
    TransportError,
}

impl Status {
    pub fn code(self) -> u8 {
        match self {
            Status::Success => 0,
            Status::CommandFailed => 1,
            Status::ParseError => 2,
            Status::TransportError => 3,
        }
    }
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        ExitCode::from(status.code())
    }
}

/// One line per registered command, in grammar form.
pub fn usage() -> String {
    registry::commands()
        .iter()
        .map(|spec| {
            let mut line = String::from("  ");
            if let Some(keyword) = spec.kind.keyword() {
                line.push_str(keyword);
                line.push(' ');
            }
            line.push_str(spec.name);
            format!("{:<40}{}", line, spec.summary)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse `words`, run them on the daemon at `socket` and print non-empty
/// `OK` replies to `out`, one line each.
pub fn run<S: AsRef<str>>(socket: &Path, words: &[S], out: &mut impl Write) -> Status {
    let commands = match parser::parse(words) {
        Ok(commands) => commands,
        Err(e) => {
            error!("{}", e);
            if matches!(e, ParseError::UnknownCommand { .. }) {
                info!("available commands:\n{}", usage());
            }
            return Status::ParseError;
        }
    };

    let mut client = match Client::connect(socket) {
        Ok(client) => client,
        Err(e) => {
            error!("failed to connect to {}: {}", socket.display(), e);
            return Status::TransportError;
        }
    };

    let mut status = Status::Success;
    for command in &commands {
        let request = Message::command(command);
        let reply = match client.request(&request) {
            Ok(reply) => reply,
            Err(e) => {
                error!("\n\t> {}\n\t< {}", request, e);
                return Status::TransportError;
            }
        };
        if reply.is_err() {
            error!("\n\t> {}\n\t< {}", request, reply);
            status = Status::CommandFailed;
            continue;
        }
        debug!("\n\t> {}\n\t< {}", request, reply);
        if !reply.args.is_empty() {
            let _ = writeln!(out, "{}", reply.args.join(", "));
        }
    }
    status
}
