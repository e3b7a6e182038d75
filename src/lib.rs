//! **zentile**: a master/stack tiling daemon driven by a small command
//! language.
//!
//! Every workspace keeps one store per layout (vertical, horizontal,
//! fullscreen) that partitions its clients into masters and slaves.  Users
//! drive it with commands such as `tile`, `set layout fullscreen` or
//! `for workspace 2, make_active_window_master`, typed on the command line,
//! bound to key chords, or sent over a Unix socket.
//!
//! # Architecture
//!
//! The crate is organised around two core traits:
//!
//! * [`traits::WindowSystem`]: queries and effects the tiler needs from the
//!   compositor, so the tiling logic is not coupled to any specific one.
//! * [`traits::EventSource`]: delivers window events and pressed chords into
//!   the daemon's mailbox.
//!
//! All tiling state is owned by one consumer thread ([`daemon::Daemon`]).
//! Socket connections and key chords are producers that run command
//! sequences through the [`sequencer::Sequencer`]; commands are resolved
//! against the static table in [`registry`].
//!
//! Concrete implementations live in [`hyprland`] (Hyprland IPC) and
//! [`ipc`] (Unix-socket codec, server and client).

pub mod cli;
pub mod command;
pub mod config;
pub mod daemon;
pub mod hyprland;
pub mod ipc;
pub mod keybinding;
pub mod parser;
pub mod registry;
pub mod sequencer;
pub mod store;
pub mod tiler;
pub mod traits;
pub mod workspace;
