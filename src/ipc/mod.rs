//! Unix-socket control interface.
//!
//! External tools (the `zentile` CLI, scripts, status bars) connect to the
//! socket and exchange NUL-framed [`Message`](codec::Message)s with the
//! daemon.  Every connection is one command sequence.

pub mod client;
pub mod codec;
pub mod listener;

use crate::sequencer::SequencerError;
use codec::CodecError;
use std::path::PathBuf;

/// Errors produced by the socket server and client.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to bind {}: {source}", path.display())]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("connection closed by peer")]
    Closed,
    #[error(transparent)]
    Sequencer(#[from] SequencerError),
}
