//! Client side of the control socket, used by the CLI.

use super::codec::{self, Message, RecordReader, PONG};
use super::TransportError;
use crate::command::Command;
use std::os::unix::net::UnixStream;
use std::path::Path;

/// One connection to a running daemon.
///
/// Every command sent over the same `Client` belongs to one sequence.
pub struct Client {
    writer: UnixStream,
    reader: RecordReader<UnixStream>,
}

impl Client {
    pub fn connect(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let writer = UnixStream::connect(path)?;
        let reader = RecordReader::new(writer.try_clone()?);
        Ok(Self { writer, reader })
    }

    pub fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        codec::write_message(&mut self.writer, message)?;
        Ok(())
    }

    pub fn receive(&mut self) -> Result<Message, TransportError> {
        self.reader.read_message()?.ok_or(TransportError::Closed)
    }

    /// Send `message` and wait for the reply.
    pub fn request(&mut self, message: &Message) -> Result<Message, TransportError> {
        self.send(message)?;
        self.receive()
    }

    /// Run `command` on the daemon; the reply is `OK` or `ERR`.
    pub fn execute(&mut self, command: &Command) -> Result<Message, TransportError> {
        self.request(&Message::command(command))
    }

    /// Check the daemon is alive.
    pub fn ping(&mut self) -> Result<bool, TransportError> {
        Ok(self.request(&Message::ping())?.kind == PONG)
    }
}
