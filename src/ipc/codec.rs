//! NUL-delimited wire format.
//!
//! A message is a sequence of records, each terminated by a single `\0`
//! byte:
//!
//! ```text
//! KIND \0 COUNT \0 ARG_1 \0 ... ARG_COUNT \0
//! ```
//!
//! `COUNT` is the decimal number of argument records that follow.  Requests
//! use the kinds `PING`, `ACTION`, `SET`, `QUERY` and `FOR` (first argument
//! is the command name); replies use `PONG`, `OK` and `ERR`.

use crate::command::Command;
use std::fmt;
use std::io::{self, Read, Write};

pub const DELIMITER: u8 = 0;

/// Longest record accepted, delimiter excluded.
pub const MAX_RECORD_LEN: usize = 512;

const CHUNK_LEN: usize = 512;

const TRUNCATED_MARK: &str = "...";

pub const PING: &str = "PING";
pub const PONG: &str = "PONG";
pub const OK: &str = "OK";
pub const ERR: &str = "ERR";

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("read error: {0}")]
    Read(#[from] io::Error),
    #[error("record is longer than {} bytes", MAX_RECORD_LEN)]
    RecordTooLong,
    #[error("malformed argument count {0:?}")]
    MalformedCount(String),
    #[error("connection closed in the middle of a message")]
    Truncated,
    #[error("record is not valid UTF-8")]
    InvalidUtf8,
}

/// One framed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: String,
    pub args: Vec<String>,
}

impl Message {
    pub fn new(kind: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            kind: kind.into(),
            args,
        }
    }

    pub fn ping() -> Self {
        Self::new(PING, Vec::new())
    }

    pub fn pong() -> Self {
        Self::new(PONG, Vec::new())
    }

    pub fn ok(args: Vec<String>) -> Self {
        Self::new(OK, args)
    }

    /// Error reply.  Text longer than one record is cut at a character
    /// boundary and marked with `...`, so the peer can always read it.
    pub fn err(text: impl Into<String>) -> Self {
        let mut text = text.into();
        if text.len() > MAX_RECORD_LEN {
            let mut end = MAX_RECORD_LEN - TRUNCATED_MARK.len();
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            text.truncate(end);
            text.push_str(TRUNCATED_MARK);
        }
        Self::new(ERR, vec![text])
    }

    /// Envelope for `command`: its wire kind, then the name, then the
    /// arguments.
    pub fn command(command: &Command) -> Self {
        let mut args = Vec::with_capacity(command.args.len() + 1);
        args.push(command.name.clone());
        args.extend(command.args.iter().cloned());
        Self::new(command.kind.wire_name(), args)
    }

    pub fn is_err(&self) -> bool {
        self.kind == ERR
    }

    pub fn encode(&self) -> Vec<u8> {
        let count = self.args.len().to_string();
        let mut out = Vec::with_capacity(64);
        for record in std::iter::once(self.kind.as_str())
            .chain(std::iter::once(count.as_str()))
            .chain(self.args.iter().map(String::as_str))
        {
            out.extend_from_slice(record.as_bytes());
            out.push(DELIMITER);
        }
        out
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.args.join(", "))
    }
}

/// Write one message and flush.
pub fn write_message<W: Write>(writer: &mut W, message: &Message) -> io::Result<()> {
    writer.write_all(&message.encode())?;
    writer.flush()
}

/// Reads records from a byte stream in fixed-size chunks.
///
/// After a [`CodecError::RecordTooLong`] the rest of the offending record
/// is skipped, so the next call returns the record after it.
pub struct RecordReader<R> {
    inner: R,
    buf: Vec<u8>,
    discarding: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(CHUNK_LEN),
            discarding: false,
        }
    }

    /// Next record without its delimiter, or `None` at a clean end of
    /// stream.
    pub fn read_record(&mut self) -> Result<Option<Vec<u8>>, CodecError> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == DELIMITER) {
                let mut record: Vec<u8> = self.buf.drain(..=pos).collect();
                record.pop();
                if self.discarding {
                    self.discarding = false;
                    continue;
                }
                if record.len() > MAX_RECORD_LEN {
                    return Err(CodecError::RecordTooLong);
                }
                return Ok(Some(record));
            }

            if self.discarding {
                self.buf.clear();
            } else if self.buf.len() > MAX_RECORD_LEN {
                self.buf.clear();
                self.discarding = true;
                return Err(CodecError::RecordTooLong);
            }

            let mut chunk = [0u8; CHUNK_LEN];
            let n = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(CodecError::Read(e)),
            };
            if n == 0 {
                if self.buf.is_empty() && !self.discarding {
                    return Ok(None);
                }
                self.buf.clear();
                self.discarding = false;
                return Err(CodecError::Truncated);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    fn read_string(&mut self) -> Result<Option<String>, CodecError> {
        match self.read_record()? {
            Some(record) => String::from_utf8(record)
                .map(Some)
                .map_err(|_| CodecError::InvalidUtf8),
            None => Ok(None),
        }
    }

    /// Next message, or `None` if the stream ended between messages.
    pub fn read_message(&mut self) -> Result<Option<Message>, CodecError> {
        let Some(kind) = self.read_string()? else {
            return Ok(None);
        };
        let count = self.read_string()?.ok_or(CodecError::Truncated)?;
        let count: usize = count
            .parse()
            .map_err(|_| CodecError::MalformedCount(count.clone()))?;

        let mut args = Vec::new();
        for _ in 0..count {
            args.push(self.read_string()?.ok_or(CodecError::Truncated)?);
        }
        Ok(Some(Message { kind, args }))
    }
}
