//! Serialized execution of command sequences.
//!
//! All tiling state is owned by one consumer thread which drains a mailbox
//! of [`Event`]s.  Producers (socket connections, key chords) never touch
//! that state; they send [`Request`]s and block on a reply channel.
//!
//! A producer that wants to run several commands as one unit takes a
//! [`Sequence`] from the [`Sequencer`].  The sequence holds the sequencer's
//! lock for its whole lifetime, so commands of two sequences never
//! interleave, and it carries the [`CommandContext`] that `for` commands
//! modify.  Starting a sequence asks the consumer for a fresh context built
//! from the live window-system state.

use crate::command::{Command, CommandContext, CommandResult};
use crate::traits::WindowEvent;
use log::trace;
use std::sync::mpsc::{self, Sender, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Everything the consumer thread reacts to.
#[derive(Debug)]
pub enum Event {
    Request(Request),
    Window(WindowEvent),
}

/// A message from a producer to the consumer.
#[derive(Debug)]
pub enum Request {
    /// Start a sequence; the reply is the fresh context.
    Begin { reply: SyncSender<CommandContext> },
    /// Run `command` within `context`; the reply carries the result and
    /// the context as modified by the command.
    Execute {
        command: Command,
        context: CommandContext,
        reply: SyncSender<(CommandResult, CommandContext)>,
    },
}

/// The consumer side of a [`Request`].
pub trait Executor {
    /// Build a fresh context from the live state.
    fn begin(&mut self) -> CommandContext;

    /// Run one command, updating `context` if it is a modifier.
    fn execute(&mut self, context: &mut CommandContext, command: &Command) -> CommandResult;
}

impl Request {
    /// Run this request on `executor` and send the reply.
    ///
    /// A producer that has gone away is not an error for the consumer.
    pub fn serve<E: Executor + ?Sized>(self, executor: &mut E) {
        match self {
            Request::Begin { reply } => {
                let context = executor.begin();
                trace!("begin sequence: {:?}", context);
                let _ = reply.send(context);
            }
            Request::Execute {
                command,
                mut context,
                reply,
            } => {
                let result = executor.execute(&mut context, &command);
                let _ = reply.send((result, context));
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SequencerError {
    #[error("command consumer is not running")]
    Disconnected,
}

/// Hands out exclusive [`Sequence`]s over the consumer's mailbox.
#[derive(Debug, Clone)]
pub struct Sequencer {
    lock: Arc<Mutex<()>>,
    mailbox: Sender<Event>,
}

impl Sequencer {
    pub fn new(mailbox: Sender<Event>) -> Self {
        Self {
            lock: Arc::new(Mutex::new(())),
            mailbox,
        }
    }

    /// Wait for exclusive access and start a new sequence.
    pub fn begin(&self) -> Result<Sequence<'_>, SequencerError> {
        // The guarded value is `()`, so a poisoned lock carries no broken state.
        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (reply, rx) = mpsc::sync_channel(1);
        self.mailbox
            .send(Event::Request(Request::Begin { reply }))
            .map_err(|_| SequencerError::Disconnected)?;
        let context = rx.recv().map_err(|_| SequencerError::Disconnected)?;
        Ok(Sequence {
            _guard: guard,
            mailbox: &self.mailbox,
            context,
        })
    }

    /// Run `commands` as one sequence and collect their results.
    pub fn run(&self, commands: &[Command]) -> Result<Vec<CommandResult>, SequencerError> {
        let mut sequence = self.begin()?;
        commands
            .iter()
            .map(|command| sequence.execute(command.clone()))
            .collect()
    }

    /// A new handle on the consumer's mailbox, for event sources.
    pub fn mailbox(&self) -> Sender<Event> {
        self.mailbox.clone()
    }
}

/// An exclusive run of commands sharing one [`CommandContext`].
///
/// Dropping the sequence releases the sequencer for the next producer.
pub struct Sequence<'a> {
    _guard: MutexGuard<'a, ()>,
    mailbox: &'a Sender<Event>,
    context: CommandContext,
}

impl Sequence<'_> {
    /// Run one command and wait for its result.
    pub fn execute(&mut self, command: Command) -> Result<CommandResult, SequencerError> {
        let (reply, rx) = mpsc::sync_channel(1);
        self.mailbox
            .send(Event::Request(Request::Execute {
                command,
                context: self.context,
                reply,
            }))
            .map_err(|_| SequencerError::Disconnected)?;
        let (result, context) = rx.recv().map_err(|_| SequencerError::Disconnected)?;
        self.context = context;
        Ok(result)
    }
}
