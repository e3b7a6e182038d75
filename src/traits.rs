//! Core traits that decouple zentile from any specific window system.
//!
//! Every concrete backend (Hyprland, a test harness, …) implements one of
//! these traits.  The [`Tiler`](crate::tiler::Tiler) only depends on these
//! abstractions.

use crate::command::ClientId;
use crate::sequencer::Event;
use crate::workspace::LayoutKind;
use std::sync::mpsc;

/// A client window as reported by the window system at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub id: ClientId,
    /// Zero-based workspace index.
    pub workspace: usize,
    /// Window class, matched against the `ignore` list.
    pub class: String,
}

/// Logical placement the active layout wants applied to a workspace.
///
/// The window system turns this into pixel geometry; the core only decides
/// which client occupies which slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrangement<'a> {
    pub kind: LayoutKind,
    pub masters: &'a [ClientId],
    pub slaves: &'a [ClientId],
    /// Share of the workspace given to the master area, in `(0, 1)`.
    pub proportion: f64,
}

/// Abstraction over the window system zentile tiles.
///
/// All methods are called from the single consumer thread only.
pub trait WindowSystem {
    /// The error type produced by this window system.
    type Error: std::error::Error + Send + 'static;

    /// The currently focused client, or `None` if nothing is focused.
    fn active_client(&self) -> Result<Option<ClientId>, Self::Error>;

    /// Zero-based index of the workspace currently shown.
    fn current_workspace(&self) -> Result<usize, Self::Error>;

    /// Number of workspaces zentile manages.
    fn workspace_count(&self) -> usize;

    /// Every client that already exists, used to populate the stores at
    /// startup.
    fn clients(&self) -> Result<Vec<ClientInfo>, Self::Error>;

    /// Register a key chord.  When the chord is pressed the backend's
    /// [`EventSource`] must emit [`WindowEvent::KeyChord`] with the same
    /// descriptor string.
    fn bind_key(&self, chord: &str) -> Result<(), Self::Error>;

    /// Give input focus to `client`.
    fn focus(&self, client: ClientId) -> Result<(), Self::Error>;

    /// Apply `arrangement` to the clients of `workspace`.
    fn arrange(&self, workspace: usize, arrangement: &Arrangement<'_>) -> Result<(), Self::Error>;

    /// Hand `clients` back to the window system's own placement.
    fn release(&self, workspace: usize, clients: &[ClientId]) -> Result<(), Self::Error>;
}

/// Something that happened in the window system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowEvent {
    /// A new client appeared on `workspace`.
    Opened {
        client: ClientId,
        workspace: usize,
        class: String,
    },
    /// A client went away.
    Closed { client: ClientId },
    /// A client was sent to another workspace.
    Moved { client: ClientId, workspace: usize },
    /// A chord registered with [`WindowSystem::bind_key`] was pressed.
    KeyChord(String),
}

/// A source of [`WindowEvent`]s.
///
/// Implementations listen on some transport and forward events into the
/// consumer's mailbox.
///
/// # Contract
///
/// * [`run`](EventSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait EventSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every event into `sink` as
    /// [`Event::Window`].
    fn run(&mut self, sink: mpsc::Sender<Event>) -> Result<(), Self::Error>;
}
