//! Translates Hyprland's event socket into [`WindowEvent`]s.
//!
//! Hyprland emits one `EVENT>>DATA\n` line per event on `socket2` at
//! `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket2.sock`.
//! The events zentile reacts to:
//!
//! | Event          | Payload                            | Becomes                    |
//! |----------------|------------------------------------|----------------------------|
//! | `openwindow`   | `<addr>,<ws name>,<class>,<title>` | [`WindowEvent::Opened`]    |
//! | `closewindow`  | `<addr>`                           | [`WindowEvent::Closed`]    |
//! | `movewindowv2` | `<addr>,<ws id>,<ws name>`         | [`WindowEvent::Moved`]     |
//! | `custom`       | `zentile:<chord>`                  | [`WindowEvent::KeyChord`]  |
//!
//! Addresses arrive as bare hexadecimal.  `custom` events come from the
//! `event` dispatcher that [`HyprlandWm`](super::wm::HyprlandWm) binds each
//! chord to.  Windows on special workspaces are not reported.

use super::wm::{workspace_index, CHORD_EVENT_PREFIX};
use crate::command::ClientId;
use crate::sequencer::Event;
use crate::traits::{EventSource, WindowEvent};
use log::{debug, error, info, trace, warn};
use std::io::{BufRead, BufReader};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::mpsc;

/// An [`EventSource`] reading Hyprland's event socket.
#[derive(Debug, Default)]
pub struct HyprlandEvents;

impl HyprlandEvents {
    pub fn new() -> Self {
        Self
    }
}

/// Resolve the Hyprland event socket path.
fn socket2_path() -> Result<PathBuf, HyprlandEventError> {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .map_err(|_| HyprlandEventError("XDG_RUNTIME_DIR not set".into()))?;
    let his = std::env::var("HYPRLAND_INSTANCE_SIGNATURE")
        .map_err(|_| HyprlandEventError("HYPRLAND_INSTANCE_SIGNATURE not set".into()))?;
    Ok(PathBuf::from(format!(
        "{}/hypr/{}/.socket2.sock",
        runtime_dir, his
    )))
}

/// Split a line into `(event, data)`.
fn parse_event_line(line: &str) -> Option<(&str, &str)> {
    line.split_once(">>")
}

fn parse_address(addr: &str) -> Option<ClientId> {
    u64::from_str_radix(addr.trim().trim_start_matches("0x"), 16)
        .ok()
        .map(ClientId)
}

fn parse_workspace(id: &str) -> Option<usize> {
    id.trim().parse::<i64>().ok().and_then(workspace_index)
}

/// Translate one event into a [`WindowEvent`], if zentile cares about it.
pub(crate) fn translate(event: &str, data: &str) -> Option<WindowEvent> {
    match event {
        "openwindow" => {
            let mut fields = data.splitn(4, ',');
            let client = parse_address(fields.next()?)?;
            // Named workspaces other than numbered ones are not managed.
            let workspace = parse_workspace(fields.next()?)?;
            let class = fields.next().unwrap_or_default().to_string();
            Some(WindowEvent::Opened {
                client,
                workspace,
                class,
            })
        }
        "closewindow" => Some(WindowEvent::Closed {
            client: parse_address(data)?,
        }),
        "movewindowv2" => {
            let mut fields = data.splitn(3, ',');
            let client = parse_address(fields.next()?)?;
            match parse_workspace(fields.next()?) {
                Some(workspace) => Some(WindowEvent::Moved { client, workspace }),
                // Sent to a special workspace: no longer ours.
                None => Some(WindowEvent::Closed { client }),
            }
        }
        "custom" => data
            .trim()
            .strip_prefix(CHORD_EVENT_PREFIX)
            .map(|chord| WindowEvent::KeyChord(chord.to_string())),
        _ => None,
    }
}

impl EventSource for HyprlandEvents {
    type Error = HyprlandEventError;

    /// Connect to `socket2` and forward events until the stream ends.
    ///
    /// Blocks; run it on a dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<Event>) -> Result<(), Self::Error> {
        let path = socket2_path()?;
        let stream = UnixStream::connect(&path)
            .map_err(|e| HyprlandEventError(format!("connect to {}: {}", path.display(), e)))?;
        info!("event source connected to {}", path.display());

        for line in BufReader::new(stream).lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!("socket2 read error: {}", e);
                    return Err(HyprlandEventError(format!("read error: {}", e)));
                }
            };
            let Some((event, data)) = parse_event_line(&line) else {
                continue;
            };
            trace!("{}>>{}", event, data);
            if let Some(event) = translate(event, data) {
                debug!("window event: {:?}", event);
                if sink.send(Event::Window(event)).is_err() {
                    info!("consumer gone, stopping event source");
                    return Ok(());
                }
            }
        }

        warn!("socket2 stream ended");
        Ok(())
    }
}

/// Error from the Hyprland event source.
#[derive(Debug, thiserror::Error)]
#[error("hyprland event error: {0}")]
pub struct HyprlandEventError(String);
