//! [`WindowSystem`] implementation backed by Hyprland IPC.
//!
//! Communicates directly with Hyprland through its Unix socket at
//! `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket.sock`,
//! avoiding any shell command invocation or third-party crate for socket
//! discovery.
//!
//! Hyprland numbers its regular workspaces from 1; zentile's workspace
//! index `i` is Hyprland workspace `i + 1`.  Special (negative id)
//! workspaces are left alone.
//!
//! Tiled windows are made floating and placed with exact pixel geometry so
//! Hyprland's own layout does not fight the arrangement.  Releasing a
//! workspace sets its windows back to tiled.  With `remove_decorations`
//! tiled windows also get `decorate 0` until they are released.

use crate::command::ClientId;
use crate::traits::{Arrangement, ClientInfo, WindowSystem};
use crate::workspace::LayoutKind;
use log::debug;
use serde::Deserialize;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

/// Hyprland-backed window system.
///
/// No connection is held open; each call opens a short-lived IPC request.
pub struct HyprlandWm {
    gap: u32,
    workspaces: usize,
    remove_decorations: bool,
}

/// Errors that can occur when talking to Hyprland.
#[derive(Debug, thiserror::Error)]
#[error("hyprland IPC error: {0}")]
pub struct HyprlandWmError(String);

impl HyprlandWm {
    /// `gap` is the spacing between tiled windows in pixels; `workspaces`
    /// is how many regular workspaces zentile manages.  With
    /// `remove_decorations` tiled windows lose borders and shadows until
    /// their workspace is untiled.
    pub fn new(gap: u32, workspaces: usize, remove_decorations: bool) -> Self {
        Self {
            gap,
            workspaces,
            remove_decorations,
        }
    }
}

//  Direct Hyprland IPC helpers

/// Resolve the Hyprland command socket path.
fn socket_path() -> Result<PathBuf, HyprlandWmError> {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .map_err(|_| HyprlandWmError("XDG_RUNTIME_DIR not set".into()))?;
    let his = std::env::var("HYPRLAND_INSTANCE_SIGNATURE")
        .map_err(|_| HyprlandWmError("HYPRLAND_INSTANCE_SIGNATURE not set".into()))?;
    Ok(PathBuf::from(format!(
        "{}/hypr/{}/.socket.sock",
        runtime_dir, his
    )))
}

/// Send a raw command to the Hyprland command socket and return the
/// response as a string.
fn ipc_request(command: &str) -> Result<String, HyprlandWmError> {
    let path = socket_path()?;
    let mut stream = UnixStream::connect(&path)
        .map_err(|e| HyprlandWmError(format!("connect to {}: {}", path.display(), e)))?;

    stream
        .write_all(command.as_bytes())
        .map_err(|e| HyprlandWmError(format!("write: {}", e)))?;

    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .map_err(|e| HyprlandWmError(format!("read: {}", e)))?;

    String::from_utf8(response).map_err(|e| HyprlandWmError(format!("utf-8: {}", e)))
}

/// Send a JSON data query (`j/<command>`) and deserialize the answer.
fn ipc_json<T: for<'de> Deserialize<'de>>(data_command: &str) -> Result<T, HyprlandWmError> {
    let json = ipc_request(&format!("j/{}", data_command))?;
    serde_json::from_str(&json)
        .map_err(|e| HyprlandWmError(format!("parse {}: {}", data_command, e)))
}

fn expect_ok(what: &str, response: String) -> Result<(), HyprlandWmError> {
    if response.trim() == "ok" {
        Ok(())
    } else {
        Err(HyprlandWmError(format!("{} error: {}", what, response)))
    }
}

/// Send a dispatch command and check for `"ok"`.
fn ipc_dispatch(args: &str) -> Result<(), HyprlandWmError> {
    debug!("dispatch {}", args);
    expect_ok("dispatch", ipc_request(&format!("/dispatch {}", args))?)
}

/// Set a config keyword at runtime and check for `"ok"`.
fn ipc_keyword(args: &str) -> Result<(), HyprlandWmError> {
    debug!("keyword {}", args);
    expect_ok("keyword", ipc_request(&format!("/keyword {}", args))?)
}

//  Minimal serde structs for the JSON we care about

#[derive(Deserialize)]
struct WorkspaceRef {
    id: i64,
}

/// Subset of the JSON object returned by `j/activewindow` and `j/clients`.
#[derive(Deserialize)]
struct ClientJson {
    address: String,
    workspace: WorkspaceRef,
    #[serde(default)]
    class: String,
}

/// Subset of the JSON object returned by `j/workspaces`.
#[derive(Deserialize)]
struct WorkspaceJson {
    id: i64,
    #[serde(rename = "monitorID")]
    monitor_id: i64,
}

/// Subset of the JSON object returned by `j/monitors`.
#[derive(Deserialize)]
struct MonitorJson {
    id: i64,
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    #[serde(default = "unit_scale")]
    scale: f64,
    /// Space taken by bars: left, top, right, bottom.
    #[serde(default)]
    reserved: [u32; 4],
    #[serde(default)]
    focused: bool,
}

fn unit_scale() -> f64 {
    1.0
}

/// Zero-based index of Hyprland workspace `id`, `None` for special
/// workspaces.
pub(crate) fn workspace_index(id: i64) -> Option<usize> {
    usize::try_from(id).ok().and_then(|id| id.checked_sub(1))
}

fn parse_address(address: &str) -> Result<ClientId, HyprlandWmError> {
    address
        .parse()
        .map_err(|e| HyprlandWmError(format!("bad window address {:?}: {}", address, e)))
}

//  Geometry

/// A screen rectangle in layout pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    fn inset(self, gap: u32) -> Rect {
        Rect {
            x: self.x + gap as i32,
            y: self.y + gap as i32,
            w: self.w.saturating_sub(2 * gap).max(1),
            h: self.h.saturating_sub(2 * gap).max(1),
        }
    }

    /// `n` equal columns.
    fn columns(self, n: usize) -> Vec<Rect> {
        let n = n as u64;
        (0..n)
            .map(|i| {
                let start = (self.w as u64 * i / n) as u32;
                let end = (self.w as u64 * (i + 1) / n) as u32;
                Rect {
                    x: self.x + start as i32,
                    w: end - start,
                    ..self
                }
            })
            .collect()
    }

    /// `n` equal rows.
    fn rows(self, n: usize) -> Vec<Rect> {
        let n = n as u64;
        (0..n)
            .map(|i| {
                let start = (self.h as u64 * i / n) as u32;
                let end = (self.h as u64 * (i + 1) / n) as u32;
                Rect {
                    y: self.y + start as i32,
                    h: end - start,
                    ..self
                }
            })
            .collect()
    }

    fn split_left(self, proportion: f64) -> (Rect, Rect) {
        let left = (self.w as f64 * proportion).round() as u32;
        (
            Rect { w: left, ..self },
            Rect {
                x: self.x + left as i32,
                w: self.w - left,
                ..self
            },
        )
    }

    fn split_top(self, proportion: f64) -> (Rect, Rect) {
        let top = (self.h as f64 * proportion).round() as u32;
        (
            Rect { h: top, ..self },
            Rect {
                y: self.y + top as i32,
                h: self.h - top,
                ..self
            },
        )
    }
}

/// Rectangles for `masters` then `slaves`, in that order.
///
/// * vertical: masters stacked in a left column, slaves stacked on the right
/// * horizontal: masters side by side on top, slaves side by side below
/// * fullscreen: every window covers the whole area
///
/// When either group is empty the other gets the whole area.
pub fn layout_rects(
    kind: LayoutKind,
    area: Rect,
    masters: usize,
    slaves: usize,
    proportion: f64,
    gap: u32,
) -> Vec<Rect> {
    let rects = match kind {
        LayoutKind::Fullscreen => vec![area; masters + slaves],
        LayoutKind::Vertical | LayoutKind::Horizontal if masters == 0 || slaves == 0 => {
            let n = masters + slaves;
            if kind == LayoutKind::Vertical {
                area.rows(n)
            } else {
                area.columns(n)
            }
        }
        LayoutKind::Vertical => {
            let (left, right) = area.split_left(proportion);
            let mut rects = left.rows(masters);
            rects.extend(right.rows(slaves));
            rects
        }
        LayoutKind::Horizontal => {
            let (top, bottom) = area.split_top(proportion);
            let mut rects = top.columns(masters);
            rects.extend(bottom.columns(slaves));
            rects
        }
    };
    rects.into_iter().map(|r| r.inset(gap)).collect()
}

impl HyprlandWm {
    /// Usable area of the monitor showing workspace `index`, falling back to
    /// the focused monitor if the workspace does not exist yet.
    fn workspace_area(&self, index: usize) -> Result<Rect, HyprlandWmError> {
        let hypr_id = index as i64 + 1;
        let workspaces: Vec<WorkspaceJson> = ipc_json("workspaces")?;
        let monitor_id = workspaces
            .iter()
            .find(|w| w.id == hypr_id)
            .map(|w| w.monitor_id);

        let monitors: Vec<MonitorJson> = ipc_json("monitors")?;
        let monitor = match monitor_id {
            Some(id) => monitors.iter().find(|m| m.id == id),
            None => monitors.iter().find(|m| m.focused),
        }
        .or_else(|| monitors.first())
        .ok_or_else(|| HyprlandWmError("no monitors".into()))?;

        let scale = if monitor.scale > 0.0 { monitor.scale } else { 1.0 };
        let width = (monitor.width as f64 / scale).round() as u32;
        let height = (monitor.height as f64 / scale).round() as u32;
        let [left, top, right, bottom] = monitor.reserved;
        Ok(Rect {
            x: monitor.x + left as i32,
            y: monitor.y + top as i32,
            w: width.saturating_sub(left + right),
            h: height.saturating_sub(top + bottom),
        })
    }
}

/// Translate a chord like `Control-Shift-t` into Hyprland's `MODS` and
/// `KEY` bind fields.
pub fn chord_to_bind(chord: &str) -> Result<(String, String), HyprlandWmError> {
    let mut parts: Vec<&str> = chord.split('-').collect();
    let key = parts
        .pop()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| HyprlandWmError(format!("chord {:?} has no key", chord)))?;
    let mods = parts
        .iter()
        .map(|m| match m.to_ascii_lowercase().as_str() {
            "control" | "ctrl" => Ok("CTRL"),
            "shift" => Ok("SHIFT"),
            "mod1" | "alt" => Ok("ALT"),
            "mod4" | "super" => Ok("SUPER"),
            _ => Err(HyprlandWmError(format!(
                "unknown modifier {:?} in chord {:?}",
                m, chord
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((mods.join(" "), key.to_string()))
}

/// Dispatches that float `client` into `rect`.
fn place_dispatches(client: ClientId, rect: Rect, remove_decorations: bool) -> Vec<String> {
    let mut dispatches = vec![
        format!("setfloating address:{}", client),
        format!("resizewindowpixel exact {} {},address:{}", rect.w, rect.h, client),
        format!("movewindowpixel exact {} {},address:{}", rect.x, rect.y, client),
    ];
    if remove_decorations {
        dispatches.push(format!("setprop address:{} decorate 0", client));
    }
    dispatches
}

/// Dispatches that hand `client` back to Hyprland's own tiling.
fn release_dispatches(client: ClientId, remove_decorations: bool) -> Vec<String> {
    let mut dispatches = vec![format!("settiled address:{}", client)];
    if remove_decorations {
        dispatches.push(format!("setprop address:{} decorate 1", client));
    }
    dispatches
}

/// Prefix of the `custom` event data emitted for bound chords.
pub const CHORD_EVENT_PREFIX: &str = "zentile:";

//  WindowSystem implementation

impl WindowSystem for HyprlandWm {
    type Error = HyprlandWmError;

    fn active_client(&self) -> Result<Option<ClientId>, Self::Error> {
        let json = ipc_request("j/activewindow")?;
        // Hyprland returns an empty object `{}` when no window is focused.
        if json.trim() == "{}" {
            return Ok(None);
        }
        let w: ClientJson =
            serde_json::from_str(&json).map_err(|e| HyprlandWmError(format!("parse: {}", e)))?;
        parse_address(&w.address).map(Some)
    }

    fn current_workspace(&self) -> Result<usize, Self::Error> {
        let ws: WorkspaceRef = ipc_json("activeworkspace")?;
        workspace_index(ws.id)
            .ok_or_else(|| HyprlandWmError(format!("workspace {} is not managed", ws.id)))
    }

    fn workspace_count(&self) -> usize {
        self.workspaces
    }

    fn clients(&self) -> Result<Vec<ClientInfo>, Self::Error> {
        let clients: Vec<ClientJson> = ipc_json("clients")?;
        let mut infos = Vec::with_capacity(clients.len());
        for c in clients {
            let Some(workspace) = workspace_index(c.workspace.id) else {
                continue;
            };
            infos.push(ClientInfo {
                id: parse_address(&c.address)?,
                workspace,
                class: c.class,
            });
        }
        Ok(infos)
    }

    fn bind_key(&self, chord: &str) -> Result<(), Self::Error> {
        let (mods, key) = chord_to_bind(chord)?;
        ipc_keyword(&format!(
            "bind {},{},event,{}{}",
            mods, key, CHORD_EVENT_PREFIX, chord
        ))
    }

    fn focus(&self, client: ClientId) -> Result<(), Self::Error> {
        ipc_dispatch(&format!("focuswindow address:{}", client))
    }

    fn arrange(&self, workspace: usize, arrangement: &Arrangement<'_>) -> Result<(), Self::Error> {
        if arrangement.masters.is_empty() && arrangement.slaves.is_empty() {
            return Ok(());
        }
        let area = self.workspace_area(workspace)?;
        let rects = layout_rects(
            arrangement.kind,
            area,
            arrangement.masters.len(),
            arrangement.slaves.len(),
            arrangement.proportion,
            self.gap,
        );
        let clients = arrangement.masters.iter().chain(arrangement.slaves);
        for (&client, rect) in clients.zip(rects) {
            for args in place_dispatches(client, rect, self.remove_decorations) {
                ipc_dispatch(&args)?;
            }
        }
        Ok(())
    }

    fn release(&self, _workspace: usize, clients: &[ClientId]) -> Result<(), Self::Error> {
        for &client in clients {
            for args in release_dispatches(client, self.remove_decorations) {
                ipc_dispatch(&args)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AREA: Rect = Rect {
        x: 0,
        y: 0,
        w: 1000,
        h: 600,
    };

    #[test]
    fn vertical_splits_columns_by_proportion() {
        let rects = layout_rects(LayoutKind::Vertical, AREA, 1, 2, 0.6, 0);
        assert_eq!(
            rects,
            vec![
                Rect { x: 0, y: 0, w: 600, h: 600 },
                Rect { x: 600, y: 0, w: 400, h: 300 },
                Rect { x: 600, y: 300, w: 400, h: 300 },
            ]
        );
    }

    #[test]
    fn horizontal_splits_rows_by_proportion() {
        let rects = layout_rects(LayoutKind::Horizontal, AREA, 2, 1, 0.5, 0);
        assert_eq!(
            rects,
            vec![
                Rect { x: 0, y: 0, w: 500, h: 300 },
                Rect { x: 500, y: 0, w: 500, h: 300 },
                Rect { x: 0, y: 300, w: 1000, h: 300 },
            ]
        );
    }

    #[test]
    fn lone_group_takes_whole_area() {
        let rects = layout_rects(LayoutKind::Vertical, AREA, 1, 0, 0.5, 0);
        assert_eq!(rects, vec![AREA]);
    }

    #[test]
    fn fullscreen_stacks_everything_with_gap() {
        let rects = layout_rects(LayoutKind::Fullscreen, AREA, 1, 2, 0.5, 5);
        let inner = Rect { x: 5, y: 5, w: 990, h: 590 };
        assert_eq!(rects, vec![inner; 3]);
    }

    #[test]
    fn workspace_ids_map_to_indices() {
        assert_eq!(workspace_index(1), Some(0));
        assert_eq!(workspace_index(10), Some(9));
        assert_eq!(workspace_index(0), None);
        assert_eq!(workspace_index(-98), None);
    }

    #[test]
    fn chords_translate_to_bind_fields() {
        assert_eq!(
            chord_to_bind("Control-Shift-t").unwrap(),
            ("CTRL SHIFT".to_string(), "t".to_string())
        );
        assert_eq!(
            chord_to_bind("Control-bracketright").unwrap(),
            ("CTRL".to_string(), "bracketright".to_string())
        );
        assert_eq!(
            chord_to_bind("Mod4-Return").unwrap(),
            ("SUPER".to_string(), "Return".to_string())
        );
        assert!(chord_to_bind("Hyper-t").is_err());
        assert!(chord_to_bind("Control-").is_err());
    }

    #[test]
    fn client_json_parses() {
        let json = r#"[{
            "address": "0x55d1c0a2",
            "workspace": { "id": 2, "name": "2" },
            "class": "kitty",
            "title": "~"
        }]"#;
        let clients: Vec<ClientJson> = serde_json::from_str(json).unwrap();
        assert_eq!(parse_address(&clients[0].address).unwrap(), ClientId(0x55d1_c0a2));
        assert_eq!(workspace_index(clients[0].workspace.id), Some(1));
        assert_eq!(clients[0].class, "kitty");
    }

    #[test]
    fn decorations_follow_the_tiling_state() {
        let rect = Rect { x: 10, y: 20, w: 300, h: 400 };
        let plain = place_dispatches(ClientId(0xab), rect, false);
        assert_eq!(
            plain,
            vec![
                "setfloating address:0xab",
                "resizewindowpixel exact 300 400,address:0xab",
                "movewindowpixel exact 10 20,address:0xab",
            ]
        );
        let bare = place_dispatches(ClientId(0xab), rect, true);
        assert_eq!(bare.last().unwrap(), "setprop address:0xab decorate 0");

        assert_eq!(
            release_dispatches(ClientId(0xab), false),
            vec!["settiled address:0xab"]
        );
        assert_eq!(
            release_dispatches(ClientId(0xab), true),
            vec!["settiled address:0xab", "setprop address:0xab decorate 1"]
        );
    }
}
