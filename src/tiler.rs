//! The consumer-side owner of all tiling state.
//!
//! [`Tiler`] holds one [`Workspace`] per window-system workspace and reacts
//! to window events and commands by updating the stores and issuing calls to
//! the [`WindowSystem`] trait.  It is only ever touched from the consumer
//! thread, so it needs no locking of its own.

use crate::command::{ClientId, Command, CommandContext, CommandResult};
use crate::registry::{self, CommandHandler, HandlerError, HandlerResult};
use crate::sequencer::Executor;
use crate::traits::{WindowEvent, WindowSystem};
use crate::workspace::{LayoutKind, Workspace};
use log::{debug, info, warn};
use std::collections::HashMap;

/// Tiling behaviour taken from the configuration.
#[derive(Debug, Clone)]
pub struct TilerOptions {
    pub layouts: Vec<LayoutKind>,
    /// Window classes that are never tiled.
    pub ignore: Vec<String>,
    /// Change of the master proportion per `increment_master` /
    /// `decrement_master`.
    pub proportion_step: f64,
}

impl Default for TilerOptions {
    fn default() -> Self {
        Self {
            layouts: LayoutKind::DEFAULT_CYCLE.to_vec(),
            ignore: Vec::new(),
            proportion_step: 0.1,
        }
    }
}

fn wm_err<E: std::error::Error>(e: E) -> HandlerError {
    HandlerError::WindowSystem(e.to_string())
}

/// Orchestrates workspaces and window-system calls.
///
/// The tiler is generic over any [`WindowSystem`] implementation, so the
/// same logic drives Hyprland and the test doubles.
pub struct Tiler<W: WindowSystem> {
    wm: W,
    workspaces: Vec<Workspace>,
    ignore: Vec<String>,
    proportion_step: f64,
    /// Which workspace currently holds each tracked client.
    client_workspace: HashMap<ClientId, usize>,
}

impl<W: WindowSystem> Tiler<W> {
    /// Create one workspace per index reported by the window system.
    pub fn new(wm: W, options: TilerOptions) -> Self {
        let workspaces = (0..wm.workspace_count())
            .map(|i| Workspace::new(i, &options.layouts))
            .collect();
        Self {
            wm,
            workspaces,
            ignore: options.ignore,
            proportion_step: options.proportion_step,
            client_workspace: HashMap::new(),
        }
    }

    pub fn wm(&self) -> &W {
        &self.wm
    }

    pub fn workspace(&self, index: usize) -> Option<&Workspace> {
        self.workspaces.get(index)
    }

    /// Add every client the window system already knows about.
    ///
    /// Returns how many clients were added.
    pub fn populate(&mut self) -> HandlerResult<usize> {
        let clients = self.wm.clients().map_err(wm_err)?;
        let mut added = 0;
        for info in clients {
            if self.track(info.id, info.workspace, &info.class) {
                added += 1;
            }
        }
        info!("tracking {} existing client(s)", added);
        Ok(added)
    }

    /// React to a window-system event.  Key chords are handled by the
    /// daemon and ignored here.
    pub fn handle_window_event(&mut self, event: WindowEvent) {
        match event {
            WindowEvent::Opened {
                client,
                workspace,
                class,
            } => {
                if self.track(client, workspace, &class) {
                    self.retile(workspace);
                }
            }
            WindowEvent::Closed { client } => {
                if let Some(ws) = self.untrack(client) {
                    self.retile(ws);
                }
            }
            WindowEvent::Moved { client, workspace } => {
                let Some(old) = self.client_workspace.get(&client).copied() else {
                    debug!("ignoring move of untracked client {}", client);
                    return;
                };
                if old == workspace {
                    return;
                }
                if workspace >= self.workspaces.len() {
                    warn!("client {} moved to unknown workspace {}", client, workspace);
                    self.untrack(client);
                    self.retile(old);
                    return;
                }
                self.untrack(client);
                self.workspaces[workspace].add_client(client);
                self.client_workspace.insert(client, workspace);
                debug!("moved client {} from {} to {}", client, old, workspace);
                self.retile(old);
                self.retile(workspace);
            }
            WindowEvent::KeyChord(chord) => {
                debug!("tiler ignores key chord {}", chord);
            }
        }
    }

    /// Start tracking `client`; false if it is ignored or the workspace is
    /// unknown.
    fn track(&mut self, client: ClientId, workspace: usize, class: &str) -> bool {
        if self.ignore.iter().any(|c| c == class) {
            debug!("ignoring client {} of class {}", client, class);
            return false;
        }
        let Some(ws) = self.workspaces.get_mut(workspace) else {
            warn!("client {} is on unknown workspace {}", client, workspace);
            return false;
        };
        ws.add_client(client);
        if let Some(previous) = self.client_workspace.insert(client, workspace) {
            if previous != workspace {
                self.workspaces[previous].remove_client(client);
            }
        }
        debug!("tracking client {} on workspace {}", client, workspace);
        true
    }

    fn untrack(&mut self, client: ClientId) -> Option<usize> {
        let ws = self.client_workspace.remove(&client)?;
        self.workspaces[ws].remove_client(client);
        debug!("untracked client {} from workspace {}", client, ws);
        Some(ws)
    }

    /// Re-apply the layout of `index`; failures are logged, not fatal.
    fn retile(&self, index: usize) {
        if let Some(ws) = self.workspaces.get(index) {
            if let Err(e) = ws.tile(&self.wm) {
                warn!("failed to tile workspace {}: {}", index, e);
            }
        }
    }

    /// Split borrow of the window system and one workspace.
    fn parts(&mut self, index: usize) -> HandlerResult<(&W, &mut Workspace)> {
        let Self { wm, workspaces, .. } = self;
        let ws = workspaces
            .get_mut(index)
            .ok_or(HandlerError::NoSuchWorkspace(index))?;
        Ok((&*wm, ws))
    }

    fn get(&self, index: usize) -> HandlerResult<&Workspace> {
        self.workspaces
            .get(index)
            .ok_or(HandlerError::NoSuchWorkspace(index))
    }

    fn focus(&self, target: Option<ClientId>) -> HandlerResult {
        match target {
            Some(client) => self.wm.focus(client).map_err(wm_err),
            None => Ok(()),
        }
    }
}

impl<W: WindowSystem> CommandHandler for Tiler<W> {
    fn workspace_count(&self) -> usize {
        self.workspaces.len()
    }

    fn tile(&mut self, workspace: usize) -> HandlerResult {
        let (wm, ws) = self.parts(workspace)?;
        Ok(ws.start_tiling(wm)?)
    }

    fn untile(&mut self, workspace: usize) -> HandlerResult {
        let (wm, ws) = self.parts(workspace)?;
        Ok(ws.untile(wm)?)
    }

    fn switch_layout(&mut self, workspace: usize) -> HandlerResult {
        let (wm, ws) = self.parts(workspace)?;
        ws.switch_layout(wm)?;
        debug!("workspace {} now uses {}", workspace, ws.active_layout_name());
        Ok(())
    }

    fn set_layout(&mut self, workspace: usize, name: &str) -> HandlerResult {
        let (wm, ws) = self.parts(workspace)?;
        Ok(ws.set_layout_by_name(name, wm)?)
    }

    fn layout(&self, workspace: usize) -> HandlerResult<Option<&'static str>> {
        let ws = self.get(workspace)?;
        Ok(ws.is_tiling().then(|| ws.active_layout_name()))
    }

    fn make_master(&mut self, workspace: usize, client: ClientId) -> HandlerResult {
        let (wm, ws) = self.parts(workspace)?;
        if !ws.active_layout_mut().store_mut().make_master_by_id(client) {
            debug!("client {} is not a slave on workspace {}", client, workspace);
        }
        Ok(ws.tile(wm)?)
    }

    fn increase_master(&mut self, workspace: usize) -> HandlerResult {
        let (wm, ws) = self.parts(workspace)?;
        ws.active_layout_mut().store_mut().inc_master();
        Ok(ws.tile(wm)?)
    }

    fn decrease_master(&mut self, workspace: usize) -> HandlerResult {
        let (wm, ws) = self.parts(workspace)?;
        ws.active_layout_mut().store_mut().decrease_master();
        Ok(ws.tile(wm)?)
    }

    fn adjust_proportion(&mut self, workspace: usize, grow: bool) -> HandlerResult {
        let step = if grow {
            self.proportion_step
        } else {
            -self.proportion_step
        };
        let (wm, ws) = self.parts(workspace)?;
        ws.active_layout_mut().adjust_proportion(step);
        Ok(ws.tile(wm)?)
    }

    fn focus_next(&mut self, workspace: usize, from: ClientId) -> HandlerResult {
        let next = self.get(workspace)?.active_layout().store().next(from);
        self.focus(next)
    }

    fn focus_previous(&mut self, workspace: usize, from: ClientId) -> HandlerResult {
        let previous = self.get(workspace)?.active_layout().store().previous(from);
        self.focus(previous)
    }

    fn swap(&mut self, workspace: usize, first: ClientId, second: ClientId) -> HandlerResult {
        let (wm, ws) = self.parts(workspace)?;
        if !ws.active_layout_mut().store_mut().swap_by_id(first, second) {
            return Err(HandlerError::SwapTargetNotFound {
                first,
                second,
                workspace,
            });
        }
        Ok(ws.tile(wm)?)
    }

    fn clients(&self, workspace: usize) -> HandlerResult<Vec<ClientId>> {
        Ok(self.get(workspace)?.active_layout().store().all())
    }
}

impl<W: WindowSystem> Executor for Tiler<W> {
    fn begin(&mut self) -> CommandContext {
        let active = self.wm.active_client().unwrap_or_else(|e| {
            warn!("failed to query active client: {}", e);
            None
        });
        let workspace = self.wm.current_workspace().unwrap_or_else(|e| {
            warn!("failed to query current workspace: {}", e);
            0
        });
        CommandContext::live(active, workspace)
    }

    fn execute(&mut self, context: &mut CommandContext, command: &Command) -> CommandResult {
        let result = registry::dispatch(self, context, command);
        if let Err(e) = &result {
            warn!("{}: {}", command, e);
        }
        result
    }
}

//  Tests
