//! Per-workspace tiling state.
//!
//! A [`Workspace`] owns one [`Layout`] per entry of a fixed layout cycle.
//! Every layout has its own [`Store`]; clients are added to and removed from
//! all of them so switching layouts never needs re-population.

use crate::command::ClientId;
use crate::store::Store;
use crate::traits::{Arrangement, WindowSystem};
use std::fmt;

/// Bounds for the master-area proportion.
pub const MIN_PROPORTION: f64 = 0.1;
pub const MAX_PROPORTION: f64 = 0.9;

/// Available tiling strategies.
///
/// They share every store operation and differ only in how the window
/// system turns their [`Arrangement`] into geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutKind {
    /// Masters in a column on the left, slaves stacked on the right.
    Vertical,
    /// Masters in a row on top, slaves side by side below.
    Horizontal,
    /// Every client covers the whole workspace.
    Fullscreen,
}

impl LayoutKind {
    pub const DEFAULT_CYCLE: [LayoutKind; 3] = [
        LayoutKind::Vertical,
        LayoutKind::Horizontal,
        LayoutKind::Fullscreen,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LayoutKind::Vertical => "vertical",
            LayoutKind::Horizontal => "horizontal",
            LayoutKind::Fullscreen => "fullscreen",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::DEFAULT_CYCLE.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors from workspace operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkspaceError {
    #[error("failed to set non-existent layout {0:?}")]
    LayoutNotFound(String),
    #[error("window system error: {0}")]
    WindowSystem(String),
}

fn wm_err<E: std::error::Error>(e: E) -> WorkspaceError {
    WorkspaceError::WindowSystem(e.to_string())
}

/// A named tiling strategy owning one [`Store`].
#[derive(Debug, Clone)]
pub struct Layout {
    kind: LayoutKind,
    store: Store,
    proportion: f64,
}

impl Layout {
    pub fn new(kind: LayoutKind) -> Self {
        Self {
            kind,
            store: Store::new(),
            proportion: 0.5,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn proportion(&self) -> f64 {
        self.proportion
    }

    /// Grow (positive `delta`) or shrink the master area, clamped to
    /// [`MIN_PROPORTION`]..=[`MAX_PROPORTION`].
    pub fn adjust_proportion(&mut self, delta: f64) {
        self.proportion = (self.proportion + delta).clamp(MIN_PROPORTION, MAX_PROPORTION);
    }

    pub fn arrangement(&self) -> Arrangement<'_> {
        Arrangement {
            kind: self.kind,
            masters: self.store.masters(),
            slaves: self.store.slaves(),
            proportion: self.proportion,
        }
    }

    /// Apply this layout (`Do`).
    pub fn apply<W: WindowSystem>(&self, wm: &W, workspace: usize) -> Result<(), W::Error> {
        wm.arrange(workspace, &self.arrangement())
    }

    /// Give the clients back to the window system (`Undo`).
    pub fn release<W: WindowSystem>(&self, wm: &W, workspace: usize) -> Result<(), W::Error> {
        wm.release(workspace, &self.store.all())
    }
}

/// Tiling state of one workspace.
#[derive(Debug, Clone)]
pub struct Workspace {
    index: usize,
    tiling: bool,
    active: usize,
    layouts: Vec<Layout>,
}

impl Workspace {
    /// Create a workspace with the given layout cycle.
    ///
    /// Duplicate entries are dropped; an empty `cycle` falls back to
    /// [`LayoutKind::DEFAULT_CYCLE`].
    pub fn new(index: usize, cycle: &[LayoutKind]) -> Self {
        let mut layouts: Vec<Layout> = Vec::with_capacity(cycle.len());
        for &kind in cycle {
            if !layouts.iter().any(|l| l.kind == kind) {
                layouts.push(Layout::new(kind));
            }
        }
        if layouts.is_empty() {
            layouts = LayoutKind::DEFAULT_CYCLE.into_iter().map(Layout::new).collect();
        }
        Self {
            index,
            tiling: false,
            active: 0,
            layouts,
        }
    }

    pub fn is_tiling(&self) -> bool {
        self.tiling
    }

    pub fn active_layout(&self) -> &Layout {
        &self.layouts[self.active]
    }

    pub fn active_layout_mut(&mut self) -> &mut Layout {
        &mut self.layouts[self.active]
    }

    pub fn active_layout_name(&self) -> &'static str {
        self.active_layout().name()
    }

    pub fn layout_names(&self) -> Vec<&'static str> {
        self.layouts.iter().map(Layout::name).collect()
    }

    /// Advance to the next layout of the cycle and apply it.
    pub fn switch_layout<W: WindowSystem>(&mut self, wm: &W) -> Result<(), WorkspaceError> {
        self.active = (self.active + 1) % self.layouts.len();
        self.active_layout().apply(wm, self.index).map_err(wm_err)
    }

    /// Activate the layout called `name`, turn tiling on and apply it.
    pub fn set_layout_by_name<W: WindowSystem>(
        &mut self,
        name: &str,
        wm: &W,
    ) -> Result<(), WorkspaceError> {
        let position = self
            .layouts
            .iter()
            .position(|l| l.name() == name)
            .ok_or_else(|| WorkspaceError::LayoutNotFound(name.to_string()))?;
        self.active = position;
        self.tiling = true;
        self.active_layout().apply(wm, self.index).map_err(wm_err)
    }

    /// Turn tiling on and apply the active layout.
    pub fn start_tiling<W: WindowSystem>(&mut self, wm: &W) -> Result<(), WorkspaceError> {
        self.tiling = true;
        self.tile(wm)
    }

    /// Re-apply the active layout, if tiling is on.
    pub fn tile<W: WindowSystem>(&self, wm: &W) -> Result<(), WorkspaceError> {
        if self.tiling {
            self.active_layout().apply(wm, self.index).map_err(wm_err)?;
        }
        Ok(())
    }

    /// Turn tiling off and release the clients.  A workspace that is not
    /// tiling is left alone.
    pub fn untile<W: WindowSystem>(&mut self, wm: &W) -> Result<(), WorkspaceError> {
        if !self.tiling {
            return Ok(());
        }
        self.tiling = false;
        self.active_layout().release(wm, self.index).map_err(wm_err)
    }

    /// Add `client` to every layout.
    pub fn add_client(&mut self, client: ClientId) {
        for layout in &mut self.layouts {
            layout.store.add(client);
        }
    }

    /// Remove `client` from every layout.
    pub fn remove_client(&mut self, client: ClientId) {
        for layout in &mut self.layouts {
            layout.store.remove(client);
        }
    }

    pub fn contains(&self, client: ClientId) -> bool {
        self.active_layout().store.contains(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ClientInfo;
    use std::cell::RefCell;

    /// Records every arrange / release call.
    #[derive(Debug, Default)]
    struct RecorderWm {
        arranged: RefCell<Vec<(usize, LayoutKind, Vec<ClientId>)>>,
        released: RefCell<Vec<(usize, Vec<ClientId>)>>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("recorder error")]
    struct RecorderErr;

    impl WindowSystem for RecorderWm {
        type Error = RecorderErr;

        fn active_client(&self) -> Result<Option<ClientId>, RecorderErr> {
            Ok(None)
        }

        fn current_workspace(&self) -> Result<usize, RecorderErr> {
            Ok(0)
        }

        fn workspace_count(&self) -> usize {
            1
        }

        fn clients(&self) -> Result<Vec<ClientInfo>, RecorderErr> {
            Ok(Vec::new())
        }

        fn bind_key(&self, _chord: &str) -> Result<(), RecorderErr> {
            Ok(())
        }

        fn focus(&self, _client: ClientId) -> Result<(), RecorderErr> {
            Ok(())
        }

        fn arrange(&self, workspace: usize, a: &Arrangement<'_>) -> Result<(), RecorderErr> {
            let clients = a.masters.iter().chain(a.slaves).copied().collect();
            self.arranged.borrow_mut().push((workspace, a.kind, clients));
            Ok(())
        }

        fn release(&self, workspace: usize, clients: &[ClientId]) -> Result<(), RecorderErr> {
            self.released.borrow_mut().push((workspace, clients.to_vec()));
            Ok(())
        }
    }

    fn workspace_with_clients(n: u64) -> Workspace {
        let mut ws = Workspace::new(2, &LayoutKind::DEFAULT_CYCLE);
        for i in 1..=n {
            ws.add_client(ClientId(i));
        }
        ws
    }

    #[test]
    fn clients_fan_out_to_every_layout() {
        let mut ws = workspace_with_clients(3);
        ws.remove_client(ClientId(2));
        for layout in &ws.layouts {
            assert_eq!(layout.store().all(), vec![ClientId(1), ClientId(3)]);
        }
    }

    #[test]
    fn switch_layout_cycles_and_applies() {
        let wm = RecorderWm::default();
        let mut ws = workspace_with_clients(2);
        ws.switch_layout(&wm).unwrap();
        assert_eq!(ws.active_layout_name(), "horizontal");
        ws.switch_layout(&wm).unwrap();
        ws.switch_layout(&wm).unwrap();
        assert_eq!(ws.active_layout_name(), "vertical");
        let kinds: Vec<LayoutKind> = wm.arranged.borrow().iter().map(|(_, k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![LayoutKind::Horizontal, LayoutKind::Fullscreen, LayoutKind::Vertical]
        );
    }

    #[test]
    fn set_layout_by_name_turns_tiling_on() {
        let wm = RecorderWm::default();
        let mut ws = workspace_with_clients(1);
        ws.set_layout_by_name("fullscreen", &wm).unwrap();
        assert!(ws.is_tiling());
        assert_eq!(ws.active_layout_name(), "fullscreen");
        assert_eq!(wm.arranged.borrow().len(), 1);
        assert_eq!(wm.arranged.borrow()[0].0, 2);
    }

    #[test]
    fn set_unknown_layout_fails_without_change() {
        let wm = RecorderWm::default();
        let mut ws = workspace_with_clients(1);
        let err = ws.set_layout_by_name("spiral", &wm).unwrap_err();
        assert_eq!(err, WorkspaceError::LayoutNotFound("spiral".into()));
        assert!(!ws.is_tiling());
        assert_eq!(ws.active_layout_name(), "vertical");
        assert!(wm.arranged.borrow().is_empty());
    }

    #[test]
    fn set_layout_outside_configured_cycle_fails() {
        let wm = RecorderWm::default();
        let mut ws = Workspace::new(0, &[LayoutKind::Vertical]);
        assert!(ws.set_layout_by_name("horizontal", &wm).is_err());
        assert_eq!(ws.layout_names(), vec!["vertical"]);
    }

    #[test]
    fn tile_only_applies_while_tiling() {
        let wm = RecorderWm::default();
        let mut ws = workspace_with_clients(2);
        ws.tile(&wm).unwrap();
        assert!(wm.arranged.borrow().is_empty());
        ws.start_tiling(&wm).unwrap();
        ws.tile(&wm).unwrap();
        assert_eq!(wm.arranged.borrow().len(), 2);
    }

    #[test]
    fn untile_is_idempotent() {
        let wm = RecorderWm::default();
        let mut ws = workspace_with_clients(2);
        ws.start_tiling(&wm).unwrap();
        ws.untile(&wm).unwrap();
        ws.untile(&wm).unwrap();
        assert!(!ws.is_tiling());
        let released = wm.released.borrow();
        assert_eq!(released.len(), 1);
        assert_eq!(released[0], (2, vec![ClientId(1), ClientId(2)]));
    }

    #[test]
    fn proportion_is_clamped() {
        let mut layout = Layout::new(LayoutKind::Vertical);
        for _ in 0..10 {
            layout.adjust_proportion(0.1);
        }
        assert!((layout.proportion() - MAX_PROPORTION).abs() < 1e-9);
        for _ in 0..20 {
            layout.adjust_proportion(-0.1);
        }
        assert!((layout.proportion() - MIN_PROPORTION).abs() < 1e-9);
    }

    #[test]
    fn duplicate_cycle_entries_collapse() {
        let ws = Workspace::new(0, &[LayoutKind::Fullscreen, LayoutKind::Fullscreen]);
        assert_eq!(ws.layout_names(), vec!["fullscreen"]);
        let ws = Workspace::new(0, &[]);
        assert_eq!(ws.layout_names(), vec!["vertical", "horizontal", "fullscreen"]);
    }
}
