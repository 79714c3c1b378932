//! A named, per-monitor container of windows governed by a single layout
//! tree. Stores its owning monitor's stable id rather than a reference or
//! an `Rc`/`Arc` back-pointer — the non-owning-handle pattern Design Note
//! §9 asks for, mirrored from the teacher's own choice to store plain
//! `usize` window handles rather than owned `Window` values.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::WindowResult;
use crate::handle::{MonitorId, ProcessId, WindowHandle, WorkspaceId};
use crate::layout::{LayoutKind, LayoutTree};
use crate::platform::PlatformPort;
use crate::rect::Rect;
use crate::registry::WindowRegistry;

/// How far into a monitor's corner the hide point sits. Small enough that
/// a 1x1-sized ghost window is invisible, large enough to never land
/// exactly on frame's edge for any realistic monitor size.
const HIDE_EPSILON: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceState {
    Inactive,
    Activating,
    Active,
    Deactivating,
}

/// A window's last known geometry plus whether it held focus, captured at
/// `deactivate()` and consulted on the next `activate()`.
#[derive(Debug, Default, Clone)]
pub struct SavedGeometry {
    pub frames: HashMap<WindowHandle, Rect>,
    pub focused: Option<WindowHandle>,
}

pub struct Workspace {
    id: WorkspaceId,
    title: String,
    monitor_id: MonitorId,
    tree: LayoutTree,
    /// Windows owned by this workspace but excluded from the tree by the
    /// `FloatClassifier` — kept alongside the tree rather than inside it
    /// so they still participate in `windows()`, `activate()`, and
    /// `deactivate()` (every *owned* window hides when inactive, tiled or
    /// not) without the `GeometryEngine` ever seeing them.
    floating: Vec<WindowHandle>,
    saved: SavedGeometry,
    state: WorkspaceState,
    needs_retile: bool,
    retile_not_before: Option<Instant>,
}

impl Workspace {
    pub fn new(monitor_id: MonitorId, title: impl Into<String>, kind: LayoutKind) -> Self {
        Self {
            id: WorkspaceId::new(),
            title: title.into(),
            monitor_id,
            tree: LayoutTree::new(kind),
            floating: Vec::new(),
            saved: SavedGeometry::default(),
            state: WorkspaceState::Inactive,
            needs_retile: false,
            retile_not_before: None,
        }
    }

    /// Reconstructs a workspace with a caller-supplied stable id, for
    /// rehydrating from a `WorkspaceRecord` loaded via `PersistenceStore`.
    pub fn from_record(
        id: WorkspaceId,
        monitor_id: MonitorId,
        title: impl Into<String>,
        kind: LayoutKind,
    ) -> Self {
        let mut ws = Self::new(monitor_id, title, kind);
        ws.id = id;
        ws
    }

    pub fn id(&self) -> WorkspaceId {
        self.id
    }

    pub fn monitor_id(&self) -> MonitorId {
        self.monitor_id
    }

    /// Reassigns this workspace to a different monitor, without touching
    /// its tree or saved geometry. Used when a display is unplugged and
    /// its workspaces are migrated to a surviving monitor (§4.6's
    /// `DisplayTopologyChanged` handling).
    pub fn set_monitor_id(&mut self, monitor_id: MonitorId) {
        self.monitor_id = monitor_id;
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn state(&self) -> WorkspaceState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == WorkspaceState::Active
    }

    pub fn tree(&self) -> &LayoutTree {
        &self.tree
    }

    /// Every window this workspace owns: both tiled (in the tree) and
    /// floating. The invariant in §8 ("every owned window is located
    /// within `hide_region`" when inactive) covers both.
    pub fn windows(&self) -> Vec<WindowHandle> {
        let mut all = self.tree.windows();
        all.extend(self.floating.iter().copied());
        all
    }

    /// Windows the `GeometryEngine` will place: the tree's contents only.
    pub fn tiled_windows(&self) -> Vec<WindowHandle> {
        self.tree.windows()
    }

    pub fn floating_windows(&self) -> &[WindowHandle] {
        &self.floating
    }

    /// The Reconciler's tree-maintenance step (§4.3/§4.6): resyncs the
    /// tree against `tileable` and replaces the floating set wholesale.
    /// Called once per reconciliation with fresh classifier output, so a
    /// window toggled float-on or float-off always lands in the right
    /// bucket on the very next retile.
    pub fn sync_tree(&mut self, tileable: &[WindowHandle], floating: Vec<WindowHandle>) {
        self.tree.sync(tileable);
        self.floating = floating;
    }

    pub fn layout_kind(&self) -> LayoutKind {
        self.tree.root_kind()
    }

    pub fn needs_retile(&self) -> bool {
        self.needs_retile
    }

    /// Whether the debounce window has elapsed and a pending retile may
    /// now fire.
    pub fn retile_is_due(&self, now: Instant) -> bool {
        self.needs_retile && self.retile_not_before.is_none_or(|t| t <= now)
    }

    pub fn mark_retiled(&mut self) {
        self.needs_retile = false;
        self.retile_not_before = None;
    }

    /// Schedules a reconciliation. Per §4.6's coalescing rule: if a job is
    /// already pending and its fire time hasn't passed yet, the new
    /// request is dropped (the earlier, sooner deadline wins); otherwise
    /// one is scheduled `debounce` from `now`.
    pub fn request_retile(&mut self, debounce: Duration, now: Instant) {
        self.needs_retile = true;
        let already_pending = self.retile_not_before.is_some_and(|t| t > now);
        if !already_pending {
            self.retile_not_before = Some(now + debounce);
        }
    }

    pub fn set_focused(&mut self, handle: Option<WindowHandle>) {
        self.saved.focused = handle;
    }

    pub fn focused(&self) -> Option<WindowHandle> {
        self.saved.focused
    }

    /// Binds `handle` to this workspace, adds it to the tree, and — if
    /// the workspace isn't active — parks it at the hide point
    /// immediately.
    pub fn adopt(
        &mut self,
        handle: WindowHandle,
        pid: ProcessId,
        registry: &WindowRegistry,
        port: &dyn PlatformPort,
        visible_frame: Rect,
    ) -> WindowResult<()> {
        registry.bind(handle, self.id, pid)?;
        let mut current = self.tree.windows();
        current.push(handle);
        self.tree.sync(&current);
        if self.state != WorkspaceState::Active {
            move_to_hide_point(port, handle, visible_frame);
        }
        Ok(())
    }

    /// Removes `handle` from the tree, unbinds it, and drops any saved
    /// geometry for it.
    pub fn release(&mut self, handle: WindowHandle, registry: &WindowRegistry) {
        self.tree.remove_window(handle);
        self.floating.retain(|h| *h != handle);
        registry.unbind(handle);
        self.saved.frames.remove(&handle);
        if self.saved.focused == Some(handle) {
            self.saved.focused = None;
        }
    }

    /// No-op if already active. Restores saved geometry window-by-window,
    /// centering any window lacking a saved entry, raises the
    /// previously-focused window if one was recorded, and schedules a
    /// reconciliation after `settle_delay` to account for asynchronous OS
    /// animations.
    pub fn activate(
        &mut self,
        port: &dyn PlatformPort,
        visible_frame: Rect,
        settle_delay: Duration,
        now: Instant,
    ) {
        if self.state == WorkspaceState::Active {
            return;
        }
        self.state = WorkspaceState::Activating;
        for handle in self.windows() {
            let target = self.saved.frames.get(&handle).copied().unwrap_or_else(|| {
                let size = port
                    .get_geometry(handle)
                    .map(|r| (r.width, r.height))
                    .unwrap_or((600, 400));
                centered_rect(visible_frame, size)
            });
            let _ = port.set_geometry(handle, target);
        }
        if let Some(focused) = self.saved.focused {
            if self.windows().contains(&focused) {
                let _ = port.raise(focused);
            }
        }
        self.state = WorkspaceState::Active;
        self.request_retile(settle_delay, now);
    }

    /// Snapshots current geometry and the focused window, then hides
    /// every owned window.
    pub fn deactivate(&mut self, port: &dyn PlatformPort, visible_frame: Rect) {
        self.state = WorkspaceState::Deactivating;
        self.saved.frames.clear();
        for handle in self.windows() {
            if let Some(rect) = port.get_geometry(handle) {
                self.saved.frames.insert(handle, rect);
            }
        }
        for handle in self.windows() {
            move_to_hide_point(port, handle, visible_frame);
        }
        self.state = WorkspaceState::Inactive;
    }

    /// Mutates the root layout kind and schedules a reconciliation.
    pub fn set_layout(&mut self, kind: LayoutKind, debounce: Duration, now: Instant) {
        self.tree.set_kind(kind);
        self.request_retile(debounce, now);
    }

    /// Advances through the fixed order {bsp, hstack, vstack, zstack,
    /// float}.
    pub fn cycle_layout(&mut self, debounce: Duration, now: Instant) {
        let next = self.tree.root_kind().next();
        self.set_layout(next, debounce, now);
    }
}

fn move_to_hide_point(port: &dyn PlatformPort, handle: WindowHandle, visible_frame: Rect) {
    let size = port
        .get_geometry(handle)
        .map(|r| (r.width, r.height))
        .unwrap_or((1, 1));
    let hidden = Rect::new(
        visible_frame.max_x() - HIDE_EPSILON,
        visible_frame.max_y() - HIDE_EPSILON,
        size.0,
        size.1,
    );
    let _ = port.set_geometry(handle, hidden);
}

fn centered_rect(visible_frame: Rect, size: (i32, i32)) -> Rect {
    let (w, h) = size;
    Rect::new(
        visible_frame.center_x() - w / 2,
        visible_frame.center_y() - h / 2,
        w,
        h,
    )
}

/// The small rectangle at the bottom-right corner of `visible_frame`
/// where inactive workspaces' windows are parked. Exposed for the
/// quantified invariant in §8 ("every owned window is located within
/// `hide_region`").
pub fn hide_region(visible_frame: Rect) -> Rect {
    Rect::new(
        visible_frame.max_x() - HIDE_EPSILON - 1,
        visible_frame.max_y() - HIDE_EPSILON - 1,
        HIDE_EPSILON + 2,
        HIDE_EPSILON + 2,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::MonitorId;
    use crate::platform::{FakePlatformPort, PlatformPort, WindowSnapshot};

    fn frame() -> Rect {
        Rect::new(0, 0, 1920, 1080)
    }

    fn port_with_window(handle: WindowHandle, rect: Rect) -> FakePlatformPort {
        let port = FakePlatformPort::new();
        port.add_window(WindowSnapshot {
            handle,
            owning_pid: ProcessId(1),
            frame: rect,
            title: String::new(),
            subrole: String::new(),
            bundle_id: String::new(),
            is_minimized: false,
        });
        port
    }

    #[test]
    fn adopt_while_inactive_hides_the_window() {
        // Arrange
        let registry = WindowRegistry::new();
        let port = port_with_window(WindowHandle(1), Rect::new(100, 100, 300, 200));
        let mut ws = Workspace::new(MonitorId(0), "Default", LayoutKind::Bsp);
        // Act
        ws.adopt(WindowHandle(1), ProcessId(1), &registry, &port, frame())
            .unwrap();
        // Assert
        let rect = port.get_geometry(WindowHandle(1)).unwrap();
        assert_eq!(rect.x, frame().max_x() - HIDE_EPSILON);
        assert_eq!(rect.y, frame().max_y() - HIDE_EPSILON);
        assert!(ws.windows().contains(&WindowHandle(1)));
    }

    #[test]
    fn adopt_fails_if_handle_already_bound_elsewhere() {
        let registry = WindowRegistry::new();
        let port = port_with_window(WindowHandle(1), Rect::new(0, 0, 10, 10));
        let other = crate::handle::WorkspaceId::new();
        registry.bind(WindowHandle(1), other, ProcessId(1)).unwrap();
        let mut ws = Workspace::new(MonitorId(0), "Default", LayoutKind::Bsp);
        let result = ws.adopt(WindowHandle(1), ProcessId(1), &registry, &port, frame());
        assert!(result.is_err());
    }

    #[test]
    fn release_drops_saved_geometry_and_unbinds() {
        let registry = WindowRegistry::new();
        let port = port_with_window(WindowHandle(1), Rect::new(0, 0, 10, 10));
        let mut ws = Workspace::new(MonitorId(0), "Default", LayoutKind::Bsp);
        ws.adopt(WindowHandle(1), ProcessId(1), &registry, &port, frame())
            .unwrap();
        ws.release(WindowHandle(1), &registry);
        assert!(!ws.windows().contains(&WindowHandle(1)));
        assert_eq!(registry.owner(WindowHandle(1)), None);
    }

    #[test]
    fn deactivate_then_activate_restores_geometry() {
        // Arrange: an active workspace with one window at a known rect.
        let registry = WindowRegistry::new();
        let port = port_with_window(WindowHandle(1), Rect::new(50, 60, 400, 300));
        let mut ws = Workspace::new(MonitorId(0), "Default", LayoutKind::Bsp);
        ws.adopt(WindowHandle(1), ProcessId(1), &registry, &port, frame())
            .unwrap();
        ws.activate(&port, frame(), Duration::from_millis(0), Instant::now());
        port.set_geometry(WindowHandle(1), Rect::new(50, 60, 400, 300))
            .unwrap();

        // Act
        ws.deactivate(&port, frame());
        let hidden = port.get_geometry(WindowHandle(1)).unwrap();
        assert_eq!(hidden.x, frame().max_x() - HIDE_EPSILON);
        ws.activate(&port, frame(), Duration::from_millis(0), Instant::now());

        // Assert: restored to the exact geometry captured at deactivate.
        assert_eq!(
            port.get_geometry(WindowHandle(1)).unwrap(),
            Rect::new(50, 60, 400, 300)
        );
    }

    #[test]
    fn activate_is_a_no_op_when_already_active() {
        let registry = WindowRegistry::new();
        let port = port_with_window(WindowHandle(1), Rect::new(0, 0, 10, 10));
        let mut ws = Workspace::new(MonitorId(0), "Default", LayoutKind::Bsp);
        ws.adopt(WindowHandle(1), ProcessId(1), &registry, &port, frame())
            .unwrap();
        ws.activate(&port, frame(), Duration::from_millis(0), Instant::now());
        assert!(ws.is_active());
        ws.activate(&port, frame(), Duration::from_millis(0), Instant::now());
        assert!(ws.is_active());
    }

    #[test]
    fn cycle_layout_five_times_returns_to_the_starting_kind() {
        let mut ws = Workspace::new(MonitorId(0), "Default", LayoutKind::Bsp);
        let now = Instant::now();
        for _ in 0..5 {
            ws.cycle_layout(Duration::from_millis(0), now);
        }
        assert_eq!(ws.layout_kind(), LayoutKind::Bsp);
    }

    #[test]
    fn set_layout_twice_with_same_kind_is_idempotent() {
        let mut ws = Workspace::new(MonitorId(0), "Default", LayoutKind::Bsp);
        let now = Instant::now();
        ws.set_layout(LayoutKind::Hstack, Duration::from_millis(0), now);
        let before = ws.layout_kind();
        ws.set_layout(LayoutKind::Hstack, Duration::from_millis(0), now);
        assert_eq!(before, ws.layout_kind());
    }

    #[test]
    fn request_retile_coalesces_within_the_debounce_window() {
        let mut ws = Workspace::new(MonitorId(0), "Default", LayoutKind::Bsp);
        let now = Instant::now();
        ws.request_retile(Duration::from_millis(200), now);
        let first_deadline = ws.retile_not_before;
        ws.request_retile(Duration::from_millis(200), now + Duration::from_millis(50));
        assert_eq!(ws.retile_not_before, first_deadline);
    }

    #[test]
    fn retile_is_not_due_before_the_debounce_elapses() {
        let mut ws = Workspace::new(MonitorId(0), "Default", LayoutKind::Bsp);
        let now = Instant::now();
        ws.request_retile(Duration::from_millis(200), now);
        assert!(!ws.retile_is_due(now + Duration::from_millis(100)));
        assert!(ws.retile_is_due(now + Duration::from_millis(200)));
    }

    #[test]
    fn sync_tree_moves_a_window_into_the_floating_set() {
        let registry = WindowRegistry::new();
        let port = port_with_window(WindowHandle(1), Rect::new(0, 0, 10, 10));
        let mut ws = Workspace::new(MonitorId(0), "Default", LayoutKind::Bsp);
        ws.adopt(WindowHandle(1), ProcessId(1), &registry, &port, frame())
            .unwrap();
        ws.sync_tree(&[], vec![WindowHandle(1)]);
        assert!(ws.tiled_windows().is_empty());
        assert_eq!(ws.floating_windows(), &[WindowHandle(1)]);
        assert!(ws.windows().contains(&WindowHandle(1)));
    }

    #[test]
    fn deactivate_hides_floating_windows_too() {
        let registry = WindowRegistry::new();
        let port = port_with_window(WindowHandle(1), Rect::new(50, 60, 300, 300));
        let mut ws = Workspace::new(MonitorId(0), "Default", LayoutKind::Bsp);
        ws.adopt(WindowHandle(1), ProcessId(1), &registry, &port, frame())
            .unwrap();
        ws.sync_tree(&[], vec![WindowHandle(1)]);
        ws.activate(&port, frame(), Duration::from_millis(0), Instant::now());
        ws.deactivate(&port, frame());
        let rect = port.get_geometry(WindowHandle(1)).unwrap();
        assert_eq!(rect.x, frame().max_x() - HIDE_EPSILON);
    }

    #[test]
    fn release_removes_a_floating_window_from_the_floating_set() {
        let registry = WindowRegistry::new();
        let port = port_with_window(WindowHandle(1), Rect::new(0, 0, 10, 10));
        let mut ws = Workspace::new(MonitorId(0), "Default", LayoutKind::Bsp);
        ws.adopt(WindowHandle(1), ProcessId(1), &registry, &port, frame())
            .unwrap();
        ws.sync_tree(&[], vec![WindowHandle(1)]);
        ws.release(WindowHandle(1), &registry);
        assert!(ws.floating_windows().is_empty());
        assert!(ws.windows().is_empty());
    }

    #[test]
    fn empty_workspace_has_no_windows_and_no_pending_retile() {
        let ws = Workspace::new(MonitorId(0), "Default", LayoutKind::Bsp);
        assert!(ws.windows().is_empty());
        assert!(!ws.needs_retile());
    }
}
