//! The monitor table: the one piece of state the EventRouter, Reconciler,
//! and Coordinator all need to reach into. A single `Mutex` over the
//! whole table is a deliberate coarsening of §5's "per-workspace lock"
//! (see DESIGN.md) — it keeps the borrow story simple while still giving
//! each workspace's own reconciliation jobs FIFO order through the
//! worker-hashing in `reconciler`.

use crate::handle::{MonitorId, WorkspaceId};
use crate::monitor::Monitor;
use crate::workspace::Workspace;

#[derive(Default)]
pub struct MonitorTable {
    monitors: Vec<Monitor>,
}

impl MonitorTable {
    pub fn new(monitors: Vec<Monitor>) -> Self {
        Self { monitors }
    }

    pub fn monitors(&self) -> &[Monitor] {
        &self.monitors
    }

    pub fn monitors_mut(&mut self) -> &mut Vec<Monitor> {
        &mut self.monitors
    }

    pub fn find_monitor(&self, id: MonitorId) -> Option<&Monitor> {
        self.monitors.iter().find(|m| m.id() == id)
    }

    pub fn find_monitor_mut(&mut self, id: MonitorId) -> Option<&mut Monitor> {
        self.monitors.iter_mut().find(|m| m.id() == id)
    }

    pub fn find_workspace(&self, id: WorkspaceId) -> Option<&Workspace> {
        self.monitors
            .iter()
            .flat_map(|m| m.workspaces().iter())
            .find(|w| w.id() == id)
    }

    pub fn find_workspace_mut(&mut self, id: WorkspaceId) -> Option<&mut Workspace> {
        self.monitors
            .iter_mut()
            .flat_map(|m| m.workspaces_mut().iter_mut())
            .find(|w| w.id() == id)
    }

    /// The monitor whose full frame contains `(x, y)`, falling back to
    /// the first monitor if the point is outside every frame (e.g. a
    /// stale pointer position during a topology change).
    pub fn monitor_at_point(&self, x: i32, y: i32) -> Option<MonitorId> {
        self.monitors
            .iter()
            .find(|m| m.frame().contains_point(x, y))
            .or_else(|| self.monitors.first())
            .map(|m| m.id())
    }
}
