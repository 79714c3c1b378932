//! A physical display: an ordered list of workspaces and a pointer to the
//! active one. Owns its workspaces by value — Design Note §9's "Monitor
//! owns Workspaces by value... Workspaces store the Monitor's stable id"
//! split of the original cyclic reference.

use std::time::{Duration, Instant};

use crate::error::{TilingError, WindowResult};
use crate::handle::{MonitorId, WorkspaceId};
use crate::platform::PlatformPort;
use crate::rect::Rect;
use crate::workspace::Workspace;

pub struct Monitor {
    id: MonitorId,
    name: String,
    frame: Rect,
    visible_frame: Rect,
    workspaces: Vec<Workspace>,
    active_index: usize,
}

impl Monitor {
    /// Creates a monitor with a single workspace — the invariant "at
    /// least one workspace exists" must hold from construction onward.
    pub fn new(id: MonitorId, name: impl Into<String>, frame: Rect, visible_frame: Rect, initial: Workspace) -> Self {
        Self {
            id,
            name: name.into(),
            frame,
            visible_frame,
            workspaces: vec![initial],
            active_index: 0,
        }
    }

    pub fn id(&self) -> MonitorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn visible_frame(&self) -> Rect {
        self.visible_frame
    }

    pub fn set_visible_frame(&mut self, frame: Rect) {
        self.visible_frame = frame;
    }

    pub fn set_frame(&mut self, frame: Rect) {
        self.frame = frame;
    }

    /// Drains every workspace from this monitor, leaving it with none.
    /// Only ever called on a monitor that is itself about to be dropped
    /// after a display topology change — the "at least one workspace"
    /// invariant is for live monitors, not ones mid-teardown.
    pub fn take_workspaces(&mut self) -> Vec<Workspace> {
        std::mem::take(&mut self.workspaces)
    }

    pub fn workspaces(&self) -> &[Workspace] {
        &self.workspaces
    }

    pub fn workspaces_mut(&mut self) -> &mut [Workspace] {
        &mut self.workspaces
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active_workspace(&self) -> &Workspace {
        &self.workspaces[self.active_index]
    }

    pub fn active_workspace_mut(&mut self) -> &mut Workspace {
        &mut self.workspaces[self.active_index]
    }

    pub fn workspace_index(&self, id: WorkspaceId) -> Option<usize> {
        self.workspaces.iter().position(|w| w.id() == id)
    }

    /// Appends a new workspace, returning its index.
    pub fn add_workspace(&mut self, workspace: Workspace) -> usize {
        self.workspaces.push(workspace);
        self.workspaces.len() - 1
    }

    /// Removes the workspace at `index`. Fails with `LastWorkspace` if it
    /// is the only one on this monitor. The caller is responsible for
    /// reassigning the removed workspace's windows to a sibling before
    /// calling this.
    pub fn remove_workspace(&mut self, index: usize) -> WindowResult<Workspace> {
        if self.workspaces.len() <= 1 {
            return Err(TilingError::LastWorkspace(self.id));
        }
        let removed = self.workspaces.remove(index);
        if self.active_index >= self.workspaces.len() {
            self.active_index = self.workspaces.len() - 1;
        } else if index < self.active_index {
            self.active_index -= 1;
        }
        Ok(removed)
    }

    /// Activates the workspace at `index` as a single monitor-scoped
    /// critical section: the previously-active workspace is deactivated
    /// (saving its geometry and hiding its windows) before the target is
    /// activated, so `activate()` on the target can never observe a
    /// partially-deactivated sibling (§5's ordering guarantee).
    pub fn activate_workspace(
        &mut self,
        index: usize,
        port: &dyn PlatformPort,
        settle_delay: Duration,
        now: Instant,
    ) {
        if index == self.active_index {
            return;
        }
        let visible_frame = self.visible_frame;
        self.workspaces[self.active_index].deactivate(port, visible_frame);
        self.active_index = index;
        self.workspaces[self.active_index].activate(port, visible_frame, settle_delay, now);
    }

    pub fn activate_next(&mut self, port: &dyn PlatformPort, settle_delay: Duration, now: Instant) {
        let next = (self.active_index + 1) % self.workspaces.len();
        self.activate_workspace(next, port, settle_delay, now);
    }

    pub fn activate_previous(&mut self, port: &dyn PlatformPort, settle_delay: Duration, now: Instant) {
        let len = self.workspaces.len();
        let previous = (self.active_index + len - 1) % len;
        self.activate_workspace(previous, port, settle_delay, now);
    }
}
