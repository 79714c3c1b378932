//! The top-level object an embedder constructs: wires `Runtime`,
//! `Reconciler`, and `EventRouter` together, drives startup enumeration,
//! and exposes the public command surface (§6) — mirrored from the
//! teacher's daemon entry point, which does the same "build the shared
//! state, spawn the worker threads, then hand back a thin command
//! facade" assembly.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::error::{TilingError, WindowResult};
use crate::event::{CoreEvent, EventRouter};
use crate::handle::{MonitorId, WindowHandle, WorkspaceId};
use crate::layout::LayoutKind;
use crate::persistence::{PersistenceStore, WorkspaceRecord};
use crate::platform::PlatformPort;
use crate::reconciler::Reconciler;
use crate::runtime::Runtime;

pub struct Coordinator {
    runtime: Arc<Runtime>,
    reconciler: Arc<Reconciler>,
    /// Kept alive for the Coordinator's lifetime; not joined on drop since
    /// the loop only ends when every `Sender<PlatformEvent>` clone (held by
    /// the platform port) goes away, which may outlive this struct.
    _event_thread: JoinHandle<()>,
}

impl Coordinator {
    /// Enumerates the current displays and windows, seeds each monitor's
    /// workspaces from `PersistenceStore` (falling back to the built-in
    /// defaults), spawns the reconciliation worker pool, and starts the
    /// event thread draining `port`'s platform events.
    pub fn new(
        port: Arc<dyn PlatformPort>,
        persistence: Arc<dyn PersistenceStore>,
        config: crate::config::TuningConfig,
    ) -> WindowResult<Self> {
        let runtime = Arc::new(Runtime::new(Arc::clone(&port), persistence, config));

        let descriptors = port.enumerate_displays()?;
        if descriptors.is_empty() {
            return Err(TilingError::PlatformDenied);
        }
        runtime.sync_topology(descriptors, Instant::now());

        // The first monitor's first workspace starts active; everything
        // else begins Inactive, matching a freshly booted daemon.
        {
            let mut monitors = runtime.monitors.lock().unwrap();
            if let Some(monitor) = monitors.monitors_mut().first_mut() {
                let visible_frame = monitor.visible_frame();
                monitor
                    .active_workspace_mut()
                    .activate(port.as_ref(), visible_frame, Duration::from_millis(0), Instant::now());
            }
        }

        for snapshot in port.enumerate_windows()? {
            let handle = snapshot.handle;
            let pid = snapshot.owning_pid;
            let (cx, cy) = (snapshot.frame.center_x(), snapshot.frame.center_y());
            runtime.windows.insert_snapshot(&snapshot);
            let mut monitors = runtime.monitors.lock().unwrap();
            let Some(monitor_id) = monitors.monitor_at_point(cx, cy) else {
                continue;
            };
            let Some(monitor) = monitors.find_monitor_mut(monitor_id) else {
                continue;
            };
            let visible_frame = monitor.visible_frame();
            let workspace = monitor.active_workspace_mut();
            let _ = workspace.adopt(handle, pid, &runtime.registry, port.as_ref(), visible_frame);
        }

        let reconciler = Arc::new(Reconciler::new(Arc::clone(&runtime)));
        let router = EventRouter::new(Arc::clone(&runtime), Arc::clone(&reconciler));

        let (tx, rx) = mpsc::channel();
        port.subscribe(tx);
        let event_thread = std::thread::spawn(move || {
            for event in rx {
                router.route(event);
            }
        });

        Ok(Self {
            runtime,
            reconciler,
            _event_thread: event_thread,
        })
    }

    /// Registers a channel for `CoreEvent` notifications (§6).
    pub fn subscribe(&self, sender: mpsc::Sender<CoreEvent>) {
        self.runtime.subscribe(sender);
    }

    fn mouse_monitor_id(&self) -> Option<MonitorId> {
        let (x, y) = self.runtime.port.pointer_location();
        self.runtime.monitors.lock().unwrap().monitor_at_point(x, y)
    }

    fn debounce(&self) -> Duration {
        Duration::from_millis(self.runtime.config.read().unwrap().reconcile_debounce_ms)
    }

    pub fn cycle_layout_on_mouse_monitor(&self) {
        let Some(monitor_id) = self.mouse_monitor_id() else {
            return;
        };
        let now = Instant::now();
        let debounce = self.debounce();
        let workspace_id;
        let kind;
        {
            let mut monitors = self.runtime.monitors.lock().unwrap();
            let Some(monitor) = monitors.find_monitor_mut(monitor_id) else {
                return;
            };
            let workspace = monitor.active_workspace_mut();
            workspace.cycle_layout(debounce, now);
            workspace_id = workspace.id();
            kind = workspace.layout_kind();
        }
        self.runtime.emit(CoreEvent::LayoutKindChanged { workspace_id, kind });
        self.reconciler.request(workspace_id);
    }

    pub fn set_layout_on_mouse_monitor(&self, kind: LayoutKind) {
        let Some(monitor_id) = self.mouse_monitor_id() else {
            return;
        };
        let now = Instant::now();
        let debounce = self.debounce();
        let workspace_id;
        {
            let mut monitors = self.runtime.monitors.lock().unwrap();
            let Some(monitor) = monitors.find_monitor_mut(monitor_id) else {
                return;
            };
            let workspace = monitor.active_workspace_mut();
            workspace.set_layout(kind, debounce, now);
            workspace_id = workspace.id();
        }
        self.runtime.emit(CoreEvent::LayoutKindChanged { workspace_id, kind });
        self.reconciler.request(workspace_id);
    }

    /// Cycles focus through the active workspace's non-minimized windows
    /// by insertion order (§6).
    pub fn focus_next_window(&self) {
        self.cycle_focus(1);
    }

    pub fn focus_previous_window(&self) {
        self.cycle_focus(-1);
    }

    fn cycle_focus(&self, direction: i64) {
        let Some(monitor_id) = self.mouse_monitor_id() else {
            return;
        };
        let mut monitors = self.runtime.monitors.lock().unwrap();
        let Some(monitor) = monitors.find_monitor_mut(monitor_id) else {
            return;
        };
        let workspace = monitor.active_workspace_mut();
        let candidates: Vec<WindowHandle> = workspace
            .windows()
            .into_iter()
            .filter(|h| !self.runtime.windows.is_minimized(*h))
            .collect();
        if candidates.is_empty() {
            return;
        }
        let current_index = workspace
            .focused()
            .and_then(|f| candidates.iter().position(|h| *h == f));
        let next_index = match current_index {
            Some(i) => (i as i64 + direction).rem_euclid(candidates.len() as i64) as usize,
            None => 0,
        };
        let next = candidates[next_index];
        workspace.set_focused(Some(next));
        drop(monitors);
        let _ = self.runtime.port.raise(next);
    }

    pub fn activate_workspace(&self, monitor_id: MonitorId, index: usize) {
        let debounce = self.debounce();
        let now = Instant::now();
        let mut monitors = self.runtime.monitors.lock().unwrap();
        let Some(monitor) = monitors.find_monitor_mut(monitor_id) else {
            return;
        };
        monitor.activate_workspace(index, self.runtime.port.as_ref(), debounce, now);
        let workspace_id = monitor.active_workspace().id();
        drop(monitors);
        self.runtime.emit(CoreEvent::WorkspaceActivated { workspace_id, monitor_id });
    }

    pub fn activate_next_workspace(&self) {
        self.step_workspace(1);
    }

    pub fn activate_previous_workspace(&self) {
        self.step_workspace(-1);
    }

    fn step_workspace(&self, direction: i64) {
        let Some(monitor_id) = self.mouse_monitor_id() else {
            return;
        };
        let debounce = self.debounce();
        let now = Instant::now();
        let mut monitors = self.runtime.monitors.lock().unwrap();
        let Some(monitor) = monitors.find_monitor_mut(monitor_id) else {
            return;
        };
        if direction >= 0 {
            monitor.activate_next(self.runtime.port.as_ref(), debounce, now);
        } else {
            monitor.activate_previous(self.runtime.port.as_ref(), debounce, now);
        }
        let workspace_id = monitor.active_workspace().id();
        drop(monitors);
        self.runtime.emit(CoreEvent::WorkspaceActivated { workspace_id, monitor_id });
    }

    /// Appends a new workspace to `monitor_id`, persists the updated
    /// record list, and returns its id.
    pub fn create_workspace(
        &self,
        monitor_id: MonitorId,
        name: impl Into<String>,
        layout_kind: LayoutKind,
    ) -> Option<WorkspaceId> {
        let mut monitors = self.runtime.monitors.lock().unwrap();
        let monitor = monitors.find_monitor_mut(monitor_id)?;
        let workspace = crate::workspace::Workspace::new(monitor_id, name, layout_kind);
        let id = workspace.id();
        monitor.add_workspace(workspace);
        self.persist_records(monitor);
        Some(id)
    }

    /// Removes `workspace_id`. Fails (no-op) if it is the last workspace
    /// on its monitor — the caller is responsible for reassigning its
    /// windows to a sibling before calling this, per §6.
    pub fn remove_workspace(&self, workspace_id: WorkspaceId) -> WindowResult<()> {
        let mut monitors = self.runtime.monitors.lock().unwrap();
        let Some(monitor_id) = monitors.find_workspace(workspace_id).map(|w| w.monitor_id()) else {
            return Ok(());
        };
        let monitor = monitors
            .find_monitor_mut(monitor_id)
            .expect("workspace's monitor_id must resolve to a live monitor");
        let Some(index) = monitor.workspace_index(workspace_id) else {
            return Ok(());
        };
        let visible_frame = monitor.visible_frame();

        // `remove_workspace` shifts everything after `index` down by one, so
        // whichever sibling survives — the one originally at 0 or at 1 —
        // ends up at 0.
        let mut removed = monitor.remove_workspace(index)?;
        let sibling_id = monitor.workspaces()[0].id();
        let windows = removed.windows();
        for handle in windows {
            let pid = self.runtime.windows.pid_of(handle);
            // `removed` is about to be dropped; unbind each handle from it
            // before re-adopting into the sibling, or `adopt`'s `bind`
            // call fails with `RegistryConflict` since the registry still
            // points at the workspace we're tearing down.
            removed.release(handle, &self.runtime.registry);
            if let Some(pid) = pid {
                if let Some(sibling) = monitor.workspaces_mut().iter_mut().find(|w| w.id() == sibling_id) {
                    let _ = sibling.adopt(handle, pid, &self.runtime.registry, self.runtime.port.as_ref(), visible_frame);
                }
            }
        }
        self.persist_records(monitor);
        drop(monitors);
        self.reconciler.request(sibling_id);
        Ok(())
    }

    /// Updates gap tuning and requests a retile on every workspace.
    pub fn set_gaps(&self, outer: i32, inner: i32) {
        {
            let mut config = self.runtime.config.write().unwrap();
            config.outer_gap = outer;
            config.inner_gap = inner;
            config.validate();
        }
        let debounce = self.debounce();
        let now = Instant::now();
        let mut ids = Vec::new();
        {
            let mut monitors = self.runtime.monitors.lock().unwrap();
            for monitor in monitors.monitors_mut() {
                for workspace in monitor.workspaces_mut() {
                    workspace.request_retile(debounce, now);
                    ids.push(workspace.id());
                }
            }
        }
        for id in ids {
            self.reconciler.request(id);
        }
    }

    /// Flips `handle`'s user-override float flag, flushes its memoized
    /// classification, and requests a retile on its owning workspace.
    pub fn toggle_float(&self, handle: WindowHandle) {
        self.runtime.windows.toggle_floating_override(handle);
        self.runtime.classifier.flush(handle);
        if let Some(workspace_id) = self.runtime.registry.owner(handle) {
            self.reconciler.request(workspace_id);
        }
    }

    fn persist_records(&self, monitor: &crate::monitor::Monitor) {
        let records: Vec<WorkspaceRecord> = monitor
            .workspaces()
            .iter()
            .map(|w| WorkspaceRecord {
                workspace_id: w.id(),
                name: w.title().to_string(),
                layout_kind: w.layout_kind(),
            })
            .collect();
        self.runtime.persistence.save(monitor.id(), &records);
    }
}
