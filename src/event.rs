//! Fan-out notifications for UI embedders (§6) and the dispatch table that
//! turns a raw `PlatformEvent` into registry/tree mutations plus
//! reconciliation requests — mirrored from the teacher's event-handler
//! module, which does the same raw-event-to-domain-mutation translation
//! one match arm at a time.

use std::sync::Arc;
use std::time::Instant;

use crate::handle::{MonitorId, ProcessId, WindowHandle, WorkspaceId};
use crate::layout::LayoutKind;
use crate::platform::{PlatformEvent, WindowSnapshot};
use crate::rect::Rect;
use crate::reconciler::Reconciler;
use crate::runtime::Runtime;

/// The nine notification kinds an embedder can subscribe to (§6). Each
/// corresponds to a user-visible change in tiling state, not to every raw
/// `PlatformEvent` — a window move that doesn't change which workspace
/// owns it, for instance, is not one of these.
#[derive(Debug, Clone)]
pub enum CoreEvent {
    WorkspaceActivated {
        workspace_id: WorkspaceId,
        monitor_id: MonitorId,
    },
    LayoutKindChanged {
        workspace_id: WorkspaceId,
        kind: LayoutKind,
    },
    WindowAdded {
        workspace_id: WorkspaceId,
        handle: WindowHandle,
    },
    WindowRemoved {
        workspace_id: WorkspaceId,
        handle: WindowHandle,
    },
    WindowMoved {
        handle: WindowHandle,
        frame: Rect,
    },
    WindowResized {
        handle: WindowHandle,
        frame: Rect,
    },
    WindowMinimized {
        handle: WindowHandle,
    },
    WindowUnminimized {
        handle: WindowHandle,
    },
    WindowClosed {
        handle: WindowHandle,
    },
}

/// Dispatches raw `PlatformEvent`s against the shared `Runtime`, requesting
/// reconciliation through a `Reconciler` and emitting `CoreEvent`s for
/// anything an embedder would want to react to.
pub struct EventRouter {
    runtime: Arc<Runtime>,
    reconciler: Arc<Reconciler>,
}

impl EventRouter {
    pub fn new(runtime: Arc<Runtime>, reconciler: Arc<Reconciler>) -> Self {
        Self { runtime, reconciler }
    }

    pub fn route(&self, event: PlatformEvent) {
        self.route_at(event, Instant::now());
    }

    pub fn route_at(&self, event: PlatformEvent, now: Instant) {
        match event {
            PlatformEvent::WindowCreated(snapshot) => self.handle_window_created(snapshot, now),
            PlatformEvent::WindowDestroyed(handle) => self.handle_window_destroyed(handle),
            PlatformEvent::AppTerminated(pid) => self.handle_app_terminated(pid),
            PlatformEvent::WindowMoved { handle, frame } => self.handle_window_moved(handle, frame),
            PlatformEvent::WindowResized { handle, frame } => self.handle_window_resized(handle, frame),
            PlatformEvent::WindowMinimized(handle) => self.handle_minimize(handle, true),
            PlatformEvent::WindowDeminimized(handle) => self.handle_minimize(handle, false),
            PlatformEvent::WindowFocusChanged(handle) => self.handle_focus_changed(handle),
            PlatformEvent::AppActivated(pid) => self.handle_app_activated(pid, now),
            PlatformEvent::SpaceChanged => self.handle_space_changed(),
            PlatformEvent::DisplayTopologyChanged => self.handle_topology_changed(now),
            PlatformEvent::SystemSleep => self.handle_system_sleep(),
            PlatformEvent::SystemWake => self.handle_system_wake(now),
        }
    }

    /// New window: resolve which monitor the pointer is over, adopt it
    /// into that monitor's active workspace, and request a retile.
    fn handle_window_created(&self, snapshot: WindowSnapshot, now: Instant) {
        let handle = snapshot.handle;
        let pid = snapshot.owning_pid;
        self.runtime.windows.insert_snapshot(&snapshot);

        let (x, y) = self.runtime.port.pointer_location();
        let mut monitors = self.runtime.monitors.lock().unwrap();
        let Some(monitor_id) = monitors.monitor_at_point(x, y) else {
            return;
        };
        let Some(monitor) = monitors.find_monitor_mut(monitor_id) else {
            return;
        };
        let visible_frame = monitor.visible_frame();
        let workspace = monitor.active_workspace_mut();
        let workspace_id = workspace.id();
        if workspace
            .adopt(handle, pid, &self.runtime.registry, self.runtime.port.as_ref(), visible_frame)
            .is_err()
        {
            return;
        }
        drop(monitors);

        self.runtime.emit(CoreEvent::WindowAdded { workspace_id, handle });
        self.request_retile(workspace_id, now);
    }

    /// Destroyed window: release it from its owning workspace and request
    /// a retile. On a small Active workspace, bypasses the debounce
    /// entirely (§4.6's performance-critical path) so the remaining
    /// windows rebalance without a visible delay.
    fn handle_window_destroyed(&self, handle: WindowHandle) {
        self.runtime.windows.remove(handle);
        self.runtime.classifier.flush(handle);
        let Some(workspace_id) = self.runtime.registry.owner(handle) else {
            return;
        };

        let mut monitors = self.runtime.monitors.lock().unwrap();
        let Some(workspace) = monitors.find_workspace_mut(workspace_id) else {
            return;
        };
        workspace.release(handle, &self.runtime.registry);
        let is_active = workspace.is_active();
        let window_count = workspace.windows().len();
        drop(monitors);

        self.runtime.emit(CoreEvent::WindowRemoved { workspace_id, handle });
        self.runtime.emit(CoreEvent::WindowClosed { handle });

        let threshold = self.runtime.config.read().unwrap().perf_fast_path_window_threshold;
        if is_active && window_count < threshold {
            self.reconciler.reconcile_now(workspace_id);
        } else {
            self.reconciler.request(workspace_id);
        }
    }

    /// An application quit: drop every window it owned, one workspace's
    /// worth of reconciliation requests per affected workspace.
    fn handle_app_terminated(&self, pid: ProcessId) {
        self.runtime.windows.drop_all_for_pid(pid);
        let dropped = self.runtime.registry.drop_all_for_pid(pid);
        let mut affected: Vec<WorkspaceId> = Vec::new();
        {
            let mut monitors = self.runtime.monitors.lock().unwrap();
            for (handle, workspace_id) in &dropped {
                if let Some(workspace) = monitors.find_workspace_mut(*workspace_id) {
                    workspace.release(*handle, &self.runtime.registry);
                }
                if !affected.contains(workspace_id) {
                    affected.push(*workspace_id);
                }
            }
        }
        for (handle, workspace_id) in &dropped {
            self.runtime.emit(CoreEvent::WindowRemoved {
                workspace_id: *workspace_id,
                handle: *handle,
            });
            self.runtime.emit(CoreEvent::WindowClosed { handle: *handle });
        }
        for workspace_id in affected {
            self.reconciler.request(workspace_id);
        }
    }

    /// A window moved under its own power (user drag, app-initiated
    /// reposition). Floating windows keep whatever geometry they land on;
    /// tiled windows on an active workspace get pulled back into place on
    /// the next retile.
    fn handle_window_moved(&self, handle: WindowHandle, frame: Rect) {
        self.runtime.windows.set_frame(handle, frame);
        self.runtime.emit(CoreEvent::WindowMoved { handle, frame });
        self.request_retile_for_owner_if_tiled(handle);
    }

    fn handle_window_resized(&self, handle: WindowHandle, frame: Rect) {
        self.runtime.windows.set_frame(handle, frame);
        self.runtime.classifier.flush(handle);
        self.runtime.emit(CoreEvent::WindowResized { handle, frame });
        self.request_retile_for_owner_if_tiled(handle);
    }

    fn handle_minimize(&self, handle: WindowHandle, minimized: bool) {
        self.runtime.windows.set_minimized(handle, minimized);
        self.runtime.classifier.flush(handle);
        if minimized {
            self.runtime.emit(CoreEvent::WindowMinimized { handle });
        } else {
            self.runtime.emit(CoreEvent::WindowUnminimized { handle });
        }
        self.request_retile_for_owner_if_tiled(handle);
    }

    fn handle_focus_changed(&self, handle: WindowHandle) {
        let Some(workspace_id) = self.runtime.registry.owner(handle) else {
            return;
        };
        let mut monitors = self.runtime.monitors.lock().unwrap();
        if let Some(workspace) = monitors.find_workspace_mut(workspace_id) {
            workspace.set_focused(Some(handle));
        }
    }

    /// An application came to the foreground: if one of its windows is
    /// owned by a workspace other than the mouse monitor's active one,
    /// activate that workspace so the app's windows come into view.
    fn handle_app_activated(&self, pid: ProcessId, now: Instant) {
        let Some(workspace_id) = self.runtime.registry.workspace_for_pid(pid) else {
            return;
        };
        let mut monitors = self.runtime.monitors.lock().unwrap();
        let Some(monitor_id) = monitors.find_workspace(workspace_id).map(|w| w.monitor_id()) else {
            return;
        };
        let Some(monitor) = monitors.find_monitor_mut(monitor_id) else {
            return;
        };
        if monitor.active_workspace().id() == workspace_id {
            return;
        }
        let Some(index) = monitor.workspace_index(workspace_id) else {
            return;
        };
        let settle_delay = std::time::Duration::from_millis(self.runtime.config.read().unwrap().reconcile_debounce_ms);
        monitor.activate_workspace(index, self.runtime.port.as_ref(), settle_delay, now);
        drop(monitors);
        self.runtime.emit(CoreEvent::WorkspaceActivated { workspace_id, monitor_id });
    }

    /// The desktop space changed under us (e.g. a full-screen app took
    /// over): request a retile on the mouse monitor's active workspace, in
    /// case the space swap revealed stale geometry.
    fn handle_space_changed(&self) {
        let (x, y) = self.runtime.port.pointer_location();
        let monitors = self.runtime.monitors.lock().unwrap();
        let Some(monitor_id) = monitors.monitor_at_point(x, y) else {
            return;
        };
        let Some(workspace_id) = monitors.find_monitor(monitor_id).map(|m| m.active_workspace().id()) else {
            return;
        };
        drop(monitors);
        self.reconciler.request(workspace_id);
    }

    fn handle_topology_changed(&self, now: Instant) {
        self.resync_topology(now);
    }

    fn handle_system_sleep(&self) {
        self.runtime.classifier.flush_all();
        self.runtime.suspended.store(true, std::sync::atomic::Ordering::Relaxed);
    }

    fn handle_system_wake(&self, now: Instant) {
        self.runtime.suspended.store(false, std::sync::atomic::Ordering::Relaxed);
        self.resync_topology(now);
    }

    /// Re-enumerates displays and folds the result into the live monitor
    /// table via [`Runtime::sync_topology`], then requests a retile for
    /// every surviving active workspace (new frames mean stale geometry).
    fn resync_topology(&self, now: Instant) {
        let Ok(descriptors) = self.runtime.port.enumerate_displays() else {
            return;
        };
        let affected = self.runtime.sync_topology(descriptors, now);
        for workspace_id in affected {
            self.reconciler.request(workspace_id);
        }
    }

    fn request_retile(&self, workspace_id: WorkspaceId, now: Instant) {
        let debounce = std::time::Duration::from_millis(self.runtime.config.read().unwrap().reconcile_debounce_ms);
        let mut monitors = self.runtime.monitors.lock().unwrap();
        if let Some(workspace) = monitors.find_workspace_mut(workspace_id) {
            workspace.request_retile(debounce, now);
        }
        drop(monitors);
        self.reconciler.request(workspace_id);
    }

    fn request_retile_for_owner_if_tiled(&self, handle: WindowHandle) {
        let Some(workspace_id) = self.runtime.registry.owner(handle) else {
            return;
        };
        self.reconciler.request(workspace_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TuningConfig;
    use crate::handle::ProcessId;
    use crate::monitor::Monitor;
    use crate::persistence::NullPersistence;
    use crate::platform::{FakePlatformPort, MonitorDescriptor, PlatformPort};
    use crate::state::MonitorTable;
    use crate::workspace::Workspace;

    fn frame() -> Rect {
        Rect::new(0, 0, 1920, 1080)
    }

    fn router_with_one_monitor() -> (Arc<Runtime>, Arc<Reconciler>, EventRouter, Arc<FakePlatformPort>, WorkspaceId) {
        let fake = Arc::new(FakePlatformPort::new());
        fake.add_display(MonitorDescriptor {
            id: MonitorId(0),
            name: "m0".to_string(),
            frame: frame(),
            visible_frame: frame(),
        });
        let mut ws = Workspace::new(MonitorId(0), "Default", LayoutKind::Hstack);
        ws.activate(fake.as_ref(), frame(), std::time::Duration::from_millis(0), Instant::now());
        let workspace_id = ws.id();
        let monitor = Monitor::new(MonitorId(0), "m0", frame(), frame(), ws);

        let port: Arc<dyn PlatformPort> = fake.clone();
        let runtime = Arc::new(Runtime::new(port, Arc::new(NullPersistence), TuningConfig::default()));
        *runtime.monitors.lock().unwrap() = MonitorTable::new(vec![monitor]);

        let reconciler = Arc::new(Reconciler::with_worker_count(Arc::clone(&runtime), 1));
        let router = EventRouter::new(Arc::clone(&runtime), Arc::clone(&reconciler));
        (runtime, reconciler, router, fake, workspace_id)
    }

    #[test]
    fn window_created_is_adopted_into_the_monitor_under_the_pointer() {
        let (runtime, _reconciler, router, fake, workspace_id) = router_with_one_monitor();
        fake.add_window(WindowSnapshot {
            handle: WindowHandle(1),
            owning_pid: ProcessId(1),
            frame: Rect::new(0, 0, 300, 300),
            title: String::new(),
            subrole: "standard".to_string(),
            bundle_id: "com.example.app".to_string(),
            is_minimized: false,
        });

        router.route(PlatformEvent::WindowCreated(WindowSnapshot {
            handle: WindowHandle(1),
            owning_pid: ProcessId(1),
            frame: Rect::new(0, 0, 300, 300),
            title: String::new(),
            subrole: "standard".to_string(),
            bundle_id: "com.example.app".to_string(),
            is_minimized: false,
        }));

        assert_eq!(runtime.registry.owner(WindowHandle(1)), Some(workspace_id));
    }

    #[test]
    fn window_destroyed_unbinds_and_notifies_subscribers() {
        let (runtime, _reconciler, router, fake, _workspace_id) = router_with_one_monitor();
        fake.add_window(WindowSnapshot {
            handle: WindowHandle(1),
            owning_pid: ProcessId(1),
            frame: Rect::new(0, 0, 300, 300),
            title: String::new(),
            subrole: "standard".to_string(),
            bundle_id: "com.example.app".to_string(),
            is_minimized: false,
        });
        router.route(PlatformEvent::WindowCreated(WindowSnapshot {
            handle: WindowHandle(1),
            owning_pid: ProcessId(1),
            frame: Rect::new(0, 0, 300, 300),
            title: String::new(),
            subrole: "standard".to_string(),
            bundle_id: "com.example.app".to_string(),
            is_minimized: false,
        }));

        let (tx, rx) = std::sync::mpsc::channel();
        runtime.subscribe(tx);
        router.route(PlatformEvent::WindowDestroyed(WindowHandle(1)));

        assert_eq!(runtime.registry.owner(WindowHandle(1)), None);
        let mut saw_closed = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, CoreEvent::WindowClosed { handle } if handle == WindowHandle(1)) {
                saw_closed = true;
            }
        }
        assert!(saw_closed);
    }

    #[test]
    fn app_terminated_drops_every_window_of_that_process() {
        let (runtime, _reconciler, router, fake, _workspace_id) = router_with_one_monitor();
        for n in 1..=2u64 {
            fake.add_window(WindowSnapshot {
                handle: WindowHandle(n),
                owning_pid: ProcessId(7),
                frame: Rect::new(0, 0, 300, 300),
                title: String::new(),
                subrole: "standard".to_string(),
                bundle_id: "com.example.app".to_string(),
                is_minimized: false,
            });
            router.route(PlatformEvent::WindowCreated(WindowSnapshot {
                handle: WindowHandle(n),
                owning_pid: ProcessId(7),
                frame: Rect::new(0, 0, 300, 300),
                title: String::new(),
                subrole: "standard".to_string(),
                bundle_id: "com.example.app".to_string(),
                is_minimized: false,
            }));
        }

        router.route(PlatformEvent::AppTerminated(ProcessId(7)));

        assert_eq!(runtime.registry.owner(WindowHandle(1)), None);
        assert_eq!(runtime.registry.owner(WindowHandle(2)), None);
    }

    #[test]
    fn system_sleep_then_wake_toggles_suspended() {
        let (runtime, _reconciler, router, _fake, _workspace_id) = router_with_one_monitor();
        router.route(PlatformEvent::SystemSleep);
        assert!(runtime.is_suspended());
        router.route(PlatformEvent::SystemWake);
        assert!(!runtime.is_suspended());
    }
}
