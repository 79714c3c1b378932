//! The debounced, per-workspace retiling driver (§4.6). A small
//! fixed-size pool of `std::thread::spawn` workers, each pulling jobs off
//! its own `mpsc::Receiver<WorkspaceId>` — mirrored from the teacher's
//! `daemon_threads.rs`, which spawns a handful of named long-lived
//! threads rather than reaching for a `rayon`/`tokio` runtime. A
//! workspace id is hashed to a fixed worker slot so every job for one
//! workspace lands on the same worker's channel, giving per-workspace
//! FIFO ordering for free.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::float::Classification;
use crate::handle::{WindowHandle, WorkspaceId};
use crate::layout::{self, LayoutKind};
use crate::rect::Rect;
use crate::runtime::Runtime;

const DEFAULT_WORKER_COUNT: usize = 4;

pub struct Reconciler {
    runtime: Arc<Runtime>,
    workers: Vec<mpsc::Sender<WorkspaceId>>,
    handles: Vec<JoinHandle<()>>,
}

impl Reconciler {
    pub fn new(runtime: Arc<Runtime>) -> Self {
        Self::with_worker_count(runtime, DEFAULT_WORKER_COUNT)
    }

    pub fn with_worker_count(runtime: Arc<Runtime>, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let mut workers = Vec::with_capacity(worker_count);
        let mut handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let (tx, rx) = mpsc::channel::<WorkspaceId>();
            let worker_runtime = Arc::clone(&runtime);
            let handle = thread::spawn(move || {
                for workspace_id in rx {
                    reconcile_workspace(&worker_runtime, workspace_id, Instant::now(), false);
                }
            });
            workers.push(tx);
            handles.push(handle);
        }
        Self {
            runtime,
            workers,
            handles,
        }
    }

    fn worker_index(&self, id: WorkspaceId) -> usize {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        (hasher.finish() as usize) % self.workers.len()
    }

    /// Enqueues a reconciliation job for `workspace_id`. A no-op if the
    /// worker's channel is somehow closed (only possible during
    /// shutdown).
    pub fn request(&self, workspace_id: WorkspaceId) {
        if self.runtime.is_suspended() {
            return;
        }
        let idx = self.worker_index(workspace_id);
        let _ = self.workers[idx].send(workspace_id);
    }

    /// The performance-critical path (§4.6): bypasses the debounce and
    /// the queue entirely, running synchronously on the caller's thread.
    /// Used for window-destroyed events on a small Active workspace, so
    /// closing a window visibly rebalances the others without a
    /// one-frame gap.
    pub fn reconcile_now(&self, workspace_id: WorkspaceId) {
        if self.runtime.is_suspended() {
            return;
        }
        reconcile_workspace(&self.runtime, workspace_id, Instant::now(), true);
    }

}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.workers.clear();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn is_float(runtime: &Runtime, handle: WindowHandle) -> bool {
    runtime
        .windows
        .classify(handle, &runtime.classifier)
        .is_some_and(|c| c == Classification::Float)
}

/// The algorithm in §4.6 step 2-5, run either off the worker pool or
/// synchronously via [`Reconciler::reconcile_now`].
pub(crate) fn reconcile_workspace(
    runtime: &Runtime,
    workspace_id: WorkspaceId,
    now: Instant,
    bypass_debounce: bool,
) {
    if runtime.is_suspended() {
        return;
    }
    let config = runtime.config.read().unwrap().clone();

    let mut monitors = runtime.monitors.lock().unwrap();

    let Some(monitor_id) = monitors.find_workspace(workspace_id).map(|w| w.monitor_id()) else {
        // Cancelled: the workspace was destroyed before this job began.
        return;
    };
    let Some(visible_frame) = monitors.find_monitor(monitor_id).map(|m| m.visible_frame()) else {
        return;
    };
    drop(monitors);

    let owned = runtime.registry.windows_owned_by(workspace_id);
    let mut tileable = Vec::with_capacity(owned.len());
    let mut floating = Vec::new();
    for handle in owned {
        if is_float(runtime, handle) {
            floating.push(handle);
        } else {
            tileable.push(handle);
        }
    }

    let mut monitors = runtime.monitors.lock().unwrap();
    let Some(workspace) = monitors.find_workspace_mut(workspace_id) else {
        return;
    };
    if !bypass_debounce && !workspace.retile_is_due(now) {
        return;
    }

    workspace.sync_tree(&tileable, floating);

    if workspace.is_active() && workspace.layout_kind() != LayoutKind::Float {
        let rects: std::collections::HashMap<WindowHandle, Rect> =
            layout::layout(workspace.tree().root(), visible_frame, config.outer_gap, config.inner_gap);
        drop(monitors);
        let _suppression = runtime.port.suppress_animations();
        for (handle, rect) in rects {
            apply_geometry_with_retry(runtime, handle, rect, Duration::from_millis(config.geometry_retry_ms));
        }
        let mut monitors = runtime.monitors.lock().unwrap();
        if let Some(workspace) = monitors.find_workspace_mut(workspace_id) {
            workspace.mark_retiled();
        }
    } else {
        workspace.mark_retiled();
    }
}

fn apply_geometry_with_retry(runtime: &Runtime, handle: WindowHandle, rect: Rect, retry_delay: Duration) {
    if runtime.port.set_geometry(handle, rect).is_ok() {
        return;
    }
    thread::sleep(retry_delay);
    if runtime.port.set_geometry(handle, rect).is_err() {
        crate::log_warn!("geometry write failed twice for {handle}, dropping until next reconcile");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TuningConfig;
    use crate::handle::{MonitorId, ProcessId};
    use crate::monitor::Monitor;
    use crate::persistence::NullPersistence;
    use crate::platform::{FakePlatformPort, MonitorDescriptor, PlatformPort, WindowSnapshot};
    use crate::state::MonitorTable;
    use crate::workspace::Workspace;

    fn frame() -> Rect {
        Rect::new(0, 0, 1920, 1080)
    }

    fn runtime_with_one_active_workspace() -> (Arc<Runtime>, Arc<FakePlatformPort>, WorkspaceId) {
        let fake = Arc::new(FakePlatformPort::new());
        fake.add_display(MonitorDescriptor {
            id: MonitorId(0),
            name: "m0".to_string(),
            frame: frame(),
            visible_frame: frame(),
        });

        let mut ws = Workspace::new(MonitorId(0), "Default", LayoutKind::Hstack);
        ws.activate(fake.as_ref(), frame(), Duration::from_millis(0), Instant::now());
        let id = ws.id();
        let monitor = Monitor::new(MonitorId(0), "m0", frame(), frame(), ws);

        let mut config = TuningConfig::default();
        config.reconcile_debounce_ms = 0;
        let port: Arc<dyn PlatformPort> = fake.clone();
        let runtime = Arc::new(Runtime::new(port, Arc::new(NullPersistence), config));
        *runtime.monitors.lock().unwrap() = MonitorTable::new(vec![monitor]);
        (runtime, fake, id)
    }

    fn adopt_window(
        runtime: &Runtime,
        fake: &FakePlatformPort,
        workspace_id: WorkspaceId,
        handle: WindowHandle,
        rect: Rect,
        bundle_id: &str,
    ) {
        let snapshot = WindowSnapshot {
            handle,
            owning_pid: ProcessId(1),
            frame: rect,
            title: String::new(),
            subrole: "standard".to_string(),
            bundle_id: bundle_id.to_string(),
            is_minimized: false,
        };
        fake.add_window(snapshot.clone());
        runtime.windows.insert_snapshot(&snapshot);
        let mut monitors = runtime.monitors.lock().unwrap();
        let workspace = monitors.find_workspace_mut(workspace_id).unwrap();
        workspace
            .adopt(handle, ProcessId(1), &runtime.registry, fake, frame())
            .unwrap();
    }

    #[test]
    fn reconcile_tiles_two_windows_into_equal_hstack_halves() {
        let (runtime, fake, workspace_id) = runtime_with_one_active_workspace();
        adopt_window(&runtime, &fake, workspace_id, WindowHandle(1), Rect::new(0, 0, 100, 100), "com.example.a");
        adopt_window(&runtime, &fake, workspace_id, WindowHandle(2), Rect::new(0, 0, 100, 100), "com.example.b");

        reconcile_workspace(&runtime, workspace_id, Instant::now(), true);

        let r1 = fake.get_geometry(WindowHandle(1)).unwrap();
        let r2 = fake.get_geometry(WindowHandle(2)).unwrap();
        assert_eq!(r1, Rect::new(8, 8, 948, 1064));
        assert_eq!(r2, Rect::new(964, 8, 948, 1064));
    }

    #[test]
    fn reconcile_excludes_a_deny_listed_window_from_the_geometry_map() {
        let (runtime, fake, workspace_id) = runtime_with_one_active_workspace();
        adopt_window(
            &runtime,
            &fake,
            workspace_id,
            WindowHandle(1),
            Rect::new(0, 0, 100, 100),
            "com.example.editor",
        );
        adopt_window(
            &runtime,
            &fake,
            workspace_id,
            WindowHandle(2),
            Rect::new(400, 400, 200, 200),
            "com.apple.preference.general",
        );
        let pre_float_geometry = fake.get_geometry(WindowHandle(2)).unwrap();

        reconcile_workspace(&runtime, workspace_id, Instant::now(), true);

        let r1 = fake.get_geometry(WindowHandle(1)).unwrap();
        assert_eq!(r1, Rect::new(8, 8, 1904, 1064));
        // The floated window was never written by the engine.
        assert_eq!(fake.get_geometry(WindowHandle(2)).unwrap(), pre_float_geometry);

        let monitors = runtime.monitors.lock().unwrap();
        let ws = monitors.find_workspace(workspace_id).unwrap();
        assert_eq!(ws.floating_windows(), &[WindowHandle(2)]);
    }

    #[test]
    fn reconcile_of_a_destroyed_workspace_is_a_no_op() {
        let (runtime, _fake, _workspace_id) = runtime_with_one_active_workspace();
        let bogus = WorkspaceId::new();
        // Should not panic even though no such workspace exists.
        reconcile_workspace(&runtime, bogus, Instant::now(), true);
    }

    #[test]
    fn reconcile_respects_the_debounce_window_unless_bypassed() {
        let (runtime, fake, workspace_id) = runtime_with_one_active_workspace();
        {
            let mut config = runtime.config.write().unwrap();
            config.reconcile_debounce_ms = 200;
        }
        {
            let mut monitors = runtime.monitors.lock().unwrap();
            let ws = monitors.find_workspace_mut(workspace_id).unwrap();
            ws.request_retile(Duration::from_millis(200), Instant::now());
        }
        adopt_window(&runtime, &fake, workspace_id, WindowHandle(1), Rect::new(0, 0, 50, 50), "com.example.a");

        reconcile_workspace(&runtime, workspace_id, Instant::now(), false);

        // Not due yet: the engine never ran, so the window keeps the
        // geometry it had at adopt time rather than a freshly tiled one.
        assert_eq!(fake.get_geometry(WindowHandle(1)).unwrap(), Rect::new(0, 0, 50, 50));
    }
}
