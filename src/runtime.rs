//! The state every subsystem past the `LayoutTree` needs a handle to:
//! the monitor table, the registry, the window table, the float
//! classifier, the platform port, live configuration, and the UI
//! notification fan-out. `EventRouter`, `Reconciler`, and `Coordinator`
//! each hold an `Arc<Runtime>` rather than one owning the others —
//! Design Note §9's "explicit value constructed once... passed through a
//! context object," applied to three collaborators instead of one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use crate::config::TuningConfig;
use crate::event::CoreEvent;
use crate::float::FloatClassifier;
use crate::handle::{MonitorId, WorkspaceId};
use crate::monitor::Monitor;
use crate::persistence::PersistenceStore;
use crate::platform::{MonitorDescriptor, PlatformPort};
use crate::registry::WindowRegistry;
use crate::state::MonitorTable;
use crate::window::WindowTable;
use crate::workspace::Workspace;

pub struct Runtime {
    pub monitors: Mutex<MonitorTable>,
    pub registry: WindowRegistry,
    pub windows: WindowTable,
    pub classifier: FloatClassifier,
    pub port: Arc<dyn PlatformPort>,
    pub config: RwLock<TuningConfig>,
    pub persistence: Arc<dyn PersistenceStore>,
    subscribers: Mutex<Vec<std::sync::mpsc::Sender<CoreEvent>>>,
    /// Set while the platform reports `SystemSleep`; reconciliation jobs
    /// become no-ops until `SystemWake` clears it (§4.6's event table).
    pub suspended: AtomicBool,
}

impl Runtime {
    pub fn new(
        port: Arc<dyn PlatformPort>,
        persistence: Arc<dyn PersistenceStore>,
        config: TuningConfig,
    ) -> Self {
        Self {
            monitors: Mutex::new(MonitorTable::default()),
            registry: WindowRegistry::new(),
            windows: WindowTable::new(),
            classifier: FloatClassifier::new(Vec::new()),
            port,
            config: RwLock::new(config),
            persistence,
            subscribers: Mutex::new(Vec::new()),
            suspended: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self, sender: std::sync::mpsc::Sender<CoreEvent>) {
        self.subscribers.lock().unwrap().push(sender);
    }

    pub fn emit(&self, event: CoreEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|s| s.send(event.clone()).is_ok());
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Relaxed)
    }

    /// Folds a fresh display enumeration into the live monitor table:
    /// updates frames of monitors that survived, builds new ones (seeded
    /// from `PersistenceStore`) for newly attached displays, and migrates
    /// every workspace of a disconnected monitor onto the first surviving
    /// one rather than destroying it. Returns every workspace whose
    /// geometry may now be stale and should be retiled.
    pub fn sync_topology(&self, descriptors: Vec<MonitorDescriptor>, now: Instant) -> Vec<WorkspaceId> {
        let mut affected = Vec::new();
        let mut monitors = self.monitors.lock().unwrap();

        let seen_ids: Vec<MonitorId> = descriptors.iter().map(|d| d.id).collect();
        let table = monitors.monitors_mut();

        for descriptor in &descriptors {
            if let Some(monitor) = table.iter_mut().find(|m| m.id() == descriptor.id) {
                monitor.set_frame(descriptor.frame);
                monitor.set_visible_frame(descriptor.visible_frame);
                for workspace in monitor.workspaces_mut() {
                    workspace.request_retile(Duration::from_millis(0), now);
                    affected.push(workspace.id());
                }
            } else {
                let records = self.persistence.load(descriptor.id);
                let records = if records.is_empty() {
                    crate::persistence::default_records()
                } else {
                    records
                };
                let mut records = records.into_iter();
                let Some(first) = records.next() else {
                    continue;
                };
                let mut initial = Workspace::from_record(first.workspace_id, descriptor.id, first.name, first.layout_kind);
                initial.request_retile(Duration::from_millis(0), now);
                affected.push(initial.id());
                let mut new_monitor = Monitor::new(
                    descriptor.id,
                    descriptor.name.clone(),
                    descriptor.frame,
                    descriptor.visible_frame,
                    initial,
                );
                for record in records {
                    let workspace = Workspace::from_record(
                        record.workspace_id,
                        descriptor.id,
                        record.name,
                        record.layout_kind,
                    );
                    new_monitor.add_workspace(workspace);
                }
                table.push(new_monitor);
            }
        }

        let mut orphaned: Vec<Workspace> = Vec::new();
        table.retain_mut(|monitor| {
            if seen_ids.contains(&monitor.id()) {
                true
            } else {
                orphaned.extend(monitor.take_workspaces());
                false
            }
        });

        if let Some(survivor) = table.first_mut() {
            let survivor_id = survivor.id();
            for mut workspace in orphaned {
                workspace.set_monitor_id(survivor_id);
                workspace.request_retile(Duration::from_millis(0), now);
                affected.push(workspace.id());
                survivor.add_workspace(workspace);
            }
        }

        affected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::NullPersistence;
    use crate::platform::FakePlatformPort;

    #[test]
    fn new_runtime_starts_unsuspended_with_no_monitors() {
        let runtime = Runtime::new(
            Arc::new(FakePlatformPort::new()),
            Arc::new(NullPersistence),
            TuningConfig::default(),
        );
        assert!(!runtime.is_suspended());
        assert!(runtime.monitors.lock().unwrap().monitors().is_empty());
    }

    #[test]
    fn emit_drops_subscribers_whose_receiver_went_away() {
        let runtime = Runtime::new(
            Arc::new(FakePlatformPort::new()),
            Arc::new(NullPersistence),
            TuningConfig::default(),
        );
        let (tx, rx) = std::sync::mpsc::channel();
        runtime.subscribe(tx);
        drop(rx);
        runtime.emit(CoreEvent::WindowClosed {
            handle: crate::handle::WindowHandle(1),
        });
        assert!(runtime.subscribers.lock().unwrap().is_empty());
    }

    fn descriptor(id: u32, x: i32) -> MonitorDescriptor {
        let frame = crate::rect::Rect::new(x, 0, 1920, 1080);
        MonitorDescriptor {
            id: MonitorId(id),
            name: format!("m{id}"),
            frame,
            visible_frame: frame,
        }
    }

    #[test]
    fn sync_topology_creates_a_monitor_for_a_newly_seen_display() {
        let runtime = Runtime::new(
            Arc::new(FakePlatformPort::new()),
            Arc::new(NullPersistence),
            TuningConfig::default(),
        );
        let affected = runtime.sync_topology(vec![descriptor(0, 0)], Instant::now());
        assert_eq!(affected.len(), 2); // NullPersistence seeds two workspaces
        assert_eq!(runtime.monitors.lock().unwrap().monitors().len(), 1);
    }

    #[test]
    fn sync_topology_migrates_workspaces_off_a_disconnected_monitor() {
        let runtime = Runtime::new(
            Arc::new(FakePlatformPort::new()),
            Arc::new(NullPersistence),
            TuningConfig::default(),
        );
        runtime.sync_topology(vec![descriptor(0, 0), descriptor(1, 1920)], Instant::now());
        assert_eq!(runtime.monitors.lock().unwrap().monitors().len(), 2);

        // Monitor 1 is gone from the next enumeration.
        runtime.sync_topology(vec![descriptor(0, 0)], Instant::now());

        let monitors = runtime.monitors.lock().unwrap();
        assert_eq!(monitors.monitors().len(), 1);
        assert_eq!(monitors.monitors()[0].workspaces().len(), 4);
    }
}
