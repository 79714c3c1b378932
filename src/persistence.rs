//! The persistence contract (§6): consumed by the core, not implemented by
//! it. On startup the Coordinator asks a `PersistenceStore` for each
//! monitor's saved workspace list; on mutation it pushes the updated list
//! back. A real implementation (reading/writing a config file, a
//! database, whatever the embedder prefers) lives outside this crate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::handle::{MonitorId, WorkspaceId};
use crate::layout::LayoutKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceRecord {
    pub workspace_id: WorkspaceId,
    pub name: String,
    pub layout_kind: LayoutKind,
}

pub trait PersistenceStore: Send + Sync {
    fn load(&self, monitor_id: MonitorId) -> Vec<WorkspaceRecord>;
    fn save(&self, monitor_id: MonitorId, records: &[WorkspaceRecord]);
}

/// Returns the spec's built-in default layout for a monitor with no saved
/// state: two workspaces, "Default" (bsp) and "Secondary" (hstack).
pub fn default_records() -> Vec<WorkspaceRecord> {
    vec![
        WorkspaceRecord {
            workspace_id: WorkspaceId::new(),
            name: "Default".to_string(),
            layout_kind: LayoutKind::Bsp,
        },
        WorkspaceRecord {
            workspace_id: WorkspaceId::new(),
            name: "Secondary".to_string(),
            layout_kind: LayoutKind::Hstack,
        },
    ]
}

/// A `PersistenceStore` that persists nothing: `load` always returns the
/// built-in defaults, `save` is a no-op. Useful for embedders that haven't
/// wired up real persistence yet.
#[derive(Debug, Default)]
pub struct NullPersistence;

impl PersistenceStore for NullPersistence {
    fn load(&self, _monitor_id: MonitorId) -> Vec<WorkspaceRecord> {
        default_records()
    }

    fn save(&self, _monitor_id: MonitorId, _records: &[WorkspaceRecord]) {}
}

/// An in-process `PersistenceStore` backed by a `HashMap`, used by tests
/// that need to observe what the core pushed back after a mutation.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    records: Mutex<HashMap<MonitorId, Vec<WorkspaceRecord>>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceStore for MemoryPersistence {
    fn load(&self, monitor_id: MonitorId) -> Vec<WorkspaceRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&monitor_id)
            .cloned()
            .unwrap_or_else(default_records)
    }

    fn save(&self, monitor_id: MonitorId, records: &[WorkspaceRecord]) {
        self.records
            .lock()
            .unwrap()
            .insert(monitor_id, records.to_vec());
    }
}
