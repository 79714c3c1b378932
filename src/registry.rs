//! The process-wide mapping from window handle to owning workspace — the
//! authoritative source of ownership that LayoutTrees are reconciled
//! against, not the other way around.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::error::{TilingError, WindowResult};
use crate::handle::{ProcessId, WindowHandle, WorkspaceId};

const LRU_CAPACITY: usize = 100;

struct Inner {
    /// The authoritative binding. Never touched by LRU eviction.
    owners: HashMap<WindowHandle, (WorkspaceId, ProcessId)>,
    /// Most-recently-used handles, front = most recent. Purely an
    /// acceleration structure; evicting from here never removes an
    /// authoritative binding.
    lru: VecDeque<WindowHandle>,
}

/// One hash mapping plus a small LRU cache for the most recent 100
/// window→workspace lookups. All reads and writes are serialized by a
/// single lock with an O(1) critical section.
pub struct WindowRegistry {
    inner: Mutex<Inner>,
}

impl Default for WindowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                owners: HashMap::new(),
                lru: VecDeque::new(),
            }),
        }
    }

    /// Binds `handle` to `workspace`. Fails with `RegistryConflict` if the
    /// handle is already bound to a different workspace — the caller must
    /// `unbind` first.
    pub fn bind(
        &self,
        handle: WindowHandle,
        workspace: WorkspaceId,
        pid: ProcessId,
    ) -> WindowResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.owners.contains_key(&handle) {
            return Err(TilingError::RegistryConflict(handle));
        }
        inner.owners.insert(handle, (workspace, pid));
        touch(&mut inner.lru, handle);
        Ok(())
    }

    /// Removes `handle`'s binding, if any. Idempotent.
    pub fn unbind(&self, handle: WindowHandle) {
        let mut inner = self.inner.lock().unwrap();
        inner.owners.remove(&handle);
        inner.lru.retain(|h| *h != handle);
    }

    /// Returns the workspace owning `handle`, if bound.
    pub fn owner(&self, handle: WindowHandle) -> Option<WorkspaceId> {
        let mut inner = self.inner.lock().unwrap();
        let owner = inner.owners.get(&handle).map(|(ws, _)| *ws);
        if owner.is_some() {
            touch(&mut inner.lru, handle);
        }
        owner
    }

    /// Returns the workspace owning any window of `pid`'s process, if
    /// one is currently bound. Read-only — unlike `drop_all_for_pid`,
    /// this does not remove anything.
    pub fn workspace_for_pid(&self, pid: ProcessId) -> Option<WorkspaceId> {
        let inner = self.inner.lock().unwrap();
        inner
            .owners
            .values()
            .find(|(_, owner_pid)| *owner_pid == pid)
            .map(|(ws, _)| *ws)
    }

    /// Unbinds every handle owned by `pid`'s process, returning each
    /// handle paired with the workspace it was bound to (so the caller
    /// can clean up the corresponding `LayoutTree` entries). Idempotent:
    /// calling this twice for the same pid after the first call returns
    /// an empty vec.
    pub fn drop_all_for_pid(&self, pid: ProcessId) -> Vec<(WindowHandle, WorkspaceId)> {
        let mut inner = self.inner.lock().unwrap();
        let dropped: Vec<(WindowHandle, WorkspaceId)> = inner
            .owners
            .iter()
            .filter(|(_, (_, owner_pid))| *owner_pid == pid)
            .map(|(handle, (ws, _))| (*handle, *ws))
            .collect();
        for (handle, _) in &dropped {
            inner.owners.remove(handle);
            inner.lru.retain(|h| h != handle);
        }
        dropped
    }

    /// Every handle currently bound to `workspace`. An O(n) scan over the
    /// authoritative map — acceptable for the reconciler's per-workspace
    /// snapshot, which is not the O(1)-critical-section path `bind`/
    /// `unbind`/`owner` are.
    pub fn windows_owned_by(&self, workspace: WorkspaceId) -> Vec<WindowHandle> {
        let inner = self.inner.lock().unwrap();
        inner
            .owners
            .iter()
            .filter(|(_, (ws, _))| *ws == workspace)
            .map(|(handle, _)| *handle)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Moves `handle` to the front of the LRU list (inserting it if absent),
/// evicting the oldest entry once the list exceeds [`LRU_CAPACITY`].
/// Eviction only ever drops the acceleration entry, never the
/// authoritative `owners` binding.
fn touch(lru: &mut VecDeque<WindowHandle>, handle: WindowHandle) {
    lru.retain(|h| *h != handle);
    lru.push_front(handle);
    while lru.len() > LRU_CAPACITY {
        lru.pop_back();
    }
}
