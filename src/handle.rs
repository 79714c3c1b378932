//! Opaque identifiers threaded through the core: window handles (owned by
//! the platform), process ids, and workspace ids (owned by us).

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An opaque handle to a system window, as vended by the PlatformPort.
///
/// The core never interprets this value; it is a key, not a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowHandle(pub u64);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// The owning process id of a window, used to drop all of a terminated
/// application's windows in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessId(pub u32);

/// A monitor's stable integer id, assigned at enumeration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonitorId(pub u32);

/// A workspace's stable identity. Unlike `WindowHandle` and `MonitorId`,
/// which come from the platform, this id is minted by the core itself and
/// must survive monitor reattachment and persistence round-trips — hence a
/// UUID rather than a positional index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceId(pub Uuid);

impl WorkspaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorkspaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_ids_are_unique() {
        let a = WorkspaceId::new();
        let b = WorkspaceId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn window_handle_equality_is_by_value() {
        assert_eq!(WindowHandle(7), WindowHandle(7));
        assert_ne!(WindowHandle(7), WindowHandle(8));
    }
}
