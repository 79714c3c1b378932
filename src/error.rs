//! Error kinds the core can produce, and the propagation policy each one
//! carries. Reconciliation never lets these escape upward: they are logged
//! and swallowed at the reconciler boundary. Commands from the UI return
//! them directly.

use thiserror::Error;

use crate::handle::{MonitorId, WindowHandle};

#[derive(Debug, Error)]
pub enum TilingError {
    /// Accessibility permission not granted. Fatal to the core; surfaced
    /// once to the UI and never retried automatically.
    #[error("platform access denied")]
    PlatformDenied,

    /// A window handle used in a call no longer exists. Callers should
    /// treat this the same as having received a window-destroyed event.
    #[error("window handle {0} is stale")]
    HandleStale(WindowHandle),

    /// A geometry write failed. Retriable once; never fatal.
    #[error("geometry write failed for {0}")]
    GeometryWriteFailed(WindowHandle),

    /// Attempted to bind a handle already owned by another workspace.
    /// Programmer error: the caller must unbind first.
    #[error("window {0} is already bound to a workspace")]
    RegistryConflict(WindowHandle),

    /// Attempted to remove the only workspace on a monitor.
    #[error("monitor {0:?} has only one workspace left")]
    LastWorkspace(MonitorId),

    /// The PlatformPort's event subscription was lost. Transient; handled
    /// by the caller with backoff.
    #[error("platform port disconnected")]
    PortDisconnected,
}

/// The result type threaded through every fallible operation in the core.
pub type WindowResult<T> = Result<T, TilingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_handle() {
        let err = TilingError::HandleStale(WindowHandle(42));
        assert!(err.to_string().contains("42"));
    }
}
