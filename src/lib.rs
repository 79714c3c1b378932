//! Tessera: a platform-agnostic tiling window manager core. Consumes a
//! [`platform::PlatformPort`] implementation and exposes a [`Coordinator`]
//! as the single embedding surface — commands in, [`event::CoreEvent`]s
//! out.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod float;
pub mod handle;
pub mod layout;
pub mod log;
pub mod monitor;
pub mod persistence;
pub mod platform;
pub mod reconciler;
pub mod rect;
pub mod registry;
pub mod runtime;
pub mod state;
pub mod window;
pub mod workspace;

pub use coordinator::Coordinator;
pub use error::{TilingError, WindowResult};
pub use event::CoreEvent;
pub use float::{ClassifyInput, Classification, FloatClassifier, ForceRule};
pub use handle::{MonitorId, ProcessId, WindowHandle, WorkspaceId};
pub use layout::{LayoutKind, LayoutNode, LayoutTree};
pub use monitor::Monitor;
pub use persistence::{MemoryPersistence, NullPersistence, PersistenceStore, WorkspaceRecord};
pub use platform::{
    AnimationSuppression, FakePlatformPort, MonitorDescriptor, PlatformEvent, PlatformPort,
    WindowSnapshot,
};
pub use rect::Rect;
pub use registry::WindowRegistry;
pub use runtime::Runtime;
pub use workspace::{Workspace, WorkspaceState};
