//! The abstract capability surface the core depends on for everything
//! that touches the real windowing system. `PlatformPort` is a trait
//! object boundary (`Arc<dyn PlatformPort>`), mirroring how the teacher
//! implements its own `Window` trait once per platform and consumes it
//! generically everywhere else. The real accessibility-API driver is an
//! external collaborator (§1) and is not implemented here — only the
//! in-memory fake this crate's own tests drive.

use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::sync::{Mutex, RwLock};

use crate::error::WindowResult;
use crate::handle::{MonitorId, ProcessId, WindowHandle};
use crate::rect::Rect;

#[derive(Debug, Clone)]
pub struct MonitorDescriptor {
    pub id: MonitorId,
    pub name: String,
    pub frame: Rect,
    pub visible_frame: Rect,
}

#[derive(Debug, Clone)]
pub struct WindowSnapshot {
    pub handle: WindowHandle,
    pub owning_pid: ProcessId,
    pub frame: Rect,
    pub title: String,
    pub subrole: String,
    pub bundle_id: String,
    pub is_minimized: bool,
}

/// An event the PlatformPort pushes into the core's event channel.
/// Replacing OS-callback trampolines with a channel (Design Note §9).
#[derive(Debug, Clone)]
pub enum PlatformEvent {
    WindowCreated(WindowSnapshot),
    WindowDestroyed(WindowHandle),
    AppTerminated(ProcessId),
    WindowMoved { handle: WindowHandle, frame: Rect },
    WindowResized { handle: WindowHandle, frame: Rect },
    WindowMinimized(WindowHandle),
    WindowDeminimized(WindowHandle),
    WindowFocusChanged(WindowHandle),
    AppActivated(ProcessId),
    SpaceChanged,
    DisplayTopologyChanged,
    SystemSleep,
    SystemWake,
}

/// An RAII guard returned by [`PlatformPort::suppress_animations`].
/// Dropping it (including during unwinding) restores the windowing
/// system's normal animation behavior — the "guarantee restoration on all
/// exit paths" contract in §4.1.
pub trait AnimationSuppression: Send {}

/// The abstract dependency through which the core reads and writes
/// window state and receives lifecycle events.
pub trait PlatformPort: Send + Sync {
    fn enumerate_displays(&self) -> WindowResult<Vec<MonitorDescriptor>>;
    fn enumerate_windows(&self) -> WindowResult<Vec<WindowSnapshot>>;
    fn get_geometry(&self, handle: WindowHandle) -> Option<Rect>;
    fn set_geometry(&self, handle: WindowHandle, rect: Rect) -> WindowResult<()>;
    fn raise(&self, handle: WindowHandle) -> WindowResult<()>;
    fn set_minimized(&self, handle: WindowHandle, minimized: bool) -> WindowResult<()>;
    fn set_fullscreen(&self, handle: WindowHandle, fullscreen: bool) -> WindowResult<()>;
    fn subscribe(&self, sender: Sender<PlatformEvent>);
    fn pointer_location(&self) -> (i32, i32);
    /// Acquires a scoped suppression of enhanced-accessibility animation,
    /// to be held across a batch of `set_geometry` calls and released
    /// (via `Drop`) immediately after.
    fn suppress_animations(&self) -> Box<dyn AnimationSuppression>;
}

struct NoopSuppression;
impl AnimationSuppression for NoopSuppression {}

/// An in-memory [`PlatformPort`] used by this crate's own tests, and by
/// any embedder that hasn't wired up a real driver yet. Geometry writes
/// always succeed; nothing is actually rendered.
#[derive(Default)]
pub struct FakePlatformPort {
    displays: RwLock<Vec<MonitorDescriptor>>,
    windows: RwLock<HashMap<WindowHandle, WindowSnapshot>>,
    geometry: RwLock<HashMap<WindowHandle, Rect>>,
    subscribers: Mutex<Vec<Sender<PlatformEvent>>>,
    pointer: RwLock<(i32, i32)>,
    fail_next_geometry_write: Mutex<Option<WindowHandle>>,
}

impl FakePlatformPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_display(&self, descriptor: MonitorDescriptor) {
        self.displays.write().unwrap().push(descriptor);
    }

    pub fn add_window(&self, snapshot: WindowSnapshot) {
        self.geometry
            .write()
            .unwrap()
            .insert(snapshot.handle, snapshot.frame);
        self.windows.write().unwrap().insert(snapshot.handle, snapshot);
    }

    pub fn remove_window(&self, handle: WindowHandle) {
        self.windows.write().unwrap().remove(&handle);
        self.geometry.write().unwrap().remove(&handle);
    }

    /// Causes the next `set_geometry(handle, _)` call to fail, to exercise
    /// the reconciler's retry-then-drop failure semantics.
    pub fn fail_next_write_for(&self, handle: WindowHandle) {
        *self.fail_next_geometry_write.lock().unwrap() = Some(handle);
    }

    pub fn emit(&self, event: PlatformEvent) {
        for sender in self.subscribers.lock().unwrap().iter() {
            let _ = sender.send(event.clone());
        }
    }
}

impl PlatformPort for FakePlatformPort {
    fn enumerate_displays(&self) -> WindowResult<Vec<MonitorDescriptor>> {
        Ok(self.displays.read().unwrap().clone())
    }

    fn enumerate_windows(&self) -> WindowResult<Vec<WindowSnapshot>> {
        Ok(self.windows.read().unwrap().values().cloned().collect())
    }

    fn get_geometry(&self, handle: WindowHandle) -> Option<Rect> {
        self.geometry.read().unwrap().get(&handle).copied()
    }

    fn set_geometry(&self, handle: WindowHandle, rect: Rect) -> WindowResult<()> {
        let mut guard = self.fail_next_geometry_write.lock().unwrap();
        if *guard == Some(handle) {
            *guard = None;
            return Err(crate::error::TilingError::GeometryWriteFailed(handle));
        }
        drop(guard);
        self.geometry.write().unwrap().insert(handle, rect);
        Ok(())
    }

    fn raise(&self, _handle: WindowHandle) -> WindowResult<()> {
        Ok(())
    }

    fn set_minimized(&self, handle: WindowHandle, minimized: bool) -> WindowResult<()> {
        if let Some(window) = self.windows.write().unwrap().get_mut(&handle) {
            window.is_minimized = minimized;
        }
        Ok(())
    }

    fn set_fullscreen(&self, _handle: WindowHandle, _fullscreen: bool) -> WindowResult<()> {
        Ok(())
    }

    fn subscribe(&self, sender: Sender<PlatformEvent>) {
        self.subscribers.lock().unwrap().push(sender);
    }

    fn pointer_location(&self) -> (i32, i32) {
        *self.pointer.read().unwrap()
    }

    fn suppress_animations(&self) -> Box<dyn AnimationSuppression> {
        Box::new(NoopSuppression)
    }
}
