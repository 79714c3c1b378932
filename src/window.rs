//! The `Window` entity from §3's data model: cached attributes the
//! `FloatClassifier` needs plus the flags an embedder toggles (minimize,
//! user-override float). Kept as a process-wide table rather than fields
//! on `Workspace` — ownership of *which workspace* a handle belongs to is
//! the registry's job; this table only ever answers "what do we know
//! about this window."

use std::collections::HashMap;
use std::sync::Mutex;

use crate::float::{Classification, ClassifyInput, FloatClassifier};
use crate::handle::{ProcessId, WindowHandle};
use crate::platform::WindowSnapshot;
use crate::rect::Rect;

#[derive(Debug, Clone)]
pub struct Window {
    pub handle: WindowHandle,
    pub owning_pid: ProcessId,
    pub title: String,
    pub subrole: String,
    pub bundle_id: String,
    pub frame: Rect,
    pub is_floating: bool,
    pub is_minimized: bool,
    pub is_modal: bool,
}

impl Window {
    fn from_snapshot(snapshot: &WindowSnapshot) -> Self {
        Self {
            handle: snapshot.handle,
            owning_pid: snapshot.owning_pid,
            title: snapshot.title.clone(),
            subrole: snapshot.subrole.clone(),
            bundle_id: snapshot.bundle_id.clone(),
            frame: snapshot.frame,
            is_floating: false,
            is_minimized: snapshot.is_minimized,
            is_modal: false,
        }
    }

    fn classify_input(&self) -> ClassifyInput<'_> {
        ClassifyInput {
            user_override_float: self.is_floating,
            is_minimized: self.is_minimized,
            bundle_id: &self.bundle_id,
            subrole: &self.subrole,
            is_modal: self.is_modal,
            width: self.frame.width,
            height: self.frame.height,
            title: &self.title,
        }
    }
}

/// A process-wide table of every window the core currently knows about,
/// keyed by handle. Populated from `WindowSnapshot`s as the `EventRouter`
/// observes them.
#[derive(Default)]
pub struct WindowTable {
    inner: Mutex<HashMap<WindowHandle, Window>>,
}

impl WindowTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a freshly observed window, or updates the cached fields of
    /// one already present — preserving its `is_floating`/`is_modal`
    /// flags, which only the embedder (not the platform) sets.
    pub fn insert_snapshot(&self, snapshot: &WindowSnapshot) {
        let mut table = self.inner.lock().unwrap();
        match table.get_mut(&snapshot.handle) {
            Some(existing) => {
                existing.owning_pid = snapshot.owning_pid;
                existing.title = snapshot.title.clone();
                existing.subrole = snapshot.subrole.clone();
                existing.bundle_id = snapshot.bundle_id.clone();
                existing.frame = snapshot.frame;
                existing.is_minimized = snapshot.is_minimized;
            }
            None => {
                table.insert(snapshot.handle, Window::from_snapshot(snapshot));
            }
        }
    }

    pub fn remove(&self, handle: WindowHandle) {
        self.inner.lock().unwrap().remove(&handle);
    }

    /// Removes every window owned by `pid`, returning their handles.
    pub fn drop_all_for_pid(&self, pid: ProcessId) -> Vec<WindowHandle> {
        let mut table = self.inner.lock().unwrap();
        let dead: Vec<WindowHandle> = table
            .values()
            .filter(|w| w.owning_pid == pid)
            .map(|w| w.handle)
            .collect();
        for handle in &dead {
            table.remove(handle);
        }
        dead
    }

    pub fn set_minimized(&self, handle: WindowHandle, minimized: bool) {
        if let Some(w) = self.inner.lock().unwrap().get_mut(&handle) {
            w.is_minimized = minimized;
        }
    }

    pub fn set_frame(&self, handle: WindowHandle, frame: Rect) {
        if let Some(w) = self.inner.lock().unwrap().get_mut(&handle) {
            w.frame = frame;
        }
    }

    pub fn set_title(&self, handle: WindowHandle, title: impl Into<String>) {
        if let Some(w) = self.inner.lock().unwrap().get_mut(&handle) {
            w.title = title.into();
        }
    }

    /// Flips the user-override float flag, returning the new value.
    pub fn toggle_floating_override(&self, handle: WindowHandle) -> bool {
        let mut table = self.inner.lock().unwrap();
        match table.get_mut(&handle) {
            Some(w) => {
                w.is_floating = !w.is_floating;
                w.is_floating
            }
            None => false,
        }
    }

    pub fn is_minimized(&self, handle: WindowHandle) -> bool {
        self.inner
            .lock()
            .unwrap()
            .get(&handle)
            .is_some_and(|w| w.is_minimized)
    }

    pub fn pid_of(&self, handle: WindowHandle) -> Option<ProcessId> {
        self.inner.lock().unwrap().get(&handle).map(|w| w.owning_pid)
    }

    /// Classifies `handle` against `classifier`, or `None` if nothing is
    /// known about it (e.g. it was never observed via a snapshot).
    pub fn classify(&self, handle: WindowHandle, classifier: &FloatClassifier) -> Option<Classification> {
        let table = self.inner.lock().unwrap();
        let window = table.get(&handle)?;
        Some(classifier.classify(handle, &window.classify_input()))
    }
}
