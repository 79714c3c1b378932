//! The layout tree: a recursive structure of regions, each tagged with a
//! layout kind, that the Reconciler rebuilds or incrementally patches from
//! the current window set, and the GeometryEngine turns into rectangles.

mod geometry;

pub use geometry::layout;

use serde::{Deserialize, Serialize};

use crate::handle::WindowHandle;

/// One of the five layout kinds a workspace (or a leaf within its tree)
/// can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    Bsp,
    Hstack,
    Vstack,
    Zstack,
    Float,
}

impl LayoutKind {
    /// The fixed cycle order `cycle_layout()` advances through.
    const CYCLE: [LayoutKind; 5] = [
        LayoutKind::Bsp,
        LayoutKind::Hstack,
        LayoutKind::Vstack,
        LayoutKind::Zstack,
        LayoutKind::Float,
    ];

    pub fn next(self) -> LayoutKind {
        let idx = Self::CYCLE.iter().position(|k| *k == self).unwrap_or(0);
        Self::CYCLE[(idx + 1) % Self::CYCLE.len()]
    }

    /// Whether this kind is valid on an internal (`Split`) node.
    pub fn is_splittable(self) -> bool {
        matches!(self, LayoutKind::Bsp | LayoutKind::Hstack | LayoutKind::Vstack)
    }
}

/// The subset of [`LayoutKind`] valid on an internal node — zstack and
/// float never subdivide a region, so they cannot appear here. Keeping
/// this as its own type makes that invariant checked by the compiler
/// rather than asserted at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitKind {
    Bsp,
    Hstack,
    Vstack,
}

#[cfg(test)]
impl SplitKind {
    fn from_layout_kind(kind: LayoutKind) -> Option<SplitKind> {
        match kind {
            LayoutKind::Bsp => Some(SplitKind::Bsp),
            LayoutKind::Hstack => Some(SplitKind::Hstack),
            LayoutKind::Vstack => Some(SplitKind::Vstack),
            LayoutKind::Zstack | LayoutKind::Float => None,
        }
    }
}

/// A node in the layout tree: either a leaf holding windows directly, or
/// an internal split with exactly two children. The tagged-variant shape
/// Design Note §9 asks for, replacing dynamic dispatch over node types.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutNode {
    Leaf {
        kind: LayoutKind,
        windows: Vec<WindowHandle>,
    },
    Split {
        kind: SplitKind,
        ratio: f64,
        left: Box<LayoutNode>,
        right: Box<LayoutNode>,
    },
}

impl LayoutNode {
    fn window_count(&self) -> usize {
        match self {
            LayoutNode::Leaf { windows, .. } => windows.len(),
            LayoutNode::Split { left, right, .. } => left.window_count() + right.window_count(),
        }
    }

    fn collect_windows(&self, out: &mut Vec<WindowHandle>) {
        match self {
            LayoutNode::Leaf { windows, .. } => out.extend(windows.iter().copied()),
            LayoutNode::Split { left, right, .. } => {
                left.collect_windows(out);
                right.collect_windows(out);
            }
        }
    }

    /// Removes `handle` from whichever leaf currently holds it. No-op if
    /// absent.
    fn remove(&mut self, handle: WindowHandle) {
        match self {
            LayoutNode::Leaf { windows, .. } => windows.retain(|w| *w != handle),
            LayoutNode::Split { left, right, .. } => {
                left.remove(handle);
                right.remove(handle);
            }
        }
    }

    /// Inserts `handle` into the leaf with the fewest windows, breaking
    /// ties by tree order (left before right).
    fn insert_into_smallest_leaf(&mut self, handle: WindowHandle) {
        match self {
            LayoutNode::Leaf { windows, .. } => windows.push(handle),
            LayoutNode::Split { left, right, .. } => {
                if left.window_count() <= right.window_count() {
                    left.insert_into_smallest_leaf(handle);
                } else {
                    right.insert_into_smallest_leaf(handle);
                }
            }
        }
    }
}

/// The tree plus enough bookkeeping to decide rebuild-vs-incremental on
/// the next `sync`.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTree {
    root: LayoutNode,
}

impl LayoutTree {
    pub fn new(kind: LayoutKind) -> Self {
        Self {
            root: LayoutNode::Leaf {
                kind,
                windows: Vec::new(),
            },
        }
    }

    pub fn root(&self) -> &LayoutNode {
        &self.root
    }

    pub fn root_kind(&self) -> LayoutKind {
        root_kind(&self.root)
    }

    pub fn window_count(&self) -> usize {
        self.root.window_count()
    }

    /// Removes `handle` from whichever leaf holds it, without triggering
    /// a full rebuild. Used by `Workspace::release`, where a single
    /// departure should never cascade into re-laying-out the whole tree.
    pub fn remove_window(&mut self, handle: WindowHandle) {
        self.root.remove(handle);
    }

    pub fn windows(&self) -> Vec<WindowHandle> {
        let mut out = Vec::new();
        self.root.collect_windows(&mut out);
        out
    }

    /// Rebuilds the tree from scratch with a new root kind, keeping
    /// whatever windows were already present.
    pub fn set_kind(&mut self, kind: LayoutKind) {
        let current = self.windows();
        self.root = rebuild(kind, &current);
    }

    /// Tree maintenance per §4.3: rebuild from scratch when the delta
    /// against the current window set is large (or either side is
    /// empty), otherwise patch incrementally.
    pub fn sync(&mut self, current: &[WindowHandle]) {
        let existing = self.windows();
        let delta = symmetric_difference_count(&existing, current);

        if delta > 2 || existing.is_empty() || current.is_empty() {
            let kind = self.root_kind();
            self.root = rebuild(kind, current);
            return;
        }

        for handle in &existing {
            if !current.contains(handle) {
                self.root.remove(*handle);
            }
        }
        for handle in current {
            if !existing.contains(handle) {
                self.root.insert_into_smallest_leaf(*handle);
            }
        }
    }
}

fn root_kind(node: &LayoutNode) -> LayoutKind {
    match node {
        LayoutNode::Leaf { kind, .. } => *kind,
        LayoutNode::Split { kind, .. } => match kind {
            SplitKind::Bsp => LayoutKind::Bsp,
            SplitKind::Hstack => LayoutKind::Hstack,
            SplitKind::Vstack => LayoutKind::Vstack,
        },
    }
}

fn symmetric_difference_count(a: &[WindowHandle], b: &[WindowHandle]) -> usize {
    let added = b.iter().filter(|h| !a.contains(h)).count();
    let removed = a.iter().filter(|h| !b.contains(h)).count();
    added + removed
}

/// Builds a fresh tree for `kind` over `windows`.
///
/// Only `bsp` actually subdivides into nested `Split` nodes — one level
/// per halving, until leaves hold at most two windows, matching §4.3's
/// "recursively create one initial split per level until leaves hold ≤ 2
/// windows". `hstack`/`vstack`/`zstack`/`float` arrange their whole window
/// list directly within a single leaf (see DESIGN.md): none of them needs
/// a subdivided tree, since their geometry rule is already an n-way
/// arrangement (or, for float, no arrangement at all) over the leaf's
/// full window list.
fn rebuild(kind: LayoutKind, windows: &[WindowHandle]) -> LayoutNode {
    if kind == LayoutKind::Bsp && windows.len() > 2 {
        return build_bsp_splits(windows);
    }
    LayoutNode::Leaf {
        kind,
        windows: windows.to_vec(),
    }
}

fn build_bsp_splits(windows: &[WindowHandle]) -> LayoutNode {
    if windows.len() <= 2 {
        return LayoutNode::Leaf {
            kind: LayoutKind::Bsp,
            windows: windows.to_vec(),
        };
    }
    let mid = windows.len().div_ceil(2);
    let (first, second) = windows.split_at(mid);
    LayoutNode::Split {
        kind: SplitKind::Bsp,
        ratio: 0.5,
        left: Box::new(build_bsp_splits(first)),
        right: Box::new(build_bsp_splits(second)),
    }
}
