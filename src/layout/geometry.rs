//! The GeometryEngine: a pure function from `(LayoutTree, region, gaps)` to
//! a map of window rectangles. No side effects, no platform calls — every
//! test in this module constructs a tree and a region and asserts on the
//! resulting map directly.

use std::collections::HashMap;

use crate::handle::WindowHandle;
use crate::rect::Rect;

use super::{LayoutKind, LayoutNode, SplitKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    Horizontal,
    Vertical,
}

/// Computes the rectangle for every window reachable from `root`, within
/// `region`, after subtracting `outer_gap` once at the root and
/// `inner_gap` between every pair of siblings.
pub fn layout(root: &LayoutNode, region: Rect, outer_gap: i32, inner_gap: i32) -> HashMap<WindowHandle, Rect> {
    let mut out = HashMap::new();
    place(root, region.inset(outer_gap), inner_gap, 0, &mut out);
    out
}

fn place(
    node: &LayoutNode,
    region: Rect,
    gap: i32,
    depth: u32,
    out: &mut HashMap<WindowHandle, Rect>,
) {
    match node {
        LayoutNode::Leaf { kind, windows } => place_leaf(*kind, windows, region, gap, depth, out),
        LayoutNode::Split {
            kind,
            ratio,
            left,
            right,
        } => {
            let orientation = split_orientation(*kind, depth);
            let (r1, r2) = split_region(region, *ratio, orientation, gap);
            place(left, r1, gap, depth + 1, out);
            place(right, r2, gap, depth + 1, out);
        }
    }
}

fn split_orientation(kind: SplitKind, depth: u32) -> Orientation {
    match kind {
        SplitKind::Hstack => Orientation::Horizontal,
        SplitKind::Vstack => Orientation::Vertical,
        // The root's first split is always horizontal; orientation then
        // alternates strictly by depth, regardless of ancestor chain.
        SplitKind::Bsp => {
            if depth % 2 == 0 {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            }
        }
    }
}

/// Splits `region` into two children along `orientation`, clamping `ratio`
/// into `[0.1, 0.9]` and never producing a dimension below 1px.
fn split_region(region: Rect, ratio: f64, orientation: Orientation, gap: i32) -> (Rect, Rect) {
    let ratio = ratio.clamp(0.1, 0.9);
    match orientation {
        Orientation::Horizontal => {
            let avail = (region.width - gap).max(2);
            let w1 = ((avail as f64) * ratio).round() as i32;
            let w1 = w1.clamp(1, avail - 1);
            let w2 = (avail - w1).max(1);
            let r1 = Rect::new(region.x, region.y, w1, region.height);
            let r2 = Rect::new(region.x + w1 + gap, region.y, w2, region.height);
            (r1, r2)
        }
        Orientation::Vertical => {
            let avail = (region.height - gap).max(2);
            let h1 = ((avail as f64) * ratio).round() as i32;
            let h1 = h1.clamp(1, avail - 1);
            let h2 = (avail - h1).max(1);
            // First child at the top: lower y, in this crate's top-left,
            // y-down coordinate convention (see DESIGN.md).
            let r1 = Rect::new(region.x, region.y, region.width, h1);
            let r2 = Rect::new(region.x, region.y + h1 + gap, region.width, h2);
            (r1, r2)
        }
    }
}

fn place_leaf(
    kind: LayoutKind,
    windows: &[WindowHandle],
    region: Rect,
    gap: i32,
    depth: u32,
    out: &mut HashMap<WindowHandle, Rect>,
) {
    match kind {
        // Floating windows keep whatever geometry they already have; the
        // engine contributes nothing for them.
        LayoutKind::Float => {}
        LayoutKind::Zstack => {
            for handle in windows {
                out.insert(*handle, region);
            }
        }
        LayoutKind::Hstack => arrange_equal(windows, region, gap, Orientation::Horizontal, out),
        LayoutKind::Vstack => arrange_equal(windows, region, gap, Orientation::Vertical, out),
        LayoutKind::Bsp => arrange_bsp(windows, region, gap, depth, out),
    }
}

/// Lays `windows` out in equal-sized slices along `orientation`, separated
/// by `gap` between each pair.
fn arrange_equal(
    windows: &[WindowHandle],
    region: Rect,
    gap: i32,
    orientation: Orientation,
    out: &mut HashMap<WindowHandle, Rect>,
) {
    let n = windows.len();
    if n == 0 {
        return;
    }
    let n = n as i32;
    match orientation {
        Orientation::Horizontal => {
            let avail = (region.width - gap * (n - 1)).max(n);
            let base = avail / n;
            let extra = avail % n;
            let mut x = region.x;
            for (i, handle) in windows.iter().enumerate() {
                let w = base + if (i as i32) < extra { 1 } else { 0 };
                out.insert(*handle, Rect::new(x, region.y, w.max(1), region.height));
                x += w + gap;
            }
        }
        Orientation::Vertical => {
            let avail = (region.height - gap * (n - 1)).max(n);
            let base = avail / n;
            let extra = avail % n;
            let mut y = region.y;
            for (i, handle) in windows.iter().enumerate() {
                let h = base + if (i as i32) < extra { 1 } else { 0 };
                out.insert(*handle, Rect::new(region.x, y, region.width, h.max(1)));
                y += h + gap;
            }
        }
    }
}

/// Recursive binary partition of an arbitrary window list within a single
/// leaf, alternating orientation by `depth`. Mirrors the teacher's
/// `BspLayout::split` recursion, generalized to continue the alternation
/// from whatever depth the enclosing tree placed this leaf at.
fn arrange_bsp(
    windows: &[WindowHandle],
    region: Rect,
    gap: i32,
    depth: u32,
    out: &mut HashMap<WindowHandle, Rect>,
) {
    if windows.is_empty() {
        return;
    }
    if windows.len() == 1 {
        out.insert(windows[0], region);
        return;
    }
    let mid = windows.len().div_ceil(2);
    let (first, second) = windows.split_at(mid);
    let orientation = split_orientation(SplitKind::Bsp, depth);
    let (r1, r2) = split_region(region, 0.5, orientation, gap);
    arrange_bsp(first, r1, gap, depth + 1, out);
    arrange_bsp(second, r2, gap, depth + 1, out);
}
