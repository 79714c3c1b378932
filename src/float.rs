//! Decides, per window, whether it must be excluded from tiling. Mirrors
//! the shape of the teacher's `WindowRule`/`should_manage` rule table
//! (plain data, first-match-wins) rather than a rule-engine abstraction,
//! extended with the built-in heuristics §4.4 enumerates.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::handle::WindowHandle;

/// A snapshot of the window attributes the classifier needs. Supplied by
/// the caller (normally assembled from a `WindowSnapshot` plus the
/// Window's own flags) rather than queried directly, so the classifier
/// stays a pure function of its inputs.
#[derive(Debug, Clone)]
pub struct ClassifyInput<'a> {
    pub user_override_float: bool,
    pub is_minimized: bool,
    pub bundle_id: &'a str,
    pub subrole: &'a str,
    pub is_modal: bool,
    pub width: i32,
    pub height: i32,
    pub title: &'a str,
}

/// A user-authored override, applied ahead of the built-in heuristics
/// (check 8 in §4.4): an application whose windows are force-tiled (or
/// force-floated) regardless of what the generic rules would decide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceRule {
    pub bundle_id_contains: String,
    pub tile: bool,
}

const DENY_LIST_BUNDLE_IDS: &[&str] = &[
    "com.apple.preference",
    "com.apple.print.center",
    "com.apple.ColorSyncUtility",
    "com.apple.finder.openpanel",
    "com.apple.finder.savepanel",
];

const FLOATING_SUBROLES: &[&str] = &["dialog", "sheet", "system-dialog", "floating"];

const TITLE_KEYWORDS: &[&str] = &[
    "Preferences",
    "Settings",
    "Inspector",
    "Find",
    "Properties",
    "Alert",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Tile,
    Float,
}

/// Per-window memoization of the last classification, invalidated
/// explicitly by the caller on minimize/deminimize, title change, user
/// override toggle, or a Coordinator-issued flush.
#[derive(Default)]
pub struct FloatClassifier {
    force_rules: Vec<ForceRule>,
    cache: Mutex<HashMap<WindowHandle, Classification>>,
}

impl FloatClassifier {
    pub fn new(force_rules: Vec<ForceRule>) -> Self {
        Self {
            force_rules,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Classifies `handle`, using the cached result if present.
    pub fn classify(&self, handle: WindowHandle, input: &ClassifyInput<'_>) -> Classification {
        if let Some(cached) = self.cache.lock().unwrap().get(&handle) {
            return *cached;
        }
        let result = classify_uncached(input, &self.force_rules);
        self.cache.lock().unwrap().insert(handle, result);
        result
    }

    /// Drops the memoized result for `handle`, forcing the next
    /// `classify` call to recompute it.
    pub fn flush(&self, handle: WindowHandle) {
        self.cache.lock().unwrap().remove(&handle);
    }

    /// Drops every memoized result.
    pub fn flush_all(&self) {
        self.cache.lock().unwrap().clear();
    }
}

fn classify_uncached(input: &ClassifyInput<'_>, force_rules: &[ForceRule]) -> Classification {
    if input.user_override_float {
        return Classification::Float;
    }
    if input.is_minimized {
        return Classification::Float;
    }
    // App-specific overrides win over every generic heuristic below —
    // this is what lets an IDE's editor windows force-tile even though
    // the title-keyword or size checks would otherwise float them.
    for rule in force_rules {
        if input.bundle_id.contains(&rule.bundle_id_contains) {
            return if rule.tile {
                Classification::Tile
            } else {
                Classification::Float
            };
        }
    }
    if DENY_LIST_BUNDLE_IDS
        .iter()
        .any(|deny| input.bundle_id.contains(deny))
    {
        return Classification::Float;
    }
    if FLOATING_SUBROLES.contains(&input.subrole) {
        return Classification::Float;
    }
    if input.is_modal {
        return Classification::Float;
    }
    let tiny_dialog = input.width < 300 && input.height < 300;
    let notification_strip = input.height < 150 && input.width > 300;
    if tiny_dialog || notification_strip {
        return Classification::Float;
    }
    if TITLE_KEYWORDS
        .iter()
        .any(|kw| input.title.contains(kw))
    {
        return Classification::Float;
    }
    Classification::Tile
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tileable() -> ClassifyInput<'static> {
        ClassifyInput {
            user_override_float: false,
            is_minimized: false,
            bundle_id: "com.example.editor",
            subrole: "standard",
            is_modal: false,
            width: 1200,
            height: 800,
            title: "main.rs — editor",
        }
    }

    #[test]
    fn default_tileable_window_tiles() {
        let classifier = FloatClassifier::new(vec![]);
        let input = tileable();
        assert_eq!(
            classifier.classify(WindowHandle(1), &input),
            Classification::Tile
        );
    }

    #[test]
    fn user_override_wins_over_everything_else() {
        let classifier = FloatClassifier::new(vec![]);
        let mut input = tileable();
        input.user_override_float = true;
        assert_eq!(
            classifier.classify(WindowHandle(1), &input),
            Classification::Float
        );
    }

    #[test]
    fn deny_listed_bundle_floats() {
        let classifier = FloatClassifier::new(vec![]);
        let mut input = tileable();
        input.bundle_id = "com.apple.preference.general";
        assert_eq!(
            classifier.classify(WindowHandle(1), &input),
            Classification::Float
        );
    }

    #[test]
    fn tiny_window_is_treated_as_a_dialog() {
        let classifier = FloatClassifier::new(vec![]);
        let mut input = tileable();
        input.width = 200;
        input.height = 150;
        assert_eq!(
            classifier.classify(WindowHandle(1), &input),
            Classification::Float
        );
    }

    #[test]
    fn wide_short_window_is_treated_as_a_notification_strip() {
        let classifier = FloatClassifier::new(vec![]);
        let mut input = tileable();
        input.width = 500;
        input.height = 80;
        assert_eq!(
            classifier.classify(WindowHandle(1), &input),
            Classification::Float
        );
    }

    #[test]
    fn title_keyword_floats_a_preferences_window() {
        let classifier = FloatClassifier::new(vec![]);
        let mut input = tileable();
        input.title = "Preferences";
        assert_eq!(
            classifier.classify(WindowHandle(1), &input),
            Classification::Float
        );
    }

    #[test]
    fn force_rule_overrides_a_generic_float_decision() {
        let classifier = FloatClassifier::new(vec![ForceRule {
            bundle_id_contains: "com.example.ide".to_string(),
            tile: true,
        }]);
        let mut input = tileable();
        input.bundle_id = "com.example.ide.main";
        input.title = "Find in Files";
        assert_eq!(
            classifier.classify(WindowHandle(1), &input),
            Classification::Tile
        );
    }

    #[test]
    fn classification_is_memoized_until_flushed() {
        let classifier = FloatClassifier::new(vec![]);
        let input = tileable();
        assert_eq!(
            classifier.classify(WindowHandle(1), &input),
            Classification::Tile
        );
        let mut changed = input.clone();
        changed.is_minimized = true;
        // Stale cache entry still wins until flushed.
        assert_eq!(
            classifier.classify(WindowHandle(1), &changed),
            Classification::Tile
        );
        classifier.flush(WindowHandle(1));
        assert_eq!(
            classifier.classify(WindowHandle(1), &changed),
            Classification::Float
        );
    }
}
