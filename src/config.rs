//! On-disk tuning configuration, loaded the way the teacher loads
//! `config.toml`: parse, then [`TuningConfig::validate`] clamps anything
//! the user supplied into a safe range rather than rejecting the file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::log::LogConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    pub outer_gap: i32,
    pub inner_gap: i32,
    pub restore_positions: bool,
    pub auto_tile_new_windows: bool,
    pub reconcile_debounce_ms: u64,
    pub geometry_retry_ms: u64,
    pub perf_fast_path_window_threshold: usize,
    pub logging: LogConfig,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            outer_gap: 8,
            inner_gap: 8,
            restore_positions: true,
            auto_tile_new_windows: true,
            reconcile_debounce_ms: 200,
            geometry_retry_ms: 50,
            perf_fast_path_window_threshold: 8,
            logging: LogConfig::default(),
        }
    }
}

impl TuningConfig {
    /// Clamps every numeric field into the range the rest of the core
    /// assumes it is already in. Called once after parsing, so a
    /// hand-edited config file can never put the engine into an invalid
    /// state.
    pub fn validate(&mut self) {
        self.outer_gap = self.outer_gap.clamp(0, 200);
        self.inner_gap = self.inner_gap.clamp(0, 200);
        self.reconcile_debounce_ms = self.reconcile_debounce_ms.clamp(0, 5_000);
        self.geometry_retry_ms = self.geometry_retry_ms.clamp(0, 5_000);
        self.perf_fast_path_window_threshold = self.perf_fast_path_window_threshold.clamp(1, 64);
    }
}

/// Returns the config directory: `~/.config/tessera/`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tessera"))
}

/// Returns the config file path: `~/.config/tessera/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Tries to load and parse `config.toml`.
///
/// Returns `Ok(TuningConfig)` on success, or an error string describing
/// what went wrong (IO error, parse error, etc.).
pub fn try_load() -> Result<TuningConfig, String> {
    let path = config_path().ok_or("could not determine config path")?;
    let content = std::fs::read_to_string(&path).map_err(|e| format!("{}: {e}", path.display()))?;
    let mut config: TuningConfig =
        toml::from_str(&content).map_err(|e| format!("{}: {e}", path.display()))?;
    config.validate();
    Ok(config)
}

/// Loads the configuration from disk, falling back to defaults.
///
/// Non-existent files silently return defaults; other IO errors are
/// logged via `log_warn!` and defaults are used.
pub fn load() -> TuningConfig {
    match config_path() {
        Some(p) if !p.exists() => TuningConfig::default(),
        None => TuningConfig::default(),
        _ => match try_load() {
            Ok(config) => config,
            Err(e) => {
                crate::log_warn!("config load failed, using defaults: {e}");
                TuningConfig::default()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_spec_tuning_knobs() {
        let config = TuningConfig::default();
        assert_eq!(config.outer_gap, 8);
        assert_eq!(config.inner_gap, 8);
        assert!(config.restore_positions);
        assert!(config.auto_tile_new_windows);
        assert_eq!(config.reconcile_debounce_ms, 200);
        assert_eq!(config.geometry_retry_ms, 50);
        assert_eq!(config.perf_fast_path_window_threshold, 8);
    }

    #[test]
    fn validate_clamps_out_of_range_gaps() {
        let mut config = TuningConfig {
            outer_gap: -5,
            inner_gap: 10_000,
            ..TuningConfig::default()
        };
        config.validate();
        assert_eq!(config.outer_gap, 0);
        assert_eq!(config.inner_gap, 200);
    }

    #[test]
    fn validate_clamps_threshold_to_at_least_one() {
        let mut config = TuningConfig {
            perf_fast_path_window_threshold: 0,
            ..TuningConfig::default()
        };
        config.validate();
        assert_eq!(config.perf_fast_path_window_threshold, 1);
    }
}
