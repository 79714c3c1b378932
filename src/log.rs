//! A small file logger with size-based rotation, in the style of a daemon
//! that cannot assume a terminal is attached. Deliberately hand-rolled
//! rather than pulled from `log`/`tracing`: the core's only consumer of
//! logging is itself, and a dependency-free file writer keeps the
//! embedding story simple for callers that wire their own subscriber.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub enabled: bool,
    pub level: Level,
    pub max_file_mb: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: Level::Info,
            max_file_mb: 10,
        }
    }
}

struct Logger {
    config: LogConfig,
    path: Option<PathBuf>,
    file: Option<File>,
}

impl Logger {
    fn write(&mut self, level: Level, args: std::fmt::Arguments<'_>) {
        if !self.config.enabled || level < self.config.level {
            return;
        }
        let Some(file) = self.file.as_mut() else {
            return;
        };
        self.rotate_if_needed();
        let _ = writeln!(file, "[{}] {} {args}", timestamp(), level.label());
    }

    fn rotate_if_needed(&mut self) {
        let Some(path) = &self.path else { return };
        let Ok(meta) = fs::metadata(path) else {
            return;
        };
        if meta.len() < self.config.max_file_mb * 1024 * 1024 {
            return;
        }
        let rotated = path.with_extension("log.old");
        let _ = fs::rename(path, &rotated);
        if let Ok(f) = OpenOptions::new().create(true).append(true).open(path) {
            self.file = Some(f);
        }
    }
}

static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

/// Initializes the global logger. Safe to call more than once; later calls
/// are ignored (the first caller wins, matching the teacher's
/// `OnceLock`-backed singleton).
pub fn init(config: LogConfig, path: Option<PathBuf>) {
    let file = path.as_ref().and_then(|p| {
        if let Some(parent) = p.parent() {
            let _ = fs::create_dir_all(parent);
        }
        OpenOptions::new().create(true).append(true).open(p).ok()
    });
    let _ = LOGGER.set(Mutex::new(Logger {
        config,
        path,
        file,
    }));
}

#[doc(hidden)]
pub fn write_log(level: Level, args: std::fmt::Arguments<'_>) {
    if let Some(logger) = LOGGER.get() {
        if let Ok(mut logger) = logger.lock() {
            logger.write(level, args);
        }
    }
}

fn timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let secs_of_day = now % 86_400;
    format!(
        "{:02}:{:02}:{:02}",
        secs_of_day / 3600,
        (secs_of_day % 3600) / 60,
        secs_of_day % 60
    )
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::log::write_log($crate::log::Level::Debug, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::log::write_log($crate::log::Level::Info, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::log::write_log($crate::log::Level::Warn, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::log::write_log($crate::log::Level::Error, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_by_default() {
        assert!(!LogConfig::default().enabled);
    }

    #[test]
    fn levels_order_debug_below_error() {
        assert!(Level::Debug < Level::Error);
    }

    #[test]
    fn timestamp_has_expected_shape() {
        let ts = timestamp();
        assert_eq!(ts.len(), 8);
        assert_eq!(ts.chars().nth(2), Some(':'));
    }
}
