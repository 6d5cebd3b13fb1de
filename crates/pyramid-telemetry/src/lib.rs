//! Tracing setup for pyramid binaries.
//!
//! Every binary logs through a `tracing_subscriber::registry()` with an
//! `EnvFilter` and an `fmt` layer on stderr. Setting `PYRAMID_LOG_DIR` adds
//! a daily-rolling, non-ANSI file layer alongside it:
//!
//! ```bash
//! RUST_LOG=pyramid_engine=debug PYRAMID_LOG_DIR=/tmp/pyramid pyramid show roadmap
//! ```
//!
//! Hold the returned [`LogGuard`] for the life of the process; dropping it
//! flushes and stops the file writer.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable enabling the file layer.
pub const LOG_DIR_ENV: &str = "PYRAMID_LOG_DIR";

/// Filter used when neither `RUST_LOG` nor a configured filter is usable.
pub const DEFAULT_FILTER: &str = "info";

/// Keeps the background file writer alive.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
    log_file: Option<PathBuf>,
}

impl LogGuard {
    /// Directory and prefix of the rolling log, when file logging is on.
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

/// How to set up tracing.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Filter used when `RUST_LOG` is unset or invalid.
    pub default_filter: String,
    /// Directory for the rolling log file; `None` disables it.
    pub log_dir: Option<PathBuf>,
    /// Log file name prefix.
    pub file_prefix: String,
}

impl TracingConfig {
    /// Stderr only, `info` by default.
    pub fn new(file_prefix: impl Into<String>) -> Self {
        Self {
            default_filter: DEFAULT_FILTER.to_string(),
            log_dir: None,
            file_prefix: file_prefix.into(),
        }
    }

    /// Set the fallback filter directive.
    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    /// Enable the file layer in `dir`.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Enable the file layer if `PYRAMID_LOG_DIR` is set and non-empty.
    pub fn with_log_dir_from_env(self) -> Self {
        match std::env::var(LOG_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => self.with_log_dir(dir),
            _ => self,
        }
    }
}

/// Build the filter: `RUST_LOG` if valid, else `fallback`, else `info`.
pub fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber.
///
/// A second call in the same process leaves the first subscriber in place.
pub fn init_tracing(config: &TracingConfig) -> LogGuard {
    let filter = env_filter(&config.default_filter);
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr));

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, format!("{}.log", config.file_prefix));
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let installed = registry
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .try_init()
                .is_ok();
            let log_file = dir.join(format!("{}.log", config.file_prefix));
            if installed {
                tracing::info!(path = %log_file.display(), "logging to file");
            }
            LogGuard {
                _file: Some(guard),
                log_file: Some(log_file),
            }
        }
        None => {
            let _ = registry.try_init();
            LogGuard {
                _file: None,
                log_file: None,
            }
        }
    }
}
