//! Structured Logger
//!
//! Wraps `tracing` with a console layer on stderr, an optional daily-rotated
//! JSON file layer, and environment-based level control.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log file prefix inside the log directory.
const LOG_FILE_NAME: &str = "cmdroute.log";

/// `RUST_LOG` wins over the configured level.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the global logger.
///
/// Console output goes to stderr so command results on stdout stay clean.
/// With `log_dir`, events are also written as NDJSON to
/// `<log_dir>/cmdroute.log.YYYY-MM-DD`. Calling this twice is harmless.
pub fn init_logger(level: &str, log_dir: Option<&Path>) -> Result<()> {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(true);

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_NAME);
            Some(fmt::layer().json().with_writer(appender).with_ansi(false))
        }
        None => None,
    };

    let _ = tracing_subscriber::registry()
        .with(build_filter(level))
        .with(console_layer)
        .with(file_layer)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        init_logger("debug", Some(&logs)).unwrap();
        assert!(logs.is_dir());
        // A second subscriber is silently ignored.
        init_logger("info", None).unwrap();
    }

    #[test]
    fn filter_accepts_configured_level() {
        let filter = build_filter("warn");
        assert!(!filter.to_string().is_empty());
    }
}
