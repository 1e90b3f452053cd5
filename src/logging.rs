//! Tracing initialisation.
//!
//! Console output always; with a log directory, also a daily-rolling file
//! with all events and a second one with warnings and errors only. The
//! level defaults to `info` and can be overridden with `RUST_LOG`.
//!
//! ```no_run
//! credit_features::logging::init(None).expect("logging");
//! tracing::info!("ready");
//! ```

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

const LOG_PREFIX: &str = "credit-features";

/// Platform data directory for log files, e.g. `~/.local/share/credit-features/logs`.
pub fn default_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().context("Failed to determine data directory")?;
    Ok(base_dir.join(LOG_PREFIX).join("logs"))
}

fn rolling_appender(dir: &Path, prefix: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(dir)
        .with_context(|| format!("Failed to create {prefix} log appender"))
}

/// Install the global subscriber. Call once, at process start.
///
/// # Errors
///
/// Returns error if the log directory cannot be created, an appender fails,
/// or a subscriber is already installed.
pub fn init(log_dir: Option<&Path>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layers = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

            let all_logs = fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(rolling_appender(dir, LOG_PREFIX)?);
            let errors = fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(rolling_appender(dir, "error")?)
                .with_filter(EnvFilter::new("warn"));
            Some(all_logs.and_then(errors))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layers)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(log_dir = ?log_dir, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_dir_is_namespaced() {
        if let Ok(dir) = default_log_dir() {
            assert!(dir.ends_with("credit-features/logs"));
        }
    }

    #[test]
    fn test_appender_writes_into_dir() -> Result<()> {
        let dir = tempfile::tempdir()?;
        rolling_appender(dir.path(), "test")?;
        Ok(())
    }
}
