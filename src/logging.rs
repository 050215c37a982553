//! Logging configuration using the tracing ecosystem.
//!
//! The library itself only emits `tracing` events and spans. Applications
//! that do not install their own subscriber can use one of the helpers here:
//! - `init` writes to stderr
//! - `init_with_file` writes to a daily rotating file
//!
//! Both read the level from `RUST_LOG`.

use std::path::{Path, PathBuf};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Default log level if RUST_LOG is not set.
const DEFAULT_LOG_FILTER: &str = "tracker_client=info,warn";

/// Log file name prefix inside the log directory.
const LOG_FILE_NAME: &str = "tracker-client.log";

/// Initialize logging to stderr.
///
/// # Log Levels
///
/// Configure via `RUST_LOG` environment variable:
/// - `RUST_LOG=debug` - Verbose output for debugging
/// - `RUST_LOG=tracker_client=debug` - Debug only for this crate
/// - `RUST_LOG=tracker_client=trace` - Every request and response status
///
/// # Errors
///
/// Returns an error if a global subscriber is already set.
pub fn init() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .with(env_filter());

    tracing::subscriber::set_global_default(subscriber)?;

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "tracker-client logging to stderr");
    Ok(())
}

/// Initialize logging to a daily rotating file in `log_dir`.
///
/// # Errors
///
/// Returns an error if:
/// - The log directory cannot be created
/// - A global subscriber is already set
pub fn init_with_file(log_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_NAME);

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(env_filter());

    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tracker-client logging started");
    tracing::debug!(log_dir = %log_dir.display(), "Log directory");

    Ok(())
}

/// Build the filter from `RUST_LOG`, falling back to the default.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Get the log directory path.
///
/// Returns the platform-specific local data directory with
/// `tracker-client/logs` appended.
fn get_log_directory() -> anyhow::Result<PathBuf> {
    let base_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;

    Ok(base_dir.join("tracker-client").join("logs"))
}

/// Get the conventional place to keep log files, for use with
/// [`init_with_file`].
pub fn log_directory() -> Option<PathBuf> {
    get_log_directory().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_log_directory_has_expected_structure() {
        let dir = get_log_directory().unwrap();
        assert!(dir.ends_with("tracker-client/logs"));
    }

    #[test]
    fn test_log_directory_public_function() {
        let dir = log_directory();
        assert!(dir.is_some());
        assert!(dir.unwrap().ends_with("tracker-client/logs"));
    }

    #[test]
    #[serial]
    fn test_env_filter_default() {
        std::env::remove_var("RUST_LOG");
        assert_eq!(env_filter().to_string(), EnvFilter::new(DEFAULT_LOG_FILTER).to_string());
    }

    #[test]
    #[serial]
    fn test_env_filter_from_env() {
        std::env::set_var("RUST_LOG", "tracker_client=trace");
        let filter = env_filter().to_string();
        std::env::remove_var("RUST_LOG");
        assert!(filter.contains("tracker_client=trace"));
    }
}
