//! Logging initialization.
//!
//! Logs go to stderr unless `logging.to_file` is set, in which case they are
//! written to `<state>/logs/listing-wizard-{datetime}.log`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Result of logging initialization
pub struct LoggingHandle {
    /// Guard that must be kept alive for the duration of the program.
    /// When dropped, ensures all buffered logs are flushed.
    pub _guard: Option<WorkerGuard>,

    /// Path to the log file when file logging is enabled
    pub log_file_path: Option<PathBuf>,
}

/// Filter directive: `RUST_LOG` wins, then `--debug`, then the configured level
pub fn filter_directive(config: &Config, debug_override: bool) -> String {
    if let Ok(env) = std::env::var("RUST_LOG") {
        return env;
    }
    if debug_override {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    }
}

/// `listing-wizard-20260101T120000Z.log`
pub fn log_filename(now: chrono::DateTime<chrono::Utc>) -> String {
    format!("listing-wizard-{}.log", now.format("%Y%m%dT%H%M%SZ"))
}

fn log_file_in(logs_dir: &Path) -> Result<(String, PathBuf)> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;
    let filename = log_filename(chrono::Utc::now());
    let path = logs_dir.join(&filename);
    Ok((filename, path))
}

/// Initialize the global subscriber. Call once, early in `main`.
pub fn init_logging(config: &Config, debug_override: bool) -> Result<LoggingHandle> {
    let filter = tracing_subscriber::EnvFilter::new(filter_directive(config, debug_override));

    if config.logging.to_file {
        let logs_dir = config.logs_path();
        let (log_filename, log_file_path) = log_file_in(&logs_dir)?;

        let file_appender = tracing_appender::rolling::never(&logs_dir, &log_filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false) // No ANSI codes in log files
                    .with_writer(non_blocking),
            )
            .init();

        Ok(LoggingHandle {
            _guard: Some(guard),
            log_file_path: Some(log_file_path),
        })
    } else {
        // Stdout carries command output, so logs stay on stderr
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();

        Ok(LoggingHandle {
            _guard: None,
            log_file_path: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.paths.state = temp_dir.path().to_string_lossy().to_string();
        config
    }

    #[test]
    fn test_logs_path_under_state() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let logs_dir = config.logs_path();
        assert!(logs_dir.ends_with("logs"));
        assert!(logs_dir.starts_with(temp_dir.path()));
    }

    #[test]
    fn test_log_filename_format() {
        let at = chrono::Utc.with_ymd_and_hms(2026, 3, 9, 14, 5, 0).unwrap();
        assert_eq!(log_filename(at), "listing-wizard-20260309T140500Z.log");
    }

    #[test]
    fn test_log_file_dir_is_created() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let (filename, path) = log_file_in(&config.logs_path()).unwrap();
        assert!(config.logs_path().is_dir());
        assert!(path.ends_with(&filename));
        assert!(filename.starts_with("listing-wizard-"));
    }

    #[test]
    fn test_debug_override_raises_level() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = Config::default();
        assert_eq!(filter_directive(&config, false), "info");
        assert_eq!(filter_directive(&config, true), "debug");
    }
}
