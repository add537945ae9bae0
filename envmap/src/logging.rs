//! Logging setup.
//!
//! Installs a `tracing` subscriber writing to stderr and, when a directory is
//! configured, to a daily-rolling log file. `RUST_LOG` takes precedence over
//! the configured level.

use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingSettings;

/// Default log file prefix.
pub const DEFAULT_LOG_PREFIX: &str = "envmap.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Failed to create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("A global logger is already installed: {0}")]
    AlreadyInitialized(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for log files. Stderr only when `None`.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: DEFAULT_LOG_PREFIX.to_string(),
        }
    }
}

impl From<&LoggingSettings> for LoggingConfig {
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level.clone(),
            directory: settings.directory.clone(),
            file_prefix: DEFAULT_LOG_PREFIX.to_string(),
        }
    }
}

/// Keeps the file writer alive. Dropping it flushes pending lines.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    file: Option<WorkerGuard>,
}

impl LoggingGuard {
    pub fn has_file_output(&self) -> bool {
        self.file.is_some()
    }
}

/// Builds the filter for `config`, preferring `RUST_LOG` when set.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directive) if !directive.trim().is_empty() => parse_filter(&directive),
        _ => parse_filter(&config.level),
    }
}

fn parse_filter(directive: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directive).map_err(|e| LoggingError::InvalidFilter {
        filter: directive.to_string(),
        reason: e.to_string(),
    })
}

/// Installs the global subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let filter = build_filter(config)?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .boxed();

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::Directory {
                path: dir.clone(),
                source,
            })?;
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(LoggingGuard { file: guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_settings() {
        let settings = LoggingSettings {
            level: "debug".to_string(),
            directory: Some(PathBuf::from("/tmp/envmap-logs")),
        };
        let config = LoggingConfig::from(&settings);
        assert_eq!(config.level, "debug");
        assert_eq!(config.directory, Some(PathBuf::from("/tmp/envmap-logs")));
        assert_eq!(config.file_prefix, DEFAULT_LOG_PREFIX);
    }

    #[test]
    fn test_parse_filter() {
        assert!(parse_filter("envmap=debug,warn").is_ok());
        let err = parse_filter("envmap=notalevel").unwrap_err();
        assert!(matches!(err, LoggingError::InvalidFilter { .. }));
    }

    #[test]
    fn test_init_creates_log_directory() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("logs");
        let config = LoggingConfig {
            directory: Some(dir.clone()),
            ..LoggingConfig::default()
        };

        // Another test may already own the global subscriber.
        match init_logging(&config) {
            Ok(guard) => assert!(guard.has_file_output()),
            Err(e) => assert!(matches!(e, LoggingError::AlreadyInitialized(_))),
        }
        assert!(dir.is_dir());
    }
}
