//! CLI error type and exit codes.

use envmap::analysis::AnalysisError;
use envmap::config::ConfigError;
use envmap::environment::EnvironmentError;
use envmap::geo::CoordError;
use envmap::http::HttpError;
use envmap::logging::LoggingError;
use envmap::{MapError, OverlayError, ProviderError};
use thiserror::Error;

/// Exit code when no map provider could be initialized.
pub const EXIT_MAP_INIT_FAILED: i32 = 2;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    MapInit(#[from] MapError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Overlay(#[from] OverlayError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error(transparent)]
    Coordinates(#[from] CoordError),

    #[error("Failed to create HTTP client: {0}")]
    Http(#[from] HttpError),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::MapInit(MapError::InitFailed { .. }) => EXIT_MAP_INIT_FAILED,
            _ => 1,
        }
    }
}
