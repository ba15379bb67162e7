//! Error types for configuration loading and validation.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("bot token is not configured")]
    MissingToken,

    #[error("monitor channel id is not configured")]
    MissingMonitorChannel,

    #[error("no services configured")]
    NoServices,

    #[error("duplicate service name: {0}")]
    DuplicateService(String),
}
