//! Error types for configuration loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings file could not be read.
    #[error("failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid JSON for the expected shape.
    #[error("failed to parse settings {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A required environment variable is not set.
    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    /// Settings are well-formed but semantically invalid.
    #[error("invalid settings: {0}")]
    Invalid(String),

    /// A watcher definition was rejected.
    #[error(transparent)]
    Model(#[from] herald_models::ModelError),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
