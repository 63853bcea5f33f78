//! Error types for model validation.

use thiserror::Error;

/// Errors raised when a model value is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// Watcher name is empty or contains unsupported characters.
    #[error("invalid watcher name: {0:?}")]
    InvalidName(String),

    /// A watcher configuration value is out of range.
    #[error("invalid config for watcher {watcher}: {reason}")]
    InvalidConfig { watcher: String, reason: String },

    /// A daily time could not be parsed.
    #[error("invalid time of day: {0:?} (expected HH:MM)")]
    InvalidTimeOfDay(String),
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
