//! Error types for the runtime crate.

use thiserror::Error;

/// Errors that can occur while managing watchers.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Scheduler not started.
    #[error("scheduler not started")]
    NotStarted,

    /// Scheduler already started.
    #[error("scheduler already started")]
    AlreadyStarted,

    /// Scheduler was stopped and cannot be started again.
    #[error("scheduler has been stopped")]
    Stopped,

    /// A watcher with this name is already registered.
    #[error("watcher already registered: {0}")]
    DuplicateWatcher(String),

    /// Watcher not found.
    #[error("watcher not found: {0}")]
    UnknownWatcher(String),

    /// Resume was requested for a watcher that is not suspended.
    #[error("watcher is not suspended: {0}")]
    NotSuspended(String),

    /// Watcher definition rejected.
    #[error("invalid watcher: {0}")]
    Config(#[from] herald_models::ModelError),

    /// Shutdown error.
    #[error("shutdown error: {0}")]
    Shutdown(String),
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
