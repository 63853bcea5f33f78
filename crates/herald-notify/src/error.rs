//! Error types for notification delivery.

use std::time::Duration;

use thiserror::Error;

/// A batch could not be delivered.
///
/// The watcher treats every variant as transient; the distinction is kept
/// for logs and for the status API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The destination asked us to slow down.
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Network failure or a server-side error.
    #[error("delivery failed: {0}")]
    Unavailable(String),

    /// The destination refused the message.
    #[error("delivery rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Telegram Bot API error.
    #[error("telegram error: {0}")]
    Telegram(String),

    /// No destination is configured for the watcher.
    #[error("no notification route for watcher {0}")]
    NoRoute(String),
}

/// Result type for delivery operations.
pub type Result<T> = std::result::Result<T, DeliveryError>;
