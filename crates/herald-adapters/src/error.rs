//! Classified source failures.

use thiserror::Error;

/// A failed fetch, tagged by whether retrying can help.
///
/// Only the adapter knows which of its failures are retryable, so the
/// classification happens here rather than in the runtime.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// Network failure, rate limiting, remote 5xx: retry with backoff.
    #[error("transient source error: {0}")]
    Transient(String),

    /// Auth failure, missing resource, malformed response or persisted
    /// state: requires operator intervention.
    #[error("fatal source error: {0}")]
    Fatal(String),
}

impl SourceError {
    /// Creates a transient error.
    pub fn transient(msg: impl Into<String>) -> Self {
        SourceError::Transient(msg.into())
    }

    /// Creates a fatal error.
    pub fn fatal(msg: impl Into<String>) -> Self {
        SourceError::Fatal(msg.into())
    }

    /// Returns true if the failure is eligible for backoff and retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Transient(_))
    }

    /// The error message without the classification prefix.
    pub fn message(&self) -> &str {
        match self {
            SourceError::Transient(msg) | SourceError::Fatal(msg) => msg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(SourceError::transient("timeout").is_transient());
        assert!(!SourceError::fatal("401").is_transient());
    }

    #[test]
    fn test_display_and_message() {
        let err = SourceError::fatal("bad credentials");
        assert_eq!(err.to_string(), "fatal source error: bad credentials");
        assert_eq!(err.message(), "bad credentials");
    }
}
