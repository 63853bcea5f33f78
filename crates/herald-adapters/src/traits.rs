//! Core trait for source adapters.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use herald_models::{Checkpoint, Item, SortKey};

use crate::error::SourceError;

/// Information about a source adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    /// Adapter type identifier (`github_issues`, `json_feed`, ...).
    pub id: String,
    /// Human-readable description of what is watched.
    pub description: String,
}

/// Trait for source adapters.
///
/// Each adapter knows how to:
/// - fetch items newer than a checkpoint
/// - classify its failures as transient or fatal
/// - pick a baseline position the first time a watcher runs
///
/// # Example
///
/// ```ignore
/// use herald_adapters::SourceAdapter;
///
/// async fn preview(adapter: &dyn SourceAdapter, checkpoint: &Checkpoint) {
///     match adapter.fetch_since(checkpoint).await {
///         Ok(items) => println!("{} new items", items.len()),
///         Err(e) if e.is_transient() => println!("try again later: {}", e),
///         Err(e) => println!("needs attention: {}", e),
///     }
/// }
/// ```
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Returns information about this adapter.
    fn info(&self) -> &AdapterInfo;

    /// Returns items that appeared after `checkpoint`.
    ///
    /// Items may come back in any order and may overlap previous fetches;
    /// the watcher sorts and de-duplicates them.
    async fn fetch_since(&self, checkpoint: &Checkpoint) -> Result<Vec<Item>, SourceError>;

    /// Position recorded when a watcher runs for the first time, so history
    /// that predates the watcher is not announced.
    fn initial_position(&self, now: DateTime<Utc>) -> SortKey {
        SortKey::Timestamp(now)
    }

    /// Position to advance to after a fetch that found nothing new, or
    /// `None` to keep the checkpoint where it is.
    fn idle_position(&self, _fetched_at: DateTime<Utc>) -> Option<SortKey> {
        None
    }
}

/// Extracts a timestamp position, rejecting checkpoints of another kind.
///
/// A mismatch means the persisted state does not belong to this source.
pub fn timestamp_position(checkpoint: &Checkpoint) -> Result<DateTime<Utc>, SourceError> {
    match &checkpoint.position {
        SortKey::Timestamp(ts) => Ok(*ts),
        other => Err(SourceError::fatal(format!(
            "checkpoint position {} is not a timestamp",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_position() {
        let now = Utc::now();
        let cp = Checkpoint::new(SortKey::Timestamp(now), now);
        assert_eq!(timestamp_position(&cp).unwrap(), now);

        let cp = Checkpoint::new(SortKey::Sequence(3), now);
        assert!(matches!(
            timestamp_position(&cp),
            Err(SourceError::Fatal(_))
        ));
    }
}
