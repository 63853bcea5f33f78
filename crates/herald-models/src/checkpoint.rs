//! Checkpoints: how far a watcher has processed its source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Natural ordering key of an item, and the position a checkpoint records.
///
/// A source uses a single variant consistently. Cursor keys compare
/// lexicographically, so cursor sources must emit sortable cursors.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SortKey {
    /// Creation time of the item.
    Timestamp(DateTime<Utc>),
    /// Monotonic sequence number assigned by the source.
    Sequence(u64),
    /// Opaque, lexicographically ordered cursor.
    Cursor(String),
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            SortKey::Sequence(n) => write!(f, "#{}", n),
            SortKey::Cursor(c) => write!(f, "{}", c),
        }
    }
}

/// Durable marker of the last position a watcher delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Sort key of the last delivered item (or the baseline position).
    pub position: SortKey,
    /// When this checkpoint was committed.
    pub committed_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Creates a checkpoint at the given position.
    pub fn new(position: SortKey, committed_at: DateTime<Utc>) -> Self {
        Self {
            position,
            committed_at,
        }
    }

    /// Returns true if `key` lies strictly after this checkpoint.
    pub fn is_before(&self, key: &SortKey) -> bool {
        key > &self.position
    }

    /// Compares positions only; the commit time is not part of the ordering.
    pub fn cmp_position(&self, other: &Checkpoint) -> Ordering {
        self.position.cmp(&other.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> SortKey {
        SortKey::Timestamp(Utc.timestamp_opt(secs, 0).unwrap())
    }

    #[test]
    fn test_sort_key_ordering() {
        assert!(ts(10) < ts(11));
        assert!(SortKey::Sequence(2) < SortKey::Sequence(10));
        assert!(SortKey::Cursor("0002".into()) < SortKey::Cursor("0010".into()));
    }

    #[test]
    fn test_checkpoint_is_before() {
        let cp = Checkpoint::new(ts(100), Utc::now());
        assert!(cp.is_before(&ts(101)));
        assert!(!cp.is_before(&ts(100)));
        assert!(!cp.is_before(&ts(99)));
    }

    #[test]
    fn test_cmp_position_ignores_commit_time() {
        let a = Checkpoint::new(SortKey::Sequence(5), Utc.timestamp_opt(0, 0).unwrap());
        let b = Checkpoint::new(SortKey::Sequence(5), Utc::now());
        assert_eq!(a.cmp_position(&b), Ordering::Equal);
    }

    #[test]
    fn test_checkpoint_serialization_shape() {
        let cp = Checkpoint::new(SortKey::Sequence(7), Utc.timestamp_opt(0, 0).unwrap());
        let json = serde_json::to_value(&cp).unwrap();
        assert_eq!(json["position"]["kind"], "sequence");
        assert_eq!(json["position"]["value"], 7);

        let parsed: Checkpoint = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, cp);
    }
}
