//! Items detected by source adapters and the batches they are delivered in.

use serde::{Deserialize, Serialize};

use crate::checkpoint::SortKey;
use crate::ids::{BatchId, SourceId, WatcherName};

/// One detected change: a new issue, a patch release, a feed post.
///
/// The payload is produced by the adapter and rendered by the notifier; the
/// runtime never inspects it beyond measuring its encoded size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Identifier assigned by the source, used for de-duplication.
    pub source_id: SourceId,
    /// Natural ordering key (usually creation time).
    pub sort_key: SortKey,
    /// Opaque payload forwarded to the notifier.
    pub payload: serde_json::Value,
}

impl Item {
    /// Creates a new item.
    pub fn new(
        source_id: impl Into<SourceId>,
        sort_key: SortKey,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            sort_key,
            payload,
        }
    }

    /// Size of the payload once serialized as compact JSON.
    pub fn encoded_len(&self) -> usize {
        self.payload.to_string().len()
    }
}

/// A size-bounded group of items delivered in one notifier call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Unique batch ID, usable by notifiers for idempotency.
    pub id: BatchId,
    /// Watcher that produced the batch; notifiers route on it.
    pub watcher: WatcherName,
    /// Items in ascending sort-key order.
    pub items: Vec<Item>,
}

impl Batch {
    /// Creates a batch for a watcher.
    pub fn new(watcher: WatcherName, items: Vec<Item>) -> Self {
        Self {
            id: BatchId::new(),
            watcher,
            items,
        }
    }

    /// Number of items in the batch.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the batch holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of the encoded sizes of all items.
    pub fn encoded_len(&self) -> usize {
        self.items.iter().map(Item::encoded_len).sum()
    }

    /// Sort key of the last item, i.e. the position to commit once delivered.
    pub fn last_key(&self) -> Option<&SortKey> {
        self.items.last().map(|item| &item.sort_key)
    }
}
