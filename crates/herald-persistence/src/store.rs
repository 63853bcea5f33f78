//! The checkpoint store interface.

use async_trait::async_trait;

use herald_models::{Checkpoint, WatcherName};

use crate::error::Result;

/// Durable key/value store of per-watcher checkpoints.
///
/// Each watcher reads and writes only its own key, so implementations need
/// no cross-key coordination. Any error from `save` means the checkpoint
/// must be considered not persisted.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Loads the checkpoint for a watcher, `None` if it never committed one.
    async fn load(&self, watcher: &WatcherName) -> Result<Option<Checkpoint>>;

    /// Persists the checkpoint for a watcher, replacing the previous one.
    async fn save(&self, watcher: &WatcherName, checkpoint: &Checkpoint) -> Result<()>;
}
