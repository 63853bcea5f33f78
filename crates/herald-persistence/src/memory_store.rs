//! In-memory checkpoint store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use herald_models::{Checkpoint, WatcherName};

use crate::error::{PersistenceError, Result};
use crate::store::CheckpointStore;

/// Process-local checkpoint store.
///
/// Records every save so tests can inspect the full write history, and can
/// be switched into a failing mode to simulate an unavailable backend.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    current: Mutex<HashMap<WatcherName, Checkpoint>>,
    history: Mutex<Vec<(WatcherName, Checkpoint)>>,
    fail_saves: AtomicBool,
    save_calls: AtomicUsize,
}

impl MemoryCheckpointStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with one checkpoint.
    pub fn with_checkpoint(watcher: WatcherName, checkpoint: Checkpoint) -> Self {
        let store = Self::new();
        store.lock_current().insert(watcher, checkpoint);
        store
    }

    /// Makes subsequent saves fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Every successful save, in order.
    pub fn history(&self) -> Vec<(WatcherName, Checkpoint)> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Successful saves for one watcher, in order.
    pub fn history_for(&self, watcher: &WatcherName) -> Vec<Checkpoint> {
        self.history()
            .into_iter()
            .filter(|(name, _)| name == watcher)
            .map(|(_, cp)| cp)
            .collect()
    }

    /// Number of save attempts, including failed ones.
    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, HashMap<WatcherName, Checkpoint>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, watcher: &WatcherName) -> Result<Option<Checkpoint>> {
        Ok(self.lock_current().get(watcher).cloned())
    }

    async fn save(&self, watcher: &WatcherName, checkpoint: &Checkpoint) -> Result<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable(format!(
                "save rejected for {}",
                watcher
            )));
        }

        self.lock_current()
            .insert(watcher.clone(), checkpoint.clone());
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((watcher.clone(), checkpoint.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use herald_models::SortKey;

    #[tokio::test]
    async fn test_memory_store_roundtrip_and_history() {
        let store = MemoryCheckpointStore::new();
        let name = WatcherName::from("w");

        assert!(store.load(&name).await.unwrap().is_none());

        store
            .save(&name, &Checkpoint::new(SortKey::Sequence(1), Utc::now()))
            .await
            .unwrap();
        store
            .save(&name, &Checkpoint::new(SortKey::Sequence(2), Utc::now()))
            .await
            .unwrap();

        let loaded = store.load(&name).await.unwrap().unwrap();
        assert_eq!(loaded.position, SortKey::Sequence(2));
        assert_eq!(store.history_for(&name).len(), 2);
    }

    #[tokio::test]
    async fn test_memory_store_failing_saves() {
        let store = MemoryCheckpointStore::new();
        let name = WatcherName::from("w");
        store.set_fail_saves(true);

        let result = store
            .save(&name, &Checkpoint::new(SortKey::Sequence(1), Utc::now()))
            .await;

        assert!(matches!(result, Err(PersistenceError::Unavailable(_))));
        assert_eq!(store.save_calls(), 1);
        assert!(store.history().is_empty());
        assert!(store.load(&name).await.unwrap().is_none());
    }
}
