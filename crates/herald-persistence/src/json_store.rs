//! File-backed checkpoint store.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use herald_models::{Checkpoint, WatcherName};

use crate::atomic::{atomic_write_json, read_json_optional};
use crate::error::{PersistenceError, Result};
use crate::store::CheckpointStore;

/// Stores one JSON file per watcher:
///
/// ```text
/// base_path/
/// ├── github-issues.json
/// └── dota-patches.json
/// ```
#[derive(Debug, Clone)]
pub struct JsonCheckpointStore {
    base_path: PathBuf,
}

impl JsonCheckpointStore {
    /// Creates a store rooted at `base_path`. The directory is created on first save.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Returns the directory holding the checkpoint files.
    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    /// Returns the path of a watcher's checkpoint file.
    pub fn checkpoint_path(&self, watcher: &WatcherName) -> PathBuf {
        self.base_path.join(format!("{}.json", watcher))
    }
}

#[async_trait]
impl CheckpointStore for JsonCheckpointStore {
    async fn load(&self, watcher: &WatcherName) -> Result<Option<Checkpoint>> {
        let path = self.checkpoint_path(watcher);
        tokio::task::spawn_blocking(move || read_json_optional::<Checkpoint>(&path))
            .await
            .map_err(|e| PersistenceError::Task(e.to_string()))?
    }

    async fn save(&self, watcher: &WatcherName, checkpoint: &Checkpoint) -> Result<()> {
        let path = self.checkpoint_path(watcher);
        debug!(watcher = %watcher, position = %checkpoint.position, "saving checkpoint");

        let checkpoint = checkpoint.clone();
        tokio::task::spawn_blocking(move || atomic_write_json(&path, &checkpoint))
            .await
            .map_err(|e| PersistenceError::Task(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use herald_models::SortKey;
    use tempfile::tempdir;

    fn checkpoint(secs: i64) -> Checkpoint {
        let ts = Utc.timestamp_opt(secs, 0).unwrap();
        Checkpoint::new(SortKey::Timestamp(ts), ts)
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let dir = tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path());

        let loaded = store.load(&WatcherName::from("gh")).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path().join("checkpoints"));
        let name = WatcherName::from("gh");

        store.save(&name, &checkpoint(100)).await.unwrap();
        store.save(&name, &checkpoint(200)).await.unwrap();

        let loaded = store.load(&name).await.unwrap();
        assert_eq!(loaded, Some(checkpoint(200)));
        assert!(store.checkpoint_path(&name).ends_with("checkpoints/gh.json"));
    }

    #[tokio::test]
    async fn test_watchers_use_disjoint_files() {
        let dir = tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path());
        let a = WatcherName::from("a");
        let b = WatcherName::from("b");

        store.save(&a, &checkpoint(1)).await.unwrap();
        store.save(&b, &checkpoint(2)).await.unwrap();

        assert_eq!(store.load(&a).await.unwrap(), Some(checkpoint(1)));
        assert_eq!(store.load(&b).await.unwrap(), Some(checkpoint(2)));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path());
        let name = WatcherName::from("gh");
        std::fs::write(store.checkpoint_path(&name), "garbage").unwrap();

        let result = store.load(&name).await;
        assert!(matches!(result, Err(PersistenceError::Corrupt { .. })));
    }
}
