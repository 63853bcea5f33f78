//! Checkpoint persistence for Herald.
//!
//! Watchers record how far they have delivered in a [`CheckpointStore`].
//! Two stores are provided:
//!
//! - [`JsonCheckpointStore`]: one JSON file per watcher, written atomically
//!   (write to temp file, then rename) so a crash never leaves a torn file.
//! - [`MemoryCheckpointStore`]: process-local, for tests and dry runs.
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use herald_models::{Checkpoint, SortKey, WatcherName};
//! use herald_persistence::{CheckpointStore, JsonCheckpointStore};
//!
//! # async fn demo() -> herald_persistence::Result<()> {
//! let store = JsonCheckpointStore::new("/home/user/.herald/checkpoints");
//! let name = WatcherName::from("github-issues");
//!
//! store.save(&name, &Checkpoint::new(SortKey::Sequence(42), Utc::now())).await?;
//! let loaded = store.load(&name).await?;
//! # Ok(())
//! # }
//! ```

pub mod atomic;
pub mod error;
pub mod json_store;
pub mod memory_store;
pub mod store;

pub use error::{PersistenceError, Result};
pub use json_store::JsonCheckpointStore;
pub use memory_store::MemoryCheckpointStore;
pub use store::CheckpointStore;
