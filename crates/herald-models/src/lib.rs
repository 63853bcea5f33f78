//! Core data models for Herald.
//!
//! This crate provides the fundamental data types shared by every Herald
//! crate: watcher names and configuration, checkpoints, and the items and
//! batches that flow from source adapters to notifiers.

pub mod checkpoint;
pub mod error;
pub mod ids;
pub mod item;
pub mod watcher;

// Re-export main types
pub use checkpoint::{Checkpoint, SortKey};
pub use error::{ModelError, Result};
pub use ids::{BatchId, SourceId, WatcherName};
pub use item::{Batch, Item};
pub use watcher::{Cadence, WatcherConfig};
