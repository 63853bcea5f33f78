//! Observable per-watcher state.

use chrono::{DateTime, Utc};
use serde::Serialize;

use herald_models::{Checkpoint, WatcherName};

/// What a watcher is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatcherStatus {
    /// Waiting for the next fire time.
    Idle,
    Fetching,
    Delivering,
    /// Waiting to retry after a failure.
    Backoff,
    /// Not ticking until resumed.
    Suspended,
    Stopped,
}

/// Snapshot of one watcher, published by its task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatcherState {
    pub name: WatcherName,
    pub status: WatcherStatus,
    /// Consecutive failures in the current episode.
    pub retries: u32,
    pub next_fire_at: Option<DateTime<Utc>>,
    /// Last committed checkpoint.
    pub checkpoint: Option<Checkpoint>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Items delivered since the process started.
    pub delivered_items: u64,
}

impl WatcherState {
    /// State of a registered watcher that has not started yet.
    pub fn new(name: WatcherName) -> Self {
        Self {
            name,
            status: WatcherStatus::Idle,
            retries: 0,
            next_fire_at: None,
            checkpoint: None,
            last_success_at: None,
            last_error: None,
            delivered_items: 0,
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.status == WatcherStatus::Suspended
    }
}
