//! Log-only destination.

use async_trait::async_trait;
use tracing::{info, warn};

use herald_models::{Batch, WatcherName};

use crate::error::Result;
use crate::traits::{AlertSink, Notifier};

/// Writes notifications and alerts to the log instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, batch: &Batch) -> Result<()> {
        info!(watcher = %batch.watcher, batch = %batch.id, items = batch.len(), "delivering batch");
        for item in &batch.items {
            let title = item
                .payload
                .get("title")
                .and_then(|t| t.as_str())
                .unwrap_or(item.source_id.as_str());
            info!(
                watcher = %batch.watcher,
                source_id = %item.source_id,
                sort_key = %item.sort_key,
                "{}",
                title
            );
        }
        Ok(())
    }
}

#[async_trait]
impl AlertSink for LogNotifier {
    async fn alert(&self, watcher: &WatcherName, message: &str) {
        warn!(watcher = %watcher, "alert: {}", message);
    }
}
