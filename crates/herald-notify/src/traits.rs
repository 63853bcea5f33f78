//! Delivery traits consumed by the watcher runtime.

use async_trait::async_trait;

use herald_models::{Batch, WatcherName};

use crate::error::Result;

/// Renders and delivers batches of new items.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one batch. The batch is either fully accepted or an error
    /// is returned; the caller never retries within the same tick.
    async fn deliver(&self, batch: &Batch) -> Result<()>;
}

/// Receives operator alerts about failing watchers.
///
/// Alerts are fire-and-forget: implementations log their own failures and
/// never report them to the caller.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Sends `message` about `watcher`.
    async fn alert(&self, watcher: &WatcherName, message: &str);
}

/// A destination usable both for notifications and alerts.
pub trait Channel: Notifier + AlertSink {}

impl<T: Notifier + AlertSink> Channel for T {}
