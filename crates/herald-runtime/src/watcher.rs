//! A single watcher: one checkpoint, one source, one delivery channel.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use herald_adapters::{SourceAdapter, SourceError};
use herald_models::{Batch, Checkpoint, Item, SortKey, WatcherConfig, WatcherName};
use herald_notify::{DeliveryError, Notifier};
use herald_persistence::{CheckpointStore, PersistenceError};

use crate::aggregator;
use crate::backoff::FailureKind;
use crate::clock::Clock;
use crate::state::{WatcherState, WatcherStatus};

/// Why a tick failed.
#[derive(Debug)]
pub enum TickFailure {
    /// The source could not be queried.
    Source(SourceError),
    /// A batch was not delivered; earlier batches were committed.
    Delivery {
        error: DeliveryError,
        delivered_batches: usize,
    },
    /// The checkpoint could not be read or written.
    Store(PersistenceError),
}

impl TickFailure {
    /// Classification used by the backoff controller.
    ///
    /// Delivery failures are always retried; store failures never are,
    /// since the persisted position can no longer be trusted.
    pub fn kind(&self) -> FailureKind {
        match self {
            TickFailure::Source(e) if e.is_transient() => FailureKind::Transient,
            TickFailure::Source(_) => FailureKind::Fatal,
            TickFailure::Delivery { .. } => FailureKind::Transient,
            TickFailure::Store(_) => FailureKind::Fatal,
        }
    }

    pub fn is_delivery(&self) -> bool {
        matches!(self, TickFailure::Delivery { .. })
    }
}

impl fmt::Display for TickFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickFailure::Source(e) => write!(f, "source error: {}", e),
            TickFailure::Delivery {
                error,
                delivered_batches,
            } => write!(
                f,
                "{} (after {} delivered batches)",
                error, delivered_batches
            ),
            TickFailure::Store(e) => write!(f, "checkpoint store error: {}", e),
        }
    }
}

/// Outcome of one tick.
#[derive(Debug)]
pub enum TickResult {
    /// Nothing new. `advanced` is true when the checkpoint moved to the
    /// source's idle position.
    NoChange { advanced: bool },
    /// Every new item was delivered.
    Delivered { batches: usize, items: usize },
    /// Shutdown was requested before all batches went out; delivered
    /// batches were committed.
    Interrupted { batches: usize, items: usize },
    Failed(TickFailure),
}

/// Drives one source against its checkpoint.
pub struct Watcher {
    config: WatcherConfig,
    adapter: Arc<dyn SourceAdapter>,
    store: Arc<dyn CheckpointStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    state: watch::Sender<WatcherState>,
}

impl Watcher {
    /// Creates a watcher. The config is expected to be validated.
    pub fn new(
        config: WatcherConfig,
        adapter: Arc<dyn SourceAdapter>,
        store: Arc<dyn CheckpointStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (state, _) = watch::channel(WatcherState::new(config.name.clone()));
        Self {
            config,
            adapter,
            store,
            notifier,
            clock,
            state,
        }
    }

    pub fn name(&self) -> &WatcherName {
        &self.config.name
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Subscribes to this watcher's state.
    pub fn subscribe_state(&self) -> watch::Receiver<WatcherState> {
        self.state.subscribe()
    }

    /// Applies a change to the published state.
    pub(crate) fn update_state(&self, modify: impl FnOnce(&mut WatcherState)) {
        self.state.send_modify(modify);
    }

    /// Loads the persisted checkpoint, creating a baseline on first run.
    ///
    /// The baseline is the adapter's initial position, so history older than
    /// the watcher is never announced. Returns the checkpoint and whether it
    /// already existed.
    pub async fn load_checkpoint(&self) -> Result<(Checkpoint, bool), PersistenceError> {
        let (checkpoint, existed) = match self.store.load(self.name()).await? {
            Some(checkpoint) => (checkpoint, true),
            None => {
                let now = self.clock.now();
                let baseline = Checkpoint::new(self.adapter.initial_position(now), now);
                self.store.save(self.name(), &baseline).await?;
                info!(
                    watcher = %self.name(),
                    position = %baseline.position,
                    "created baseline checkpoint"
                );
                (baseline, false)
            }
        };

        let published = checkpoint.clone();
        self.update_state(|s| s.checkpoint = Some(published));
        Ok((checkpoint, existed))
    }

    /// Runs one fetch/deliver/commit cycle.
    ///
    /// `checkpoint` is advanced (and persisted) after every delivered batch.
    /// `shutdown` is checked after the fetch and between batches; a batch
    /// that has started delivering is always finished and committed.
    pub async fn run_tick(
        &self,
        checkpoint: &mut Checkpoint,
        shutdown: &watch::Receiver<bool>,
    ) -> TickResult {
        self.update_state(|s| s.status = WatcherStatus::Fetching);

        let fetched = match self.adapter.fetch_since(checkpoint).await {
            Ok(items) => items,
            Err(e) => return TickResult::Failed(TickFailure::Source(e)),
        };
        let fetched_at = self.clock.now();
        let fetched_count = fetched.len();
        let items = fresh_items(checkpoint, fetched);

        if items.is_empty() {
            debug!(watcher = %self.name(), fetched = fetched_count, "no new items");
            let advanced = match self.adapter.idle_position(fetched_at) {
                Some(position) => match self.commit(checkpoint, position).await {
                    Ok(advanced) => advanced,
                    Err(e) => return TickResult::Failed(TickFailure::Store(e)),
                },
                None => false,
            };
            return TickResult::NoChange { advanced };
        }

        let groups = aggregator::batch(
            items,
            self.config.batch_item_limit,
            self.config.batch_byte_limit,
        );
        let commit_keys = commit_keys(&groups);
        let total = groups.len();
        debug!(watcher = %self.name(), batches = total, "delivering new items");
        self.update_state(|s| s.status = WatcherStatus::Delivering);

        let mut delivered_batches = 0;
        let mut delivered_items = 0;
        for (items, commit_key) in groups.into_iter().zip(commit_keys) {
            if *shutdown.borrow() {
                info!(
                    watcher = %self.name(),
                    delivered = delivered_batches,
                    remaining = total - delivered_batches,
                    "stopping between batches"
                );
                return TickResult::Interrupted {
                    batches: delivered_batches,
                    items: delivered_items,
                };
            }

            let batch = Batch::new(self.name().clone(), items);
            if let Err(error) = self.notifier.deliver(&batch).await {
                return TickResult::Failed(TickFailure::Delivery {
                    error,
                    delivered_batches,
                });
            }
            delivered_batches += 1;
            delivered_items += batch.len();
            let count = batch.len() as u64;
            self.update_state(|s| s.delivered_items += count);

            match commit_key {
                Some(position) => {
                    if let Err(e) = self.commit(checkpoint, position).await {
                        return TickResult::Failed(TickFailure::Store(e));
                    }
                }
                None => debug!(
                    watcher = %self.name(),
                    batch = %batch.id,
                    "next batch shares the boundary sort key, deferring commit"
                ),
            }
        }

        TickResult::Delivered {
            batches: delivered_batches,
            items: delivered_items,
        }
    }

    /// Persists `position` if it moves the checkpoint forward.
    async fn commit(
        &self,
        checkpoint: &mut Checkpoint,
        position: SortKey,
    ) -> Result<bool, PersistenceError> {
        if !checkpoint.is_before(&position) {
            return Ok(false);
        }
        let next = Checkpoint::new(position, self.clock.now());
        self.store.save(self.name(), &next).await?;
        debug!(watcher = %self.name(), position = %next.position, "checkpoint committed");

        *checkpoint = next.clone();
        self.update_state(|s| s.checkpoint = Some(next));
        Ok(true)
    }
}

/// Drops items the checkpoint already covers and repeated source ids, then
/// sorts the rest by sort key.
pub fn fresh_items(checkpoint: &Checkpoint, items: Vec<Item>) -> Vec<Item> {
    let mut fresh: Vec<Item> = items
        .into_iter()
        .filter(|item| checkpoint.is_before(&item.sort_key))
        .collect();
    fresh.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));

    let mut seen = HashSet::new();
    fresh.retain(|item| seen.insert(item.source_id.clone()));
    fresh
}

/// Position to commit after each batch.
///
/// `None` when the next batch starts with the same sort key: committing it
/// would hide the rest of the tie from the next tick if that batch failed.
fn commit_keys(groups: &[Vec<Item>]) -> Vec<Option<SortKey>> {
    groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let last = group.last().map(|item| &item.sort_key);
            let next = groups.get(i + 1).and_then(|g| g.first()).map(|item| &item.sort_key);
            match (last, next) {
                (Some(last), Some(next)) if last == next => None,
                (last, _) => last.cloned(),
            }
        })
        .collect()
}
