//! Test doubles shared by the runtime integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use tokio::sync::broadcast;
use tokio::time::Instant;

use herald_adapters::{AdapterInfo, SourceAdapter, SourceError};
use herald_models::{Batch, Checkpoint, Item, SortKey, WatcherName};
use herald_notify::{AlertSink, DeliveryError, Notifier};
use herald_runtime::{TokioClock, WatcherEvent};

/// Fixed wall-clock start for every test.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
}

pub fn clock() -> Arc<TokioClock> {
    Arc::new(TokioClock::starting_at(start_time()))
}

pub fn name(s: &str) -> WatcherName {
    WatcherName::parse(s).unwrap()
}

pub fn item(seq: u64) -> Item {
    Item::new(
        format!("item-{}", seq),
        SortKey::Sequence(seq),
        json!({ "title": format!("Item {}", seq) }),
    )
}

/// In-memory source with sequence-keyed items and scripted failures.
pub struct MockSource {
    info: AdapterInfo,
    items: Mutex<Vec<Item>>,
    failures: Mutex<VecDeque<SourceError>>,
    always_fail: Mutex<Option<SourceError>>,
    initial: u64,
    fetches: Mutex<Vec<Instant>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            info: AdapterInfo {
                id: "mock".to_string(),
                description: "mock source".to_string(),
            },
            items: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            always_fail: Mutex::new(None),
            initial: 0,
            fetches: Mutex::new(Vec::new()),
        }
    }

    /// Baseline position used when no checkpoint exists.
    pub fn with_initial(mut self, seq: u64) -> Self {
        self.initial = seq;
        self
    }

    pub fn with_items(self, seqs: impl IntoIterator<Item = u64>) -> Self {
        self.push(seqs);
        self
    }

    pub fn push(&self, seqs: impl IntoIterator<Item = u64>) {
        self.items.lock().unwrap().extend(seqs.into_iter().map(item));
    }

    /// Fails the next fetches with these errors, in order.
    pub fn fail_next(&self, errors: impl IntoIterator<Item = SourceError>) {
        self.failures.lock().unwrap().extend(errors);
    }

    /// Fails every fetch until cleared.
    pub fn fail_always(&self, error: Option<SourceError>) {
        *self.always_fail.lock().unwrap() = error;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    pub fn fetch_times(&self) -> Vec<Instant> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceAdapter for MockSource {
    fn info(&self) -> &AdapterInfo {
        &self.info
    }

    async fn fetch_since(&self, checkpoint: &Checkpoint) -> Result<Vec<Item>, SourceError> {
        self.fetches.lock().unwrap().push(Instant::now());
        if let Some(error) = self.always_fail.lock().unwrap().clone() {
            return Err(error);
        }
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        // Include the item at the checkpoint as well, like overlapping fetch windows do.
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| item.sort_key >= checkpoint.position)
            .rev()
            .cloned()
            .collect())
    }

    fn initial_position(&self, _now: DateTime<Utc>) -> SortKey {
        SortKey::Sequence(self.initial)
    }
}

/// Notifier and alert sink that records everything it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    batches: Mutex<Vec<(WatcherName, Vec<u64>)>>,
    alerts: Mutex<Vec<(WatcherName, String)>>,
    failures: Mutex<VecDeque<DeliveryError>>,
    /// Deliveries accepted before failures kick in.
    accept_before_failing: AtomicUsize,
    delay: Mutex<Option<Duration>>,
    alert_delay: Mutex<Option<Duration>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails `count` deliveries after the next `accept` successful ones.
    pub fn fail_after(&self, accept: usize, count: usize) {
        self.accept_before_failing.store(accept, Ordering::SeqCst);
        let mut failures = self.failures.lock().unwrap();
        for _ in 0..count {
            failures.push_back(DeliveryError::Unavailable("channel unavailable".to_string()));
        }
    }

    /// Makes every delivery take `delay`.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }

    /// Delivered sequence numbers, flattened, for one watcher.
    pub fn delivered(&self, watcher: &str) -> Vec<u64> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .filter(|(w, _)| w.as_str() == watcher)
            .flat_map(|(_, seqs)| seqs.clone())
            .collect()
    }

    /// Makes every alert take `delay`.
    pub fn with_alert_delay(self, delay: Duration) -> Self {
        *self.alert_delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub fn alerts(&self) -> Vec<(WatcherName, String)> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, batch: &Batch) -> herald_notify::Result<()> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let accepted = self.accept_before_failing.load(Ordering::SeqCst);
        if accepted > 0 {
            self.accept_before_failing.fetch_sub(1, Ordering::SeqCst);
        } else if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        let seqs = batch
            .items
            .iter()
            .map(|item| match item.sort_key {
                SortKey::Sequence(seq) => seq,
                ref other => panic!("unexpected key {}", other),
            })
            .collect();
        self.batches
            .lock()
            .unwrap()
            .push((batch.watcher.clone(), seqs));
        Ok(())
    }
}

#[async_trait]
impl AlertSink for RecordingNotifier {
    async fn alert(&self, watcher: &WatcherName, message: &str) {
        let delay = *self.alert_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.alerts
            .lock()
            .unwrap()
            .push((watcher.clone(), message.to_string()));
    }
}

/// Waits for the first event matching `predicate`, giving up after an hour
/// of (paused) time.
pub async fn wait_for(
    events: &mut broadcast::Receiver<WatcherEvent>,
    predicate: impl Fn(&WatcherEvent) -> bool,
) -> WatcherEvent {
    let deadline = Duration::from_secs(3600);
    tokio::time::timeout(deadline, async {
        loop {
            match events.recv().await {
                Ok(event) if predicate(&event) => return event,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(e) => panic!("event channel closed: {}", e),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Counts events matching `predicate` until `count` have been seen.
pub async fn wait_for_count(
    events: &mut broadcast::Receiver<WatcherEvent>,
    count: usize,
    predicate: impl Fn(&WatcherEvent) -> bool,
) {
    for _ in 0..count {
        wait_for(events, &predicate).await;
    }
}
