//! Scheduler: registers watchers and runs each on its own task.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{broadcast, watch, Notify, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use herald_adapters::SourceAdapter;
use herald_models::{WatcherConfig, WatcherName};
use herald_notify::{AlertSink, Notifier};
use herald_persistence::CheckpointStore;

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, RuntimeError};
use crate::event::WatcherEvent;
use crate::runner::WatcherTask;
use crate::state::{WatcherState, WatcherStatus};
use crate::watcher::Watcher;

/// Capacity of the event broadcast channel.
const EVENT_CAPACITY: usize = 256;

/// Control surface of one registered watcher.
struct WatcherControl {
    state: watch::Receiver<WatcherState>,
    resume: Arc<Notify>,
}

type Controls = Arc<RwLock<BTreeMap<WatcherName, WatcherControl>>>;

/// Cloneable view of a scheduler for status queries and operator actions.
#[derive(Clone)]
pub struct SchedulerHandle {
    controls: Controls,
    events: broadcast::Sender<WatcherEvent>,
}

impl SchedulerHandle {
    /// Current state of every watcher, ordered by name.
    pub async fn snapshots(&self) -> Vec<WatcherState> {
        self.controls
            .read()
            .await
            .values()
            .map(|c| c.state.borrow().clone())
            .collect()
    }

    /// Current state of one watcher.
    pub async fn snapshot(&self, name: &WatcherName) -> Option<WatcherState> {
        self.controls
            .read()
            .await
            .get(name)
            .map(|c| c.state.borrow().clone())
    }

    /// Lifts the suspension of a watcher.
    pub async fn resume(&self, name: &WatcherName) -> Result<()> {
        let controls = self.controls.read().await;
        let control = controls
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownWatcher(name.to_string()))?;

        if control.state.borrow().status != WatcherStatus::Suspended {
            return Err(RuntimeError::NotSuspended(name.to_string()));
        }
        info!(watcher = %name, "resume requested");
        control.resume.notify_one();
        Ok(())
    }

    /// Subscribes to watcher events.
    pub fn subscribe(&self) -> broadcast::Receiver<WatcherEvent> {
        self.events.subscribe()
    }

    /// Number of registered watchers.
    pub async fn len(&self) -> usize {
        self.controls.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.controls.read().await.is_empty()
    }
}

/// Runs every registered watcher on its own schedule.
///
/// Each watcher gets a dedicated task, so a slow or failing watcher never
/// delays another one. Store, notifier and alert sink are shared; watchers
/// only touch their own keys and routes.
pub struct Scheduler {
    store: Arc<dyn CheckpointStore>,
    notifier: Arc<dyn Notifier>,
    alerts: Arc<dyn AlertSink>,
    clock: Arc<dyn Clock>,
    handle: SchedulerHandle,
    /// Tasks registered before `start`.
    pending: Vec<WatcherTask>,
    /// Handles of running watcher tasks.
    tasks: Vec<JoinHandle<()>>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver (cloned into every task).
    shutdown_rx: watch::Receiver<bool>,
    started: bool,
}

impl Scheduler {
    /// Creates a scheduler using the system clock.
    pub fn new(
        store: Arc<dyn CheckpointStore>,
        notifier: Arc<dyn Notifier>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            store,
            notifier,
            alerts,
            clock: Arc::new(SystemClock),
            handle: SchedulerHandle {
                controls: Arc::new(RwLock::new(BTreeMap::new())),
                events,
            },
            pending: Vec::new(),
            tasks: Vec::new(),
            shutdown_tx,
            shutdown_rx,
            started: false,
        }
    }

    /// Replaces the clock used for cadences and checkpoints.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Registers a watcher. After `start`, the watcher begins immediately.
    pub async fn register(
        &mut self,
        config: WatcherConfig,
        adapter: Arc<dyn SourceAdapter>,
    ) -> Result<()> {
        config.validate()?;
        if *self.shutdown_rx.borrow() {
            return Err(RuntimeError::Stopped);
        }

        let name = config.name.clone();
        let mut controls = self.handle.controls.write().await;
        if controls.contains_key(&name) {
            return Err(RuntimeError::DuplicateWatcher(name.to_string()));
        }

        let watcher = Watcher::new(
            config,
            adapter,
            Arc::clone(&self.store),
            Arc::clone(&self.notifier),
            Arc::clone(&self.clock),
        );
        let resume = Arc::new(Notify::new());
        controls.insert(
            name.clone(),
            WatcherControl {
                state: watcher.subscribe_state(),
                resume: Arc::clone(&resume),
            },
        );
        drop(controls);

        let task = WatcherTask::new(
            watcher,
            Arc::clone(&self.alerts),
            Arc::clone(&self.clock),
            self.handle.events.clone(),
            resume,
            self.shutdown_rx.clone(),
        );

        if self.started {
            self.tasks.push(tokio::spawn(task.run()));
        } else {
            self.pending.push(task);
        }
        debug!(watcher = %name, "watcher registered");
        Ok(())
    }

    /// Starts every registered watcher.
    pub async fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(RuntimeError::AlreadyStarted);
        }
        if *self.shutdown_rx.borrow() {
            return Err(RuntimeError::Stopped);
        }

        info!(watchers = self.pending.len(), "starting scheduler");
        for task in self.pending.drain(..) {
            self.tasks.push(tokio::spawn(task.run()));
        }
        self.started = true;
        Ok(())
    }

    /// Stops all watchers and waits for in-flight ticks to finish.
    ///
    /// Sleeping watchers exit at once; a watcher that is delivering finishes
    /// the current batch and persists its checkpoint first.
    pub async fn stop(&mut self) -> Result<()> {
        if !self.started {
            return Err(RuntimeError::NotStarted);
        }

        info!("stopping scheduler");
        self.shutdown_tx.send(true).map_err(|e| {
            RuntimeError::Shutdown(format!("failed to send shutdown signal: {}", e))
        })?;

        let results = join_all(self.tasks.drain(..)).await;
        let panicked = results.iter().filter(|r| r.is_err()).count();
        self.started = false;

        if panicked > 0 {
            warn!(panicked, "watcher tasks panicked during shutdown");
            return Err(RuntimeError::Shutdown(format!(
                "{} watcher task(s) panicked",
                panicked
            )));
        }
        info!("scheduler stopped");
        Ok(())
    }

    /// Returns a cloneable handle for status queries and resume.
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Current state of every watcher.
    pub async fn snapshots(&self) -> Vec<WatcherState> {
        self.handle.snapshots().await
    }

    /// Lifts the suspension of a watcher.
    pub async fn resume(&self, name: &WatcherName) -> Result<()> {
        self.handle.resume(name).await
    }

    /// Subscribes to watcher events.
    pub fn subscribe(&self) -> broadcast::Receiver<WatcherEvent> {
        self.handle.subscribe()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.started {
            let _ = self.shutdown_tx.send(true);
        }
    }
}
