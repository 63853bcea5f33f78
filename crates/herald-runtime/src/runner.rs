//! The background task that drives one watcher on its cadence.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch, Notify};
use tracing::{debug, error, info, warn};

use herald_models::watcher::to_chrono;
use herald_models::{Checkpoint, WatcherName};
use herald_notify::AlertSink;

use crate::backoff::{BackoffController, FailureAction, FailureKind};
use crate::clock::Clock;
use crate::event::WatcherEvent;
use crate::state::WatcherStatus;
use crate::watcher::{TickResult, Watcher};

/// Runs a watcher until shutdown.
pub struct WatcherTask {
    watcher: Watcher,
    backoff: BackoffController,
    alerts: Arc<dyn AlertSink>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<WatcherEvent>,
    resume: Arc<Notify>,
    shutdown: watch::Receiver<bool>,
    /// Completion time of the last successful tick.
    last_success: Option<DateTime<Utc>>,
}

impl WatcherTask {
    /// Creates a task. `resume` is notified by the scheduler to lift a suspension.
    pub fn new(
        watcher: Watcher,
        alerts: Arc<dyn AlertSink>,
        clock: Arc<dyn Clock>,
        events: broadcast::Sender<WatcherEvent>,
        resume: Arc<Notify>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let backoff = BackoffController::from_config(watcher.config());
        Self {
            watcher,
            backoff,
            alerts,
            clock,
            events,
            resume,
            shutdown,
            last_success: None,
        }
    }

    fn name(&self) -> WatcherName {
        self.watcher.name().clone()
    }

    /// Sends an alert in the background; a slow sink never holds up retries
    /// or shutdown.
    fn alert(&self, text: String) {
        let alerts = Arc::clone(&self.alerts);
        let watcher = self.name();
        tokio::spawn(async move {
            alerts.alert(&watcher, &text).await;
        });
    }

    /// Runs the watcher loop until the shutdown signal.
    pub async fn run(mut self) {
        debug!(
            watcher = %self.name(),
            cadence = ?self.watcher.config().cadence,
            "starting watcher"
        );

        if let Some(mut checkpoint) = self.load_checkpoint().await {
            self.tick_loop(&mut checkpoint).await;
        }

        self.watcher.update_state(|s| {
            s.status = WatcherStatus::Stopped;
            s.next_fire_at = None;
        });
        self.emit(WatcherEvent::Stopped {
            watcher: self.name(),
        });
        debug!(watcher = %self.name(), "watcher stopped");
    }

    /// Loads the checkpoint, suspending on store errors until resumed.
    /// Returns `None` on shutdown.
    async fn load_checkpoint(&mut self) -> Option<Checkpoint> {
        loop {
            match self.watcher.load_checkpoint().await {
                Ok((checkpoint, existed)) => {
                    if existed {
                        self.last_success = Some(checkpoint.committed_at);
                    }
                    return Some(checkpoint);
                }
                Err(e) => {
                    let reason = format!("cannot load checkpoint: {}", e);
                    self.backoff.on_failure(FailureKind::Fatal, &reason);
                    if !self.suspend(reason).await {
                        return None;
                    }
                }
            }
        }
    }

    async fn tick_loop(&mut self, checkpoint: &mut Checkpoint) {
        let cadence = self.watcher.config().cadence;
        let mut due = cadence.first_fire(self.clock.now());

        loop {
            let status = if self.backoff.failures() > 0 {
                WatcherStatus::Backoff
            } else {
                WatcherStatus::Idle
            };
            self.watcher.update_state(|s| {
                s.status = status;
                s.next_fire_at = Some(due);
            });

            if !self.sleep_until(due).await {
                return;
            }

            let fired_at = due;
            let now = self.clock.now();
            if self.backoff.failures() == 0 && cadence.skips_day(self.last_success, now) {
                debug!(watcher = %self.name(), "already ran today, skipping");
                due = cadence.next_fire(fired_at, now);
                continue;
            }

            let result = self.watcher.run_tick(checkpoint, &self.shutdown).await;
            let now = self.clock.now();

            match result {
                TickResult::Delivered { batches, items } => {
                    info!(watcher = %self.name(), batches, items, "delivered new items");
                    self.on_success(now);
                    self.emit(WatcherEvent::Delivered {
                        watcher: self.name(),
                        batches,
                        items,
                    });
                    due = cadence.next_fire(fired_at, now);
                }
                TickResult::NoChange { .. } => {
                    self.on_success(now);
                    self.emit(WatcherEvent::NoChange {
                        watcher: self.name(),
                    });
                    due = cadence.next_fire(fired_at, now);
                }
                TickResult::Interrupted { batches, .. } => {
                    info!(watcher = %self.name(), batches, "tick interrupted by shutdown");
                    return;
                }
                TickResult::Failed(failure) => {
                    let message = failure.to_string();
                    match self.backoff.on_failure(failure.kind(), &message) {
                        FailureAction::Retry {
                            attempt,
                            delay,
                            alert,
                        } => {
                            let retry_at = now + to_chrono(delay);
                            warn!(
                                watcher = %self.name(),
                                attempt,
                                retry_in_secs = delay.as_secs(),
                                error = %message,
                                "tick failed"
                            );
                            if alert {
                                let text = format!(
                                    "{} is failing: {}. Retrying in {}.",
                                    self.name(),
                                    message,
                                    humanize(delay)
                                );
                                self.alert(text);
                            }
                            self.watcher.update_state(|s| {
                                s.retries = attempt;
                                s.last_error = Some(message.clone());
                            });
                            self.emit(WatcherEvent::Failed {
                                watcher: self.name(),
                                error: message,
                                attempt,
                                retry_at,
                            });

                            // A failing sink waits for the next regular firing
                            // instead of being hammered at the backoff rate.
                            due = if failure.is_delivery() {
                                cadence.next_fire(fired_at, now).max(retry_at)
                            } else {
                                retry_at
                            };
                        }
                        FailureAction::Suspend { reason } => {
                            self.watcher.update_state(|s| s.last_error = Some(message.clone()));
                            if !self.suspend(reason).await {
                                return;
                            }
                            due = cadence.first_fire(self.clock.now());
                        }
                    }
                }
            }
        }
    }

    fn on_success(&mut self, now: DateTime<Utc>) {
        if self.backoff.on_success() {
            info!(watcher = %self.name(), "watcher recovered");
            self.emit(WatcherEvent::Recovered {
                watcher: self.name(),
            });
        }
        self.last_success = Some(now);
        self.watcher.update_state(|s| {
            s.retries = 0;
            s.last_error = None;
            s.last_success_at = Some(now);
        });
    }

    /// Announces a suspension and waits for resume. Returns false on shutdown.
    async fn suspend(&mut self, reason: String) -> bool {
        error!(watcher = %self.name(), reason = %reason, "watcher suspended");
        let text = format!(
            "{} suspended: {}. Resume it once the cause is fixed.",
            self.name(),
            reason
        );
        self.alert(text);
        self.watcher.update_state(|s| {
            s.status = WatcherStatus::Suspended;
            s.next_fire_at = None;
        });
        self.emit(WatcherEvent::Suspended {
            watcher: self.name(),
            reason,
        });

        if !self.wait_for_resume().await {
            return false;
        }

        info!(watcher = %self.name(), "watcher resumed");
        self.backoff.resume();
        self.watcher.update_state(|s| {
            s.status = WatcherStatus::Idle;
            s.retries = 0;
        });
        self.emit(WatcherEvent::Resumed {
            watcher: self.name(),
        });
        true
    }

    /// Sleeps until `due`. Returns false if shutdown was requested.
    async fn sleep_until(&mut self, due: DateTime<Utc>) -> bool {
        if *self.shutdown.borrow() {
            return false;
        }
        let delay = (due - self.clock.now()).to_std().unwrap_or(Duration::ZERO);

        tokio::select! {
            _ = tokio::time::sleep(delay) => !*self.shutdown.borrow(),
            _ = self.shutdown.changed() => false,
        }
    }

    async fn wait_for_resume(&mut self) -> bool {
        if *self.shutdown.borrow() {
            return false;
        }
        tokio::select! {
            _ = self.resume.notified() => !*self.shutdown.borrow(),
            _ = self.shutdown.changed() => false,
        }
    }

    fn emit(&self, event: WatcherEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Formats a delay like `30s`, `4m` or `1h 30m`.
fn humanize(delay: Duration) -> String {
    let secs = delay.as_secs();
    match secs {
        0..=59 => format!("{}s", secs),
        60..=3599 if secs % 60 == 0 => format!("{}m", secs / 60),
        60..=3599 => format!("{}m {}s", secs / 60, secs % 60),
        _ if secs % 3600 == 0 => format!("{}h", secs / 3600),
        _ => format!("{}h {}m", secs / 3600, (secs % 3600) / 60),
    }
}
