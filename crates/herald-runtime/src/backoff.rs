//! Retry/backoff state machine.
//!
//! ```text
//! Healthy --failure--> Backoff(1) --failure--> Backoff(2) ...
//!    ^                     |                       |
//!    +------success--------+-----------------------+
//! any --fatal or retries exhausted--> Suspended --resume--> Healthy
//! ```

use std::time::Duration;

use serde::Serialize;

use herald_models::WatcherConfig;

/// How a failure should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Worth retrying after a delay.
    Transient,
    /// Needs an operator; retrying cannot help.
    Fatal,
}

/// Backoff state of one watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "failures", rename_all = "snake_case")]
pub enum BackoffState {
    Healthy,
    /// Number of consecutive failures in the current episode.
    Backoff(u32),
    Suspended,
}

/// What the watcher should do after a failed tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureAction {
    /// Try again after `delay`.
    Retry {
        /// Consecutive failures so far, starting at 1.
        attempt: u32,
        delay: Duration,
        /// True only for the first failure of an episode.
        alert: bool,
    },
    /// Stop ticking until resumed.
    Suspend { reason: String },
}

/// Tracks consecutive failures and decides delays, alerts and suspension.
#[derive(Debug, Clone)]
pub struct BackoffController {
    base: Duration,
    cap: Duration,
    max_retries: Option<u32>,
    state: BackoffState,
}

impl BackoffController {
    /// Creates a healthy controller.
    ///
    /// `max_retries` of `None` retries transient failures forever.
    pub fn new(base: Duration, cap: Duration, max_retries: Option<u32>) -> Self {
        Self {
            base,
            cap,
            max_retries,
            state: BackoffState::Healthy,
        }
    }

    /// Creates a controller from a watcher definition.
    pub fn from_config(config: &WatcherConfig) -> Self {
        Self::new(config.backoff_base, config.backoff_cap, config.max_retries)
    }

    pub fn state(&self) -> BackoffState {
        self.state
    }

    /// Consecutive failures in the current episode.
    pub fn failures(&self) -> u32 {
        match self.state {
            BackoffState::Backoff(n) => n,
            _ => 0,
        }
    }

    /// Delay before retry number `attempt`: `base * 2^(attempt-1)`, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        2u32.checked_pow(exponent)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.cap, |delay| delay.min(self.cap))
    }

    /// Records a failed tick.
    pub fn on_failure(&mut self, kind: FailureKind, error: &str) -> FailureAction {
        if kind == FailureKind::Fatal {
            self.state = BackoffState::Suspended;
            return FailureAction::Suspend {
                reason: format!("fatal error: {}", error),
            };
        }

        let attempt = match self.state {
            BackoffState::Healthy => 1,
            BackoffState::Backoff(n) => n.saturating_add(1),
            BackoffState::Suspended => {
                return FailureAction::Suspend {
                    reason: format!("failed while suspended: {}", error),
                }
            }
        };

        if let Some(max) = self.max_retries {
            if attempt > max {
                self.state = BackoffState::Suspended;
                return FailureAction::Suspend {
                    reason: format!("gave up after {} retries: {}", max, error),
                };
            }
        }

        self.state = BackoffState::Backoff(attempt);
        FailureAction::Retry {
            attempt,
            delay: self.delay_for(attempt),
            alert: attempt == 1,
        }
    }

    /// Records a successful tick. Returns true if this ended an episode.
    pub fn on_success(&mut self) -> bool {
        let recovered = matches!(self.state, BackoffState::Backoff(_));
        if self.state != BackoffState::Suspended {
            self.state = BackoffState::Healthy;
        }
        recovered
    }

    /// Lifts a suspension after operator intervention.
    pub fn resume(&mut self) {
        self.state = BackoffState::Healthy;
    }

    pub fn is_suspended(&self) -> bool {
        self.state == BackoffState::Suspended
    }
}
