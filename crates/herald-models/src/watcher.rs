//! Static watcher definitions.

use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};

use crate::error::{ModelError, Result};
use crate::ids::WatcherName;

/// Default number of items per batch (Discord allows ten embeds per message).
pub const DEFAULT_BATCH_ITEM_LIMIT: usize = 10;

/// Default encoded size per batch (Discord caps a message's embeds at 6000 characters).
pub const DEFAULT_BATCH_BYTE_LIMIT: usize = 6000;

/// When a watcher fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Every `Duration`, starting immediately.
    Every(Duration),
    /// Once per day at a UTC wall-clock time.
    Daily {
        /// Time of day the watcher fires.
        at: NaiveTime,
        /// Skip a firing when the watcher already completed a tick that day.
        once_per_day: bool,
    },
}

impl Cadence {
    /// Parses an `HH:MM` (or `HH:MM:SS`) time of day.
    pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .map_err(|_| ModelError::InvalidTimeOfDay(s.to_string()))
    }

    /// First fire time when a watcher starts at `now`.
    pub fn first_fire(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Cadence::Every(_) => now,
            Cadence::Daily { at, .. } => {
                let today = now.date_naive().and_time(at).and_utc();
                if today >= now {
                    today
                } else {
                    today + chrono::Duration::days(1)
                }
            }
        }
    }

    /// Next fire time after a firing that was scheduled for `scheduled`.
    ///
    /// Fixed intervals keep their phase; a tick that overran its interval
    /// fires again immediately rather than queueing missed firings.
    pub fn next_fire(&self, scheduled: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Cadence::Every(interval) => {
                let next = scheduled + to_chrono(interval);
                next.max(now)
            }
            Cadence::Daily { at, .. } => {
                let today = now.date_naive().and_time(at).and_utc();
                if today > now {
                    today
                } else {
                    today + chrono::Duration::days(1)
                }
            }
        }
    }

    /// Whether a daily firing should be skipped because the watcher already ran today.
    pub fn skips_day(&self, last_run: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match *self {
            Cadence::Daily {
                once_per_day: true, ..
            } => last_run.is_some_and(|last| last.date_naive() == now.date_naive()),
            _ => false,
        }
    }
}

/// Converts a std duration, saturating at roughly ten years.
pub fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::days(3650))
}

/// Static definition of one watcher. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Unique watcher name; also the checkpoint key.
    pub name: WatcherName,
    /// When the watcher fires.
    pub cadence: Cadence,
    /// Consecutive failures tolerated before suspension (`None` = unbounded).
    pub max_retries: Option<u32>,
    /// Delay after the first failure of an episode.
    pub backoff_base: Duration,
    /// Upper bound for the backoff delay.
    pub backoff_cap: Duration,
    /// Maximum items per delivered batch.
    pub batch_item_limit: usize,
    /// Maximum summed encoded item size per batch.
    pub batch_byte_limit: usize,
}

impl WatcherConfig {
    /// Creates a config with default retry and batching values.
    pub fn new(name: WatcherName, cadence: Cadence) -> Self {
        Self {
            name,
            cadence,
            max_retries: None,
            backoff_base: Duration::from_secs(30),
            backoff_cap: Duration::from_secs(30 * 60),
            batch_item_limit: DEFAULT_BATCH_ITEM_LIMIT,
            batch_byte_limit: DEFAULT_BATCH_BYTE_LIMIT,
        }
    }

    /// Caps consecutive failures before the watcher is suspended.
    pub fn with_max_retries(mut self, max: Option<u32>) -> Self {
        self.max_retries = max;
        self
    }

    /// Sets the backoff base and cap.
    pub fn with_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_cap = cap;
        self
    }

    /// Sets the batch limits.
    pub fn with_batch_limits(mut self, items: usize, bytes: usize) -> Self {
        self.batch_item_limit = items;
        self.batch_byte_limit = bytes;
        self
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: &str| {
            Err(ModelError::InvalidConfig {
                watcher: self.name.to_string(),
                reason: reason.to_string(),
            })
        };

        self.name.check()?;
        if let Cadence::Every(interval) = self.cadence {
            if interval.is_zero() {
                return fail("interval must be greater than zero");
            }
        }
        if self.backoff_base.is_zero() {
            return fail("backoff base must be greater than zero");
        }
        if self.backoff_base > self.backoff_cap {
            return fail("backoff base must not exceed backoff cap");
        }
        if self.batch_item_limit == 0 {
            return fail("batch item limit must be at least 1");
        }
        if self.batch_byte_limit == 0 {
            return fail("batch byte limit must be at least 1");
        }
        Ok(())
    }
}
