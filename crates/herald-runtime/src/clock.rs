//! Wall-clock sources.

use std::fmt;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use herald_models::watcher::to_chrono;

/// Source of the current wall-clock time.
///
/// Cadences and checkpoints are expressed in UTC; sleeping is always done
/// with tokio timers.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall clock that advances with tokio's timer.
///
/// With `tokio::time::pause` the clock only moves when tokio time does, so
/// daily cadences and backoff deadlines can be tested deterministically.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    base: DateTime<Utc>,
    start: Instant,
}

impl TokioClock {
    /// Creates a clock reading `base` right now.
    pub fn starting_at(base: DateTime<Utc>) -> Self {
        Self {
            base,
            start: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        self.base + to_chrono(self.start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_follows_paused_time() {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let clock = TokioClock::starting_at(base);
        assert_eq!(clock.now(), base);

        tokio::time::advance(Duration::from_secs(90)).await;
        assert_eq!(clock.now(), Utc.with_ymd_and_hms(2024, 3, 1, 12, 1, 30).unwrap());
    }
}
