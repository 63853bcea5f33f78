//! Watcher events.

use chrono::{DateTime, Utc};

use herald_models::WatcherName;

/// Events emitted by running watchers.
#[derive(Debug, Clone, PartialEq)]
pub enum WatcherEvent {
    /// A tick delivered new items.
    Delivered {
        watcher: WatcherName,
        batches: usize,
        items: usize,
    },
    /// A tick found nothing new.
    NoChange { watcher: WatcherName },
    /// A tick failed and will be retried.
    Failed {
        watcher: WatcherName,
        error: String,
        /// Consecutive failures in this episode.
        attempt: u32,
        retry_at: DateTime<Utc>,
    },
    /// A failure episode ended with a successful tick.
    Recovered { watcher: WatcherName },
    /// The watcher stopped ticking until resumed.
    Suspended { watcher: WatcherName, reason: String },
    /// An operator lifted a suspension.
    Resumed { watcher: WatcherName },
    /// The watcher task exited.
    Stopped { watcher: WatcherName },
}

impl WatcherEvent {
    /// Returns the watcher this event is about.
    pub fn watcher(&self) -> &WatcherName {
        match self {
            WatcherEvent::Delivered { watcher, .. } => watcher,
            WatcherEvent::NoChange { watcher } => watcher,
            WatcherEvent::Failed { watcher, .. } => watcher,
            WatcherEvent::Recovered { watcher } => watcher,
            WatcherEvent::Suspended { watcher, .. } => watcher,
            WatcherEvent::Resumed { watcher } => watcher,
            WatcherEvent::Stopped { watcher } => watcher,
        }
    }

    /// Returns true for failures and suspensions.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            WatcherEvent::Failed { .. } | WatcherEvent::Suspended { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_watcher_and_is_error() {
        let name = WatcherName::from("issues");

        let event = WatcherEvent::Delivered {
            watcher: name.clone(),
            batches: 1,
            items: 3,
        };
        assert_eq!(event.watcher(), &name);
        assert!(!event.is_error());

        let event = WatcherEvent::Failed {
            watcher: name.clone(),
            error: "503".to_string(),
            attempt: 1,
            retry_at: Utc::now(),
        };
        assert!(event.is_error());

        let event = WatcherEvent::Suspended {
            watcher: name.clone(),
            reason: "fatal".to_string(),
        };
        assert_eq!(event.watcher(), &name);
        assert!(event.is_error());
    }
}
