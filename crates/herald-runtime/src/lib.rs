//! Watch runtime for Herald.
//!
//! This crate turns configured watchers into running background tasks:
//! - `aggregator` - splits a tick's items into size-bounded batches
//! - `BackoffController` - failure classification, exponential delay, alerting
//! - `Watcher` - one fetch/deliver/commit cycle against a checkpoint
//! - `Scheduler` - one task per watcher, graceful start and stop
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use herald_runtime::Scheduler;
//! use herald_persistence::JsonCheckpointStore;
//! use herald_notify::LogNotifier;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let notifier = Arc::new(LogNotifier::new());
//!     let store = Arc::new(JsonCheckpointStore::new("/tmp/herald/checkpoints"));
//!     let mut scheduler = Scheduler::new(store, notifier.clone(), notifier);
//!
//!     scheduler.register(config, adapter).await?;
//!
//!     let mut events = scheduler.subscribe();
//!     scheduler.start().await?;
//!
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     tokio::signal::ctrl_c().await?;
//!     scheduler.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Key Concepts
//!
//! ## Ticks
//!
//! A tick fetches everything newer than the checkpoint, drops items already
//! covered by it, sorts the rest, and delivers them batch by batch. The
//! checkpoint is persisted after every delivered batch, so a failure only
//! ever re-sends the undelivered tail.
//!
//! ## Episodes
//!
//! Consecutive failed ticks form an episode. The operator is alerted once
//! when an episode starts and once more if the watcher gets suspended.
//!
//! ## Shutdown
//!
//! `Scheduler::stop` interrupts sleeps immediately but lets a tick that is
//! already delivering finish its current batch and persist its checkpoint.

pub mod aggregator;
pub mod backoff;
pub mod clock;
pub mod error;
pub mod event;
pub mod runner;
pub mod scheduler;
pub mod state;
pub mod watcher;

pub use backoff::{BackoffController, BackoffState, FailureAction, FailureKind};
pub use clock::{Clock, SystemClock, TokioClock};
pub use error::{Result, RuntimeError};
pub use event::WatcherEvent;
pub use scheduler::{Scheduler, SchedulerHandle};
pub use state::{WatcherState, WatcherStatus};
pub use watcher::{TickFailure, TickResult, Watcher};
