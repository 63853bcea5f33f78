//! Application state shared across handlers.

use std::sync::Arc;

use herald_runtime::SchedulerHandle;

use crate::config::ApiConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: Arc<ApiConfig>,
    /// Handle to the running scheduler.
    pub scheduler: SchedulerHandle,
}

impl AppState {
    /// Creates the state from a config and a scheduler handle.
    pub fn new(config: ApiConfig, scheduler: SchedulerHandle) -> Self {
        Self {
            config: Arc::new(config),
            scheduler,
        }
    }
}
