//! Response types for the API.

use serde::Serialize;

use herald_runtime::WatcherState;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status: `ok`, or `degraded` when a watcher is suspended.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
    /// Registered watchers.
    pub watchers: usize,
    /// Watchers waiting for an operator.
    pub suspended: usize,
}

/// Watcher list response.
#[derive(Debug, Clone, Serialize)]
pub struct WatcherListResponse {
    pub watchers: Vec<WatcherState>,
    pub total: usize,
}

/// Generic success response.
#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}
