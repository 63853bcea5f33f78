//! Health check handler.

use axum::{extract::State, Json};

use crate::state::AppState;
use crate::types::HealthResponse;

/// GET /api/health - Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshots = state.scheduler.snapshots().await;
    let suspended = snapshots.iter().filter(|s| s.is_suspended()).count();

    Json(HealthResponse {
        status: if suspended == 0 { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.config.uptime_seconds(),
        watchers: snapshots.len(),
        suspended,
    })
}
