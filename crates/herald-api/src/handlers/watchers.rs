//! Watcher handlers.

use axum::{
    extract::{Path, State},
    Json,
};

use herald_models::WatcherName;
use herald_runtime::WatcherState;

use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::types::{SuccessResponse, WatcherListResponse};

fn parse_name(raw: &str) -> Result<WatcherName> {
    WatcherName::parse(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// GET /api/watchers - List all watchers.
pub async fn list_watchers(State(state): State<AppState>) -> Json<WatcherListResponse> {
    let watchers = state.scheduler.snapshots().await;
    let total = watchers.len();
    Json(WatcherListResponse { watchers, total })
}

/// GET /api/watchers/:name - Get one watcher.
pub async fn get_watcher(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<WatcherState>> {
    let name = parse_name(&name)?;
    state
        .scheduler
        .snapshot(&name)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("watcher not found: {}", name)))
}

/// POST /api/watchers/:name/resume - Lift a suspension.
pub async fn resume_watcher(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SuccessResponse>> {
    let name = parse_name(&name)?;
    state.scheduler.resume(&name).await?;
    Ok(Json(SuccessResponse {
        message: format!("watcher {} resumed", name),
    }))
}
