use axum::extract::State;
use axum::Json;
use serde::Serialize;
use taskrelay_core::error::CoreError;
use taskrelay_core::types::Timestamp;

use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LiveMetricsResponse {
    pub timestamp: Timestamp,
    pub metrics: LiveMetrics,
}

#[derive(Debug, Serialize)]
pub struct LiveMetrics {
    /// Tasks waiting to be picked up.
    pub task_queue_depth: u64,
    pub status: &'static str,
}

/// GET /metrics/live
pub async fn live_metrics(State(state): State<AppState>) -> AppResult<Json<LiveMetricsResponse>> {
    let depth = state
        .queue
        .depth()
        .await
        .map_err(|e| CoreError::QueueUnavailable(e.to_string()))?;

    Ok(Json(LiveMetricsResponse {
        timestamp: chrono::Utc::now(),
        metrics: LiveMetrics {
            task_queue_depth: depth,
            status: "live",
        },
    }))
}
