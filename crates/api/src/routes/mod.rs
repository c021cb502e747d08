pub mod health;
pub mod metrics;
pub mod results;
pub mod tasks;

use axum::Router;

use crate::state::AppState;

/// Build the complete route tree.
///
/// ```text
/// GET  /health              service + store health
/// GET  /metrics/live        current queue depth
///
/// POST /task1               submit reverse
/// POST /task2               submit uppercase
/// POST /task3               submit slow echo
///
/// GET  /result/{task_id}    poll a task's result
/// ```
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(metrics::router())
        .merge(tasks::router())
        .merge(results::router())
}
