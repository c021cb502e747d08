//! Submission routes, one per task kind.

use axum::routing::post;
use axum::Router;
use taskrelay_core::task::TaskKind;

use crate::handlers::tasks;
use crate::state::AppState;

/// ```text
/// POST /task1    -> submit_reverse
/// POST /task2    -> submit_uppercase
/// POST /task3    -> submit_slow_echo
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(TaskKind::Reverse.route_path(), post(tasks::submit_reverse))
        .route(TaskKind::Uppercase.route_path(), post(tasks::submit_uppercase))
        .route(TaskKind::SlowEcho.route_path(), post(tasks::submit_slow_echo))
}
