use axum::routing::get;
use axum::Router;

use crate::handlers::results;
use crate::state::AppState;

/// ```text
/// GET /result/{task_id}    -> get_result
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/result/{task_id}", get(results::get_result))
}
