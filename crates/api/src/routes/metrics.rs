use axum::routing::get;
use axum::Router;

use crate::handlers::metrics;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/metrics/live", get(metrics::live_metrics))
}
