use axum::extract::{Path, State};
use axum::Json;
use taskrelay_core::result::ResultRecord;
use taskrelay_core::types::TaskId;

use crate::error::AppResult;
use crate::state::AppState;

/// GET /result/{task_id}
///
/// Returns the stored record, or `pending` when nothing has been recorded
/// yet (including ids that were never submitted or whose result expired).
pub async fn get_result(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<Json<ResultRecord>> {
    let id: TaskId = task_id.parse()?;
    let record = state.results.fetch(&id).await?;

    tracing::debug!(task_id = %id, status = ?record.status(), "Result fetched");

    Ok(Json(record))
}
