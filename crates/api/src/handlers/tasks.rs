//! Handlers for task submission.
//!
//! The request body is the payload. A JSON body must be a JSON string; any
//! other content type is taken as raw UTF-8 text. The response is returned
//! as soon as the task is queued.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use taskrelay_core::correlation::{CorrelationContext, REQUEST_ID_HEADER, TRACEPARENT_HEADER};
use taskrelay_core::task::{validate_payload, TaskKind};
use taskrelay_core::types::TaskId;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Body of a `202 Accepted` submission response.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub task_id: TaskId,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Extract the payload from the request body.
fn decode_payload(headers: &HeaderMap, body: &[u8]) -> Result<String, AppError> {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().starts_with("application/json"));

    if is_json {
        serde_json::from_slice::<String>(body)
            .map_err(|e| AppError::BadRequest(format!("JSON body must be a string: {e}")))
    } else {
        String::from_utf8(body.to_vec())
            .map_err(|_| AppError::BadRequest("Body must be valid UTF-8".to_string()))
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Correlation carried from the inbound request into the task record.
fn correlation_from(headers: &HeaderMap) -> CorrelationContext {
    CorrelationContext::new(
        header_value(headers, TRACEPARENT_HEADER),
        header_value(headers, REQUEST_ID_HEADER),
    )
}

async fn submit(
    kind: TaskKind,
    state: AppState,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let payload = decode_payload(&headers, &body)?;
    validate_payload(&payload, state.config.max_payload_chars)?;

    let task_id = state
        .submitter
        .submit(kind, payload, correlation_from(&headers))
        .await?;

    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { task_id })))
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// POST /task1
pub async fn submit_reverse(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    submit(TaskKind::Reverse, state, headers, body).await
}

/// POST /task2
pub async fn submit_uppercase(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    submit(TaskKind::Uppercase, state, headers, body).await
}

/// POST /task3
pub async fn submit_slow_echo(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    submit(TaskKind::SlowEcho, state, headers, body).await
}
