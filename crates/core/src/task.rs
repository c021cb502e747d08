//! Task kinds, their pure transformations, and the queued task record.
//!
//! The transformations are plain functions with no side effects; the
//! artificial delay of [`TaskKind::SlowEcho`] is applied by the worker's
//! executor, not here.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::correlation::CorrelationContext;
use crate::error::CoreError;
use crate::types::{TaskId, Timestamp};

/// Default upper bound on payload length accepted at the HTTP boundary.
pub const DEFAULT_MAX_PAYLOAD_CHARS: usize = 10_000;

/// Prefix prepended by the slow echo transformation.
pub const SLOW_ECHO_PREFIX: &str = "processed:";

// ---------------------------------------------------------------------------
// TaskKind
// ---------------------------------------------------------------------------

/// The closed set of task kinds the system can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    #[serde(rename = "reverse")]
    Reverse,
    #[serde(rename = "uppercase")]
    Uppercase,
    #[serde(rename = "slow")]
    SlowEcho,
}

impl TaskKind {
    pub const ALL: [TaskKind; 3] = [TaskKind::Reverse, TaskKind::Uppercase, TaskKind::SlowEcho];

    /// Name used in queue messages and span attributes.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Reverse => "reverse",
            TaskKind::Uppercase => "uppercase",
            TaskKind::SlowEcho => "slow",
        }
    }

    /// HTTP route that submits tasks of this kind.
    pub fn route_path(self) -> &'static str {
        match self {
            TaskKind::Reverse => "/task1",
            TaskKind::Uppercase => "/task2",
            TaskKind::SlowEcho => "/task3",
        }
    }

    /// Whether the executor must apply an artificial delay before the
    /// transformation.
    pub fn is_slow(self) -> bool {
        matches!(self, TaskKind::SlowEcho)
    }

    /// Apply this kind's pure transformation.
    pub fn transform(self, input: &str) -> String {
        match self {
            TaskKind::Reverse => reverse_text(input),
            TaskKind::Uppercase => uppercase_text(input),
            TaskKind::SlowEcho => slow_echo_text(input),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reverse" => Ok(TaskKind::Reverse),
            "uppercase" => Ok(TaskKind::Uppercase),
            "slow" => Ok(TaskKind::SlowEcho),
            other => Err(CoreError::Malformed(format!("Unknown task kind: {other:?}"))),
        }
    }
}

/// Reverse the character order of `text`.
pub fn reverse_text(text: &str) -> String {
    text.chars().rev().collect()
}

/// Map `text` to uppercase.
pub fn uppercase_text(text: &str) -> String {
    text.to_uppercase()
}

/// Prefix `text` with [`SLOW_ECHO_PREFIX`].
pub fn slow_echo_text(text: &str) -> String {
    format!("{SLOW_ECHO_PREFIX}{text}")
}

/// Boundary check for submitted payloads.
///
/// Rules:
/// - Must contain at least one non-whitespace character.
/// - Must not exceed `max_chars` characters.
pub fn validate_payload(payload: &str, max_chars: usize) -> Result<(), CoreError> {
    if payload.trim().is_empty() {
        return Err(CoreError::Validation(
            "Payload cannot be empty".to_string(),
        ));
    }
    if payload.chars().count() > max_chars {
        return Err(CoreError::Validation(format!(
            "Payload must not exceed {max_chars} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// TaskRecord
// ---------------------------------------------------------------------------

/// One unit of work as placed on the queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub kind: TaskKind,
    #[serde(rename = "data")]
    pub payload: String,
    pub correlation: CorrelationContext,
    pub enqueued_at: Timestamp,
}

/// A queue message that could not be turned into a [`TaskRecord`].
///
/// `id` is set when the message carried a readable identifier, so the
/// worker can still record a terminal error for it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{reason}")]
pub struct UndecodableTask {
    pub id: Option<TaskId>,
    pub reason: String,
}

/// Loose shape used for decoding so that a bad `kind` does not hide the id.
#[derive(Deserialize)]
struct RawTaskMessage {
    id: Option<String>,
    kind: Option<String>,
    data: Option<String>,
    #[serde(default)]
    correlation: CorrelationContext,
    enqueued_at: Option<Timestamp>,
}

impl TaskRecord {
    /// Build a new record with a freshly generated id.
    pub fn new(kind: TaskKind, payload: impl Into<String>, correlation: CorrelationContext) -> Self {
        Self {
            id: TaskId::generate(),
            kind,
            payload: payload.into(),
            correlation,
            enqueued_at: Utc::now(),
        }
    }

    /// Encode as the JSON queue message.
    pub fn encode(&self) -> Result<String, CoreError> {
        serde_json::to_string(self).map_err(|e| CoreError::Malformed(e.to_string()))
    }

    /// Decode a JSON queue message.
    pub fn decode(message: &str) -> Result<Self, UndecodableTask> {
        let raw: RawTaskMessage = serde_json::from_str(message).map_err(|e| UndecodableTask {
            id: None,
            reason: format!("Invalid queue message: {e}"),
        })?;

        let id = raw
            .id
            .as_deref()
            .and_then(|s| s.parse::<TaskId>().ok())
            .ok_or_else(|| UndecodableTask {
                id: None,
                reason: "Queue message has no valid id".to_string(),
            })?;

        let kind = match raw.kind.as_deref() {
            Some(kind) => kind.parse::<TaskKind>().map_err(|e| UndecodableTask {
                id: Some(id),
                reason: e.to_string(),
            })?,
            None => {
                return Err(UndecodableTask {
                    id: Some(id),
                    reason: "Queue message has no task kind".to_string(),
                })
            }
        };

        let payload = raw.data.ok_or_else(|| UndecodableTask {
            id: Some(id),
            reason: "Queue message has no payload".to_string(),
        })?;

        Ok(Self {
            id,
            kind,
            payload,
            correlation: raw.correlation,
            enqueued_at: raw.enqueued_at.unwrap_or_else(Utc::now),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
