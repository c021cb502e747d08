//! Task outcomes as written by the worker and read by pollers.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{TaskId, Timestamp};

/// Coarse status of a task as observed through the result store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Pending,
    Done,
    Error,
}

impl ResultStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ResultStatus::Pending)
    }
}

/// Status-specific fields of a [`ResultRecord`].
///
/// Modelled as an enum so that `result` exists only for `Done`, `error`
/// only for `Error`, and `completed_at` only for terminal states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResultOutcome {
    Pending,
    Done {
        result: String,
        completed_at: Timestamp,
    },
    Error {
        error: String,
        completed_at: Timestamp,
    },
}

/// The outcome of one task, keyed by its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: TaskId,
    #[serde(flatten)]
    pub outcome: ResultOutcome,
}

impl ResultRecord {
    /// The implicit record for a task with nothing stored yet.
    pub fn pending(id: TaskId) -> Self {
        Self {
            id,
            outcome: ResultOutcome::Pending,
        }
    }

    pub fn done(id: TaskId, result: impl Into<String>) -> Self {
        Self {
            id,
            outcome: ResultOutcome::Done {
                result: result.into(),
                completed_at: Utc::now(),
            },
        }
    }

    pub fn error(id: TaskId, error: impl Into<String>) -> Self {
        Self {
            id,
            outcome: ResultOutcome::Error {
                error: error.into(),
                completed_at: Utc::now(),
            },
        }
    }

    pub fn status(&self) -> ResultStatus {
        match self.outcome {
            ResultOutcome::Pending => ResultStatus::Pending,
            ResultOutcome::Done { .. } => ResultStatus::Done,
            ResultOutcome::Error { .. } => ResultStatus::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn result(&self) -> Option<&str> {
        match &self.outcome {
            ResultOutcome::Done { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            ResultOutcome::Error { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn completed_at(&self) -> Option<Timestamp> {
        match &self.outcome {
            ResultOutcome::Pending => None,
            ResultOutcome::Done { completed_at, .. } | ResultOutcome::Error { completed_at, .. } => {
                Some(*completed_at)
            }
        }
    }

    /// Encode for storage.
    pub fn encode(&self) -> Result<String, CoreError> {
        serde_json::to_string(self).map_err(|e| CoreError::Malformed(e.to_string()))
    }

    /// Decode a stored value.
    pub fn decode(value: &str) -> Result<Self, CoreError> {
        serde_json::from_str(value).map_err(|e| CoreError::Malformed(e.to_string()))
    }
}
