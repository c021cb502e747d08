//! Task submission: build a [`TaskRecord`] and append it to the queue.

use std::sync::Arc;

use taskrelay_core::correlation::CorrelationContext;
use taskrelay_core::error::CoreError;
use taskrelay_core::task::{TaskKind, TaskRecord};
use taskrelay_core::types::TaskId;

use crate::TaskQueue;

/// Enqueues tasks and hands back their ids without waiting for execution.
///
/// Stateless apart from the shared queue handle, so one instance can serve
/// any number of concurrent requests.
#[derive(Clone)]
pub struct TaskSubmitter {
    queue: Arc<dyn TaskQueue>,
}

impl TaskSubmitter {
    pub fn new(queue: Arc<dyn TaskQueue>) -> Self {
        Self { queue }
    }

    /// Submit one task.
    ///
    /// The payload is passed through untouched. On queue failure nothing is
    /// written anywhere and [`CoreError::QueueUnavailable`] is returned.
    pub async fn submit(
        &self,
        kind: TaskKind,
        payload: impl Into<String>,
        correlation: CorrelationContext,
    ) -> Result<TaskId, CoreError> {
        let record = TaskRecord::new(kind, payload, correlation);
        let message = record.encode()?;

        self.queue.enqueue(message).await.map_err(|e| {
            tracing::warn!(task_kind = %kind, error = %e, "Failed to enqueue task");
            CoreError::QueueUnavailable(e.to_string())
        })?;

        tracing::info!(
            task_id = %record.id,
            task_kind = %kind,
            payload_len = record.payload.len(),
            has_trace_parent = record.correlation.trace_parent.is_some(),
            "Task enqueued",
        );

        Ok(record.id)
    }
}
