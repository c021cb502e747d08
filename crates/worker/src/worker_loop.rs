//! The worker loop: dequeue, execute, record.
//!
//! One [`WorkerLoop`] processes one task at a time. Run several loops (each
//! with its own store connection) for concurrency. Task failures become
//! terminal `error` results and never stop the loop; only a failure to
//! record a result is fatal.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use taskrelay_core::error::CoreError;
use taskrelay_core::result::ResultRecord;
use taskrelay_core::task::TaskRecord;
use taskrelay_core::trace::{LogTracer, SpanStatus, TaskSpanAttributes, TaskTracer};
use taskrelay_core::types::TaskId;
use taskrelay_store::{ResultWriter, TaskQueue, WriteOutcome};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::WorkerError;
use crate::executor::TaskExecutor;
use crate::metrics::{LogMetrics, TaskOutcome, WorkerMetrics};

/// Name of the span opened around each task.
pub const TASK_SPAN_NAME: &str = "process_task";

/// Lifecycle of a worker loop.
///
/// `Idle -> Dequeuing -> (Idle | Processing) -> Recording -> Idle`, and
/// `Terminated` once the loop returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Dequeuing,
    Processing,
    Recording,
    Terminated,
}

/// Timing knobs for [`WorkerLoop`].
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Longest a single dequeue blocks; bounds shutdown latency.
    pub dequeue_timeout: Duration,
    /// Upper bound on one result write. Exceeding it is fatal.
    pub result_write_timeout: Duration,
    /// Pause after a failed dequeue before trying again.
    pub dequeue_retry_delay: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            dequeue_timeout: Duration::from_secs(1),
            result_write_timeout: Duration::from_secs(5),
            dequeue_retry_delay: Duration::from_secs(1),
        }
    }
}

/// Counts reported when a loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub processed: u64,
    pub failed: u64,
}

pub struct WorkerLoop {
    queue: Arc<dyn TaskQueue>,
    writer: ResultWriter,
    executor: Arc<dyn TaskExecutor>,
    tracer: Arc<dyn TaskTracer>,
    metrics: Arc<dyn WorkerMetrics>,
    settings: WorkerSettings,
    state: watch::Sender<WorkerState>,
}

impl WorkerLoop {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        writer: ResultWriter,
        executor: Arc<dyn TaskExecutor>,
    ) -> Self {
        let (state, _) = watch::channel(WorkerState::Idle);
        Self {
            queue,
            writer,
            executor,
            tracer: Arc::new(LogTracer::new("worker")),
            metrics: Arc::new(LogMetrics::default()),
            settings: WorkerSettings::default(),
            state,
        }
    }

    pub fn with_tracer(mut self, tracer: Arc<dyn TaskTracer>) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn WorkerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_settings(mut self, settings: WorkerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Watch the loop's state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: WorkerState) {
        self.state.send_replace(state);
    }

    /// Run until `cancel` fires or a result cannot be recorded.
    ///
    /// Cancellation is observed between tasks and between dequeue attempts.
    /// A dequeue in flight is never abandoned, since a message it popped
    /// would otherwise be lost.
    pub async fn run(&self, cancel: CancellationToken) -> Result<WorkerSummary, WorkerError> {
        tracing::info!(
            dequeue_timeout_ms = self.settings.dequeue_timeout.as_millis() as u64,
            result_ttl_secs = self.writer.ttl().as_secs(),
            "Worker loop started",
        );

        let outcome = self.run_inner(&cancel).await;
        self.set_state(WorkerState::Terminated);

        match &outcome {
            Ok(summary) => tracing::info!(
                processed = summary.processed,
                failed = summary.failed,
                "Worker loop stopped",
            ),
            Err(e) => tracing::error!(error = %e, "Worker loop aborted"),
        }
        outcome
    }

    async fn run_inner(&self, cancel: &CancellationToken) -> Result<WorkerSummary, WorkerError> {
        let mut summary = WorkerSummary::default();

        while !cancel.is_cancelled() {
            self.set_state(WorkerState::Dequeuing);
            let message = match self.queue.dequeue(self.settings.dequeue_timeout).await {
                Ok(Some(message)) => message,
                Ok(None) => {
                    self.set_state(WorkerState::Idle);
                    continue;
                }
                Err(e) => {
                    self.set_state(WorkerState::Idle);
                    self.metrics.dequeue_failed();
                    tracing::warn!(
                        error = %e,
                        retry_in_ms = self.settings.dequeue_retry_delay.as_millis() as u64,
                        "Dequeue failed",
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.settings.dequeue_retry_delay) => continue,
                    }
                }
            };

            match self.handle_message(&message).await? {
                TaskOutcome::Done => summary.processed += 1,
                TaskOutcome::Failed => {
                    summary.processed += 1;
                    summary.failed += 1;
                }
            }
            self.set_state(WorkerState::Idle);
        }

        Ok(summary)
    }

    /// Process one raw queue message through to a recorded result.
    async fn handle_message(&self, message: &str) -> Result<TaskOutcome, WorkerError> {
        self.set_state(WorkerState::Processing);

        let record = match TaskRecord::decode(message) {
            Ok(record) => record,
            Err(undecodable) => {
                let Some(id) = undecodable.id else {
                    // Nothing to attach a result to.
                    tracing::error!(error = %undecodable, "Dropping undecodable queue message");
                    self.metrics.message_rejected();
                    return Ok(TaskOutcome::Failed);
                };
                tracing::warn!(task_id = %id, error = %undecodable, "Rejecting queue message");
                let result = ResultRecord::error(id, undecodable.reason);
                self.store_result(&result).await?;
                self.metrics.message_rejected();
                return Ok(TaskOutcome::Failed);
            }
        };

        let started = Instant::now();
        let parent = record.correlation.parsed_trace_parent();
        let span = self.tracer.start_span(
            TASK_SPAN_NAME,
            parent.as_ref(),
            TaskSpanAttributes {
                task_kind: record.kind,
                task_id: record.id,
                request_id: record.correlation.request_id.clone(),
            },
        );

        let execution = AssertUnwindSafe(self.executor.execute(record.kind, &record.payload))
            .catch_unwind()
            .instrument(span.tracing_span().clone())
            .await
            .unwrap_or_else(|_| Err(CoreError::Execution("task panicked".to_string())));

        let (result, outcome, status) = match execution {
            Ok(output) => (
                ResultRecord::done(record.id, output),
                TaskOutcome::Done,
                SpanStatus::Ok,
            ),
            Err(e) => {
                let message = failure_message(e);
                tracing::warn!(
                    parent: span.tracing_span(),
                    task_id = %record.id,
                    task_kind = %record.kind,
                    error = %message,
                    "Task failed",
                );
                (
                    ResultRecord::error(record.id, message.clone()),
                    TaskOutcome::Failed,
                    SpanStatus::Error(message),
                )
            }
        };

        let stored = self
            .store_result(&result)
            .instrument(span.tracing_span().clone())
            .await;
        self.tracer.end_span(
            span,
            match &stored {
                Ok(()) => status,
                Err(e) => SpanStatus::Error(e.to_string()),
            },
        );
        stored?;

        self.metrics.task_finished(record.kind, outcome, started.elapsed());
        Ok(outcome)
    }

    async fn store_result(&self, result: &ResultRecord) -> Result<(), WorkerError> {
        self.set_state(WorkerState::Recording);
        let id = result.id;

        let limit = self.settings.result_write_timeout;
        let written = tokio::time::timeout(limit, self.writer.record(result))
            .await
            .map_err(|_| {
                store_failure(id, format!("write timed out after {} ms", limit.as_millis()))
            })?
            .map_err(|e| store_failure(id, e.to_string()))?;

        match written {
            WriteOutcome::Written => {
                tracing::info!(task_id = %id, status = ?result.status(), "Result recorded");
            }
            WriteOutcome::AlreadyExists => {
                tracing::warn!(task_id = %id, "Result already recorded; keeping the existing one");
            }
        }
        Ok(())
    }
}

fn store_failure(task_id: TaskId, message: String) -> WorkerError {
    WorkerError::ResultStoreUnavailable { task_id, message }
}

/// Error text stored for a failed task.
fn failure_message(error: CoreError) -> String {
    match error {
        CoreError::Execution(message) => message,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_message_unwraps_execution_errors() {
        assert_eq!(failure_message(CoreError::Execution("boom".into())), "boom");
        assert_eq!(
            failure_message(CoreError::Validation("bad".into())),
            "Validation failed: bad"
        );
    }

    #[test]
    fn default_settings() {
        let settings = WorkerSettings::default();
        assert_eq!(settings.dequeue_timeout, Duration::from_secs(1));
        assert_eq!(settings.result_write_timeout, Duration::from_secs(5));
    }
}
