//! Worker metrics sink.
//!
//! Injected into [`WorkerLoop`](crate::WorkerLoop) rather than kept as
//! process-wide counters, so several loops (or tests) can each own one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use taskrelay_core::task::TaskKind;

/// How a processed task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Done,
    Failed,
}

/// Receives worker activity.
pub trait WorkerMetrics: Send + Sync {
    fn task_finished(&self, kind: TaskKind, outcome: TaskOutcome, elapsed: Duration);

    /// A queue message that could not be decoded into a task. Counts as a
    /// failed task, since [`WorkerSummary`](crate::WorkerSummary) does.
    fn message_rejected(&self);

    fn dequeue_failed(&self);
}

/// Point-in-time copy of [`LogMetrics`] counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub processed: u64,
    pub failed: u64,
    pub rejected: u64,
    pub dequeue_failures: u64,
}

/// Counts activity and logs a progress line every `log_every` tasks.
#[derive(Debug)]
pub struct LogMetrics {
    processed: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    dequeue_failures: AtomicU64,
    log_every: u64,
}

/// Default progress logging cadence.
const DEFAULT_LOG_EVERY: u64 = 10;

impl LogMetrics {
    pub fn new(log_every: u64) -> Self {
        Self {
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            dequeue_failures: AtomicU64::new(0),
            log_every: log_every.max(1),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            dequeue_failures: self.dequeue_failures.load(Ordering::Relaxed),
        }
    }

    fn count(&self, outcome: TaskOutcome) {
        let processed = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if outcome == TaskOutcome::Failed {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }

        if processed % self.log_every == 0 {
            tracing::info!(
                processed,
                failed = self.failed.load(Ordering::Relaxed),
                "Processed {processed} tasks",
            );
        }
    }
}

impl Default for LogMetrics {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_EVERY)
    }
}

impl WorkerMetrics for LogMetrics {
    fn task_finished(&self, kind: TaskKind, outcome: TaskOutcome, elapsed: Duration) {
        tracing::debug!(
            task_kind = %kind,
            ?outcome,
            elapsed_ms = elapsed.as_millis() as u64,
            "Task finished",
        );
        self.count(outcome);
    }

    fn message_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        self.count(TaskOutcome::Failed);
    }

    fn dequeue_failed(&self) {
        self.dequeue_failures.fetch_add(1, Ordering::Relaxed);
    }
}
