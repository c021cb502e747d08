//! Client-side result polling.
//!
//! [`PollPolicy::next_step`] holds the whole retry decision as a pure
//! function; [`poll`] is a thin async driver around it that works against
//! any [`ResultSource`] (direct store access, HTTP, a test double).
//!
//! A [`PollError::ClientTimeout`] only means this poller gave up. The task
//! may still be queued, running, or already recorded.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::{ResultRecord, ResultStatus};
use crate::types::TaskId;

/// Default delay between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default number of fetches before giving up (10 s at the default interval).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

/// Anything that can report the current [`ResultRecord`] for a task.
///
/// Implementations must map "nothing stored" to [`ResultRecord::pending`].
#[async_trait]
pub trait ResultSource: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn fetch(&self, id: &TaskId) -> Result<ResultRecord, Self::Error>;
}

/// Interval and attempt budget for one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// What the driver should do after an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    /// Terminal state observed; return it.
    Finish,
    /// Still pending; wait and fetch again.
    Retry(Duration),
    /// Still pending and the budget is spent.
    GiveUp,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Decide the next step after the `attempt`-th fetch (1-based)
    /// observed `status`.
    pub fn next_step(&self, attempt: u32, status: ResultStatus) -> PollStep {
        if status.is_terminal() {
            PollStep::Finish
        } else if attempt >= self.max_attempts {
            PollStep::GiveUp
        } else {
            PollStep::Retry(self.interval)
        }
    }
}

/// Errors returned by [`poll`].
#[derive(Debug, thiserror::Error)]
pub enum PollError<E: std::error::Error + 'static> {
    /// The attempt budget ran out while the task was still pending.
    #[error("Gave up waiting for task {id} after {attempts} attempts")]
    ClientTimeout { id: TaskId, attempts: u32 },

    /// The source failed; polling stops at the first failure.
    #[error("Failed to fetch result: {0}")]
    Source(#[source] E),
}

/// Poll `source` until the task reaches a terminal state or `policy` is
/// exhausted.
///
/// A policy with `max_attempts == 0` still performs one fetch.
pub async fn poll<S>(
    source: &S,
    id: &TaskId,
    policy: &PollPolicy,
) -> Result<ResultRecord, PollError<S::Error>>
where
    S: ResultSource + ?Sized,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let record = source.fetch(id).await.map_err(PollError::Source)?;

        match policy.next_step(attempt, record.status()) {
            PollStep::Finish => return Ok(record),
            PollStep::GiveUp => {
                tracing::debug!(task_id = %id, attempts = attempt, "Poll budget exhausted");
                return Err(PollError::ClientTimeout {
                    id: *id,
                    attempts: attempt,
                });
            }
            PollStep::Retry(delay) => tokio::time::sleep(delay).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
