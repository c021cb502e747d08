//! Task execution.
//!
//! [`TaskExecutor`] is the seam between the worker loop and the business
//! functions. [`StandardExecutor`] applies the slow echo delay and then
//! [`TaskKind::transform`].

use std::time::Duration;

use async_trait::async_trait;
use taskrelay_core::error::CoreError;
use taskrelay_core::task::TaskKind;

/// Default artificial delay for [`TaskKind::SlowEcho`].
pub const DEFAULT_SLOW_ECHO_DELAY: Duration = Duration::from_secs(1);

/// Runs the business function for one task.
///
/// An `Err` (expected to be [`CoreError::Execution`]) becomes a terminal
/// error result for that task; it never stops the loop.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, kind: TaskKind, payload: &str) -> Result<String, CoreError>;
}

/// The production executor.
#[derive(Debug, Clone)]
pub struct StandardExecutor {
    slow_echo_delay: Duration,
}

impl StandardExecutor {
    pub fn new(slow_echo_delay: Duration) -> Self {
        Self { slow_echo_delay }
    }

    pub fn slow_echo_delay(&self) -> Duration {
        self.slow_echo_delay
    }
}

impl Default for StandardExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_SLOW_ECHO_DELAY)
    }
}

#[async_trait]
impl TaskExecutor for StandardExecutor {
    async fn execute(&self, kind: TaskKind, payload: &str) -> Result<String, CoreError> {
        if kind.is_slow() {
            tokio::time::sleep(self.slow_echo_delay).await;
        }
        Ok(kind.transform(payload))
    }
}
