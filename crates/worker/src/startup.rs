//! Waiting for the store at process start.
//!
//! The store may come up after the worker (e.g. in a compose stack), so the
//! first connection is retried with a linear back-off.

use std::future::Future;
use std::time::Duration;

use taskrelay_store::StoreError;

use crate::error::WorkerError;

/// Delay added per failed attempt.
const CONNECT_STEP: Duration = Duration::from_millis(500);

/// Upper bound on the delay between attempts.
const MAX_CONNECT_DELAY: Duration = Duration::from_secs(5);

/// Delay to wait after failed attempt number `attempt` (1-based).
pub fn connect_delay(attempt: u32) -> Duration {
    CONNECT_STEP.saturating_mul(attempt).min(MAX_CONNECT_DELAY)
}

/// Call `connect` until it succeeds or `max_attempts` attempts have failed.
pub async fn wait_for_store<T, F, Fut>(max_attempts: u32, mut connect: F) -> Result<T, WorkerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match connect().await {
            Ok(value) => {
                tracing::info!(attempt, "Store connection established");
                return Ok(value);
            }
            Err(e) if attempt >= max_attempts => {
                return Err(WorkerError::StoreConnect {
                    attempts: attempt,
                    message: e.to_string(),
                });
            }
            Err(e) => {
                let delay = connect_delay(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Store not ready, retrying",
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use assert_matches::assert_matches;
    use tokio::time::Instant;

    use super::*;

    #[test]
    fn delay_grows_linearly_then_caps() {
        assert_eq!(connect_delay(1), Duration::from_millis(500));
        assert_eq!(connect_delay(4), Duration::from_secs(2));
        assert_eq!(connect_delay(10), Duration::from_secs(5));
        assert_eq!(connect_delay(100), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let value = wait_for_store(5, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(StoreError::Unavailable("refused".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 3);
        // 0.5 s after attempt 1, 1 s after attempt 2.
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = wait_for_store(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::Unavailable("refused".into())) }
        })
        .await;

        assert_matches!(result, Err(WorkerError::StoreConnect { attempts: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
