//! Typed access to task outcomes in a [`ResultStore`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use taskrelay_core::error::CoreError;
use taskrelay_core::poll::ResultSource;
use taskrelay_core::result::ResultRecord;
use taskrelay_core::types::TaskId;

use crate::{ResultStore, WriteOutcome};

/// Default retention for stored results.
pub const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(3600);

/// Store key holding the result for `id` (backends may add a prefix).
pub fn result_key(id: &TaskId) -> String {
    format!("result:{id}")
}

// ---------------------------------------------------------------------------
// ResultReader
// ---------------------------------------------------------------------------

/// Reads results, treating a missing key as `Pending`.
#[derive(Clone)]
pub struct ResultReader {
    store: Arc<dyn ResultStore>,
}

impl ResultReader {
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        Self { store }
    }

    pub async fn fetch(&self, id: &TaskId) -> Result<ResultRecord, CoreError> {
        let value = self
            .store
            .get(&result_key(id))
            .await
            .map_err(|e| CoreError::ResultStoreUnavailable(e.to_string()))?;

        match value {
            None => Ok(ResultRecord::pending(*id)),
            Some(value) => ResultRecord::decode(&value),
        }
    }

    /// Reachability of the underlying store.
    pub async fn is_healthy(&self) -> bool {
        self.store.ping().await.is_ok()
    }
}

#[async_trait]
impl ResultSource for ResultReader {
    type Error = CoreError;

    async fn fetch(&self, id: &TaskId) -> Result<ResultRecord, Self::Error> {
        ResultReader::fetch(self, id).await
    }
}

// ---------------------------------------------------------------------------
// ResultWriter
// ---------------------------------------------------------------------------

/// Writes terminal results with a retention TTL.
#[derive(Clone)]
pub struct ResultWriter {
    store: Arc<dyn ResultStore>,
    ttl: Duration,
}

impl ResultWriter {
    pub fn new(store: Arc<dyn ResultStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Write a terminal record.
    ///
    /// Returns [`WriteOutcome::AlreadyExists`] if a result was recorded
    /// earlier; the stored record is left as it was.
    pub async fn record(&self, record: &ResultRecord) -> Result<WriteOutcome, CoreError> {
        if !record.is_terminal() {
            return Err(CoreError::Validation(format!(
                "Refusing to store non-terminal result for task {}",
                record.id
            )));
        }

        let value = record.encode()?;
        self.store
            .set(&result_key(&record.id), value, self.ttl)
            .await
            .map_err(|e| CoreError::ResultStoreUnavailable(e.to_string()))
    }
}
