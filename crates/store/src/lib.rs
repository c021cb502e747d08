//! Queue and result store access.
//!
//! The rest of the system touches shared state only through the two traits
//! defined here:
//!
//! - [`TaskQueue`]: `enqueue` / `dequeue(timeout)` over encoded task
//!   messages. A dequeued message is removed immediately; there is no
//!   acknowledgment and no redelivery.
//! - [`ResultStore`]: `get(key)` / `set(key, value, ttl)` where `set` only
//!   writes when the key is absent, which makes terminal results immutable.
//!
//! Backends: [`RedisStore`] for deployments and [`InMemoryStore`] for tests
//! and single-process setups. [`TaskSubmitter`], [`ResultReader`] and
//! [`ResultWriter`] layer the typed records from `taskrelay_core` on top.

use std::time::Duration;

use async_trait::async_trait;

pub mod error;
pub mod memory;
pub mod redis;
pub mod results;
pub mod submit;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use redis::RedisStore;
pub use results::{result_key, ResultReader, ResultWriter};
pub use submit::TaskSubmitter;

/// Default key prefix for all store keys.
pub const DEFAULT_KEY_PREFIX: &str = "taskrelay";

/// Outcome of a set-if-absent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// A value already exists for the key and was left untouched.
    AlreadyExists,
}

/// Ordered queue of pending task messages shared by producers and consumers.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Append `message` to the tail of the queue.
    async fn enqueue(&self, message: String) -> Result<(), StoreError>;

    /// Remove and return the head of the queue, waiting up to `timeout`
    /// for one to arrive. Each message is returned to exactly one caller.
    async fn dequeue(&self, timeout: Duration) -> Result<Option<String>, StoreError>;

    /// Number of messages waiting.
    async fn depth(&self) -> Result<u64, StoreError>;
}

/// Key-value store for task outcomes, with per-key expiry.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key` for `ttl`, unless the key already holds a
    /// value.
    async fn set(&self, key: &str, value: String, ttl: Duration)
        -> Result<WriteOutcome, StoreError>;

    /// Cheap reachability check.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Connect to Redis at `url`, namespacing keys under `prefix`.
pub async fn connect(url: &str, prefix: &str) -> Result<RedisStore, StoreError> {
    RedisStore::connect(url, prefix).await
}

/// Run a ping against the store.
pub async fn health_check(store: &dyn ResultStore) -> Result<(), StoreError> {
    store.ping().await
}
