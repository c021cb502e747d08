//! Redis backend for the queue and result store.
//!
//! # Key Schema
//!
//! | Key Pattern               | Type   | Purpose                         |
//! |---------------------------|--------|---------------------------------|
//! | `{prefix}:tasks`          | List   | Pending task messages (FIFO)    |
//! | `{prefix}:result:{id}`    | String | Result JSON, expires via `PX`   |
//!
//! Enqueue is `RPUSH`, dequeue is `BLPOP` (atomic pop, so each message
//! reaches exactly one worker), and result writes are `SET .. NX PX` so a
//! terminal result is never overwritten.
//!
//! Both connections are [`ConnectionManager`]s, so a Redis restart costs the
//! in-flight command but later commands reconnect on their own.

use std::time::Duration;

use ::redis::aio::{ConnectionManager, ConnectionManagerConfig};
use ::redis::AsyncCommands;
use async_trait::async_trait;

use crate::{ResultStore, StoreError, TaskQueue, WriteOutcome};

/// Redis-backed [`TaskQueue`] and [`ResultStore`].
///
/// Holds two managed connections: one dedicated to `BLPOP` so a blocked
/// dequeue never delays result reads/writes issued through the other.
/// Clones share both connections.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    blocking: ConnectionManager,
    key_prefix: String,
}

/// Response limit for ordinary commands. Must stay above the worker's
/// result-write timeout so the worker's own deadline is the one that fires.
pub const COMMAND_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Config for the command connection.
fn command_config() -> ConnectionManagerConfig {
    ConnectionManagerConfig::new().set_response_timeout(Some(COMMAND_RESPONSE_TIMEOUT))
}

/// Config for the `BLPOP` connection. No client-side response limit: the
/// server ends the block at the requested timeout, and giving up earlier
/// would drop a reply carrying an already-popped message.
fn blocking_config() -> ConnectionManagerConfig {
    ConnectionManagerConfig::new().set_response_timeout(None)
}

impl RedisStore {
    /// Connect to Redis at `url` (`redis://[:<password>@]<host>:<port>[/<db>]`).
    ///
    /// Fails when the server cannot be reached after the connection
    /// manager's initial retries.
    pub async fn connect(url: &str, key_prefix: &str) -> Result<Self, StoreError> {
        let client = ::redis::Client::open(url)?;
        let conn = client.get_connection_manager_with_config(command_config()).await?;
        let blocking = client.get_connection_manager_with_config(blocking_config()).await?;

        tracing::debug!(key_prefix, "Connected to Redis");

        Ok(Self {
            conn,
            blocking,
            key_prefix: key_prefix.to_string(),
        })
    }

    fn queue_key(&self) -> String {
        format!("{}:tasks", self.key_prefix)
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}:{key}", self.key_prefix)
    }
}

#[async_trait]
impl TaskQueue for RedisStore {
    async fn enqueue(&self, message: String) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.rpush(self.queue_key(), message).await?;
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<String>, StoreError> {
        let mut conn = self.blocking.clone();

        // A BLPOP timeout of 0 blocks forever; use a plain LPOP instead.
        if timeout.is_zero() {
            let message: Option<String> = ::redis::cmd("LPOP")
                .arg(self.queue_key())
                .query_async(&mut conn)
                .await?;
            return Ok(message);
        }

        let popped: Option<(String, String)> = ::redis::cmd("BLPOP")
            .arg(self.queue_key())
            .arg(timeout.as_secs_f64())
            .query_async(&mut conn)
            .await?;
        Ok(popped.map(|(_, message)| message))
    }

    async fn depth(&self) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let len: u64 = conn.llen(self.queue_key()).await?;
        Ok(len)
    }
}

#[async_trait]
impl ResultStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(self.prefixed(key)).await?;
        Ok(value)
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<WriteOutcome, StoreError> {
        let mut conn = self.conn.clone();
        let ttl_ms = ttl.as_millis().max(1) as u64;

        // Replies "OK" when written, nil when NX found an existing key.
        let reply: Option<String> = ::redis::cmd("SET")
            .arg(self.prefixed(key))
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await?;

        Ok(match reply {
            Some(_) => WriteOutcome::Written,
            None => WriteOutcome::AlreadyExists,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = ::redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
