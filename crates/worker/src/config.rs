use std::time::Duration;

use taskrelay_core::config::{env_or, env_string, ConfigError};
use taskrelay_store::DEFAULT_KEY_PREFIX;

use crate::executor::DEFAULT_SLOW_ECHO_DELAY;
use crate::worker_loop::WorkerSettings;

/// Worker process configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Store connection URL.
    pub redis_url: String,
    /// Namespace for every store key.
    pub key_prefix: String,
    /// Number of worker loops in this process.
    pub concurrency: usize,
    pub dequeue_timeout: Duration,
    /// How long results are retained.
    pub result_ttl: Duration,
    pub result_write_timeout: Duration,
    pub slow_echo_delay: Duration,
    /// Startup attempts before giving up on the store.
    pub store_connect_attempts: u32,
    /// `service.name` reported on task spans.
    pub service_name: String,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default              |
    /// |---------------------------|----------------------|
    /// | `REDIS_URL`               | `redis://redis:6379` |
    /// | `STORE_KEY_PREFIX`        | `taskrelay`          |
    /// | `WORKER_CONCURRENCY`      | `1`                  |
    /// | `DEQUEUE_TIMEOUT_MS`      | `1000`               |
    /// | `RESULT_TTL_SECS`         | `3600`               |
    /// | `RESULT_WRITE_TIMEOUT_MS` | `5000`               |
    /// | `SLOW_ECHO_DELAY_MS`      | `1000`               |
    /// | `STORE_CONNECT_ATTEMPTS`  | `20`                 |
    /// | `SERVICE_NAME`            | `worker`             |
    pub fn from_env() -> Result<Self, ConfigError> {
        let concurrency: usize = env_or("WORKER_CONCURRENCY", 1, "usize")?;
        let slow_echo_ms: u64 = env_or(
            "SLOW_ECHO_DELAY_MS",
            DEFAULT_SLOW_ECHO_DELAY.as_millis() as u64,
            "u64",
        )?;

        Ok(Self {
            redis_url: env_string("REDIS_URL", "redis://redis:6379"),
            key_prefix: env_string("STORE_KEY_PREFIX", DEFAULT_KEY_PREFIX),
            concurrency: concurrency.max(1),
            dequeue_timeout: Duration::from_millis(env_or("DEQUEUE_TIMEOUT_MS", 1000, "u64")?),
            result_ttl: Duration::from_secs(env_or("RESULT_TTL_SECS", 3600, "u64")?),
            result_write_timeout: Duration::from_millis(env_or(
                "RESULT_WRITE_TIMEOUT_MS",
                5000,
                "u64",
            )?),
            slow_echo_delay: Duration::from_millis(slow_echo_ms),
            store_connect_attempts: env_or("STORE_CONNECT_ATTEMPTS", 20, "u32")?,
            service_name: env_string("SERVICE_NAME", "worker"),
        })
    }

    /// Loop timing derived from this configuration.
    pub fn settings(&self) -> WorkerSettings {
        WorkerSettings {
            dequeue_timeout: self.dequeue_timeout,
            result_write_timeout: self.result_write_timeout,
            ..WorkerSettings::default()
        }
    }
}
