use taskrelay_core::config::{env_or, env_string, split_list, ConfigError};
use taskrelay_core::task::DEFAULT_MAX_PAYLOAD_CHARS;
use taskrelay_store::DEFAULT_KEY_PREFIX;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Queue / result store URL.
    pub redis_url: String,
    /// Namespace for every store key.
    pub key_prefix: String,
    /// Longest accepted task payload, in characters.
    pub max_payload_chars: usize,
    pub service_name: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `8000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `REDIS_URL`            | `redis://redis:6379`       |
    /// | `STORE_KEY_PREFIX`     | `taskrelay`                |
    /// | `MAX_PAYLOAD_CHARS`    | `10000`                    |
    /// | `SERVICE_NAME`         | `api`                      |
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_string("HOST", "0.0.0.0"),
            port: env_or("PORT", 8000, "u16")?,
            cors_origins: split_list(&env_string("CORS_ORIGINS", "http://localhost:5173")),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30, "u64")?,
            redis_url: env_string("REDIS_URL", "redis://redis:6379"),
            key_prefix: env_string("STORE_KEY_PREFIX", DEFAULT_KEY_PREFIX),
            max_payload_chars: env_or("MAX_PAYLOAD_CHARS", DEFAULT_MAX_PAYLOAD_CHARS, "usize")?,
            service_name: env_string("SERVICE_NAME", "api"),
        })
    }
}
