//! Helpers for reading typed settings from environment variables.

use std::str::FromStr;

/// A present but unparseable environment variable.
#[derive(Debug, thiserror::Error)]
#[error("{key} must be a valid {expected}, got {value:?}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Read `key` and parse it, falling back to `default` when unset.
///
/// `expected` names the type in the error message (e.g. `"u16"`).
pub fn env_or<T: FromStr>(key: &'static str, default: T, expected: &'static str) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw, expected),
        Err(_) => Ok(default),
    }
}

/// Read `key` as a string, falling back to `default` when unset.
pub fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a comma-separated list, dropping empty entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str, expected: &'static str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError {
        key,
        value: raw.to_string(),
        expected,
    })
}
