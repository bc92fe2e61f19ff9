//! Checks applied to a loaded `AppConfig` before the worker is built from it.

use std::collections::HashSet;

use crate::config::AppConfig;
use thiserror::Error;

/// Error raised while loading or checking configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

/// Bounds for `timeout_ms`.
const TIMEOUT_MS: std::ops::RangeInclusive<u64> = 100..=300_000;

/// Upper bound for `max_bytes`.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

impl AppConfig {
    /// Reject values the worker cannot run with.
    ///
    /// Blank version or user agent, blank precache entries, a non-http(s)
    /// origin, a timeout outside 100ms..=5min and a body limit outside
    /// 1..=50MB are all errors. Duplicate precache entries only warn.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_version.trim().is_empty() {
            return Err(invalid("cache_version", "must not be empty"));
        }

        let mut seen = HashSet::new();
        for entry in &self.precache_urls {
            let entry = entry.trim();
            if entry.is_empty() {
                return Err(invalid("precache_urls", "entries must not be empty"));
            }
            if !seen.insert(entry) {
                tracing::warn!(entry, "duplicate precache entry; it will be stored once");
            }
        }

        let origin = url::Url::parse(&self.origin).map_err(|e| invalid("origin", e.to_string()))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme())));
        }

        if !TIMEOUT_MS.contains(&self.timeout_ms) {
            return Err(invalid(
                "timeout_ms",
                format!("must be between {}ms and {}ms", TIMEOUT_MS.start(), TIMEOUT_MS.end()),
            ));
        }

        if self.max_bytes == 0 || self.max_bytes > MAX_BODY_BYTES {
            return Err(invalid("max_bytes", "must be between 1 byte and 50MB"));
        }

        if self.user_agent.trim().is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        Ok(())
    }
}
