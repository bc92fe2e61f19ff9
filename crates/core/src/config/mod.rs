//! Worker and host settings, layered with figment.
//!
//! `NETFIRST_*` environment variables override a TOML file named by
//! `NETFIRST_CONFIG_FILE`, which overrides the built-in defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Cache name used when no version is configured.
pub const DEFAULT_CACHE_VERSION: &str = "mta-wall-v1";

/// Assets fetched at install time when no list is configured.
pub const DEFAULT_PRECACHE_URLS: &[&str] = &["/", "/mobile", "/timetable.svg", "/icon.svg", "/manifest.json"];

/// Settings for one worker version and the host that runs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version tag; also the name of the cache the worker owns.
    ///
    /// Set via NETFIRST_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// URLs fetched unconditionally at install time, resolved against `origin`.
    ///
    /// Set via NETFIRST_PRECACHE_URLS environment variable.
    #[serde(default = "default_precache_urls")]
    pub precache_urls: Vec<String>,

    /// Origin that page requests and precache paths are relative to.
    ///
    /// Set via NETFIRST_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// SQLite file holding every cache.
    ///
    /// Set via NETFIRST_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent sent on every network request.
    ///
    /// Set via NETFIRST_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request network timeout in milliseconds.
    ///
    /// Set via NETFIRST_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Largest response body accepted from the network.
    ///
    /// Set via NETFIRST_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_cache_version() -> String {
    DEFAULT_CACHE_VERSION.into()
}

fn default_precache_urls() -> Vec<String> {
    DEFAULT_PRECACHE_URLS.iter().map(|s| s.to_string()).collect()
}

fn default_origin() -> String {
    "http://localhost:8100".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./netfirst-cache.sqlite")
}

fn default_user_agent() -> String {
    "netfirst/0.1".into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_version: default_cache_version(),
            precache_urls: default_precache_urls(),
            origin: default_origin(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl AppConfig {
    /// `timeout_ms` as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Merge defaults, the optional TOML file and `NETFIRST_*` variables, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("NETFIRST_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("NETFIRST_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.cache_version, "mta-wall-v1");
        assert_eq!(config.precache_urls, vec!["/", "/mobile", "/timetable.svg", "/icon.svg", "/manifest.json"]);
        assert_eq!(config.origin, "http://localhost:8100");
        assert_eq!(config.db_path, PathBuf::from("./netfirst-cache.sqlite"));
        assert_eq!(config.user_agent, "netfirst/0.1");
        assert_eq!(config.timeout_ms, 10_000);
        assert_eq!(config.max_bytes, 5_242_880);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(10_000));
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string(
            r#"
            cache_version = "mta-wall-v2"
            precache_urls = ["/", "/svg"]
            "#,
        ));
        let config: AppConfig = figment.extract().unwrap();
        assert_eq!(config.cache_version, "mta-wall-v2");
        assert_eq!(config.precache_urls, vec!["/", "/svg"]);
        assert_eq!(config.origin, "http://localhost:8100");
    }
}
