//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (APICACHE_*)
//! 2. TOML config file (if APICACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::CacheMode;

mod validation;

pub use validation::ConfigError;

/// Which key-value store backs the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Process-local map; entries are lost on exit.
    #[default]
    Memory,
    /// SQLite database at `db_path`.
    Sqlite,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (APICACHE_*)
/// 2. TOML config file (if APICACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backing store.
    ///
    /// Set via APICACHE_STORE environment variable (`memory` or `sqlite`).
    #[serde(default)]
    pub store: StoreKind,

    /// Path to the SQLite database. Required when `store = "sqlite"`.
    ///
    /// Set via APICACHE_DB_PATH environment variable.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Cache name reported in `X-Local-Cache` and in log events.
    ///
    /// Set via APICACHE_NAME environment variable.
    #[serde(default = "default_name")]
    pub name: String,

    /// Request headers never stored or compared.
    #[serde(default = "default_non_cacheable_request_headers")]
    pub non_cacheable_request_headers: Vec<String>,

    /// Cache mode for requests that do not choose one.
    ///
    /// Set via APICACHE_CACHE_MODE environment variable.
    #[serde(default)]
    pub cache_mode: CacheMode,

    /// Treat store failures as cache misses instead of request failures.
    ///
    /// Set via APICACHE_FAIL_OPEN environment variable.
    #[serde(default = "default_true")]
    pub fail_open: bool,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via APICACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via APICACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via APICACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum redirects followed per request.
    ///
    /// Set via APICACHE_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_name() -> String {
    "request-cache".into()
}

fn default_non_cacheable_request_headers() -> Vec<String> {
    vec!["authorization".into()]
}

fn default_user_agent() -> String {
    "apicache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_max_redirects() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreKind::Memory,
            db_path: None,
            name: default_name(),
            non_cacheable_request_headers: default_non_cacheable_request_headers(),
            cache_mode: CacheMode::Default,
            fail_open: true,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `APICACHE_`
    /// 2. TOML file from `APICACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment()
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("APICACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("APICACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }

    /// Database path for the SQLite store.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `db_path` is not set.
    pub fn require_db_path(&self) -> Result<&PathBuf, ConfigError> {
        self.db_path.as_ref().ok_or_else(|| ConfigError::Missing {
            field: "db_path".into(),
            hint: "Set APICACHE_DB_PATH environment variable".into(),
        })
    }
}
