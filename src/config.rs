//! Access layer configuration
//!
//! Values come from code (builders and struct literals) or from the
//! environment via [`GraphAccessConfig::from_env`], which also loads a `.env`
//! file when one is present.

use crate::cache::CacheConfig;
use crate::error::{GraphAccessError, Result};
use std::time::Duration;

/// Environment variable holding the authoritative store base URL
pub const ENV_STORE_URL: &str = "INFRAGRAPH_STORE_URL";
/// Environment variable holding the request timeout in milliseconds
pub const ENV_STORE_TIMEOUT_MS: &str = "INFRAGRAPH_STORE_TIMEOUT_MS";
/// Environment variable holding the cache freshness window in seconds
pub const ENV_CACHE_FRESHNESS_SECS: &str = "INFRAGRAPH_CACHE_FRESHNESS_SECS";
/// Environment variable holding the cache entry limit
pub const ENV_CACHE_MAX_ENTRIES: &str = "INFRAGRAPH_CACHE_MAX_ENTRIES";

/// Connection settings for the authoritative graph store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL, e.g. "http://graph-store:8080/api"
    pub base_url: String,
    /// Upper bound on a whole request; expiry resolves as upstream unavailable
    pub timeout: Duration,
    /// Upper bound on establishing the connection
    pub connect_timeout: Duration,
    /// User agent sent with every request
    pub user_agent: String,
    /// Health probes slower than this report a degraded store (milliseconds)
    pub degraded_threshold_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(3),
            user_agent: format!("infragraph-access/{}", env!("CARGO_PKG_VERSION")),
            degraded_threshold_ms: 1000,
        }
    }
}

impl StoreConfig {
    /// Store settings pointing at `base_url`, defaults elsewhere
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Complete configuration of the access layer
#[derive(Debug, Clone, Default)]
pub struct GraphAccessConfig {
    pub store: StoreConfig,
    pub cache: CacheConfig,
}

impl GraphAccessConfig {
    /// Build configuration from the environment, falling back to defaults
    /// for unset variables
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_STORE_URL) {
            config.store.base_url = url;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_STORE_TIMEOUT_MS)? {
            config.store.timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_CACHE_FRESHNESS_SECS)? {
            config.cache.freshness_window = Duration::from_secs(secs);
        }
        if let Some(max) = parse_var::<usize, _>(&lookup, ENV_CACHE_MAX_ENTRIES)? {
            config.cache.max_entries = max;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.store.base_url.trim().is_empty() {
            return Err(GraphAccessError::ConfigError(
                "store base_url must not be empty".to_string(),
            ));
        }
        if self.store.timeout.is_zero() {
            return Err(GraphAccessError::ConfigError(
                "store timeout must be greater than 0".to_string(),
            ));
        }
        self.cache.validate().map_err(GraphAccessError::ConfigError)
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            GraphAccessError::ConfigError(format!("{} has invalid value '{}'", name, raw))
        }),
    }
}
