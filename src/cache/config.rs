//! Configuration for the snapshot cache

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the snapshot cache
///
/// The freshness window bounds staleness: a snapshot older than the window is
/// treated as a miss even though it stays in the store until superseded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum age at which a cached snapshot is still served
    pub freshness_window: Duration,

    /// Freshness jitter factor (0.0 - 1.0)
    /// Shortens each entry's window by up to this fraction so entries written
    /// together do not all miss at once
    pub freshness_jitter: f64,

    /// Maximum number of entries in the cache
    pub max_entries: usize,

    /// Maximum approximate size of cached snapshots in bytes
    pub max_size_bytes: usize,

    /// Reads refresh an entry's eviction order (LRU); when off, a full cache
    /// evicts in insertion order (FIFO)
    pub enable_lru_eviction: bool,

    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            // 5 minutes
            freshness_window: Duration::from_secs(300),
            freshness_jitter: 0.0,
            max_entries: 1_000,
            // 256 MB
            max_size_bytes: 256 * 1024 * 1024,
            enable_lru_eviction: true,
            enable_metrics: true,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.freshness_window.is_zero() {
            return Err("freshness_window must be greater than 0".to_string());
        }

        if self.max_entries == 0 {
            return Err("max_entries must be greater than 0".to_string());
        }

        if self.max_size_bytes == 0 {
            return Err("max_size_bytes must be greater than 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.freshness_jitter) {
            return Err("freshness_jitter must be between 0.0 and 1.0".to_string());
        }

        Ok(())
    }

    /// Freshness window for a new entry, with jitter applied
    ///
    /// Jitter only shortens the window; no entry outlives `freshness_window`.
    pub fn window_with_jitter(&self) -> Duration {
        if self.freshness_jitter == 0.0 {
            return self.freshness_window;
        }

        let base_secs = self.freshness_window.as_secs_f64();
        let jitter = rand::random::<f64>() * base_secs * self.freshness_jitter;
        let final_secs = (base_secs - jitter).clamp(0.001, base_secs);

        Duration::from_secs_f64(final_secs)
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    freshness_window: Option<Duration>,
    freshness_jitter: Option<f64>,
    max_entries: Option<usize>,
    max_size_bytes: Option<usize>,
    enable_lru_eviction: Option<bool>,
    enable_metrics: Option<bool>,
}

impl CacheConfigBuilder {
    /// Set the freshness window
    pub fn freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = Some(window);
        self
    }

    /// Set freshness jitter factor (0.0 - 1.0)
    pub fn freshness_jitter(mut self, jitter: f64) -> Self {
        self.freshness_jitter = Some(jitter);
        self
    }

    /// Set maximum number of cache entries
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Set maximum cache size in bytes
    pub fn max_size_bytes(mut self, size: usize) -> Self {
        self.max_size_bytes = Some(size);
        self
    }

    /// Enable or disable LRU eviction
    pub fn enable_lru_eviction(mut self, enable: bool) -> Self {
        self.enable_lru_eviction = Some(enable);
        self
    }

    /// Enable or disable metrics collection
    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = Some(enable);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            freshness_window: self.freshness_window.unwrap_or(defaults.freshness_window),
            freshness_jitter: self.freshness_jitter.unwrap_or(defaults.freshness_jitter),
            max_entries: self.max_entries.unwrap_or(defaults.max_entries),
            max_size_bytes: self.max_size_bytes.unwrap_or(defaults.max_size_bytes),
            enable_lru_eviction: self
                .enable_lru_eviction
                .unwrap_or(defaults.enable_lru_eviction),
            enable_metrics: self.enable_metrics.unwrap_or(defaults.enable_metrics),
        }
    }
}

/// Preset configurations
impl CacheConfig {
    /// Short window for operators watching an incident unfold
    pub fn incident() -> Self {
        Self {
            freshness_window: Duration::from_secs(30),
            max_entries: 500,
            ..Default::default()
        }
    }

    /// Long window for read-mostly capacity planning views
    pub fn planning() -> Self {
        Self {
            freshness_window: Duration::from_secs(30 * 60),
            freshness_jitter: 0.10,
            max_entries: 5_000,
            max_size_bytes: 1024 * 1024 * 1024,
            ..Default::default()
        }
    }
}
