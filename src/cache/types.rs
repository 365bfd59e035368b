//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rendered cache key, always produced from a [`crate::cache::CacheKey`]
pub type KeyString = String;

/// Statistics for cache diagnostics
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CacheStats {
    /// Total number of fresh hits
    pub hits: u64,

    /// Total number of misses, stale reads included
    pub misses: u64,

    /// Reads that found an entry older than the freshness window
    pub stale_reads: u64,

    /// Number of entries currently in cache
    pub entries: usize,

    /// Approximate total size of cached snapshots in bytes
    pub size_bytes: usize,

    /// Number of evictions due to capacity limits
    pub evictions: u64,

    /// Number of entries removed by invalidation or clear
    pub invalidations: u64,
}

impl CacheStats {
    /// Cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Average entry size in bytes
    pub fn avg_entry_size(&self) -> usize {
        if self.entries == 0 {
            0
        } else {
            self.size_bytes / self.entries
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, entries: {}, size: {} bytes, evictions: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.entries,
            self.size_bytes,
            self.evictions
        )
    }
}
