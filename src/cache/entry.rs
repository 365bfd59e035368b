//! Cache entry management with freshness tracking

use crate::cache::types::KeyString;
use crate::model::GraphSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A cached snapshot with its bookkeeping
///
/// Entries are never patched in place: a newer fetch for the same key replaces
/// the whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The rendered cache key
    pub key: KeyString,

    /// The cached snapshot, shared read-only with callers
    pub snapshot: Arc<GraphSnapshot>,

    /// Entry metadata
    pub metadata: CacheMetadata,
}

impl CacheEntry {
    /// Create a new entry that stays fresh for `freshness_window`
    pub fn new(key: KeyString, snapshot: Arc<GraphSnapshot>, freshness_window: Duration) -> Self {
        let now = Utc::now();
        let size_bytes = key.len() + snapshot.approx_size_bytes();

        Self {
            key,
            snapshot,
            metadata: CacheMetadata {
                created_at: now,
                accessed_at: now,
                freshness_window,
                access_count: 0,
                size_bytes,
            },
        }
    }

    /// Whether the entry is older than its freshness window
    pub fn is_stale(&self) -> bool {
        self.age() > self.metadata.freshness_window
    }

    /// Get the age of the entry
    pub fn age(&self) -> Duration {
        (Utc::now() - self.metadata.created_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }

    /// Time left before the entry turns stale
    pub fn time_until_stale(&self) -> Option<Duration> {
        self.metadata.freshness_window.checked_sub(self.age())
    }

    /// Mark the entry as accessed (updates access time and count)
    pub fn mark_accessed(&mut self) {
        self.metadata.accessed_at = Utc::now();
        self.metadata.access_count += 1;
    }
}

/// Metadata associated with a cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// When the snapshot was fetched and stored
    pub created_at: DateTime<Utc>,

    /// Last read time (for LRU tracking)
    pub accessed_at: DateTime<Utc>,

    /// How long the entry is served as a hit
    pub freshness_window: Duration,

    /// Number of fresh reads served from this entry
    pub access_count: u64,

    /// Approximate size of the entry in bytes
    pub size_bytes: usize,
}
