//! Snapshot cache store with freshness checks and LRU eviction

use crate::cache::{
    config::CacheConfig,
    entry::CacheEntry,
    invalidation::{InvalidationEvent, InvalidationReason},
    types::{CacheStats, KeyString},
};
use crate::model::GraphSnapshot;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Storage seam for cached graph snapshots
///
/// All operations are total: a cache never fails a request, it only misses.
/// [`GraphCache`] is the in-process implementation; an external cache service
/// can stand in without changes to callers.
#[async_trait]
pub trait SnapshotCache: Send + Sync {
    /// Fresh snapshot for `key`, or `None` when absent or stale
    async fn get(&self, key: &str) -> Option<Arc<GraphSnapshot>>;

    /// Insert or replace the snapshot for `key`
    async fn put(&self, key: &str, snapshot: Arc<GraphSnapshot>);

    /// Insert only if `still_valid` holds while the write is exclusive
    ///
    /// Returns whether the snapshot was stored. Invalidations cannot slip
    /// between the check and the insert.
    async fn put_if(
        &self,
        key: &str,
        snapshot: Arc<GraphSnapshot>,
        still_valid: &(dyn Fn() -> bool + Sync),
    ) -> bool;

    /// Remove every entry whose key contains `pattern`
    async fn invalidate_with_reason(
        &self,
        pattern: &str,
        reason: InvalidationReason,
    ) -> InvalidationEvent;

    /// Remove every entry whose key contains `pattern`, returning the count
    async fn invalidate(&self, pattern: &str) -> usize {
        self.invalidate_with_reason(pattern, InvalidationReason::Manual)
            .await
            .removed()
    }

    /// Remove all entries
    async fn clear(&self);

    /// Diagnostic counters
    async fn stats(&self) -> CacheStats;
}

/// In-process snapshot cache
///
/// This implementation provides:
/// - Mutual exclusion of reads and writes via an async `RwLock`
/// - Lazy freshness checks: stale entries read as misses but are kept until
///   the next write to the same key
/// - Eviction when entry or size limits are reached: least recently used
///   first, or oldest insertion first when `enable_lru_eviction` is off
pub struct GraphCache {
    /// Cache configuration
    config: CacheConfig,

    /// Internal storage
    store: RwLock<CacheStore>,
}

/// Internal cache storage
struct CacheStore {
    /// Main storage: key -> entry
    entries: HashMap<KeyString, CacheEntry>,

    /// Eviction order, next victim at the front; reads move keys to the back
    /// only under LRU
    lru_queue: VecDeque<KeyString>,

    /// Current cache statistics
    stats: CacheStats,
}

impl CacheStore {
    /// Remove an entry and keep size accounting in step
    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.lru_queue.retain(|k| k != key);
        self.stats.size_bytes = self.stats.size_bytes.saturating_sub(entry.metadata.size_bytes);
        self.stats.entries = self.entries.len();
        Some(entry)
    }

    fn touch(&mut self, key: &str) {
        self.lru_queue.retain(|k| k != key);
        self.lru_queue.push_back(key.to_string());
    }
}

impl GraphCache {
    /// Create a new cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        info!("Initializing graph snapshot cache with config: {:?}", config);

        let store = CacheStore {
            entries: HashMap::new(),
            lru_queue: VecDeque::new(),
            stats: CacheStats::default(),
        };

        Self {
            config,
            store: RwLock::new(store),
        }
    }

    /// The configuration this cache was built with
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Check if a key is present, fresh or not (does not touch LRU or stats)
    pub async fn contains_key(&self, key: &str) -> bool {
        self.store.read().await.entries.contains_key(key)
    }

    /// Get number of entries in cache
    pub async fn len(&self) -> usize {
        self.store.read().await.entries.len()
    }

    /// Check if cache is empty
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.entries.is_empty()
    }

    /// Evict least recently used entries until `incoming` more bytes and one
    /// more entry fit
    fn evict_if_needed(&self, store: &mut CacheStore, incoming: usize) {
        while store.entries.len() >= self.config.max_entries
            || store.stats.size_bytes + incoming > self.config.max_size_bytes
        {
            let Some(key) = store.lru_queue.pop_front() else {
                break;
            };
            debug!("Evicting cache entry: {}", key);
            store.remove_entry(&key);
            store.stats.evictions += 1;
        }
    }
}

#[async_trait]
impl SnapshotCache for GraphCache {
    async fn get(&self, key: &str) -> Option<Arc<GraphSnapshot>> {
        let mut guard = self.store.write().await;
        let store = &mut *guard;
        let record = self.config.enable_metrics;

        let Some(entry) = store.entries.get_mut(key) else {
            debug!("Cache miss: {}", key);
            if record {
                store.stats.misses += 1;
            }
            return None;
        };

        if entry.is_stale() {
            debug!("Cache entry stale ({:?} old): {}", entry.age(), key);
            if record {
                store.stats.misses += 1;
                store.stats.stale_reads += 1;
            }
            return None;
        }

        entry.mark_accessed();
        let snapshot = Arc::clone(&entry.snapshot);

        if record {
            store.stats.hits += 1;
        }
        if self.config.enable_lru_eviction {
            store.touch(key);
        }

        debug!("Cache hit: {}", key);
        Some(snapshot)
    }

    async fn put(&self, key: &str, snapshot: Arc<GraphSnapshot>) {
        self.put_if(key, snapshot, &|| true).await;
    }

    async fn put_if(
        &self,
        key: &str,
        snapshot: Arc<GraphSnapshot>,
        still_valid: &(dyn Fn() -> bool + Sync),
    ) -> bool {
        let entry = CacheEntry::new(key.to_string(), snapshot, self.config.window_with_jitter());
        let size = entry.metadata.size_bytes;

        let mut store = self.store.write().await;

        if !still_valid() {
            debug!("Dropping write for {}: superseded before it landed", key);
            return false;
        }

        // Replace wholesale: the previous entry never survives a write
        if store.remove_entry(key).is_some() {
            debug!("Replacing cache entry: {}", key);
        }

        if size > self.config.max_size_bytes {
            warn!(
                "Snapshot for {} is {} bytes, above the {} byte cache budget; not caching",
                key, size, self.config.max_size_bytes
            );
            return false;
        }

        self.evict_if_needed(&mut store, size);

        store.entries.insert(key.to_string(), entry);
        store.lru_queue.push_back(key.to_string());
        store.stats.size_bytes += size;
        store.stats.entries = store.entries.len();
        debug!("Cached snapshot under {} ({} bytes)", key, size);
        true
    }

    async fn invalidate_with_reason(
        &self,
        pattern: &str,
        reason: InvalidationReason,
    ) -> InvalidationEvent {
        let mut store = self.store.write().await;

        let keys: Vec<KeyString> = store
            .entries
            .keys()
            .filter(|key| key.contains(pattern))
            .cloned()
            .collect();

        for key in &keys {
            store.remove_entry(key);
        }
        store.stats.invalidations += keys.len() as u64;

        info!("Invalidated {} entries matching '{}' ({})", keys.len(), pattern, reason);
        InvalidationEvent::new(reason, pattern, keys)
    }

    async fn clear(&self) {
        let mut store = self.store.write().await;

        let count = store.entries.len();
        store.entries.clear();
        store.lru_queue.clear();
        store.stats.size_bytes = 0;
        store.stats.entries = 0;
        store.stats.invalidations += count as u64;

        info!("Cleared {} entries from cache", count);
    }

    async fn stats(&self) -> CacheStats {
        self.store.read().await.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GraphNode, NodeType};
    use std::time::Duration;

    fn snapshot(id: &str) -> Arc<GraphSnapshot> {
        Arc::new(GraphSnapshot::from_parts(
            vec![GraphNode::new(id, id, NodeType::Region)],
            Vec::new(),
        ))
    }

    #[tokio::test]
    async fn test_put_and_get_returns_same_snapshot() {
        let cache = GraphCache::new(CacheConfig::default());
        let stored = snapshot("us-east-1");

        cache.put("graph-0-all", Arc::clone(&stored)).await;

        let fetched = cache.get("graph-0-all").await.unwrap();
        assert!(Arc::ptr_eq(&stored, &fetched));

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let cache = GraphCache::new(CacheConfig::default());

        assert!(cache.get("graph-9-all").await.is_none());
        assert_eq!(cache.stats().await.misses, 1);
    }

    #[tokio::test]
    async fn test_stale_entry_is_a_miss_but_kept() {
        let config = CacheConfig::builder()
            .freshness_window(Duration::from_millis(100))
            .build();
        let cache = GraphCache::new(config);

        cache.put("graph-1-all", snapshot("us-east-1")).await;
        assert!(cache.get("graph-1-all").await.is_some());

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(cache.get("graph-1-all").await.is_none());
        assert!(cache.contains_key("graph-1-all").await);

        let stats = cache.stats().await;
        assert_eq!(stats.stale_reads, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_put_supersedes_stale_entry() {
        let config = CacheConfig::builder()
            .freshness_window(Duration::from_millis(50))
            .build();
        let cache = GraphCache::new(config);

        cache.put("graph-1-all", snapshot("old")).await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get("graph-1-all").await.is_none());

        let fresh = snapshot("new");
        cache.put("graph-1-all", Arc::clone(&fresh)).await;

        let fetched = cache.get("graph-1-all").await.unwrap();
        assert!(Arc::ptr_eq(&fresh, &fetched));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let config = CacheConfig::builder().max_entries(3).build();
        let cache = GraphCache::new(config);

        cache.put("graph-0-all", snapshot("a")).await;
        cache.put("graph-1-all", snapshot("b")).await;
        cache.put("graph-2-all", snapshot("c")).await;

        // Touch the oldest so graph-1-all becomes least recently used
        cache.get("graph-0-all").await;

        cache.put("graph-3-all", snapshot("d")).await;

        assert!(cache.contains_key("graph-0-all").await);
        assert!(!cache.contains_key("graph-1-all").await);
        assert_eq!(cache.len().await, 3);
        assert_eq!(cache.stats().await.evictions, 1);
    }

    #[tokio::test]
    async fn test_fifo_eviction_without_lru() {
        let config = CacheConfig::builder()
            .max_entries(3)
            .enable_lru_eviction(false)
            .build();
        let cache = GraphCache::new(config);

        cache.put("graph-0-all", snapshot("a")).await;
        cache.put("graph-1-all", snapshot("b")).await;
        cache.put("graph-2-all", snapshot("c")).await;

        // Reads do not reorder eviction, the first insert still goes first
        cache.get("graph-0-all").await;

        cache.put("graph-3-all", snapshot("d")).await;

        assert!(!cache.contains_key("graph-0-all").await);
        assert!(cache.contains_key("graph-1-all").await);
        assert_eq!(cache.len().await, 3);
    }

    #[tokio::test]
    async fn test_put_if_checks_under_the_write_lock() {
        let cache = GraphCache::new(CacheConfig::default());

        assert!(cache.put_if("graph-2-all", snapshot("a"), &|| true).await);
        assert!(cache.contains_key("graph-2-all").await);

        let rejected = snapshot("b");
        assert!(!cache.put_if("graph-2-all", rejected.clone(), &|| false).await);
        let kept = cache.get("graph-2-all").await.unwrap();
        assert!(!Arc::ptr_eq(&kept, &rejected));
    }

    #[tokio::test]
    async fn test_oversized_snapshot_is_not_cached() {
        let config = CacheConfig::builder().max_size_bytes(16).build();
        let cache = GraphCache::new(config);

        cache.put("graph-0-all", snapshot("us-east-1")).await;

        assert!(cache.is_empty().await);
        assert!(cache.get("graph-0-all").await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_matches_substring_only() {
        let cache = GraphCache::new(CacheConfig::default());

        cache.put("graph-0-all", snapshot("a")).await;
        cache.put("graph-2-compute", snapshot("b")).await;
        cache.put("layout-2-all", snapshot("c")).await;

        let event = cache
            .invalidate_with_reason("graph-", InvalidationReason::Manual)
            .await;

        assert_eq!(event.removed(), 2);
        assert!(cache.contains_key("layout-2-all").await);
        assert!(!cache.contains_key("graph-0-all").await);
        assert_eq!(cache.stats().await.invalidations, 2);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = GraphCache::new(CacheConfig::default());

        cache.put("graph-0-all", snapshot("a")).await;
        cache.put("graph-1-all", snapshot("b")).await;
        cache.clear().await;

        assert!(cache.is_empty().await);
        let stats = cache.stats().await;
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.size_bytes, 0);
    }

    #[tokio::test]
    async fn test_stats_track_size() {
        let cache = GraphCache::new(CacheConfig::default());

        cache.put("graph-0-all", snapshot("a")).await;
        let size = cache.stats().await.size_bytes;
        assert!(size > 0);

        // Replacing an entry must not double count
        cache.put("graph-0-all", snapshot("a")).await;
        assert_eq!(cache.stats().await.size_bytes, size);
    }

    #[tokio::test]
    async fn test_metrics_disabled_skips_counters() {
        let config = CacheConfig::builder().enable_metrics(false).build();
        let cache = GraphCache::new(config);

        cache.put("graph-0-all", snapshot("a")).await;
        cache.get("graph-0-all").await;
        cache.get("graph-1-all").await;

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.entries, 1);
    }
}
