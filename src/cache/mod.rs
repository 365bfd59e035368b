//! # Graph Snapshot Cache
//!
//! Short-lived storage for graph snapshots fetched from the authoritative
//! store, keyed by the canonical shape of the query that produced them.
//!
//! ## Features
//!
//! - **Freshness window**: entries older than the window read as misses
//! - **Pattern invalidation**: drop every entry whose key contains a pattern,
//!   used after mutations to evict the whole `graph-` namespace
//! - **LRU eviction**: bounded by entry count and approximate byte size
//! - **Swappable backend**: callers depend on [`SnapshotCache`], not on the map
//!
//! ## Example
//!
//! ```rust
//! use infragraph_access::cache::{CacheConfig, CacheKey, GraphCache, SnapshotCache};
//! use infragraph_access::model::GraphSnapshot;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let config = CacheConfig::builder()
//!     .freshness_window(Duration::from_secs(300))
//!     .max_entries(1_000)
//!     .build();
//!
//! let cache = GraphCache::new(config);
//! let key = CacheKey::level(2, None).to_string();
//!
//! cache.put(&key, Arc::new(GraphSnapshot::empty())).await;
//! assert!(cache.get(&key).await.is_some());
//!
//! cache.invalidate("graph-").await;
//! assert!(cache.get(&key).await.is_none());
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod invalidation;
pub mod key;
pub mod store;
pub mod types;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use entry::{CacheEntry, CacheMetadata};
pub use invalidation::{InvalidationEvent, InvalidationReason};
pub use key::{normalize_category, CacheKey, Viewport, GRAPH_NAMESPACE};
pub use store::{GraphCache, SnapshotCache};
pub use types::{CacheStats, KeyString};
