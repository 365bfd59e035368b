//! # Infragraph Access (infragraph-access)
//!
//! A cached, level-of-detail access layer for large infrastructure dependency
//! graphs (regions, VPCs, clusters, instances, pods, services).
//!
//! ## Features
//!
//! - Detail-level catalog: five coarseness tiers, each with a node budget
//! - Snapshot cache with a freshness window, LRU bounds and pattern invalidation
//! - Single-flight fetching: concurrent misses on one query share one request
//! - Fallback skeleton graphs when the authoritative store is unreachable
//! - Search and viewport queries that degrade to empty results instead of failing
//! - Health probing of the authoritative store
//!
//! ## Browsing Levels
//!
//! ```no_run
//! use infragraph_access::{GraphAccess, GraphAccessConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let access = GraphAccess::from_config(GraphAccessConfig::from_env()?)?;
//!
//!     for level in access.list_levels() {
//!         let graph = access.get_graph(level.ordinal, None).await?;
//!         println!(
//!             "{}: {} nodes{}",
//!             level.name,
//!             graph.nodes.len(),
//!             if graph.metadata.synthesized { " (fallback)" } else { "" }
//!         );
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Mutations
//!
//! A status change is forwarded to the store and then drops every cached
//! graph view, so the next read goes back to the store.
//!
//! ```no_run
//! use infragraph_access::{GraphAccess, GraphAccessConfig, NodeStatus};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let access = GraphAccess::from_config(GraphAccessConfig::default())?;
//!
//!     access
//!         .update_node_status("eks-trading-prod", NodeStatus::Degraded, None)
//!         .await?;
//!     let path = access.get_dependency_path("alb-trading", "rds-orders").await?;
//!     println!("{} hops", path.hops());
//!     Ok(())
//! }
//! ```

pub mod access;
pub mod cache;
pub mod config;
pub mod error;
pub mod fallback;
pub mod gateway;
pub mod levels;
pub mod model;

// Re-export main types for convenience
pub use access::{DegradationStats, GraphAccess};
pub use cache::{CacheConfig, CacheConfigBuilder, CacheKey, CacheStats, GraphCache, SnapshotCache};
pub use config::{GraphAccessConfig, StoreConfig};
pub use error::{GraphAccessError, Result};
pub use gateway::{GraphStore, HealthCheckResult, HealthStatus, HttpGraphStore};
pub use levels::DetailLevel;
pub use model::{
    Attributes, DependencyPath, GraphEdge, GraphMetrics, GraphNode, GraphSnapshot, NodeDetails,
    NodeStatus, NodeType, SnapshotMetadata, StatusUpdate,
};
