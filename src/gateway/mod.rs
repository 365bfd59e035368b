//! Remote query gateway
//!
//! One method per query shape the authoritative graph store answers. Each
//! method issues exactly one outbound request and never retries; retry policy
//! belongs to the caller.

pub mod health;
pub mod http;
mod wire;

use crate::cache::Viewport;
use crate::error::Result;
use crate::levels::DetailLevel;
use crate::model::{DependencyPath, GraphMetrics, GraphNode, GraphSnapshot, NodeDetails, StatusUpdate};
use async_trait::async_trait;

pub use health::{HealthCheckResult, HealthStatus};
pub use http::HttpGraphStore;

/// Client of the authoritative graph store
///
/// Error contract per operation:
/// - `fetch_level_graph`: `UpstreamUnavailable` (recoverable by fallback) or
///   `MalformedResponse`
/// - `fetch_node_details`: `NotFound` or `UpstreamUnavailable`
/// - `dependency_path`: `NoPathFound` or `UpstreamUnavailable`
/// - `update_node_status`: `NotFound` or `UpstreamUnavailable`
/// - `search_nodes` and `query_bounds` may fail; the facade absorbs it
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Nodes and edges visible at `level`, optionally limited to one category
    async fn fetch_level_graph(
        &self,
        level: &DetailLevel,
        category: Option<&str>,
    ) -> Result<GraphSnapshot>;

    /// A node with its children, dependencies and metrics
    async fn fetch_node_details(&self, node_id: &str) -> Result<NodeDetails>;

    /// Fuzzy search over node labels and ids
    async fn search_nodes(&self, query: &str, limit: usize) -> Result<Vec<GraphNode>>;

    /// Nodes and edges inside a viewport
    async fn query_bounds(&self, viewport: &Viewport) -> Result<GraphSnapshot>;

    /// Dependency path between two nodes
    async fn dependency_path(&self, source: &str, target: &str) -> Result<DependencyPath>;

    /// Change a node's status
    async fn update_node_status(&self, node_id: &str, update: &StatusUpdate) -> Result<()>;

    /// Graph-wide summary numbers
    async fn fetch_metrics(&self) -> Result<GraphMetrics>;

    /// Probe the store; never fails, an unreachable store is `Unhealthy`
    async fn health_check(&self) -> HealthCheckResult;
}
