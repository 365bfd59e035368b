//! Type definitions for infrastructure graph nodes, edges and snapshots
//!
//! The wire format of the authoritative store is camelCase JSON; the node and
//! edge kind travel in a field called `type`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Open-ended attribute bag carried by nodes and edges
pub type Attributes = Map<String, JsonValue>;

/// Kind of infrastructure element a node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Cloud region
    Region,
    /// Virtual private network
    Vpc,
    /// Subnet inside a VPC
    Subnet,
    /// Container orchestration cluster
    Cluster,
    /// Managed database
    Database,
    /// Load balancer
    LoadBalancer,
    /// Compute instance
    Instance,
    /// Pod scheduled on an instance
    Pod,
    /// Logical service
    Service,
}

impl NodeType {
    /// Every node type, coarsest first
    pub const ALL: [NodeType; 9] = [
        NodeType::Region,
        NodeType::Vpc,
        NodeType::Subnet,
        NodeType::Cluster,
        NodeType::Database,
        NodeType::LoadBalancer,
        NodeType::Instance,
        NodeType::Pod,
        NodeType::Service,
    ];

    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Region => "region",
            NodeType::Vpc => "vpc",
            NodeType::Subnet => "subnet",
            NodeType::Cluster => "cluster",
            NodeType::Database => "database",
            NodeType::LoadBalancer => "load_balancer",
            NodeType::Instance => "instance",
            NodeType::Pod => "pod",
            NodeType::Service => "service",
        }
    }

    /// Parse from the wire representation (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "region" => Some(NodeType::Region),
            "vpc" => Some(NodeType::Vpc),
            "subnet" => Some(NodeType::Subnet),
            "cluster" => Some(NodeType::Cluster),
            "database" => Some(NodeType::Database),
            "load_balancer" | "loadbalancer" => Some(NodeType::LoadBalancer),
            "instance" => Some(NodeType::Instance),
            "pod" => Some(NodeType::Pod),
            "service" => Some(NodeType::Service),
            _ => None,
        }
    }

    /// Default coarse category for this type
    pub fn category(&self) -> &'static str {
        match self {
            NodeType::Region => "global",
            NodeType::Vpc | NodeType::Subnet | NodeType::LoadBalancer => "network",
            NodeType::Cluster | NodeType::Instance | NodeType::Pod => "compute",
            NodeType::Database => "data",
            NodeType::Service => "application",
        }
    }

    /// Structural parent in the containment hierarchy
    pub fn parent(&self) -> Option<NodeType> {
        match self {
            NodeType::Region => None,
            NodeType::Vpc => Some(NodeType::Region),
            NodeType::Subnet | NodeType::Cluster | NodeType::Database | NodeType::LoadBalancer => {
                Some(NodeType::Vpc)
            }
            NodeType::Instance | NodeType::Service => Some(NodeType::Cluster),
            NodeType::Pod => Some(NodeType::Instance),
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Operating normally
    Healthy,
    /// Operating with reduced capacity or elevated latency
    Degraded,
    /// Failing or about to fail
    Critical,
    /// Not reachable
    Offline,
    /// No health information (also used for unrecognized wire values)
    #[serde(other)]
    Unknown,
}

impl NodeStatus {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Healthy => "healthy",
            NodeStatus::Degraded => "degraded",
            NodeStatus::Critical => "critical",
            NodeStatus::Offline => "offline",
            NodeStatus::Unknown => "unknown",
        }
    }
}

/// A vertex of the infrastructure graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Stable identifier, immutable once assigned
    pub id: String,
    /// Display label
    pub label: String,
    /// Element kind
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Coarse grouping used for category filters
    pub category: String,
    /// Health state
    pub status: NodeStatus,
    /// Monthly cost, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    /// Free-form attributes
    #[serde(default, rename = "properties", alias = "attributes")]
    pub attributes: Attributes,
}

impl GraphNode {
    /// Create a node whose category defaults to the type's category
    pub fn new(id: impl Into<String>, label: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            node_type,
            category: node_type.category().to_string(),
            status: NodeStatus::Unknown,
            cost: None,
            attributes: Attributes::new(),
        }
    }

    /// Set the health status
    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the cost
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Override the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    fn approx_size(&self) -> usize {
        self.id.len() + self.label.len() + self.category.len() + 64 + self.attributes.len() * 32
    }
}

/// A directed relationship between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Edge identifier
    pub id: String,
    /// Source node id
    pub source: String,
    /// Target node id
    pub target: String,
    /// Relationship kind, e.g. "contains" or "depends-on"
    #[serde(rename = "type")]
    pub relationship: String,
    /// Optional weight
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Free-form attributes
    #[serde(default, rename = "properties", alias = "attributes")]
    pub attributes: Attributes,
}

impl GraphEdge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        relationship: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            relationship: relationship.into(),
            weight: None,
            attributes: Attributes::new(),
        }
    }

    fn approx_size(&self) -> usize {
        self.id.len()
            + self.source.len()
            + self.target.len()
            + self.relationship.len()
            + 48
            + self.attributes.len() * 32
    }
}

/// Summary information attached to a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    /// Node count reported by the store (may exceed the nodes returned)
    pub total_nodes: usize,
    /// Edge count reported by the store
    pub total_edges: usize,
    /// Distinct categories present
    #[serde(default)]
    pub categories: Vec<String>,
    /// When the data was retrieved
    pub last_updated: DateTime<Utc>,
    /// True when produced by the fallback synthesizer rather than the store
    #[serde(default)]
    pub synthesized: bool,
}

impl SnapshotMetadata {
    /// Derive metadata from the contents of a node and edge list
    pub fn from_contents(nodes: &[GraphNode], edges: &[GraphEdge]) -> Self {
        Self {
            total_nodes: nodes.len(),
            total_edges: edges.len(),
            categories: distinct_categories(nodes),
            last_updated: Utc::now(),
            synthesized: false,
        }
    }
}

fn distinct_categories(nodes: &[GraphNode]) -> Vec<String> {
    let categories: BTreeSet<&str> = nodes.iter().map(|n| n.category.as_str()).collect();
    categories.into_iter().map(str::to_string).collect()
}

/// An immutable bundle of nodes, edges and metadata
///
/// Snapshots are built once and then shared as `Arc<GraphSnapshot>`; no edge
/// in a snapshot references a node outside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub metadata: SnapshotMetadata,
}

impl GraphSnapshot {
    /// Build a snapshot, dropping edges whose endpoints are missing
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>, metadata: SnapshotMetadata) -> Self {
        let mut snapshot = Self {
            nodes,
            edges,
            metadata,
        };
        snapshot.prune_dangling_edges();
        snapshot
    }

    /// Build a snapshot whose metadata is derived from its contents
    pub fn from_parts(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        let metadata = SnapshotMetadata::from_contents(&nodes, &edges);
        Self::new(nodes, edges, metadata)
    }

    /// Snapshot with no nodes and no edges
    pub fn empty() -> Self {
        Self::from_parts(Vec::new(), Vec::new())
    }

    /// Keep only nodes matching `keep`, then drop edges that lost an endpoint
    pub fn retain_nodes<F>(mut self, keep: F) -> Self
    where
        F: Fn(&GraphNode) -> bool,
    {
        let before = self.nodes.len();
        self.nodes.retain(|n| keep(n));
        if self.nodes.len() != before {
            self.prune_dangling_edges();
            self.refresh_categories();
        }
        self
    }

    /// Keep at most `max_nodes` nodes, then drop edges that lost an endpoint
    pub fn truncated(mut self, max_nodes: usize) -> Self {
        if self.nodes.len() > max_nodes {
            self.nodes.truncate(max_nodes);
            self.prune_dangling_edges();
            self.refresh_categories();
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// Count of nodes per type
    pub fn type_counts(&self) -> BTreeMap<NodeType, usize> {
        let mut counts = BTreeMap::new();
        for node in &self.nodes {
            *counts.entry(node.node_type).or_insert(0) += 1;
        }
        counts
    }

    /// Approximate in-memory footprint in bytes
    pub fn approx_size_bytes(&self) -> usize {
        let nodes: usize = self.nodes.iter().map(GraphNode::approx_size).sum();
        let edges: usize = self.edges.iter().map(GraphEdge::approx_size).sum();
        std::mem::size_of::<Self>() + nodes + edges
    }

    fn refresh_categories(&mut self) {
        self.metadata.categories = distinct_categories(&self.nodes);
    }

    fn prune_dangling_edges(&mut self) -> usize {
        let ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        let before = self.edges.len();
        self.edges
            .retain(|e| ids.contains(e.source.as_str()) && ids.contains(e.target.as_str()));
        let dropped = before - self.edges.len();
        if dropped > 0 {
            tracing::debug!("Dropped {} dangling edges from snapshot", dropped);
        }
        dropped
    }
}

/// Detail view of a single node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDetails {
    pub node: GraphNode,
    #[serde(default)]
    pub children: Vec<GraphNode>,
    #[serde(default)]
    pub dependencies: Vec<GraphEdge>,
    #[serde(default)]
    pub metrics: Map<String, JsonValue>,
}

/// Result of a dependency path query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyPath {
    /// Nodes from source to target, in order
    #[serde(rename = "path")]
    pub nodes: Vec<GraphNode>,
    /// Edges traversed
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    /// Whether the path lies on a designated critical path
    #[serde(default)]
    pub critical_path: bool,
    /// Blast-radius style impact score
    #[serde(default)]
    pub impact_score: f64,
}

impl DependencyPath {
    /// Number of hops between source and target
    pub fn hops(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }
}

/// Graph-wide summary numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetrics {
    pub total_nodes: usize,
    pub total_edges: usize,
    #[serde(default)]
    pub nodes_by_type: BTreeMap<String, usize>,
    #[serde(default)]
    pub nodes_by_status: BTreeMap<String, usize>,
    #[serde(default)]
    pub total_cost: Option<f64>,
    pub last_updated: DateTime<Utc>,
}

/// Body of a status mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Attributes>,
}
