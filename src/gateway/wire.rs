//! Response bodies of the authoritative store

use crate::model::{GraphEdge, GraphNode, GraphSnapshot};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// `GET /graph` and `GET /bounds`
#[derive(Debug, Deserialize)]
pub(crate) struct SnapshotResponse {
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    #[serde(default)]
    pub metadata: Option<WireMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireMetadata {
    pub total_nodes: Option<usize>,
    pub total_edges: Option<usize>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl SnapshotResponse {
    /// Merge store-reported totals over what the contents imply
    ///
    /// Categories always come from the nodes actually returned.
    pub fn into_snapshot(self) -> GraphSnapshot {
        let mut snapshot = GraphSnapshot::from_parts(self.nodes, self.edges);
        if let Some(wire) = self.metadata {
            let metadata = &mut snapshot.metadata;
            if let Some(total) = wire.total_nodes {
                metadata.total_nodes = total;
            }
            if let Some(total) = wire.total_edges {
                metadata.total_edges = total;
            }
            if let Some(last_updated) = wire.last_updated {
                metadata.last_updated = last_updated;
            }
        }
        snapshot
    }
}

/// `GET /search`
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub nodes: Vec<GraphNode>,
}

/// Error body some stores attach to 4xx answers
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: Option<String>,
    pub detail: Option<String>,
}
