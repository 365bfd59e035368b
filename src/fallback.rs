//! Placeholder graphs served while the store is unreachable
//!
//! A synthesized snapshot carries one representative node per visible node
//! type so a renderer still has a coherent skeleton to draw. It is flagged in
//! its metadata and must never be cached.

use crate::cache::normalize_category;
use crate::levels::DetailLevel;
use crate::model::{GraphEdge, GraphNode, GraphSnapshot, NodeStatus, NodeType};
use tracing::debug;

/// Id prefix of synthesized nodes
pub const FALLBACK_PREFIX: &str = "fallback-";

/// Id of the representative node for `node_type`
pub fn fallback_node_id(node_type: NodeType) -> String {
    format!("{}{}", FALLBACK_PREFIX, node_type.as_str())
}

/// Build a skeleton graph for `level`, optionally limited to one category
pub fn synthesize(level: &DetailLevel, category: Option<&str>) -> GraphSnapshot {
    let category = normalize_category(category);

    let nodes: Vec<GraphNode> = level
        .node_types
        .iter()
        .filter(|t| category.as_deref().map_or(true, |c| t.category() == c))
        .map(|&t| {
            let mut node = GraphNode::new(fallback_node_id(t), placeholder_label(t), t)
                .with_status(NodeStatus::Unknown);
            node.attributes
                .insert("synthesized".to_string(), serde_json::Value::Bool(true));
            node
        })
        .collect();

    let edges: Vec<GraphEdge> = nodes
        .iter()
        .filter_map(|child| {
            let parent = child.node_type.parent()?;
            let parent_id = fallback_node_id(parent);
            nodes.iter().any(|n| n.id == parent_id).then(|| {
                GraphEdge::new(
                    format!("{}-contains-{}", parent_id, child.id),
                    parent_id.clone(),
                    child.id.clone(),
                    "contains",
                )
            })
        })
        .collect();

    let mut snapshot = GraphSnapshot::from_parts(nodes, edges);
    snapshot.metadata.synthesized = true;

    debug!(
        "Synthesized fallback for level {} ({} nodes, {} edges)",
        level.ordinal,
        snapshot.nodes.len(),
        snapshot.edges.len()
    );
    snapshot
}

fn placeholder_label(node_type: NodeType) -> String {
    format!("{} (unavailable)", node_type.as_str().replace('_', " "))
}
