//! Detail-level catalog
//!
//! Levels form a strict superset progression: each level shows every node type
//! of the level below it plus at least one more. Level 0 shows regions only and
//! the last level shows every [`NodeType`].

use crate::model::NodeType;
use serde::Serialize;

/// A coarseness tier controlling which node types are visible and how many
/// nodes may be returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailLevel {
    pub ordinal: u8,
    pub name: &'static str,
    pub node_types: &'static [NodeType],
    pub max_nodes: usize,
    pub description: &'static str,
}

impl DetailLevel {
    /// Whether nodes of this type are visible at this level
    pub fn includes(&self, node_type: NodeType) -> bool {
        self.node_types.contains(&node_type)
    }

    /// Whether this is the most detailed level
    pub fn is_full(&self) -> bool {
        usize::from(self.ordinal) + 1 == LEVELS.len()
    }
}

use NodeType::*;

static LEVELS: [DetailLevel; 5] = [
    DetailLevel {
        ordinal: 0,
        name: "regions",
        node_types: &[Region],
        max_nodes: 50,
        description: "Cloud regions only",
    },
    DetailLevel {
        ordinal: 1,
        name: "network",
        node_types: &[Region, Vpc, Subnet],
        max_nodes: 500,
        description: "Regions with their VPCs and subnets",
    },
    DetailLevel {
        ordinal: 2,
        name: "platform",
        node_types: &[Region, Vpc, Subnet, Cluster, Database, LoadBalancer],
        max_nodes: 2_000,
        description: "Clusters, databases and load balancers inside the network",
    },
    DetailLevel {
        ordinal: 3,
        name: "compute",
        node_types: &[Region, Vpc, Subnet, Cluster, Database, LoadBalancer, Instance],
        max_nodes: 10_000,
        description: "Adds the compute instances backing each cluster",
    },
    DetailLevel {
        ordinal: 4,
        name: "full",
        node_types: &[
            Region,
            Vpc,
            Subnet,
            Cluster,
            Database,
            LoadBalancer,
            Instance,
            Pod,
            Service,
        ],
        max_nodes: 50_000,
        description: "Every node type including pods and services",
    },
];

/// All detail levels, coarsest first
pub fn levels() -> &'static [DetailLevel] {
    &LEVELS
}

/// Look up a level by ordinal
pub fn level(ordinal: u8) -> Option<&'static DetailLevel> {
    LEVELS.get(usize::from(ordinal))
}

/// The most detailed level
pub fn full_level() -> &'static DetailLevel {
    &LEVELS[LEVELS.len() - 1]
}
