//! Cache invalidation bookkeeping
//!
//! Invalidation removes entries whose views of the graph can no longer be
//! trusted. Staleness is not a reason: a stale entry reads as a miss and stays
//! until the next write to its key supersedes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reason for cache invalidation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidationReason {
    /// A node's status changed in the authoritative store
    NodeMutated { node_id: String },

    /// Invalidated by explicit request
    Manual,
}

impl std::fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidationReason::NodeMutated { node_id } => write!(f, "node mutated: {}", node_id),
            InvalidationReason::Manual => write!(f, "manual invalidation"),
        }
    }
}

/// Record of one invalidation pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationEvent {
    /// Reason for invalidation
    pub reason: InvalidationReason,

    /// Pattern the keys were matched against
    pub pattern: String,

    /// When the invalidation occurred
    pub timestamp: DateTime<Utc>,

    /// Keys that were removed
    pub keys: Vec<String>,
}

impl InvalidationEvent {
    /// Create a new invalidation event
    pub fn new(reason: InvalidationReason, pattern: impl Into<String>, keys: Vec<String>) -> Self {
        Self {
            reason,
            pattern: pattern.into(),
            timestamp: Utc::now(),
            keys,
        }
    }

    /// Number of entries removed
    pub fn removed(&self) -> usize {
        self.keys.len()
    }
}
