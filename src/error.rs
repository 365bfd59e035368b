//! Error types for graph access operations
//!
//! Every failure the access layer can surface is described here. The taxonomy
//! drives the facade's recovery decisions: only [`GraphAccessError::UpstreamUnavailable`]
//! on a level-graph query is answered with a synthesized snapshot.

use thiserror::Error;

/// Main error type for graph access operations
///
/// The error is `Clone` so one upstream outcome can be handed to every caller
/// that was coalesced onto the same fetch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphAccessError {
    /// Network failure, timeout or 5xx from the authoritative store
    #[error("Upstream unavailable during {operation}: {reason}")]
    UpstreamUnavailable { operation: String, reason: String },

    /// The store answered, but the payload does not fit the data model
    #[error("Malformed response from {operation}: {reason}")]
    MalformedResponse { operation: String, reason: String },

    /// Unknown node identifier
    #[error("Node not found: {0}")]
    NotFound(String),

    /// Source and target are topologically disconnected
    #[error("No dependency path from {from} to {to}")]
    NoPathFound { from: String, to: String },

    /// The store refused the request (4xx other than 404)
    #[error("Request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Requested detail level is not in the catalog
    #[error("Unknown detail level: {0}")]
    InvalidLevel(u8),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for graph access operations
pub type Result<T> = std::result::Result<T, GraphAccessError>;

impl GraphAccessError {
    pub(crate) fn upstream(operation: &str, reason: impl Into<String>) -> Self {
        GraphAccessError::UpstreamUnavailable {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(operation: &str, reason: impl Into<String>) -> Self {
        GraphAccessError::MalformedResponse {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether a level-graph query may answer this error with a fallback snapshot
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GraphAccessError::UpstreamUnavailable { .. })
    }
}
