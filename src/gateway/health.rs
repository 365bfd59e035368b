//! Health of the authoritative graph store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the graph store answered its last health request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Answered within the slow-store threshold
    Healthy,
    /// Answered, but slower than the threshold
    Degraded,
    /// Did not answer, or answered with an error
    Unhealthy,
}

impl HealthStatus {
    /// Whether graph reads can still be served by the store
    pub fn is_operational(&self) -> bool {
        !matches!(self, HealthStatus::Unhealthy)
    }
}

/// Outcome of one store health request, as returned by `GraphAccess::health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    /// Round-trip time of the request
    pub response_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    /// Why the store was considered unhealthy
    pub error: Option<String>,
}

impl HealthCheckResult {
    /// The store answered; slow answers are reported as degraded
    pub fn healthy(response_time: Duration, degraded_threshold_ms: u64) -> Self {
        let response_time_ms = response_time.as_millis() as u64;
        let status = if response_time_ms > degraded_threshold_ms {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Self {
            status,
            response_time_ms,
            timestamp: Utc::now(),
            error: None,
        }
    }

    /// The store did not answer usefully
    pub fn unhealthy(response_time: Duration, error: &str) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            response_time_ms: response_time.as_millis() as u64,
            timestamp: Utc::now(),
            error: Some(error.to_string()),
        }
    }
}
