//! HTTP client for the authoritative graph store

use super::health::HealthCheckResult;
use super::wire::{ErrorBody, SearchResponse, SnapshotResponse};
use super::GraphStore;
use crate::cache::Viewport;
use crate::config::StoreConfig;
use crate::error::{GraphAccessError, Result};
use crate::levels::DetailLevel;
use crate::model::{
    DependencyPath, GraphMetrics, GraphNode, GraphSnapshot, NodeDetails, StatusUpdate,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Longest slice of a raw error body carried into `Rejected`
const MAX_ERROR_MESSAGE: usize = 200;

/// [`GraphStore`] backed by the store's JSON-over-HTTP API
pub struct HttpGraphStore {
    client: Client,
    base_url: Url,
    config: StoreConfig,
}

impl std::fmt::Debug for HttpGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGraphStore")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.config.timeout)
            .finish()
    }
}

impl HttpGraphStore {
    /// Build a client for the store at `config.base_url`
    ///
    /// # Example
    /// ```no_run
    /// use infragraph_access::config::StoreConfig;
    /// use infragraph_access::gateway::HttpGraphStore;
    ///
    /// let store = HttpGraphStore::new(StoreConfig::new("http://graph-store:8080/api"))?;
    /// # Ok::<(), infragraph_access::GraphAccessError>(())
    /// ```
    pub fn new(config: StoreConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim()).map_err(|e| {
            GraphAccessError::ConfigError(format!("invalid store url '{}': {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(GraphAccessError::ConfigError(format!(
                "store url '{}' cannot carry a path",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GraphAccessError::ConfigError(format!("http client: {}", e)))?;

        info!(
            "Graph store client ready for {} (timeout {:?})",
            base_url, config.timeout
        );

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Base URL with `segments` appended as percent-encoded path segments
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send a request and return the body of a 2xx answer
    async fn send(&self, operation: &'static str, request: RequestBuilder) -> Result<String> {
        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(operation, &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(operation, &e))?;

        if status.is_success() {
            Ok(body)
        } else {
            debug!("{} answered {}", operation, status);
            Err(classify_status(operation, status, &body))
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T> {
        let body = self.send(operation, request).await?;
        serde_json::from_str(&body).map_err(|e| GraphAccessError::malformed(operation, e.to_string()))
    }

    fn transport_error(&self, operation: &'static str, error: &reqwest::Error) -> GraphAccessError {
        let reason = if error.is_timeout() {
            format!("timed out after {:?}", self.config.timeout)
        } else {
            error.to_string()
        };
        warn!("{} failed: {}", operation, reason);
        GraphAccessError::upstream(operation, reason)
    }
}

/// Map a non-2xx answer onto the error taxonomy
///
/// 404 becomes `NotFound` carrying the store's message; callers narrow it to
/// the subject they asked about.
pub(crate) fn classify_status(operation: &str, status: StatusCode, body: &str) -> GraphAccessError {
    let code = status.as_u16();
    if status == StatusCode::NOT_FOUND {
        return GraphAccessError::NotFound(error_message(body));
    }
    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        return GraphAccessError::upstream(operation, format!("store answered {}", code));
    }
    if status.is_client_error() {
        return GraphAccessError::Rejected {
            status: code,
            message: error_message(body),
        };
    }
    GraphAccessError::upstream(operation, format!("unexpected status {}", code))
}

fn error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.message.or(parsed.detail) {
            return message;
        }
    }
    body.trim().chars().take(MAX_ERROR_MESSAGE).collect()
}

/// A 404 on a collection endpoint means the store does not serve it
fn missing_endpoint(operation: &'static str, error: GraphAccessError) -> GraphAccessError {
    match error {
        GraphAccessError::NotFound(_) => GraphAccessError::upstream(operation, "endpoint not found"),
        other => other,
    }
}

/// Restrict a store answer to what the level may show
pub(crate) fn sanitize_level_graph(
    snapshot: GraphSnapshot,
    level: &DetailLevel,
    category: Option<&str>,
) -> GraphSnapshot {
    let snapshot = snapshot.retain_nodes(|n| {
        level.includes(n.node_type)
            && category.map_or(true, |c| n.category.eq_ignore_ascii_case(c))
    });
    snapshot.truncated(level.max_nodes)
}

#[async_trait]
impl GraphStore for HttpGraphStore {
    async fn fetch_level_graph(
        &self,
        level: &DetailLevel,
        category: Option<&str>,
    ) -> Result<GraphSnapshot> {
        const OP: &str = "fetch_level_graph";
        let mut query = vec![
            ("level", level.ordinal.to_string()),
            ("max_nodes", level.max_nodes.to_string()),
        ];
        if let Some(category) = category {
            query.push(("category", category.to_string()));
        }

        debug!("GET /graph level={} category={:?}", level.ordinal, category);
        let request = self.client.get(self.endpoint(&["graph"])).query(&query);
        let response: SnapshotResponse = self
            .get_json(OP, request)
            .await
            .map_err(|e| missing_endpoint(OP, e))?;

        Ok(sanitize_level_graph(response.into_snapshot(), level, category))
    }

    async fn fetch_node_details(&self, node_id: &str) -> Result<NodeDetails> {
        let request = self
            .client
            .get(self.endpoint(&["nodes", node_id, "details"]));
        self.get_json("fetch_node_details", request)
            .await
            .map_err(|e| match e {
                GraphAccessError::NotFound(_) => GraphAccessError::NotFound(node_id.to_string()),
                other => other,
            })
    }

    async fn search_nodes(&self, query: &str, limit: usize) -> Result<Vec<GraphNode>> {
        const OP: &str = "search_nodes";
        let request = self
            .client
            .get(self.endpoint(&["search"]))
            .query(&[("query", query.to_string()), ("limit", limit.to_string())]);
        let response: SearchResponse = self
            .get_json(OP, request)
            .await
            .map_err(|e| missing_endpoint(OP, e))?;
        Ok(response.nodes)
    }

    async fn query_bounds(&self, viewport: &Viewport) -> Result<GraphSnapshot> {
        const OP: &str = "query_bounds";
        let request = self.client.get(self.endpoint(&["bounds"])).query(&[
            ("x1", viewport.min_x.to_string()),
            ("y1", viewport.min_y.to_string()),
            ("x2", viewport.max_x.to_string()),
            ("y2", viewport.max_y.to_string()),
            ("zoom", viewport.zoom.to_string()),
            ("max_nodes", viewport.max_nodes.to_string()),
        ]);
        let response: SnapshotResponse = self
            .get_json(OP, request)
            .await
            .map_err(|e| missing_endpoint(OP, e))?;
        Ok(response.into_snapshot().truncated(viewport.max_nodes))
    }

    async fn dependency_path(&self, source: &str, target: &str) -> Result<DependencyPath> {
        let no_path = || GraphAccessError::NoPathFound {
            from: source.to_string(),
            to: target.to_string(),
        };

        let request = self
            .client
            .get(self.endpoint(&["dependency-path", source, target]));
        let path: DependencyPath = self
            .get_json("dependency_path", request)
            .await
            .map_err(|e| match e {
                GraphAccessError::NotFound(_) => no_path(),
                other => other,
            })?;

        if path.nodes.is_empty() {
            return Err(no_path());
        }
        Ok(path)
    }

    async fn update_node_status(&self, node_id: &str, update: &StatusUpdate) -> Result<()> {
        let request = self
            .client
            .patch(self.endpoint(&["nodes", node_id, "status"]))
            .json(update);
        self.send("update_node_status", request)
            .await
            .map(|_| ())
            .map_err(|e| match e {
                GraphAccessError::NotFound(_) => GraphAccessError::NotFound(node_id.to_string()),
                other => other,
            })
    }

    async fn fetch_metrics(&self) -> Result<GraphMetrics> {
        const OP: &str = "fetch_metrics";
        let request = self.client.get(self.endpoint(&["metrics"]));
        self.get_json(OP, request)
            .await
            .map_err(|e| missing_endpoint(OP, e))
    }

    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let outcome = self
            .send("health_check", self.client.get(self.endpoint(&["health"])))
            .await;
        let elapsed = start.elapsed();

        match outcome {
            Ok(_) => {
                let result = HealthCheckResult::healthy(elapsed, self.config.degraded_threshold_ms);
                debug!(
                    "Store health: {:?} ({}ms)",
                    result.status, result.response_time_ms
                );
                result
            }
            Err(e) => {
                warn!("Store health probe failed: {}", e);
                HealthCheckResult::unhealthy(elapsed, &e.to_string())
            }
        }
    }
}
