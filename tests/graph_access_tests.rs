//! Integration tests for the graph access facade
//!
//! An in-memory store with call counters and failure injection stands in for
//! the authoritative store, so every path through the facade (hit, miss,
//! coalesced miss, fallback, degradation, mutation) can be observed.

use async_trait::async_trait;
use futures::future::join_all;
use infragraph_access::cache::{
    CacheConfig, CacheStats, GraphCache, InvalidationEvent, InvalidationReason, SnapshotCache,
    Viewport,
};
use infragraph_access::gateway::{GraphStore, HealthCheckResult, HealthStatus};
use infragraph_access::levels::DetailLevel;
use infragraph_access::model::{
    DependencyPath, GraphEdge, GraphMetrics, GraphNode, GraphSnapshot, NodeDetails, NodeStatus,
    NodeType, StatusUpdate,
};
use infragraph_access::{GraphAccess, GraphAccessError, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct MockStore {
    nodes: Mutex<Vec<GraphNode>>,
    edges: Vec<GraphEdge>,
    fail_with: Mutex<Option<GraphAccessError>>,
    delay: Duration,
    level_calls: AtomicUsize,
    bounds_calls: AtomicUsize,
    search_calls: AtomicUsize,
}

impl MockStore {
    fn new() -> Self {
        let nodes = vec![
            GraphNode::new("us-east-1", "US East", NodeType::Region).with_status(NodeStatus::Healthy),
            GraphNode::new("vpc-trading", "Trading VPC", NodeType::Vpc),
            GraphNode::new("subnet-trading-a", "Trading A", NodeType::Subnet),
            GraphNode::new("eks-trading-prod", "Trading EKS", NodeType::Cluster)
                .with_status(NodeStatus::Healthy)
                .with_cost(4200.0),
            GraphNode::new("rds-orders", "Orders DB", NodeType::Database),
            GraphNode::new("alb-trading", "Trading ALB", NodeType::LoadBalancer),
            GraphNode::new("i-0abc", "worker-1", NodeType::Instance),
            GraphNode::new("pod-matcher", "matcher", NodeType::Pod),
            GraphNode::new("svc-orders", "orders", NodeType::Service),
        ];
        let edges = vec![
            GraphEdge::new("e1", "us-east-1", "vpc-trading", "contains"),
            GraphEdge::new("e2", "vpc-trading", "subnet-trading-a", "contains"),
            GraphEdge::new("e3", "vpc-trading", "eks-trading-prod", "contains"),
            GraphEdge::new("e4", "vpc-trading", "rds-orders", "contains"),
            GraphEdge::new("e5", "alb-trading", "eks-trading-prod", "routes-to"),
            GraphEdge::new("e6", "eks-trading-prod", "i-0abc", "contains"),
            GraphEdge::new("e7", "i-0abc", "pod-matcher", "contains"),
            GraphEdge::new("e8", "svc-orders", "rds-orders", "depends-on"),
        ];

        Self {
            nodes: Mutex::new(nodes),
            edges,
            fail_with: Mutex::new(None),
            delay: Duration::ZERO,
            level_calls: AtomicUsize::new(0),
            bounds_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn failing(self, error: GraphAccessError) -> Self {
        self.fail(error);
        self
    }

    fn fail(&self, error: GraphAccessError) {
        *self.fail_with.lock().unwrap() = Some(error);
    }

    fn recover(&self) {
        *self.fail_with.lock().unwrap() = None;
    }

    fn level_calls(&self) -> usize {
        self.level_calls.load(Ordering::SeqCst)
    }

    async fn respond(&self) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.fail_with.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn snapshot_where<F: Fn(&GraphNode) -> bool>(&self, keep: F) -> GraphSnapshot {
        let nodes: Vec<GraphNode> = self
            .nodes
            .lock()
            .unwrap()
            .iter()
            .filter(|n| keep(n))
            .cloned()
            .collect();
        GraphSnapshot::from_parts(nodes, self.edges.clone())
    }
}

fn upstream_down() -> GraphAccessError {
    GraphAccessError::UpstreamUnavailable {
        operation: "mock".to_string(),
        reason: "connection refused".to_string(),
    }
}

#[async_trait]
impl GraphStore for MockStore {
    async fn fetch_level_graph(
        &self,
        level: &DetailLevel,
        category: Option<&str>,
    ) -> Result<GraphSnapshot> {
        self.level_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        Ok(self
            .snapshot_where(|n| {
                level.includes(n.node_type) && category.map_or(true, |c| n.category == c)
            })
            .truncated(level.max_nodes))
    }

    async fn fetch_node_details(&self, node_id: &str) -> Result<NodeDetails> {
        self.respond().await?;
        let node = self
            .nodes
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.id == node_id)
            .cloned()
            .ok_or_else(|| GraphAccessError::NotFound(node_id.to_string()))?;
        Ok(NodeDetails {
            node,
            children: Vec::new(),
            dependencies: Vec::new(),
            metrics: Default::default(),
        })
    }

    async fn search_nodes(&self, query: &str, _limit: usize) -> Result<Vec<GraphNode>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        // Ignores the limit on purpose; the facade must enforce it
        Ok(self
            .nodes
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.id.contains(query) || n.label.contains(query))
            .cloned()
            .collect())
    }

    async fn query_bounds(&self, viewport: &Viewport) -> Result<GraphSnapshot> {
        self.bounds_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        Ok(self.snapshot_where(|_| true).truncated(viewport.max_nodes))
    }

    async fn dependency_path(&self, source: &str, target: &str) -> Result<DependencyPath> {
        self.respond().await?;
        Err(GraphAccessError::NoPathFound {
            from: source.to_string(),
            to: target.to_string(),
        })
    }

    async fn update_node_status(&self, node_id: &str, update: &StatusUpdate) -> Result<()> {
        self.respond().await?;
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes
            .iter_mut()
            .find(|n| n.id == node_id)
            .ok_or_else(|| GraphAccessError::NotFound(node_id.to_string()))?;
        node.status = update.status;
        Ok(())
    }

    async fn fetch_metrics(&self) -> Result<GraphMetrics> {
        self.respond().await?;
        let nodes = self.nodes.lock().unwrap();
        let mut nodes_by_type = BTreeMap::new();
        for node in nodes.iter() {
            *nodes_by_type.entry(node.node_type.to_string()).or_insert(0) += 1;
        }
        Ok(GraphMetrics {
            total_nodes: nodes.len(),
            total_edges: self.edges.len(),
            nodes_by_type,
            nodes_by_status: BTreeMap::new(),
            total_cost: Some(4200.0),
            last_updated: chrono::Utc::now(),
        })
    }

    async fn health_check(&self) -> HealthCheckResult {
        match self.respond().await {
            Ok(()) => HealthCheckResult::healthy(Duration::from_millis(1), 1000),
            Err(e) => HealthCheckResult::unhealthy(Duration::from_millis(1), &e.to_string()),
        }
    }
}

fn setup(store: MockStore) -> (GraphAccess, Arc<MockStore>, Arc<GraphCache>) {
    setup_with_cache(store, CacheConfig::default())
}

fn setup_with_cache(
    store: MockStore,
    config: CacheConfig,
) -> (GraphAccess, Arc<MockStore>, Arc<GraphCache>) {
    let store = Arc::new(store);
    let cache = Arc::new(GraphCache::new(config));
    let access = GraphAccess::new(
        store.clone() as Arc<dyn GraphStore>,
        cache.clone() as Arc<dyn SnapshotCache>,
    );
    (access, store, cache)
}

#[tokio::test]
async fn test_second_read_is_served_from_cache() {
    let (access, store, cache) = setup(MockStore::new());

    let first = access.get_graph(2, None).await.unwrap();
    assert_eq!(store.level_calls(), 1);
    assert!(cache.contains_key("graph-2-all").await);

    let second = access.get_graph(2, None).await.unwrap();
    assert_eq!(store.level_calls(), 1);
    assert!(Arc::ptr_eq(&first, &second));

    for node in &first.nodes {
        assert!(matches!(
            node.node_type,
            NodeType::Region
                | NodeType::Vpc
                | NodeType::Subnet
                | NodeType::Cluster
                | NodeType::Database
                | NodeType::LoadBalancer
        ));
    }

    let stats = access.cache_stats().await;
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn test_equivalent_categories_share_one_fetch() {
    let (access, store, cache) = setup(MockStore::new());

    let a = access.get_graph(1, Some(" Network ")).await.unwrap();
    let b = access.get_graph(1, Some("network")).await.unwrap();

    assert_eq!(store.level_calls(), 1);
    assert!(Arc::ptr_eq(&a, &b));
    assert!(cache.contains_key("graph-1-network").await);
    assert!(a.nodes.iter().all(|n| n.category == "network"));
}

#[tokio::test]
async fn test_unknown_level_is_rejected_without_a_fetch() {
    let (access, store, _cache) = setup(MockStore::new());

    let result = access.get_graph(9, None).await;
    assert_eq!(result.unwrap_err(), GraphAccessError::InvalidLevel(9));
    assert_eq!(store.level_calls(), 0);
}

#[tokio::test]
async fn test_unreachable_store_serves_uncached_fallback() {
    let (access, store, cache) = setup(MockStore::new().failing(upstream_down()));

    let graph = access.get_graph(0, None).await.unwrap();
    assert_eq!(graph.nodes.len(), 1);
    assert_eq!(graph.nodes[0].node_type, NodeType::Region);
    assert_eq!(graph.nodes[0].status, NodeStatus::Unknown);
    assert!(graph.metadata.synthesized);
    assert!(!cache.contains_key("graph-0-all").await);

    // Each failed read goes back to the store and re-synthesizes
    access.get_graph(0, None).await.unwrap();
    assert_eq!(store.level_calls(), 2);
    assert_eq!(access.degradation_stats().fallbacks_served, 2);

    // Once the store recovers the real graph is cached
    store.recover();
    let graph = access.get_graph(0, None).await.unwrap();
    assert!(!graph.metadata.synthesized);
    assert_eq!(graph.nodes[0].id, "us-east-1");
    assert!(cache.contains_key("graph-0-all").await);
}

#[tokio::test]
async fn test_fallback_contains_only_level_types() {
    let (access, _store, _cache) = setup(MockStore::new().failing(upstream_down()));

    for level in access.list_levels() {
        let graph = access.get_graph(level.ordinal, None).await.unwrap();
        assert!(graph.nodes.iter().all(|n| level.includes(n.node_type)));
        for edge in &graph.edges {
            assert!(graph.contains_node(&edge.source));
            assert!(graph.contains_node(&edge.target));
        }
    }
}

#[tokio::test]
async fn test_malformed_response_propagates() {
    let malformed = GraphAccessError::MalformedResponse {
        operation: "fetch_level_graph".to_string(),
        reason: "missing field `nodes`".to_string(),
    };
    let (access, _store, _cache) = setup(MockStore::new().failing(malformed.clone()));

    let result = access.get_graph(1, None).await;
    assert_eq!(result.unwrap_err(), malformed);
    assert_eq!(access.degradation_stats().fallbacks_served, 0);
}

#[tokio::test]
async fn test_search_respects_limit() {
    let (access, _store, _cache) = setup(MockStore::new());

    let results = access.search("-", 3).await;
    assert_eq!(results.len(), 3);

    assert!(access.search("-", 0).await.is_empty());
}

#[tokio::test]
async fn test_search_failure_yields_empty_list() {
    let (access, store, _cache) = setup(MockStore::new().failing(upstream_down()));

    let results = access.search("trading", 10).await;
    assert!(results.is_empty());
    assert_eq!(store.search_calls.load(Ordering::SeqCst), 1);
    assert_eq!(access.degradation_stats().search_failures, 1);
}

#[tokio::test]
async fn test_bounds_failure_yields_empty_graph() {
    let (access, _store, cache) = setup(MockStore::new().failing(upstream_down()));

    let graph = access.get_nodes_in_bounds(0.0, 0.0, 800.0, 600.0, 1.0, 100).await;
    assert!(graph.nodes.is_empty());
    assert!(graph.edges.is_empty());
    assert_eq!(access.degradation_stats().bounds_failures, 1);
    assert_eq!(cache.len().await, 0);
}

#[tokio::test]
async fn test_swapped_corners_share_cached_bounds() {
    let (access, store, _cache) = setup(MockStore::new());

    let a = access.get_nodes_in_bounds(0.0, 0.0, 800.0, 600.0, 1.0, 4).await;
    let b = access.get_nodes_in_bounds(800.0, 600.0, 0.0, 0.0, 1.0, 4).await;

    assert_eq!(store.bounds_calls.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.nodes.len(), 4);
}

#[tokio::test]
async fn test_non_finite_bounds_skip_the_store() {
    let (access, store, _cache) = setup(MockStore::new());

    let graph = access
        .get_nodes_in_bounds(f64::NAN, 0.0, 800.0, 600.0, 1.0, 100)
        .await;
    assert!(graph.is_empty());
    assert_eq!(store.bounds_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_status_update_invalidates_graph_views() {
    let (access, store, cache) = setup(MockStore::new());

    access.get_graph(2, None).await.unwrap();
    access.get_nodes_in_bounds(0.0, 0.0, 10.0, 10.0, 1.0, 50).await;
    cache.put("session-layout", Arc::new(GraphSnapshot::empty())).await;

    access
        .update_node_status("eks-trading-prod", NodeStatus::Degraded, None)
        .await
        .unwrap();

    assert!(!cache.contains_key("graph-2-all").await);
    assert!(cache.contains_key("session-layout").await);

    let graph = access.get_graph(2, None).await.unwrap();
    assert_eq!(store.level_calls(), 2);
    let cluster = graph
        .nodes
        .iter()
        .find(|n| n.id == "eks-trading-prod")
        .unwrap();
    assert_eq!(cluster.status, NodeStatus::Degraded);
}

#[tokio::test]
async fn test_failed_status_update_keeps_cache() {
    let (access, _store, cache) = setup(MockStore::new());

    access.get_graph(1, None).await.unwrap();
    let result = access
        .update_node_status("does-not-exist", NodeStatus::Offline, None)
        .await;

    assert_eq!(
        result.unwrap_err(),
        GraphAccessError::NotFound("does-not-exist".to_string())
    );
    assert!(cache.contains_key("graph-1-all").await);
}

#[tokio::test]
async fn test_concurrent_misses_share_one_fetch() {
    let (access, store, _cache) =
        setup(MockStore::new().with_delay(Duration::from_millis(50)));

    let results = join_all((0..8).map(|_| access.get_graph(3, None))).await;

    assert_eq!(store.level_calls(), 1);
    let first = results[0].as_ref().unwrap();
    for result in &results {
        assert!(Arc::ptr_eq(first, result.as_ref().unwrap()));
    }
    assert_eq!(access.degradation_stats().coalesced_waits, 7);
    assert_eq!(access.in_flight(), 0);
}

#[tokio::test]
async fn test_shared_failure_falls_back_for_every_waiter() {
    let (access, store, cache) = setup(
        MockStore::new()
            .with_delay(Duration::from_millis(20))
            .failing(upstream_down()),
    );

    let results = join_all((0..4).map(|_| access.get_graph(1, Some("network")))).await;

    assert_eq!(store.level_calls(), 1);
    for result in results {
        let graph = result.unwrap();
        assert!(graph.metadata.synthesized);
        assert!(graph.nodes.iter().all(|n| n.category == "network"));
    }
    assert_eq!(access.degradation_stats().fallbacks_served, 4);
    assert!(!cache.contains_key("graph-1-network").await);
}

#[tokio::test]
async fn test_abandoned_request_still_populates_cache() {
    let (access, store, cache) =
        setup(MockStore::new().with_delay(Duration::from_millis(100)));

    let abandoned = tokio::time::timeout(Duration::from_millis(10), access.get_graph(2, None)).await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(cache.contains_key("graph-2-all").await);

    access.get_graph(2, None).await.unwrap();
    assert_eq!(store.level_calls(), 1);
}

#[tokio::test]
async fn test_fetch_overtaken_by_mutation_is_not_cached() {
    let (access, _store, cache) =
        setup(MockStore::new().with_delay(Duration::from_millis(100)));
    let access = Arc::new(access);

    let reader = {
        let access = Arc::clone(&access);
        tokio::spawn(async move { access.get_graph(2, None).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    access
        .update_node_status("rds-orders", NodeStatus::Critical, None)
        .await
        .unwrap();

    assert!(reader.await.unwrap().is_ok());
    assert!(!cache.contains_key("graph-2-all").await);
}

/// Cache whose writes reach the lock only after a pause
struct SlowWrites {
    inner: GraphCache,
    delay: Duration,
}

#[async_trait]
impl SnapshotCache for SlowWrites {
    async fn get(&self, key: &str) -> Option<Arc<GraphSnapshot>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, snapshot: Arc<GraphSnapshot>) {
        tokio::time::sleep(self.delay).await;
        self.inner.put(key, snapshot).await
    }

    async fn put_if(
        &self,
        key: &str,
        snapshot: Arc<GraphSnapshot>,
        still_valid: &(dyn Fn() -> bool + Sync),
    ) -> bool {
        tokio::time::sleep(self.delay).await;
        self.inner.put_if(key, snapshot, still_valid).await
    }

    async fn invalidate_with_reason(
        &self,
        pattern: &str,
        reason: InvalidationReason,
    ) -> InvalidationEvent {
        self.inner.invalidate_with_reason(pattern, reason).await
    }

    async fn clear(&self) {
        self.inner.clear().await
    }

    async fn stats(&self) -> CacheStats {
        self.inner.stats().await
    }
}

#[tokio::test]
async fn test_mutation_during_cache_write_is_not_overwritten() {
    let cache = Arc::new(SlowWrites {
        inner: GraphCache::new(CacheConfig::default()),
        delay: Duration::from_millis(100),
    });
    let access = Arc::new(GraphAccess::new(
        Arc::new(MockStore::new()) as Arc<dyn GraphStore>,
        cache.clone() as Arc<dyn SnapshotCache>,
    ));

    let reader = {
        let access = Arc::clone(&access);
        tokio::spawn(async move { access.get_graph(2, None).await })
    };
    // The fetch has returned and its write is waiting to land
    tokio::time::sleep(Duration::from_millis(30)).await;

    access
        .update_node_status("eks-trading-prod", NodeStatus::Degraded, None)
        .await
        .unwrap();

    assert!(reader.await.unwrap().is_ok());
    assert!(!cache.inner.contains_key("graph-2-all").await);

    let graph = access.get_graph(2, None).await.unwrap();
    let cluster = graph.nodes.iter().find(|n| n.id == "eks-trading-prod").unwrap();
    assert_eq!(cluster.status, NodeStatus::Degraded);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_back_to_back_fetches_never_lose_waiters() {
    // Nothing fits in the cache, so every read starts or joins a fetch
    let config = CacheConfig::builder().max_size_bytes(1).build();
    let (access, store, _cache) = setup_with_cache(MockStore::new(), config);
    let access = Arc::new(access);

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let access = Arc::clone(&access);
            tokio::spawn(async move {
                let mut synthesized = 0;
                for _ in 0..500 {
                    if access.get_graph(0, None).await.unwrap().metadata.synthesized {
                        synthesized += 1;
                    }
                }
                synthesized
            })
        })
        .collect();

    let mut synthesized = 0;
    for reader in readers {
        synthesized += reader.await.unwrap();
    }

    assert_eq!(synthesized, 0);
    assert_eq!(access.degradation_stats().fallbacks_served, 0);
    assert!(store.level_calls() > 0);
    assert_eq!(access.in_flight(), 0);
}

#[tokio::test]
async fn test_pass_through_operations() {
    let (access, _store, _cache) = setup(MockStore::new());

    let details = access.get_node_details("rds-orders").await.unwrap();
    assert_eq!(details.node.node_type, NodeType::Database);
    assert_eq!(
        access.get_node_details("nope").await.unwrap_err(),
        GraphAccessError::NotFound("nope".to_string())
    );

    let path = access.get_dependency_path("svc-orders", "us-east-1").await;
    assert!(matches!(path, Err(GraphAccessError::NoPathFound { .. })));

    let metrics = access.get_metrics().await.unwrap();
    assert_eq!(metrics.total_nodes, 9);
    assert_eq!(metrics.nodes_by_type.get("cluster"), Some(&1));

    assert_eq!(access.health().await.status, HealthStatus::Healthy);
}

#[tokio::test]
async fn test_metrics_are_not_cached_and_errors_propagate() {
    let (access, store, cache) = setup(MockStore::new());

    access.get_metrics().await.unwrap();
    assert_eq!(cache.len().await, 0);

    store.fail(upstream_down());
    assert!(access.get_metrics().await.unwrap_err().is_recoverable());
    assert_eq!(access.health().await.status, HealthStatus::Unhealthy);
}

#[tokio::test]
async fn test_clear_cache() {
    let (access, store, _cache) = setup(MockStore::new());

    access.get_graph(0, None).await.unwrap();
    access.clear_cache().await;
    assert_eq!(access.cache_stats().await.entries, 0);

    access.get_graph(0, None).await.unwrap();
    assert_eq!(store.level_calls(), 2);
}

#[test]
fn test_level_catalog_is_exposed() {
    let (access, _store, _cache) = setup(MockStore::new());
    let levels = access.list_levels();

    assert_eq!(levels.len(), 5);
    assert_eq!(levels[0].node_types, &[NodeType::Region]);
    assert!(levels.last().unwrap().is_full());
}
