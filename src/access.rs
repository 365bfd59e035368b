//! Graph access facade
//!
//! [`GraphAccess`] is the one entry point consumers use. Every snapshot query
//! walks the same path: canonical key, cache check, then on a miss a single
//! shared fetch per key whose outcome is cached and handed to every caller
//! that asked for that key while it was running. Level queries that fail
//! because the store is unreachable are answered with a synthesized skeleton;
//! search and viewport queries degrade to empty results.
//!
//! Fetches run in their own task, so a caller that gives up does not cancel
//! the fetch; it still completes and populates the cache.

use crate::cache::{
    normalize_category, CacheKey, CacheStats, GraphCache, InvalidationReason, SnapshotCache,
    Viewport, GRAPH_NAMESPACE,
};
use crate::config::GraphAccessConfig;
use crate::error::{GraphAccessError, Result};
use crate::fallback;
use crate::gateway::{GraphStore, HealthCheckResult, HttpGraphStore};
use crate::levels::{self, DetailLevel};
use crate::model::{
    Attributes, DependencyPath, GraphMetrics, GraphNode, GraphSnapshot, NodeDetails, NodeStatus,
    StatusUpdate,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

type FetchOutcome = Result<Arc<GraphSnapshot>>;
type Waiter = oneshot::Sender<FetchOutcome>;

/// Snapshot queries that go through the cache
#[derive(Debug, Clone)]
enum SnapshotQuery {
    Level {
        level: &'static DetailLevel,
        category: Option<String>,
    },
    Bounds(Viewport),
}

impl SnapshotQuery {
    fn operation(&self) -> &'static str {
        match self {
            SnapshotQuery::Level { .. } => "fetch_level_graph",
            SnapshotQuery::Bounds(_) => "query_bounds",
        }
    }

    async fn run(&self, store: &dyn GraphStore) -> Result<GraphSnapshot> {
        match self {
            SnapshotQuery::Level { level, category } => {
                store.fetch_level_graph(level, category.as_deref()).await
            }
            SnapshotQuery::Bounds(viewport) => store.query_bounds(viewport).await,
        }
    }
}

/// Callers waiting on a fetch, per rendered cache key
#[derive(Default)]
struct InFlight {
    pending: Mutex<HashMap<String, Vec<Waiter>>>,
}

impl InFlight {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Waiter>>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a waiter; returns true when no fetch for `key` was running
    fn join(&self, key: &str, waiter: Waiter) -> bool {
        let mut pending = self.lock();
        match pending.get_mut(key) {
            Some(waiters) => {
                waiters.push(waiter);
                false
            }
            None => {
                pending.insert(key.to_string(), vec![waiter]);
                true
            }
        }
    }

    fn take(&self, key: &str) -> Vec<Waiter> {
        self.lock().remove(key).unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Ownership of one running fetch
///
/// Dropping it without [`Flight::finish`] (the task panicked) releases the
/// waiters, who then see a closed channel instead of hanging.
struct Flight {
    key: String,
    table: Arc<InFlight>,
    finished: bool,
}

impl Flight {
    fn new(key: String, table: Arc<InFlight>) -> Self {
        Self {
            key,
            table,
            finished: false,
        }
    }

    fn finish(mut self, outcome: FetchOutcome) {
        // Once taken, the key may belong to a newer fetch; drop must not touch it
        self.finished = true;
        for waiter in self.table.take(&self.key) {
            // receiver gone means that caller stopped waiting
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for Flight {
    fn drop(&mut self) {
        if !self.finished {
            self.table.take(&self.key);
        }
    }
}

#[derive(Debug, Default)]
struct DegradationCounters {
    search_failures: AtomicU64,
    bounds_failures: AtomicU64,
    fallbacks_served: AtomicU64,
    coalesced_waits: AtomicU64,
}

/// How often the facade answered with a degraded result instead of an error
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DegradationStats {
    /// Searches answered with an empty list because the store failed
    pub search_failures: u64,
    /// Viewport queries answered with an empty snapshot because the store failed
    pub bounds_failures: u64,
    /// Level queries answered with a synthesized snapshot
    pub fallbacks_served: u64,
    /// Cache misses that joined a fetch already running for the same key
    pub coalesced_waits: u64,
}

/// Cache-first access to the infrastructure dependency graph
pub struct GraphAccess {
    store: Arc<dyn GraphStore>,
    cache: Arc<dyn SnapshotCache>,
    in_flight: Arc<InFlight>,
    degradation: DegradationCounters,
    /// Bumped on every mutation; fetches started under an older generation
    /// do not write their result back
    generation: Arc<AtomicU64>,
}

impl GraphAccess {
    /// Facade over an explicit store and cache
    pub fn new(store: Arc<dyn GraphStore>, cache: Arc<dyn SnapshotCache>) -> Self {
        Self {
            store,
            cache,
            in_flight: Arc::new(InFlight::default()),
            degradation: DegradationCounters::default(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Facade over the HTTP store and the in-process cache
    ///
    /// # Example
    /// ```no_run
    /// use infragraph_access::{GraphAccess, GraphAccessConfig};
    ///
    /// # async fn example() -> infragraph_access::Result<()> {
    /// let access = GraphAccess::from_config(GraphAccessConfig::from_env()?)?;
    /// let regions = access.get_graph(0, None).await?;
    /// println!("{} regions", regions.nodes.len());
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_config(config: GraphAccessConfig) -> Result<Self> {
        config.validate()?;
        let store = HttpGraphStore::new(config.store)?;
        let cache = GraphCache::new(config.cache);
        Ok(Self::new(Arc::new(store), Arc::new(cache)))
    }

    /// Graph visible at `level`, optionally restricted to one category
    ///
    /// When the store is unreachable the answer is a synthesized skeleton
    /// flagged `metadata.synthesized`; it is never cached.
    pub async fn get_graph(&self, level: u8, category: Option<&str>) -> Result<Arc<GraphSnapshot>> {
        let detail = levels::level(level).ok_or(GraphAccessError::InvalidLevel(level))?;
        let category = normalize_category(category);
        let key = CacheKey::level(level, category.as_deref()).to_string();

        let query = SnapshotQuery::Level {
            level: detail,
            category: category.clone(),
        };
        match self.load(key, query).await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) if e.is_recoverable() => {
                warn!("Serving fallback graph for level {}: {}", level, e);
                self.degradation
                    .fallbacks_served
                    .fetch_add(1, Ordering::Relaxed);
                Ok(Arc::new(fallback::synthesize(detail, category.as_deref())))
            }
            Err(e) => {
                error!("Level {} graph query failed: {}", level, e);
                Err(e)
            }
        }
    }

    /// Nodes and edges inside a viewport; empty when the store fails
    pub async fn get_nodes_in_bounds(
        &self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        zoom: f64,
        max_nodes: usize,
    ) -> Arc<GraphSnapshot> {
        let viewport = Viewport::new(x1, y1, x2, y2, zoom, max_nodes);
        if !viewport.is_finite() {
            warn!("Ignoring viewport query with non-finite bounds: {:?}", viewport);
            return Arc::new(GraphSnapshot::empty());
        }

        let key = CacheKey::bounds(viewport).to_string();
        match self.load(key, SnapshotQuery::Bounds(viewport)).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.degradation
                    .bounds_failures
                    .fetch_add(1, Ordering::Relaxed);
                warn!("Viewport query failed, returning empty graph: {}", e);
                Arc::new(GraphSnapshot::empty())
            }
        }
    }

    pub async fn get_node_details(&self, node_id: &str) -> Result<NodeDetails> {
        self.store.fetch_node_details(node_id).await
    }

    /// Fuzzy node search; at most `limit` results, empty when the store fails
    pub async fn search(&self, query: &str, limit: usize) -> Vec<GraphNode> {
        if limit == 0 {
            return Vec::new();
        }
        match self.store.search_nodes(query, limit).await {
            Ok(mut nodes) => {
                nodes.truncate(limit);
                nodes
            }
            Err(e) => {
                self.degradation
                    .search_failures
                    .fetch_add(1, Ordering::Relaxed);
                warn!("Search for '{}' failed, returning no results: {}", query, e);
                Vec::new()
            }
        }
    }

    /// Graph-wide summary numbers, always fetched live
    pub async fn get_metrics(&self) -> Result<GraphMetrics> {
        self.store.fetch_metrics().await
    }

    pub async fn get_dependency_path(&self, source: &str, target: &str) -> Result<DependencyPath> {
        self.store.dependency_path(source, target).await
    }

    /// Change a node's status, then drop every cached graph view
    pub async fn update_node_status(
        &self,
        node_id: &str,
        status: NodeStatus,
        properties: Option<Attributes>,
    ) -> Result<()> {
        let update = StatusUpdate { status, properties };
        self.store.update_node_status(node_id, &update).await?;

        self.generation.fetch_add(1, Ordering::SeqCst);
        let event = self
            .cache
            .invalidate_with_reason(
                GRAPH_NAMESPACE,
                InvalidationReason::NodeMutated {
                    node_id: node_id.to_string(),
                },
            )
            .await;
        info!(
            "Set {} to {}; invalidated {} cached views",
            node_id,
            status.as_str(),
            event.removed()
        );
        Ok(())
    }

    /// The detail-level catalog, coarsest first
    pub fn list_levels(&self) -> &'static [DetailLevel] {
        levels::levels()
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        info!("Graph cache cleared");
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub fn degradation_stats(&self) -> DegradationStats {
        let c = &self.degradation;
        DegradationStats {
            search_failures: c.search_failures.load(Ordering::Relaxed),
            bounds_failures: c.bounds_failures.load(Ordering::Relaxed),
            fallbacks_served: c.fallbacks_served.load(Ordering::Relaxed),
            coalesced_waits: c.coalesced_waits.load(Ordering::Relaxed),
        }
    }

    pub async fn health(&self) -> HealthCheckResult {
        self.store.health_check().await
    }

    /// Number of keys with a fetch currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Cache hit, or the outcome of the one fetch running for `key`
    async fn load(&self, key: String, query: SnapshotQuery) -> FetchOutcome {
        if let Some(snapshot) = self.cache.get(&key).await {
            debug!("Cache hit: {}", key);
            return Ok(snapshot);
        }

        let operation = query.operation();
        let (tx, rx) = oneshot::channel();
        if self.in_flight.join(&key, tx) {
            debug!("Cache miss: {}, fetching", key);
            self.spawn_fetch(key, query);
        } else {
            debug!("Cache miss: {}, joining running fetch", key);
            self.degradation
                .coalesced_waits
                .fetch_add(1, Ordering::Relaxed);
        }

        rx.await.unwrap_or_else(|_| {
            Err(GraphAccessError::upstream(
                operation,
                "fetch ended without a result",
            ))
        })
    }

    fn spawn_fetch(&self, key: String, query: SnapshotQuery) {
        let store = Arc::clone(&self.store);
        let cache = Arc::clone(&self.cache);
        let generation = Arc::clone(&self.generation);
        let flight = Flight::new(key, Arc::clone(&self.in_flight));
        let started = generation.load(Ordering::SeqCst);

        tokio::spawn(async move {
            let outcome = query.run(store.as_ref()).await.map(Arc::new);

            match &outcome {
                Ok(snapshot) => {
                    // Checked under the cache's write lock so a mutation's
                    // invalidation cannot land between check and insert
                    let unchanged = || generation.load(Ordering::SeqCst) == started;
                    if !cache.put_if(&flight.key, Arc::clone(snapshot), &unchanged).await {
                        debug!("Fetch of {} not cached", flight.key);
                    }
                }
                Err(e) => debug!("Fetch for {} failed: {}", flight.key, e),
            }

            flight.finish(outcome);
        });
    }
}
