//! Level Browse Demo Application
//!
//! Walks every detail level of the infrastructure graph, reads each one twice
//! to show the cache at work, runs a search and a viewport query, then prints
//! cache and degradation counters.
//!
//! Usage:
//!   cargo run --example level_browse
//!
//! Environment variables:
//!   INFRAGRAPH_STORE_URL            - store base URL (default: http://localhost:8000/api)
//!   INFRAGRAPH_STORE_TIMEOUT_MS     - request timeout in milliseconds (default: 10000)
//!   INFRAGRAPH_CACHE_FRESHNESS_SECS - cache freshness window (default: 300)
//!   INFRAGRAPH_CACHE_MAX_ENTRIES    - cache entry limit (default: 1000)

use infragraph_access::{GraphAccess, GraphAccessConfig};
use std::time::Instant;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("=== Infrastructure Graph Level Browse ===");

    let config = GraphAccessConfig::from_env()?;
    info!("Using graph store at {}", config.store.base_url);
    let access = GraphAccess::from_config(config)?;

    let health = access.health().await;
    info!(
        "Store health: {:?} ({}ms){}",
        health.status,
        health.response_time_ms,
        health
            .error
            .as_deref()
            .map(|e| format!(" - {}", e))
            .unwrap_or_default()
    );

    for level in access.list_levels() {
        info!("\n--- Level {} ({}) ---", level.ordinal, level.name);
        info!("{}", level.description);

        for attempt in ["cold", "warm"] {
            let start = Instant::now();
            let graph = access.get_graph(level.ordinal, None).await?;
            info!(
                "  {} read: {} nodes, {} edges in {:?}{}",
                attempt,
                graph.nodes.len(),
                graph.edges.len(),
                start.elapsed(),
                if graph.metadata.synthesized {
                    " [fallback]"
                } else {
                    ""
                }
            );
            if attempt == "warm" {
                for (node_type, count) in graph.type_counts() {
                    info!("    {:>5} {}", count, node_type);
                }
            }
        }
    }

    info!("\n--- Search ---");
    for node in access.search("prod", 5).await {
        info!("  {} ({}, {})", node.id, node.node_type, node.status.as_str());
    }

    info!("\n--- Viewport ---");
    let viewport = access
        .get_nodes_in_bounds(0.0, 0.0, 1920.0, 1080.0, 1.0, 500)
        .await;
    info!("  {} nodes in view", viewport.nodes.len());

    info!("\n--- Counters ---");
    info!("  {}", access.cache_stats().await);
    info!("  {:?}", access.degradation_stats());

    Ok(())
}
