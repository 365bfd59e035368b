//! Canonical cache keys
//!
//! Two logically identical queries must render to the same key regardless of
//! argument order or casing, so keys are built from normalized parts rather
//! than concatenated request parameters.

use std::fmt;

/// Prefix shared by every key that caches a view of graph content
pub const GRAPH_NAMESPACE: &str = "graph-";

/// Category value that means "no filter"
const ALL_CATEGORIES: &str = "all";

/// A rectangular viewport plus zoom and node budget
///
/// Corners are stored as min/max so swapped corners describe the same region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub zoom: f64,
    pub max_nodes: usize,
}

impl Viewport {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64, zoom: f64, max_nodes: usize) -> Self {
        let (min_x, max_x) = ordered(x1, x2);
        let (min_y, max_y) = ordered(y1, y2);
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
            zoom,
            max_nodes,
        }
    }

    /// All coordinates and the zoom are finite numbers
    pub fn is_finite(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y, self.zoom]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Structured cache key for a graph query
#[derive(Debug, Clone, PartialEq)]
pub enum CacheKey {
    /// Whole-level graph, optionally restricted to one category
    Level { level: u8, category: Option<String> },
    /// Viewport query
    Bounds(Viewport),
}

impl CacheKey {
    /// Key for a level query; the category is normalized
    pub fn level(level: u8, category: Option<&str>) -> Self {
        CacheKey::Level {
            level,
            category: normalize_category(category),
        }
    }

    /// Key for a viewport query
    pub fn bounds(viewport: Viewport) -> Self {
        CacheKey::Bounds(viewport)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Level { level, category } => write!(
                f,
                "{}{}-{}",
                GRAPH_NAMESPACE,
                level,
                category.as_deref().unwrap_or(ALL_CATEGORIES)
            ),
            CacheKey::Bounds(v) => write!(
                f,
                "{}bounds-{:.3}_{:.3}_{:.3}_{:.3}-z{:.3}-n{}",
                GRAPH_NAMESPACE,
                canonical(v.min_x),
                canonical(v.min_y),
                canonical(v.max_x),
                canonical(v.max_y),
                canonical(v.zoom),
                v.max_nodes
            ),
        }
    }
}

/// Trim and lowercase a category filter; blank or "all" means no filter
pub fn normalize_category(category: Option<&str>) -> Option<String> {
    let category = category?.trim().to_lowercase();
    if category.is_empty() || category == ALL_CATEGORIES {
        None
    } else {
        Some(category)
    }
}

/// Order two coordinates; NaN is kept so `is_finite` can reject it
fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a.is_nan() || b.is_nan() {
        (f64::NAN, f64::NAN)
    } else {
        (a.min(b), a.max(b))
    }
}

/// Round to key precision and fold negative zero into zero
fn canonical(value: f64) -> f64 {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
