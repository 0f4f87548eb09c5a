//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use netforge_core::{
    config::ForgeConfig,
    derive::NetworkEngine,
    source::{Coord, ElementId, Member, SourceGraph, TagMap},
};

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times — subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

#[allow(dead_code)]
pub fn residential_tags() -> TagMap {
    TagMap::from_pairs([("highway", "residential")])
}

/// Insert untagged points at the given (id, lon, lat) triples and a line
/// over them carrying `tags`.
#[allow(dead_code)]
pub fn add_line(graph: &mut SourceGraph, line_id: i64, points: &[(i64, f64, f64)], tags: TagMap) {
    for (id, lon, lat) in points {
        graph.insert_point(*id, Coord::new(*lon, *lat), TagMap::new());
    }
    graph.insert_line(line_id, points.iter().map(|(id, _, _)| *id).collect(), tags);
}

/// A platform point wrapped in its own stop-area group.
#[allow(dead_code)]
pub fn add_stop_area(
    graph: &mut SourceGraph,
    group_id: i64,
    platform_point: i64,
    coord: Coord,
    ref_id: &str,
) {
    graph.insert_point(platform_point, coord, TagMap::new());
    graph.insert_group(
        group_id,
        vec![Member::new("platform", ElementId::Point(platform_point))],
        TagMap::from_pairs([("public_transport", "stop_area"), ("ref", ref_id)]),
    );
}

/// An engine over the default configuration, fully derived against `graph`.
#[allow(dead_code)]
pub fn derived_engine(graph: &SourceGraph) -> NetworkEngine {
    let mut engine = NetworkEngine::new(ForgeConfig::default());
    engine.visit_all(graph).unwrap();
    engine
}
