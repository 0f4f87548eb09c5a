//! The node relevance predicate.
//!
//! Decides which source points become derived network nodes. Relevance is
//! recomputed from the current source graph on every derivation pass; a
//! derived node exists exactly while this predicate holds for its point.

use crate::{
    config::ForgeConfig,
    resolve::resolve_line,
    source::SourceGraph,
};

pub const TAG_PUBLIC_TRANSPORT: &str = "public_transport";
pub const V_STOP_POSITION: &str = "stop_position";

/// A point is relevant iff it is live and at least one live qualifying line
/// refers to it where it is an endpoint, a junction of two or more
/// qualifying lines, kept wholesale by the keep-paths toggle, or tagged as
/// a transit stop position.
pub fn is_relevant(graph: &SourceGraph, config: &ForgeConfig, point_id: i64) -> bool {
    let Some(point) = graph.point(point_id) else {
        return false;
    };
    if !point.live {
        return false;
    }

    let qualifying: Vec<_> = graph
        .referring_lines(point_id)
        .filter(|line| {
            resolve_line(&line.tags, &config.defaults, config.hierarchy_cutoff)
                .is_some_and(|spec| spec.is_open())
        })
        .collect();
    if qualifying.is_empty() {
        return false;
    }

    if config.keep_paths {
        return true;
    }
    if point.tags.is(TAG_PUBLIC_TRANSPORT, V_STOP_POSITION) {
        return true;
    }
    if qualifying.len() >= 2 {
        return true;
    }
    qualifying.iter().any(|line| line.is_endpoint(point_id))
}
