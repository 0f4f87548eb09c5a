//! Export projection: a standalone copy of the derived graph keyed by
//! stable identifiers, ready for any target writer.
//!
//! Session-local identifiers never leave the engine. The projection
//! substitutes each entity's stable identifier and re-links all cross
//! references through that substitution. Routes tombstoned during editing
//! and transit lines left with no surviving routes are swept here; a
//! dangling stop or link reference is dropped with a warning, never an
//! error, so projection is total over anything an editor can produce.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    derive::{
        transit::{TAG_NAME, TAG_REF},
        Departure, DerivationStore,
    },
    source::{Coord, SourceGraph},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportNode {
    pub id: String,
    pub coord: Coord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportLink {
    pub id: String,
    pub from: String,
    pub to: String,
    pub length_m: f64,
    pub freespeed: f64,
    pub capacity: f64,
    pub lanes_per_direction: f64,
    pub modes: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportStop {
    pub id: String,
    pub name: Option<String>,
    pub coord: Coord,
    /// Stable id of the link serving this stop, when still derivable.
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRoute {
    pub id: String,
    pub mode: String,
    /// Stable stop ids in halt order.
    pub stops: Vec<String>,
    /// Stable link ids in travel order. Empty in pseudo-network mode.
    pub links: Vec<String>,
    pub departures: Vec<Departure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportTransitLine {
    pub id: String,
    pub routes: Vec<ExportRoute>,
}

/// The standalone derived graph handed to target-format writers.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportGraph {
    pub nodes: BTreeMap<String, ExportNode>,
    pub links: BTreeMap<String, ExportLink>,
    pub stops: BTreeMap<String, ExportStop>,
    pub lines: Vec<ExportTransitLine>,
}

/// Project the current derived state onto stable identifiers.
pub fn project(graph: &SourceGraph, store: &DerivationStore) -> ExportGraph {
    let mut out = ExportGraph::default();

    for node in store.nodes().values() {
        out.nodes.insert(
            node.original_id.clone(),
            ExportNode {
                id: node.original_id.clone(),
                coord: node.coord,
            },
        );
    }

    // Session link id to stable id, for re-linking stop and route references.
    let mut link_ids: BTreeMap<String, String> = BTreeMap::new();
    for links in store.links().values() {
        for link in links {
            link_ids.insert(link.id.clone(), link.original_id.clone());
            let (Some(from), Some(to)) = (
                store.node_for_point(link.from_point),
                store.node_for_point(link.to_point),
            ) else {
                tracing::warn!(
                    "link {} references a point without a derived node; dropping it from export",
                    link.id
                );
                continue;
            };
            out.links.insert(
                link.original_id.clone(),
                ExportLink {
                    id: link.original_id.clone(),
                    from: from.original_id.clone(),
                    to: to.original_id.clone(),
                    length_m: link.length_m,
                    freespeed: link.freespeed,
                    capacity: link.capacity,
                    lanes_per_direction: link.lanes_per_direction,
                    modes: link.modes.clone(),
                },
            );
        }
    }

    for stop in store.stop_areas().values() {
        let link = stop.linked_link.as_ref().and_then(|session_id| {
            let stable = link_ids.get(session_id).cloned();
            if stable.is_none() {
                tracing::warn!(
                    "stop area {} references link {session_id}, which no longer exists; \
                     dropping the reference",
                    stop.original_ref
                );
            }
            stable
        });
        out.stops.insert(
            stop.original_ref.clone(),
            ExportStop {
                id: stop.original_ref.clone(),
                name: stop.name.clone(),
                coord: stop.coord,
                link,
            },
        );
    }

    let mut claimed: BTreeSet<i64> = BTreeSet::new();
    for line in store.transit_lines().values() {
        let routes: Vec<ExportRoute> = line
            .routes
            .iter()
            .filter_map(|route_group| project_route(graph, store, &link_ids, *route_group))
            .collect();
        claimed.extend(&line.routes);
        if routes.is_empty() {
            // A line with zero surviving routes is pruned here, not during
            // editing.
            continue;
        }
        out.lines.push(ExportTransitLine {
            id: group_export_id(graph, line.group),
            routes,
        });
    }

    // Routes under no master export as their own single-route line.
    for (route_group, route) in store.routes() {
        if route.deleted || claimed.contains(route_group) {
            continue;
        }
        if let Some(route) = project_route(graph, store, &link_ids, *route_group) {
            out.lines.push(ExportTransitLine {
                id: route.id.clone(),
                routes: vec![route],
            });
        }
    }

    out
}

fn project_route(
    graph: &SourceGraph,
    store: &DerivationStore,
    link_ids: &BTreeMap<String, String>,
    route_group: i64,
) -> Option<ExportRoute> {
    let route = store.routes().get(&route_group)?;
    if route.deleted {
        return None;
    }
    let stops: Vec<String> = route
        .stops
        .iter()
        .filter_map(|stop| {
            let area = store.stop_areas().get(&stop.stop_area);
            if area.is_none() {
                tracing::warn!(
                    "route group {route_group} halts at stop area group {}, which no longer \
                     exists; dropping the halt",
                    stop.stop_area
                );
            }
            area.map(|a| a.original_ref.clone())
        })
        .collect();
    let links: Vec<String> = route
        .link_sequence
        .iter()
        .filter_map(|session_id| {
            let stable = link_ids.get(session_id).cloned();
            if stable.is_none() {
                tracing::warn!(
                    "route group {route_group} traverses link {session_id}, which no longer \
                     exists; dropping it"
                );
            }
            stable
        })
        .collect();
    Some(ExportRoute {
        id: group_export_id(graph, route_group),
        mode: route.mode.clone(),
        stops,
        links,
        departures: route.departures.clone(),
    })
}

fn group_export_id(graph: &SourceGraph, group: i64) -> String {
    graph
        .group(group)
        .and_then(|g| g.tags.get(TAG_REF).or_else(|| g.tags.get(TAG_NAME)))
        .map(str::to_string)
        .unwrap_or_else(|| group.to_string())
}
