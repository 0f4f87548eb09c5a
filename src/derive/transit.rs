//! Transit assembly: stop areas, routes and transit lines from tagged
//! member groups, built against the engine's already-updated node and link
//! maps.

use crate::{
    config::ForgeConfig,
    derive::store::{DerivationStore, Route, RouteStop, StopArea, TransitLine},
    relevance::TAG_PUBLIC_TRANSPORT,
    source::{Coord, ElementId, SourceGraph, TagMap},
};

pub const TAG_TYPE: &str = "type";
pub const TAG_ROUTE: &str = "route";
pub const TAG_NAME: &str = "name";
pub const TAG_REF: &str = "ref";
pub const V_STOP_AREA: &str = "stop_area";
pub const V_ROUTE: &str = "route";
pub const V_ROUTE_MASTER: &str = "route_master";
pub const ROLE_STOP: &str = "stop";
pub const ROLE_PLATFORM: &str = "platform";
pub const ROLE_LINK: &str = "link";

/// Transit route modes the assembler recognizes on route groups.
pub const RECOGNIZED_MODES: [&str; 8] = [
    "bus",
    "trolleybus",
    "tram",
    "train",
    "subway",
    "light_rail",
    "ferry",
    "rail",
];

/// The transit shape a group's tags describe, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKind {
    StopArea,
    Route(String),
    Master,
}

pub fn group_kind(tags: &TagMap) -> Option<GroupKind> {
    if tags.is(TAG_PUBLIC_TRANSPORT, V_STOP_AREA) {
        return Some(GroupKind::StopArea);
    }
    if tags.is(TAG_TYPE, V_ROUTE_MASTER) {
        return Some(GroupKind::Master);
    }
    if tags.is(TAG_TYPE, V_ROUTE) {
        if let Some(mode) = tags.get(TAG_ROUTE) {
            if RECOGNIZED_MODES.contains(&mode) {
                return Some(GroupKind::Route(mode.to_string()));
            }
        }
    }
    None
}

/// Tombstone a route slot: structure is cleared so no dangling stop or link
/// references survive, departures stay attached for a later requalification
/// or the export sweep.
pub(crate) fn tombstone_route(store: &mut DerivationStore, group: i64) {
    if let Some(route) = store.routes.get_mut(&group) {
        if !route.deleted {
            tracing::debug!("Route group {group} no longer qualifies, tombstoning");
        }
        route.deleted = true;
        route.stops.clear();
        route.link_sequence.clear();
    }
}

/// Derive or replace the stop area backed by `group`.
///
/// The location comes from the member platform and stop-position points:
/// their centroid for three or more, the midpoint for two, the point itself
/// for one. Without a computable location no stop area exists.
pub(crate) fn derive_stop_area(graph: &SourceGraph, store: &mut DerivationStore, group_id: i64) {
    let Some(group) = graph.group(group_id) else {
        store.stop_areas.remove(&group_id);
        return;
    };
    if !group.live || group_kind(&group.tags) != Some(GroupKind::StopArea) {
        store.stop_areas.remove(&group_id);
        return;
    }

    let coords: Vec<Coord> = group
        .members
        .iter()
        .filter(|m| m.role == ROLE_PLATFORM || m.role == ROLE_STOP)
        .filter_map(|m| match m.id {
            ElementId::Point(p) => graph.point(p).filter(|point| point.live),
            _ => None,
        })
        .map(|point| point.coord)
        .collect();
    let Some(coord) = Coord::centroid(&coords) else {
        tracing::debug!("Stop area group {group_id} has no locatable platform members");
        store.stop_areas.remove(&group_id);
        return;
    };

    let linked_link = group
        .members
        .iter()
        .find_map(|m| match (m.role.as_str(), m.id) {
            (ROLE_LINK, ElementId::Line(l)) => Some(l),
            _ => None,
        })
        .and_then(|line| {
            let link = store.last_link_of_line(line);
            if link.is_none() {
                tracing::warn!(
                    "Stop area group {group_id} names line {line} as its link, \
                     but the line has no derived links; dropping the reference"
                );
            }
            link.map(|l| l.id.clone())
        });

    store.stop_areas.insert(
        group_id,
        StopArea {
            group: group_id,
            derived_id: format!("stoparea_{group_id}"),
            original_ref: group
                .tags
                .get(TAG_REF)
                .map(str::to_string)
                .unwrap_or_else(|| group_id.to_string()),
            name: group.tags.get(TAG_NAME).map(str::to_string),
            coord,
            linked_link,
        },
    );
}

/// Derive or refresh the route backed by `group`, reusing its slot so
/// attached departures survive.
pub(crate) fn derive_route(
    graph: &SourceGraph,
    config: &ForgeConfig,
    store: &mut DerivationStore,
    group_id: i64,
) {
    let Some(group) = graph.group(group_id) else {
        tombstone_route(store, group_id);
        return;
    };
    let mode = match group_kind(&group.tags) {
        Some(GroupKind::Route(mode)) if group.live => mode,
        _ => {
            tombstone_route(store, group_id);
            return;
        }
    };

    let mut stops: Vec<RouteStop> = Vec::new();
    for member in &group.members {
        if member.role != ROLE_STOP && member.role != ROLE_PLATFORM {
            continue;
        }
        let owner = graph.referrers_of(member.id).find_map(|r| match r {
            ElementId::Group(g) if store.stop_areas.contains_key(&g) => Some(g),
            _ => None,
        });
        let Some(owner) = owner else {
            tracing::warn!(
                "Route group {group_id} member {} resolves to no stop area; dropping the stop",
                member.id
            );
            continue;
        };
        if stops.last().map(|s| s.stop_area) == Some(owner) {
            // Immediate repeats of the same stop area collapse to one halt.
            continue;
        }
        let ref_id = store.stop_areas[&owner].original_ref.clone();
        stops.push(RouteStop {
            stop_area: owner,
            ref_id,
        });
    }

    let link_sequence: Vec<String> = if config.pseudo_network {
        Vec::new()
    } else {
        group
            .members
            .iter()
            .filter_map(|m| match m.id {
                ElementId::Line(l) if m.role.is_empty() => Some(l),
                _ => None,
            })
            .filter_map(|line| {
                let link = store.last_link_of_line(line);
                if link.is_none() {
                    tracing::warn!(
                        "Route group {group_id} member line {line} has no derived links; \
                         skipping it in the link sequence"
                    );
                }
                link.map(|l| l.id.clone())
            })
            .collect()
    };

    let route = store.routes.entry(group_id).or_insert_with(|| Route {
        group: group_id,
        mode: mode.clone(),
        stops: Vec::new(),
        link_sequence: Vec::new(),
        departures: Vec::new(),
        deleted: false,
    });
    route.mode = mode;
    route.stops = stops;
    route.link_sequence = link_sequence;
    route.deleted = false;

    attach_to_master(graph, store, group_id);
}

/// Attach a route to the transit line of the master group referencing it,
/// detaching it from any line that wrongly lists it.
fn attach_to_master(graph: &SourceGraph, store: &mut DerivationStore, route_group: i64) {
    let master = graph
        .referrers_of(ElementId::Group(route_group))
        .find_map(|r| match r {
            ElementId::Group(g) => graph
                .group(g)
                .filter(|grp| grp.live && grp.tags.is(TAG_TYPE, V_ROUTE_MASTER))
                .map(|_| g),
            _ => None,
        });

    for (group, line) in store.transit_lines.iter_mut() {
        if Some(*group) != master {
            line.routes.retain(|r| *r != route_group);
        }
    }
    if let Some(master) = master {
        let line = store
            .transit_lines
            .entry(master)
            .or_insert_with(|| TransitLine {
                group: master,
                routes: Vec::new(),
            });
        if !line.routes.contains(&route_group) {
            line.routes.push(route_group);
        }
    }
}

/// Derive or replace the transit line backed by a master group, listing its
/// member route groups in member order.
pub(crate) fn derive_master(graph: &SourceGraph, store: &mut DerivationStore, group_id: i64) {
    let Some(group) = graph.group(group_id) else {
        store.transit_lines.remove(&group_id);
        return;
    };
    if !group.live || group_kind(&group.tags) != Some(GroupKind::Master) {
        store.transit_lines.remove(&group_id);
        return;
    }

    let mut routes: Vec<i64> = Vec::new();
    for member in &group.members {
        if let ElementId::Group(g) = member.id {
            if store.routes.contains_key(&g) && !routes.contains(&g) {
                routes.push(g);
            }
        }
    }
    store.transit_lines.insert(
        group_id,
        TransitLine {
            group: group_id,
            routes,
        },
    );
}
