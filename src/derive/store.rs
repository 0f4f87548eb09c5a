//! Derived entity types and the store that exclusively owns them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::source::Coord;

/// A derived network node. Exists exactly while its source point satisfies
/// the relevance predicate; replaced, never mutated, across recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedNode {
    /// Stable identifier for export: the point's explicit `id` tag when
    /// present, else the point identity rendered as a string.
    pub original_id: String,
    pub coord: Coord,
    /// Backing source point.
    pub point: i64,
}

/// A derived network link, one direction of one segment of a qualifying
/// source line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedLink {
    /// Session-unique identifier: `<line>_<segment>`, `_r` on the backward
    /// twin.
    pub id: String,
    /// Stable identifier for export; substitutes the line's explicit `id`
    /// tag for the line identity when present.
    pub original_id: String,
    pub from_point: i64,
    pub to_point: i64,
    pub length_m: f64,
    pub freespeed: f64,
    pub capacity: f64,
    pub lanes_per_direction: f64,
    pub modes: BTreeSet<String>,
    /// The original source points this segment spans, in traversal order.
    pub segment_points: Vec<i64>,
    pub reversed: bool,
}

/// A physical stop grouping derived from a stop-area group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopArea {
    /// Backing source group.
    pub group: i64,
    /// Session-local identifier.
    pub derived_id: String,
    /// Stable identifier for export: the group's `ref` tag, else its id.
    pub original_ref: String,
    pub name: Option<String>,
    pub coord: Coord,
    /// Session id of the derived link serving this stop, when a member line
    /// carries the link role.
    pub linked_link: Option<String>,
}

/// One halt of a route at a stop area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStop {
    /// Backing stop-area group.
    pub stop_area: i64,
    pub ref_id: String,
}

/// A scheduled departure attached to a route by the hosting editor.
/// Survives re-derivation of the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Departure {
    pub id: String,
    /// Seconds since service day start.
    pub time_s: f64,
    pub vehicle: Option<String>,
}

/// One transit itinerary derived from a route group.
///
/// The slot is keyed by the backing group so identity survives edits; a
/// group that stops qualifying leaves a tombstone (`deleted`) rather than
/// disappearing, keeping attached departures recoverable until export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Backing source group.
    pub group: i64,
    pub mode: String,
    pub stops: Vec<RouteStop>,
    /// Session link ids, in travel order. Empty in pseudo-network mode.
    pub link_sequence: Vec<String>,
    pub departures: Vec<Departure>,
    pub deleted: bool,
}

/// A named service grouping several routes, derived from a master group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitLine {
    /// Backing source group.
    pub group: i64,
    /// Route group ids, in master member order.
    pub routes: Vec<i64>,
}

/// Exclusive owner of all derived state for one editing session.
///
/// Constructed with the engine, injected wherever derived data is read, and
/// dropped with the session. External readers only ever see `&` views.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivationStore {
    /// Point id to its derived node.
    pub(crate) nodes: BTreeMap<i64, DerivedNode>,
    /// Line id to its full (atomically replaced) link set.
    pub(crate) links: BTreeMap<i64, Vec<DerivedLink>>,
    /// Stop-area group id to its stop area.
    pub(crate) stop_areas: BTreeMap<i64, StopArea>,
    /// Route group id to its route slot.
    pub(crate) routes: BTreeMap<i64, Route>,
    /// Master group id to its transit line.
    pub(crate) transit_lines: BTreeMap<i64, TransitLine>,
}

impl DerivationStore {
    pub fn new() -> Self {
        DerivationStore::default()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
        self.stop_areas.clear();
        self.routes.clear();
        self.transit_lines.clear();
    }

    pub fn nodes(&self) -> &BTreeMap<i64, DerivedNode> {
        &self.nodes
    }

    pub fn links(&self) -> &BTreeMap<i64, Vec<DerivedLink>> {
        &self.links
    }

    pub fn stop_areas(&self) -> &BTreeMap<i64, StopArea> {
        &self.stop_areas
    }

    pub fn routes(&self) -> &BTreeMap<i64, Route> {
        &self.routes
    }

    pub fn transit_lines(&self) -> &BTreeMap<i64, TransitLine> {
        &self.transit_lines
    }

    pub fn node_for_point(&self, point: i64) -> Option<&DerivedNode> {
        self.nodes.get(&point)
    }

    pub fn links_of_line(&self, line: i64) -> &[DerivedLink] {
        self.links.get(&line).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The last forward-direction link a line derived, used to anchor stop
    /// areas and route link sequences.
    pub fn last_link_of_line(&self, line: i64) -> Option<&DerivedLink> {
        self.links_of_line(line)
            .iter()
            .rev()
            .find(|link| !link.reversed)
    }

    pub fn link_by_id(&self, id: &str) -> Option<&DerivedLink> {
        self.links
            .values()
            .flat_map(|links| links.iter())
            .find(|link| link.id == id)
    }

    pub fn link_count(&self) -> usize {
        self.links.values().map(Vec::len).sum()
    }
}
