//! In-memory mirror of the editor's source graph.
//!
//! The hosting editor owns the authoritative dataset; this module holds the
//! engine-facing mirror of it: points, polylines, member groups, their free
//! form tags, and the referrer index answering "which elements contain this
//! one". Mutators here keep the referrer index in sync so the change
//! propagator can traverse containment in either direction without
//! back-pointers.

use geo::{HaversineDistance, Point as GeoPoint};
use petgraph::{graphmap::DiGraphMap, Direction};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt,
};

/// Identity of a source element, closed over the three element kinds.
///
/// Used as the node type of the referrer index and as the element handle in
/// events, diagnostics, and closure computation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ElementId {
    Point(i64),
    Line(i64),
    Group(i64),
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ElementId::Point(id) => write!(f, "point {id}"),
            ElementId::Line(id) => write!(f, "line {id}"),
            ElementId::Group(id) => write!(f, "group {id}"),
        }
    }
}

/// Free-form key/value tags carried by every source element.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagMap(BTreeMap<String, String>);

impl TagMap {
    pub fn new() -> Self {
        TagMap(BTreeMap::new())
    }

    pub fn from_pairs<'a, I: IntoIterator<Item = (&'a str, &'a str)>>(pairs: I) -> Self {
        TagMap(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Numeric accessor. Unparsable values answer `None` so resolution chains
    /// fall through to their next source.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(|v| v.trim().parse::<f64>().ok())
    }

    pub fn is(&self, key: &str, value: &str) -> bool {
        self.get(key) == Some(value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

/// A WGS84 coordinate as fed in by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lon: f64,
    pub lat: f64,
}

impl Coord {
    pub fn new(lon: f64, lat: f64) -> Self {
        Coord { lon, lat }
    }

    /// Great-circle distance in meters.
    pub fn distance_m(&self, other: &Coord) -> f64 {
        GeoPoint::new(self.lon, self.lat).haversine_distance(&GeoPoint::new(other.lon, other.lat))
    }

    /// Arithmetic mean of a coordinate set. `None` for an empty slice.
    pub fn centroid(coords: &[Coord]) -> Option<Coord> {
        if coords.is_empty() {
            return None;
        }
        let n = coords.len() as f64;
        Some(Coord {
            lon: coords.iter().map(|c| c.lon).sum::<f64>() / n,
            lat: coords.iter().map(|c| c.lat).sum::<f64>() / n,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePoint {
    pub id: i64,
    pub coord: Coord,
    pub tags: TagMap,
    pub live: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceLine {
    pub id: i64,
    /// Ordered point ids. Identical first and last describe a closed loop.
    pub points: Vec<i64>,
    pub tags: TagMap,
    pub live: bool,
}

impl SourceLine {
    pub fn is_endpoint(&self, point: i64) -> bool {
        self.points.first() == Some(&point) || self.points.last() == Some(&point)
    }
}

/// An ordered, role-tagged group member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub role: String,
    pub id: ElementId,
}

impl Member {
    pub fn new(role: impl Into<String>, id: ElementId) -> Self {
        Member {
            role: role.into(),
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceGroup {
    pub id: i64,
    pub members: Vec<Member>,
    pub tags: TagMap,
    pub live: bool,
}

/// Borrowed per-kind view of an element, for explicit dispatch.
#[derive(Debug, Clone, Copy)]
pub enum ElementRef<'a> {
    Point(&'a SourcePoint),
    Line(&'a SourceLine),
    Group(&'a SourceGroup),
}

impl ElementRef<'_> {
    pub fn live(&self) -> bool {
        match self {
            ElementRef::Point(p) => p.live,
            ElementRef::Line(l) => l.live,
            ElementRef::Group(g) => g.live,
        }
    }
}

/// The source dataset mirror plus its referrer index.
///
/// The referrer index is a directed graph with one containment edge per
/// membership reference, pointing container to member. `referrers_of`
/// answers the inverse adjacency query; the change propagator descends
/// member lists by following edges forward.
///
/// Removal tombstones an element (clears its liveness flag) but retains its
/// body and index edges, so a re-derivation pass can still observe the dead
/// element's shape. `purge` drops tombstones for good.
#[derive(Debug, Default)]
pub struct SourceGraph {
    points: BTreeMap<i64, SourcePoint>,
    lines: BTreeMap<i64, SourceLine>,
    groups: BTreeMap<i64, SourceGroup>,
    referrers: DiGraphMap<ElementId, ()>,
}

impl SourceGraph {
    pub fn new() -> Self {
        SourceGraph::default()
    }

    /// Drop every containment edge leaving `container`, keeping the node
    /// itself registered in the index.
    fn clear_membership_edges(&mut self, container: ElementId) {
        let members: Vec<ElementId> = self
            .referrers
            .neighbors_directed(container, Direction::Outgoing)
            .collect();
        for member in members {
            self.referrers.remove_edge(container, member);
        }
        self.referrers.add_node(container);
    }

    pub fn insert_point(&mut self, id: i64, coord: Coord, tags: TagMap) {
        self.points.insert(
            id,
            SourcePoint {
                id,
                coord,
                tags,
                live: true,
            },
        );
        self.referrers.add_node(ElementId::Point(id));
    }

    pub fn insert_line(&mut self, id: i64, points: Vec<i64>, tags: TagMap) {
        let eid = ElementId::Line(id);
        self.clear_membership_edges(eid);
        for point in &points {
            self.referrers.add_edge(eid, ElementId::Point(*point), ());
        }
        self.lines.insert(
            id,
            SourceLine {
                id,
                points,
                tags,
                live: true,
            },
        );
    }

    pub fn insert_group(&mut self, id: i64, members: Vec<Member>, tags: TagMap) {
        let eid = ElementId::Group(id);
        self.clear_membership_edges(eid);
        for member in &members {
            self.referrers.add_edge(eid, member.id, ());
        }
        self.groups.insert(
            id,
            SourceGroup {
                id,
                members,
                tags,
                live: true,
            },
        );
    }

    pub fn move_point(&mut self, id: i64, coord: Coord) {
        if let Some(point) = self.points.get_mut(&id) {
            point.coord = coord;
        }
    }

    pub fn set_tags(&mut self, id: ElementId, tags: TagMap) {
        match id {
            ElementId::Point(p) => {
                if let Some(point) = self.points.get_mut(&p) {
                    point.tags = tags;
                }
            }
            ElementId::Line(l) => {
                if let Some(line) = self.lines.get_mut(&l) {
                    line.tags = tags;
                }
            }
            ElementId::Group(g) => {
                if let Some(group) = self.groups.get_mut(&g) {
                    group.tags = tags;
                }
            }
        }
    }

    /// Replace a line's ordered point list, rebuilding its index edges.
    pub fn set_line_points(&mut self, id: i64, points: Vec<i64>) {
        if !self.lines.contains_key(&id) {
            return;
        }
        let eid = ElementId::Line(id);
        self.clear_membership_edges(eid);
        for point in &points {
            self.referrers.add_edge(eid, ElementId::Point(*point), ());
        }
        if let Some(line) = self.lines.get_mut(&id) {
            line.points = points;
        }
    }

    /// Replace a group's ordered member list, rebuilding its index edges.
    pub fn set_members(&mut self, id: i64, members: Vec<Member>) {
        if !self.groups.contains_key(&id) {
            return;
        }
        let eid = ElementId::Group(id);
        self.clear_membership_edges(eid);
        for member in &members {
            self.referrers.add_edge(eid, member.id, ());
        }
        if let Some(group) = self.groups.get_mut(&id) {
            group.members = members;
        }
    }

    /// Tombstone an element. The body and index edges survive until `purge`.
    pub fn remove(&mut self, id: ElementId) {
        match id {
            ElementId::Point(p) => {
                if let Some(point) = self.points.get_mut(&p) {
                    point.live = false;
                }
            }
            ElementId::Line(l) => {
                if let Some(line) = self.lines.get_mut(&l) {
                    line.live = false;
                }
            }
            ElementId::Group(g) => {
                if let Some(group) = self.groups.get_mut(&g) {
                    group.live = false;
                }
            }
        }
    }

    /// Drop all tombstoned elements and their index edges.
    pub fn purge(&mut self) {
        let dead: Vec<ElementId> = self
            .points
            .values()
            .filter(|p| !p.live)
            .map(|p| ElementId::Point(p.id))
            .chain(
                self.lines
                    .values()
                    .filter(|l| !l.live)
                    .map(|l| ElementId::Line(l.id)),
            )
            .chain(
                self.groups
                    .values()
                    .filter(|g| !g.live)
                    .map(|g| ElementId::Group(g.id)),
            )
            .collect();
        for id in dead {
            self.referrers.remove_node(id);
            match id {
                ElementId::Point(p) => {
                    self.points.remove(&p);
                }
                ElementId::Line(l) => {
                    self.lines.remove(&l);
                }
                ElementId::Group(g) => {
                    self.groups.remove(&g);
                }
            }
        }
    }

    pub fn point(&self, id: i64) -> Option<&SourcePoint> {
        self.points.get(&id)
    }

    pub fn line(&self, id: i64) -> Option<&SourceLine> {
        self.lines.get(&id)
    }

    pub fn group(&self, id: i64) -> Option<&SourceGroup> {
        self.groups.get(&id)
    }

    pub fn get(&self, id: ElementId) -> Option<ElementRef<'_>> {
        match id {
            ElementId::Point(p) => self.points.get(&p).map(ElementRef::Point),
            ElementId::Line(l) => self.lines.get(&l).map(ElementRef::Line),
            ElementId::Group(g) => self.groups.get(&g).map(ElementRef::Group),
        }
    }

    pub fn points(&self) -> impl Iterator<Item = &SourcePoint> {
        self.points.values()
    }

    pub fn lines(&self) -> impl Iterator<Item = &SourceLine> {
        self.lines.values()
    }

    pub fn groups(&self) -> impl Iterator<Item = &SourceGroup> {
        self.groups.values()
    }

    /// Elements whose member lists reference `id`, live or tombstoned.
    pub fn referrers_of(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        self.referrers.neighbors_directed(id, Direction::Incoming)
    }

    /// Live lines whose point lists reference `point`.
    pub fn referring_lines(&self, point: i64) -> impl Iterator<Item = &SourceLine> {
        self.referrers_of(ElementId::Point(point))
            .filter_map(|id| match id {
                ElementId::Line(l) => self.lines.get(&l).filter(|line| line.live),
                _ => None,
            })
    }

    pub(crate) fn referrer_index(&self) -> &DiGraphMap<ElementId, ()> {
        &self.referrers
    }
}
