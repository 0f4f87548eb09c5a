//! Tests for change propagation and group classification.

use super::*;
use crate::{
    derive::transit::{group_kind, GroupKind},
    source::{Coord, ElementId, Member, SourceGraph, TagMap},
};
use test_log::test;

fn residential() -> TagMap {
    TagMap::from_pairs([("highway", "residential")])
}

/// Two residential lines sharing point 2, plus a route group over line 10.
fn junction_fixture() -> SourceGraph {
    let mut graph = SourceGraph::new();
    for (id, lon) in [(1, 0.0), (2, 0.001), (3, 0.002)] {
        graph.insert_point(id, Coord::new(lon, 0.0), TagMap::new());
    }
    graph.insert_line(10, vec![1, 2], residential());
    graph.insert_line(11, vec![2, 3], residential());
    graph.insert_group(
        20,
        vec![Member::new("", ElementId::Line(10))],
        TagMap::from_pairs([("type", "route"), ("route", "bus")]),
    );
    graph
}

#[test]
fn test_touched_point_expands_to_referrers() {
    let graph = junction_fixture();
    let closure = affected_closure(&graph, &[ElementId::Point(2)]);
    assert!(closure.points.contains(&2));
    assert!(closure.lines.contains(&10));
    assert!(closure.lines.contains(&11));
    assert!(closure.groups.contains(&20));
}

#[test]
fn test_touched_line_pulls_member_points_and_neighbor_lines() {
    let graph = junction_fixture();
    let closure = affected_closure(&graph, &[ElementId::Line(10)]);
    // Its own points, whose relevance may flip.
    assert!(closure.points.contains(&1) && closure.points.contains(&2));
    // The neighbor line sharing point 2, whose partition may change.
    assert!(closure.lines.contains(&11));
    // The route group reading line 10's links.
    assert!(closure.groups.contains(&20));
    // Point 3 belongs only to the untouched neighbor and is not expanded.
    assert!(!closure.points.contains(&3));
}

#[test]
fn test_route_refresh_reaches_its_master() {
    let mut graph = junction_fixture();
    graph.insert_group(
        30,
        vec![Member::new("", ElementId::Group(20))],
        TagMap::from_pairs([("type", "route_master")]),
    );
    let closure = affected_closure(&graph, &[ElementId::Line(10)]);
    assert!(closure.groups.contains(&20));
    assert!(closure.groups.contains(&30));
}

#[test]
fn test_master_descent_terminates_on_cyclic_groups() {
    let mut graph = SourceGraph::new();
    graph.insert_group(
        1,
        vec![Member::new("", ElementId::Group(2))],
        TagMap::from_pairs([("type", "route_master")]),
    );
    graph.insert_group(
        2,
        vec![Member::new("", ElementId::Group(1))],
        TagMap::from_pairs([("type", "route_master")]),
    );
    let closure = affected_closure(&graph, &[ElementId::Group(1)]);
    assert!(closure.groups.contains(&1) && closure.groups.contains(&2));
}

#[test]
fn test_group_kind_classification() {
    assert_eq!(
        group_kind(&TagMap::from_pairs([("public_transport", "stop_area")])),
        Some(GroupKind::StopArea)
    );
    assert_eq!(
        group_kind(&TagMap::from_pairs([("type", "route"), ("route", "tram")])),
        Some(GroupKind::Route("tram".to_string()))
    );
    assert_eq!(
        group_kind(&TagMap::from_pairs([("type", "route_master")])),
        Some(GroupKind::Master)
    );
    // Unrecognized modes and plain groups derive nothing.
    assert_eq!(
        group_kind(&TagMap::from_pairs([("type", "route"), ("route", "unicycle")])),
        None
    );
    assert_eq!(group_kind(&TagMap::new()), None);
}
