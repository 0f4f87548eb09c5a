//! Transit assembly integration tests: stop areas, routes, masters, and
//! the identity-preserving route slot behavior.

mod common;

use test_log::test;

use approx::assert_relative_eq;
use common::{add_line, add_stop_area, derived_engine, residential_tags};
use netforge_core::{
    config::ForgeConfig,
    derive::{Departure, NetworkEngine},
    event::SourceEvent,
    source::{Coord, ElementId, Member, SourceGraph, TagMap},
};

fn bus_route_tags() -> TagMap {
    TagMap::from_pairs([("type", "route"), ("route", "bus")])
}

/// A two-line corridor with three stop areas and one bus route whose
/// ordered members alternate platform, line, platform, line, platform.
fn corridor_fixture() -> SourceGraph {
    let mut graph = SourceGraph::new();
    add_line(
        &mut graph,
        10,
        &[(1, 0.0, 0.0), (2, 0.001, 0.0)],
        residential_tags(),
    );
    graph.insert_point(3, Coord::new(0.002, 0.0), TagMap::new());
    graph.insert_line(11, vec![2, 3], residential_tags());

    add_stop_area(&mut graph, 201, 100, Coord::new(0.0, 0.0001), "stop_a");
    add_stop_area(&mut graph, 202, 101, Coord::new(0.001, 0.0001), "stop_b");
    add_stop_area(&mut graph, 203, 102, Coord::new(0.002, 0.0001), "stop_c");

    graph.insert_group(
        300,
        vec![
            Member::new("platform", ElementId::Point(100)),
            Member::new("", ElementId::Line(10)),
            Member::new("platform", ElementId::Point(101)),
            Member::new("", ElementId::Line(11)),
            Member::new("platform", ElementId::Point(102)),
        ],
        bus_route_tags(),
    );
    graph
}

#[test]
fn test_stop_area_location_rules() {
    let mut graph = SourceGraph::new();
    // One platform point: the point itself.
    add_stop_area(&mut graph, 201, 100, Coord::new(0.5, 0.5), "one");
    // Two: their midpoint.
    graph.insert_point(101, Coord::new(0.0, 0.0), TagMap::new());
    graph.insert_point(102, Coord::new(0.002, 0.001), TagMap::new());
    graph.insert_group(
        202,
        vec![
            Member::new("platform", ElementId::Point(101)),
            Member::new("stop", ElementId::Point(102)),
        ],
        TagMap::from_pairs([("public_transport", "stop_area"), ("ref", "two")]),
    );
    // None: no stop area at all.
    graph.insert_group(
        203,
        vec![],
        TagMap::from_pairs([("public_transport", "stop_area"), ("ref", "empty")]),
    );
    let engine = derived_engine(&graph);

    let one = &engine.store().stop_areas()[&201];
    assert_relative_eq!(one.coord.lon, 0.5);
    let two = &engine.store().stop_areas()[&202];
    assert_relative_eq!(two.coord.lon, 0.001);
    assert_relative_eq!(two.coord.lat, 0.0005);
    assert!(!engine.store().stop_areas().contains_key(&203));
}

#[test]
fn test_route_stop_sequence_and_link_sequence() {
    let graph = corridor_fixture();
    let engine = derived_engine(&graph);

    let route = &engine.store().routes()[&300];
    assert!(!route.deleted);
    assert_eq!(route.mode, "bus");

    let stops: Vec<&str> = route.stops.iter().map(|s| s.ref_id.as_str()).collect();
    assert_eq!(stops, vec!["stop_a", "stop_b", "stop_c"]);

    // One last-derived link per member line, in member order.
    assert_eq!(route.link_sequence, vec!["10_0", "11_0"]);
}

#[test]
fn test_duplicate_consecutive_platform_collapses() {
    let mut graph = corridor_fixture();
    let mut members = graph.group(300).unwrap().members.clone();
    // Repeat the middle platform immediately.
    members.insert(3, Member::new("platform", ElementId::Point(101)));
    graph.set_members(300, members);
    let engine = derived_engine(&graph);

    let route = &engine.store().routes()[&300];
    let stops: Vec<&str> = route.stops.iter().map(|s| s.ref_id.as_str()).collect();
    assert_eq!(stops, vec!["stop_a", "stop_b", "stop_c"]);
}

#[test]
fn test_pseudo_network_mode_leaves_link_sequence_empty() {
    let graph = corridor_fixture();
    let mut engine = NetworkEngine::new(ForgeConfig {
        pseudo_network: true,
        ..Default::default()
    });
    engine.visit_all(&graph).unwrap();

    let route = &engine.store().routes()[&300];
    assert_eq!(route.stops.len(), 3);
    assert!(route.link_sequence.is_empty());
}

#[test]
fn test_route_tombstone_preserves_departures() {
    let mut graph = corridor_fixture();
    let mut engine = derived_engine(&graph);
    engine
        .set_departures(
            300,
            vec![Departure {
                id: "d1".to_string(),
                time_s: 8.0 * 3600.0,
                vehicle: Some("bus_1".to_string()),
            }],
        )
        .unwrap();

    // An unrecognized mode disqualifies the group; the slot tombstones.
    graph.set_tags(
        ElementId::Group(300),
        TagMap::from_pairs([("type", "route"), ("route", "unicycle")]),
    );
    engine
        .apply(
            &graph,
            &SourceEvent::TagsChanged(vec![ElementId::Group(300)]),
        )
        .unwrap();
    let route = &engine.store().routes()[&300];
    assert!(route.deleted);
    assert!(route.stops.is_empty());
    assert_eq!(route.departures.len(), 1);

    // Requalifying revives the same slot, departures intact.
    graph.set_tags(ElementId::Group(300), bus_route_tags());
    engine
        .apply(
            &graph,
            &SourceEvent::TagsChanged(vec![ElementId::Group(300)]),
        )
        .unwrap();
    let route = &engine.store().routes()[&300];
    assert!(!route.deleted);
    assert_eq!(route.stops.len(), 3);
    assert_eq!(route.departures[0].id, "d1");
}

#[test]
fn test_master_adopts_and_detaches_routes() {
    let mut graph = corridor_fixture();
    graph.insert_group(
        400,
        vec![Member::new("", ElementId::Group(300))],
        TagMap::from_pairs([("type", "route_master"), ("ref", "M1")]),
    );
    let mut engine = derived_engine(&graph);
    assert_eq!(engine.store().transit_lines()[&400].routes, vec![300]);

    // Move the route to a different master.
    graph.set_members(400, vec![]);
    engine
        .apply(&graph, &SourceEvent::MembersChanged(vec![400]))
        .unwrap();
    assert!(engine.store().transit_lines()[&400].routes.is_empty());

    graph.insert_group(
        401,
        vec![Member::new("", ElementId::Group(300))],
        TagMap::from_pairs([("type", "route_master"), ("ref", "M2")]),
    );
    engine
        .apply(
            &graph,
            &SourceEvent::ElementsAdded(vec![ElementId::Group(401)]),
        )
        .unwrap();
    assert_eq!(engine.store().transit_lines()[&401].routes, vec![300]);
    assert!(engine.store().transit_lines()[&400].routes.is_empty());
}

#[test]
fn test_stop_area_attaches_member_link() {
    let mut graph = corridor_fixture();
    let mut members = graph.group(201).unwrap().members.clone();
    members.push(Member::new("link", ElementId::Line(10)));
    graph.set_members(201, members);
    let engine = derived_engine(&graph);

    let area = &engine.store().stop_areas()[&201];
    assert_eq!(area.linked_link.as_deref(), Some("10_0"));
}

#[test]
fn test_transit_support_off_derives_nothing() {
    let graph = corridor_fixture();
    let mut engine = NetworkEngine::new(ForgeConfig {
        transit_support: false,
        ..Default::default()
    });
    engine.visit_all(&graph).unwrap();

    assert!(engine.store().stop_areas().is_empty());
    assert!(engine.store().routes().is_empty());
    assert!(engine.store().transit_lines().is_empty());
    // The road network still derives.
    assert_eq!(engine.store().links_of_line(10).len(), 2);
}
