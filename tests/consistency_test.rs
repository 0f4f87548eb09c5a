//! Consistency checker and export projector integration tests.

mod common;

use test_log::test;

use common::{add_line, add_stop_area, derived_engine, residential_tags};
use netforge_core::{
    check::{Severity, SuggestedFix},
    event::SourceEvent,
    source::{Coord, ElementId, Member, SourceGraph, TagMap},
};

#[test]
fn test_duplicate_explicit_ids_yield_one_diagnostic() {
    let mut graph = SourceGraph::new();
    let mut tags = residential_tags();
    tags.insert("id", "shared");
    add_line(&mut graph, 10, &[(1, 0.0, 0.0), (2, 0.001, 0.0)], tags.clone());
    add_line(&mut graph, 11, &[(3, 0.01, 0.0), (4, 0.011, 0.0)], tags);
    let engine = derived_engine(&graph);

    let duplicates: Vec<_> = engine
        .diagnostics(&graph)
        .into_iter()
        .filter(|d| d.message.contains("duplicate"))
        .collect();
    assert_eq!(duplicates.len(), 1);
    let diagnostic = &duplicates[0];
    assert_eq!(diagnostic.severity, Severity::Error);
    assert_eq!(
        diagnostic.elements,
        vec![ElementId::Line(10), ElementId::Line(11)]
    );
    // The fix retags all but the canonical member.
    let Some(SuggestedFix::RetagIds(retags)) = &diagnostic.fix else {
        panic!("expected a retag fix");
    };
    assert_eq!(retags, &vec![(ElementId::Line(11), "shared_1".to_string())]);
}

#[test]
fn test_clean_network_has_no_diagnostics() {
    let mut graph = SourceGraph::new();
    add_line(
        &mut graph,
        10,
        &[(1, 0.0, 0.0), (2, 0.001, 0.0)],
        residential_tags(),
    );
    let engine = derived_engine(&graph);
    assert!(engine.diagnostics(&graph).is_empty());
}

#[test]
fn test_zero_attributes_flagged_as_doubtful() {
    let mut graph = SourceGraph::new();
    let mut tags = residential_tags();
    tags.insert("capacity", "0");
    add_line(&mut graph, 10, &[(1, 0.0, 0.0), (2, 0.001, 0.0)], tags);
    let engine = derived_engine(&graph);

    let diagnostics = engine.diagnostics(&graph);
    let doubtful: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.message.contains("zero"))
        .collect();
    // Forward and backward twin both carry the zero capacity.
    assert_eq!(doubtful.len(), 2);
    assert_eq!(doubtful[0].severity, Severity::Warning);
    assert_eq!(doubtful[0].elements, vec![ElementId::Line(10)]);
}

#[test]
fn test_route_without_member_lines_warns() {
    let mut graph = SourceGraph::new();
    add_stop_area(&mut graph, 201, 100, Coord::new(0.0, 0.0), "only_stop");
    graph.insert_group(
        300,
        vec![Member::new("platform", ElementId::Point(100))],
        TagMap::from_pairs([("type", "route"), ("route", "bus")]),
    );
    let engine = derived_engine(&graph);

    let diagnostics = engine.diagnostics(&graph);
    assert!(diagnostics
        .iter()
        .any(|d| d.severity == Severity::Warning && d.message.contains("no member lines")));
}

#[test]
fn test_disconnected_route_is_an_error() {
    let mut graph = SourceGraph::new();
    add_line(
        &mut graph,
        10,
        &[(1, 0.0, 0.0), (2, 0.001, 0.0)],
        residential_tags(),
    );
    // Far away, sharing no endpoint with line 10.
    add_line(
        &mut graph,
        11,
        &[(3, 0.01, 0.0), (4, 0.011, 0.0)],
        residential_tags(),
    );
    graph.insert_group(
        300,
        vec![
            Member::new("", ElementId::Line(10)),
            Member::new("", ElementId::Line(11)),
        ],
        TagMap::from_pairs([("type", "route"), ("route", "bus")]),
    );
    let engine = derived_engine(&graph);

    let diagnostics = engine.diagnostics(&graph);
    assert!(diagnostics
        .iter()
        .any(|d| d.severity == Severity::Error && d.message.contains("disconnected")));
}

#[test]
fn test_export_substitutes_stable_ids() {
    let mut graph = SourceGraph::new();
    let mut tags = residential_tags();
    tags.insert("id", "main_street");
    add_line(&mut graph, 10, &[(1, 0.0, 0.0), (2, 0.001, 0.0)], tags);
    graph.set_tags(ElementId::Point(1), TagMap::from_pairs([("id", "corner_a")]));
    let engine = derived_engine(&graph);

    let export = engine.export(&graph);
    assert!(export.nodes.contains_key("corner_a"));
    let link = &export.links["main_street_0"];
    assert_eq!(link.from, "corner_a");
    assert_eq!(link.to, "2");
}

#[test]
fn test_export_prunes_deleted_routes_and_empty_lines() {
    let mut graph = SourceGraph::new();
    add_line(
        &mut graph,
        10,
        &[(1, 0.0, 0.0), (2, 0.001, 0.0)],
        residential_tags(),
    );
    add_stop_area(&mut graph, 201, 100, Coord::new(0.0, 0.0001), "stop_a");
    graph.insert_group(
        300,
        vec![
            Member::new("platform", ElementId::Point(100)),
            Member::new("", ElementId::Line(10)),
        ],
        TagMap::from_pairs([("type", "route"), ("route", "bus"), ("ref", "R1")]),
    );
    graph.insert_group(
        400,
        vec![Member::new("", ElementId::Group(300))],
        TagMap::from_pairs([("type", "route_master"), ("ref", "M1")]),
    );
    let mut engine = derived_engine(&graph);

    let export = engine.export(&graph);
    assert_eq!(export.lines.len(), 1);
    assert_eq!(export.lines[0].id, "M1");
    assert_eq!(export.lines[0].routes[0].id, "R1");
    assert_eq!(export.lines[0].routes[0].stops, vec!["stop_a".to_string()]);

    // Disqualify the route; its tombstone and the emptied line both drop
    // from the next export.
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
    let export = engine.export(&graph);
    assert!(export.lines.is_empty());
    // The stop area itself still exports.
    assert!(export.stops.contains_key("stop_a"));
}

#[test]
fn test_export_gives_orphan_routes_their_own_line() {
    let mut graph = SourceGraph::new();
    add_line(
        &mut graph,
        10,
        &[(1, 0.0, 0.0), (2, 0.001, 0.0)],
        residential_tags(),
    );
    add_stop_area(&mut graph, 201, 100, Coord::new(0.0, 0.0001), "stop_a");
    graph.insert_group(
        300,
        vec![
            Member::new("platform", ElementId::Point(100)),
            Member::new("", ElementId::Line(10)),
        ],
        TagMap::from_pairs([("type", "route"), ("route", "bus"), ("ref", "R9")]),
    );
    let engine = derived_engine(&graph);

    let export = engine.export(&graph);
    assert_eq!(export.lines.len(), 1);
    assert_eq!(export.lines[0].id, "R9");
    assert_eq!(export.lines[0].routes.len(), 1);
}
