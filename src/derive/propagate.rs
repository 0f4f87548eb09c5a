//! Change propagation: from directly touched source elements to the closure
//! of derived entities that must be recomputed.
//!
//! Expansion is two-tiered. Directly touched elements expand fully: a
//! touched line pulls in its member points, because their relevance can
//! flip, and those points pull in their other referring lines, whose link
//! partitions can change. Elements scheduled through referrer traversal are
//! re-derived but not expanded further, which bounds recomputation to the
//! affected neighborhood instead of cascading across the whole graph.

use petgraph::visit::{depth_first_search, Control, DfsEvent};
use std::collections::BTreeSet;

use crate::{
    derive::transit::{group_kind, GroupKind},
    source::{ElementId, SourceGraph},
};

/// The set of derived entities to recompute, re-derived in fixed order:
/// points, then lines, then groups, because group derivation reads already
/// updated link data.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Closure {
    pub points: BTreeSet<i64>,
    pub lines: BTreeSet<i64>,
    pub groups: BTreeSet<i64>,
}

impl Closure {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.lines.is_empty() && self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len() + self.lines.len() + self.groups.len()
    }
}

/// Compute the affected closure for a set of directly touched elements.
pub fn affected_closure(graph: &SourceGraph, touched: &[ElementId]) -> Closure {
    let mut closure = Closure::default();

    for &id in touched {
        match id {
            ElementId::Point(p) => {
                closure.points.insert(p);
                expand_point(graph, p, &mut closure);
            }
            ElementId::Line(l) => {
                closure.lines.insert(l);
                // Member points even of a tombstoned line: their relevance
                // may have flipped with the line's own fate.
                if let Some(line) = graph.line(l) {
                    for &p in &line.points {
                        closure.points.insert(p);
                        expand_point(graph, p, &mut closure);
                    }
                }
                for referrer in graph.referrers_of(id) {
                    if let ElementId::Group(g) = referrer {
                        schedule_group(graph, g, &mut closure.groups);
                    }
                }
            }
            ElementId::Group(g) => {
                schedule_group(graph, g, &mut closure.groups);
                descend_members(graph, g, &mut closure.groups);
                // Groups sharing a member with this one (a route holding the
                // same platform a stop area owns) resolve through that
                // member and must refresh too.
                if let Some(group) = graph.group(g) {
                    for member in &group.members {
                        for referrer in graph.referrers_of(member.id) {
                            if let ElementId::Group(other) = referrer {
                                schedule_group(graph, other, &mut closure.groups);
                            }
                        }
                    }
                }
            }
        }
    }

    // Every line scheduled for rebuild feeds its referrer groups: routes and
    // stop areas re-read last-derived links.
    for l in closure.lines.clone() {
        for referrer in graph.referrers_of(ElementId::Line(l)) {
            if let ElementId::Group(g) = referrer {
                schedule_group(graph, g, &mut closure.groups);
            }
        }
    }

    closure
}

/// Full expansion of a touched point: its referrer lines are rebuilt and
/// their referrer groups refreshed; referrer groups are scheduled directly.
fn expand_point(graph: &SourceGraph, point: i64, closure: &mut Closure) {
    for referrer in graph.referrers_of(ElementId::Point(point)) {
        match referrer {
            ElementId::Line(l) => {
                closure.lines.insert(l);
            }
            ElementId::Group(g) => {
                schedule_group(graph, g, &mut closure.groups);
            }
            ElementId::Point(_) => {}
        }
    }
}

/// Schedule a group and ascend its referrer groups to a fixpoint, so a
/// refreshed route also refreshes the master listing it. Guarded by the
/// closure set itself acting as the visited set.
fn schedule_group(graph: &SourceGraph, group: i64, scheduled: &mut BTreeSet<i64>) {
    let mut stack = vec![group];
    while let Some(g) = stack.pop() {
        if !scheduled.insert(g) {
            continue;
        }
        for referrer in graph.referrers_of(ElementId::Group(g)) {
            if let ElementId::Group(parent) = referrer {
                stack.push(parent);
            }
        }
    }
}

/// Recursive member descent for touched master groups, guarded by the DFS
/// visited map so cyclic group graphs terminate.
fn descend_members(graph: &SourceGraph, group: i64, scheduled: &mut BTreeSet<i64>) {
    let is_master = graph
        .group(group)
        .is_some_and(|g| matches!(group_kind(&g.tags), Some(GroupKind::Master)));
    if !is_master {
        return;
    }
    depth_first_search(
        graph.referrer_index(),
        Some(ElementId::Group(group)),
        |event| {
            if let DfsEvent::Discover(id, _) = event {
                match id {
                    ElementId::Group(g) => {
                        scheduled.insert(g);
                        Control::<()>::Continue
                    }
                    // Containment below lines and points is not group
                    // structure, stop there.
                    _ => Control::Prune,
                }
            } else {
                Control::Continue
            }
        },
    );
}
