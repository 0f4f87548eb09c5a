//! Consistency checking over the current derived state.
//!
//! Checks run on demand against the derivation store, not on every edit.
//! Findings are advisory: a diagnostic may carry a suggested corrective
//! edit, but nothing here mutates the source graph or the derived maps.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::{
    config::ForgeConfig,
    derive::DerivationStore,
    resolve::TAG_ID,
    source::{ElementId, SourceGraph},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A corrective edit the hosting editor may offer to apply. Never applied
/// automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuggestedFix {
    /// Set the explicit id tag of each listed element to the paired value.
    RetagIds(Vec<(ElementId, String)>),
}

/// One consistency finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// The source elements this finding names.
    pub elements: Vec<ElementId>,
    pub fix: Option<SuggestedFix>,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            elements: Vec::new(),
            fix: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            elements: Vec::new(),
            fix: None,
        }
    }

    pub fn with_elements(mut self, elements: Vec<ElementId>) -> Self {
        self.elements = elements;
        self
    }

    pub fn with_fix(mut self, fix: SuggestedFix) -> Self {
        self.fix = Some(fix);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        if !self.elements.is_empty() {
            let elements: Vec<String> = self.elements.iter().map(|e| e.to_string()).collect();
            write!(f, " [{}]", elements.join(", "))?;
        }
        Ok(())
    }
}

/// Run every check against the current derived state.
pub fn run_all(
    graph: &SourceGraph,
    store: &DerivationStore,
    config: &ForgeConfig,
) -> Vec<Diagnostic> {
    let mut diagnostics = check_duplicate_ids(graph, store);
    diagnostics.extend(check_doubtful_attributes(store));
    diagnostics.extend(check_route_connectivity(graph, store, config));
    diagnostics
}

/// Group all current derived links and nodes by stable identifier; every
/// identifier produced by more than one source element is a duplicate.
///
/// Identifier groups contributed by the same element set collapse into one
/// finding, so two lines sharing an explicit id tag surface once, not once
/// per colliding segment.
pub fn check_duplicate_ids(graph: &SourceGraph, store: &DerivationStore) -> Vec<Diagnostic> {
    let mut by_id: BTreeMap<String, BTreeSet<ElementId>> = BTreeMap::new();
    for (line, links) in store.links() {
        for link in links {
            by_id
                .entry(link.original_id.clone())
                .or_default()
                .insert(ElementId::Line(*line));
        }
    }
    for (point, node) in store.nodes() {
        by_id
            .entry(node.original_id.clone())
            .or_default()
            .insert(ElementId::Point(*point));
    }

    let mut by_element_set: BTreeMap<BTreeSet<ElementId>, Vec<String>> = BTreeMap::new();
    for (id, elements) in by_id {
        if elements.len() > 1 {
            by_element_set.entry(elements).or_default().push(id);
        }
    }

    by_element_set
        .into_iter()
        .map(|(elements, ids)| {
            let elements: Vec<ElementId> = elements.into_iter().collect();
            let retags: Vec<(ElementId, String)> = elements
                .iter()
                .skip(1)
                .enumerate()
                .map(|(n, element)| {
                    let base = explicit_or_identity_id(graph, *element);
                    (*element, format!("{}_{}", base, n + 1))
                })
                .collect();
            Diagnostic::error(format!(
                "duplicate derived identifier(s) {}: produced by {} source elements",
                ids.join(", "),
                elements.len()
            ))
            .with_elements(elements)
            .with_fix(SuggestedFix::RetagIds(retags))
        })
        .collect()
}

fn explicit_or_identity_id(graph: &SourceGraph, element: ElementId) -> String {
    let tags = match element {
        ElementId::Point(p) => graph.point(p).map(|e| &e.tags),
        ElementId::Line(l) => graph.line(l).map(|e| &e.tags),
        ElementId::Group(g) => graph.group(g).map(|e| &e.tags),
    };
    tags.and_then(|t| t.get(TAG_ID))
        .map(str::to_string)
        .unwrap_or_else(|| match element {
            ElementId::Point(p) => p.to_string(),
            ElementId::Line(l) => l.to_string(),
            ElementId::Group(g) => g.to_string(),
        })
}

/// Flag links carrying a zero attribute where zero cannot be meant.
pub fn check_doubtful_attributes(store: &DerivationStore) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for (line, links) in store.links() {
        for link in links {
            let mut zeroes = Vec::new();
            if link.freespeed == 0.0 {
                zeroes.push("freespeed");
            }
            if link.capacity == 0.0 {
                zeroes.push("capacity");
            }
            if link.length_m == 0.0 {
                zeroes.push("length");
            }
            if link.lanes_per_direction == 0.0 {
                zeroes.push("lanes");
            }
            if !zeroes.is_empty() {
                diagnostics.push(
                    Diagnostic::warning(format!(
                        "link {} has zero {}",
                        link.id,
                        zeroes.join(", ")
                    ))
                    .with_elements(vec![ElementId::Line(*line)]),
                );
            }
        }
    }
    diagnostics
}

/// Flag routes without geometry and routes whose link sequence breaks.
///
/// A route with no member lines is missing geometry (a warning; often a
/// work in progress); consecutive sequence links that do not share an
/// endpoint are a malformed shape (an error).
pub fn check_route_connectivity(
    graph: &SourceGraph,
    store: &DerivationStore,
    config: &ForgeConfig,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for (group, route) in store.routes() {
        if route.deleted {
            continue;
        }
        let member_lines = graph
            .group(*group)
            .map(|g| {
                g.members
                    .iter()
                    .filter(|m| m.role.is_empty() && matches!(m.id, ElementId::Line(_)))
                    .count()
            })
            .unwrap_or(0);
        if member_lines == 0 {
            diagnostics.push(
                Diagnostic::warning(format!("route group {group} has no member lines"))
                    .with_elements(vec![ElementId::Group(*group)]),
            );
            continue;
        }
        if config.pseudo_network {
            continue;
        }
        if route.link_sequence.is_empty() {
            diagnostics.push(
                Diagnostic::warning(format!(
                    "route group {group} has member lines but no derived link sequence"
                ))
                .with_elements(vec![ElementId::Group(*group)]),
            );
            continue;
        }
        for pair in route.link_sequence.windows(2) {
            let (Some(a), Some(b)) = (store.link_by_id(&pair[0]), store.link_by_id(&pair[1]))
            else {
                continue;
            };
            let a_ends = [a.from_point, a.to_point];
            if !a_ends.contains(&b.from_point) && !a_ends.contains(&b.to_point) {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "route group {group} is disconnected between links {} and {}",
                        a.id, b.id
                    ))
                    .with_elements(vec![ElementId::Group(*group)]),
                );
            }
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_constructors() {
        let warning = Diagnostic::warning("something looks off");
        assert_eq!(warning.severity, Severity::Warning);
        assert!(warning.fix.is_none());

        let error = Diagnostic::error("broken")
            .with_elements(vec![ElementId::Line(3)])
            .with_fix(SuggestedFix::RetagIds(vec![(
                ElementId::Line(3),
                "3_1".to_string(),
            )]));
        assert_eq!(error.severity, Severity::Error);
        assert_eq!(error.elements, vec![ElementId::Line(3)]);
        assert!(error.fix.is_some());
    }

    #[test]
    fn test_diagnostic_display_names_elements() {
        let d = Diagnostic::warning("zero capacity").with_elements(vec![ElementId::Line(7)]);
        assert_eq!(format!("{d}"), "warning: zero capacity [line 7]");
    }
}
