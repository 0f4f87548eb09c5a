use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::source::ElementId;

/// A single mutation applied to the source graph by the hosting editor.
///
/// Each variant carries the directly affected element set. The hosting editor
/// applies the mutation to its [`crate::source::SourceGraph`] first, then hands
/// the event to [`crate::derive::NetworkEngine::apply`], which computes the
/// affected closure and re-derives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceEvent {
    /// Point coordinates changed (element ids are point ids).
    PointsMoved(Vec<i64>),
    /// Tag map replaced on any element kind.
    TagsChanged(Vec<ElementId>),
    /// Elements newly inserted into the source graph.
    ElementsAdded(Vec<ElementId>),
    /// Elements tombstoned (liveness flag cleared) in the source graph.
    ElementsRemoved(Vec<ElementId>),
    /// A group's ordered member list was changed or reordered (group ids).
    MembersChanged(Vec<i64>),
}

impl SourceEvent {
    /// The directly touched element set, normalized to [`ElementId`]s.
    pub fn touched(&self) -> Vec<ElementId> {
        match self {
            SourceEvent::PointsMoved(ids) => ids.iter().map(|id| ElementId::Point(*id)).collect(),
            SourceEvent::TagsChanged(ids) => ids.clone(),
            SourceEvent::ElementsAdded(ids) => ids.clone(),
            SourceEvent::ElementsRemoved(ids) => ids.clone(),
            SourceEvent::MembersChanged(ids) => ids.iter().map(|id| ElementId::Group(*id)).collect(),
        }
    }
}

impl Display for SourceEvent {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            SourceEvent::PointsMoved(ids) => write!(f, "PointsMoved({})", ids.len()),
            SourceEvent::TagsChanged(ids) => write!(f, "TagsChanged({})", ids.len()),
            SourceEvent::ElementsAdded(ids) => write!(f, "ElementsAdded({})", ids.len()),
            SourceEvent::ElementsRemoved(ids) => write!(f, "ElementsRemoved({})", ids.len()),
            SourceEvent::MembersChanged(ids) => write!(f, "MembersChanged({})", ids.len()),
        }
    }
}

/// Notifications emitted by the engine after it finishes processing a mutation.
///
/// Exactly one `DerivedChanged` is sent per processed [`SourceEvent`] (and one
/// per full rebuild), so downstream collaborators can re-read the derived maps
/// without tracking individual entity updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForgeEvent {
    /// Derived state was replaced; counts are the post-derivation totals.
    DerivedChanged { nodes: usize, links: usize },
}

impl Display for ForgeEvent {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            ForgeEvent::DerivedChanged { nodes, links } => {
                write!(f, "DerivedChanged({nodes} nodes, {links} links)")
            }
        }
    }
}
