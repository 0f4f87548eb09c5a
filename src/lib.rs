//! # netforge-core
//!
//! A Rust library for incrementally deriving a transportation network graph
//! and a public-transit schedule overlay from an interactively edited
//! geographic source graph.
//!
//! ## Overview
//!
//! The hosting editor owns a dataset of points, polylines and role-tagged
//! member groups, all carrying free-form key/value tags, and mutates it
//! arbitrarily: move a point, retag a line, add or remove elements, reorder
//! a group's member list. netforge-core keeps a derived network (nodes and
//! links) and transit overlay (stop areas, routes, transit lines) consistent
//! with that dataset after every single edit, recomputing only the affected
//! closure of derived entities, and exposes the result for downstream
//! export.
//!
//! ### Key Features
//!
//! - **Attribute resolution**: pure tag-plus-defaults resolution of link
//!   attributes (freespeed, capacity, lanes, directionality, modes), where
//!   malformed input degrades to "does not qualify" instead of erroring
//! - **Incremental propagation**: referrer-graph traversal limits
//!   recomputation to the derived entities an edit can actually affect
//! - **Identity-stable transit**: route slots survive re-derivation, so
//!   attached departure data rides through unrelated edits
//! - **Consistency checking**: duplicate identifier, doubtful attribute and
//!   route connectivity diagnostics with suggested (never auto-applied)
//!   corrective edits
//! - **Stable export**: an on-demand standalone projection keyed by original
//!   identifiers, with tombstoned entities swept
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netforge_core::{
//!     config::ForgeConfig,
//!     derive::NetworkEngine,
//!     event::SourceEvent,
//!     source::{Coord, SourceGraph, TagMap},
//! };
//!
//! fn main() -> Result<(), netforge_core::NetforgeError> {
//!     let mut graph = SourceGraph::new();
//!     graph.insert_point(1, Coord::new(13.40, 52.52), TagMap::new());
//!     graph.insert_point(2, Coord::new(13.41, 52.52), TagMap::new());
//!     graph.insert_line(
//!         10,
//!         vec![1, 2],
//!         TagMap::from_pairs([("highway", "residential")]),
//!     );
//!
//!     // Full rebuild at session start.
//!     let mut engine = NetworkEngine::new(ForgeConfig::default());
//!     engine.visit_all(&graph)?;
//!     assert_eq!(engine.store().links_of_line(10).len(), 2);
//!
//!     // The editor moves a point; only the affected closure re-derives.
//!     graph.move_point(2, Coord::new(13.42, 52.52));
//!     engine.apply(&graph, &SourceEvent::PointsMoved(vec![2]))?;
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Qualification and relevance
//!
//! A line *qualifies* when capacity, freespeed, lanes per direction and
//! modes are all resolvable from its tags and the configured defaults table
//! ([`resolve`]). A point is *relevant*, and becomes a node, while at least
//! one qualifying line uses it as an endpoint, junction or stop position
//! ([`relevance`]). Both predicates are pure and recomputed from current
//! source state, so derived entries can never go stale.
//!
//! ### Edit-apply-then-notify
//!
//! Each [`event::SourceEvent`] is processed to completion before control
//! returns, then a single [`event::ForgeEvent::DerivedChanged`] fires on the
//! optional notification channel. Collaborators re-read the engine's map
//! views on demand; there is no background derivation and no partial state
//! observable between edits. Hosts must serialize edits.
//!
//! ### Tombstones
//!
//! Removal never reorders identity out from under the derived state: source
//! elements keep a liveness flag until purged, and a route that stops
//! qualifying is marked deleted, keeping its departures, until the export
//! sweep drops it.
//!
//! ## Module Guide
//!
//! Start with [`derive::NetworkEngine`] for the derivation loop, then
//! [`source::SourceGraph`] for the dataset mirror it consumes. See
//! [`resolve`] for attribute resolution, [`check`] for diagnostics and
//! [`export`] for the stable projection.

pub mod check;
pub mod config;
pub mod derive;
pub mod error;
pub mod event;
pub mod export;
pub mod relevance;
pub mod resolve;
pub mod source;

pub use error::*;
