//! Derivation module: the engine, its store, change propagation and transit
//! assembly.
//!
//! # Module Organization
//!
//! - [`NetworkEngine`]: orchestrates conversion of source points, lines and
//!   groups into derived nodes, links and transit entities
//! - [`DerivationStore`]: exclusive owner of all derived state
//! - [`affected_closure`]: referrer-driven change propagation
//! - [`transit`]: stop area, route and transit line assembly

mod engine;
mod propagate;
mod store;
pub mod transit;

#[cfg(test)]
mod tests;

pub use engine::NetworkEngine;
pub use propagate::{affected_closure, Closure};
pub use store::{
    Departure, DerivationStore, DerivedLink, DerivedNode, Route, RouteStop, StopArea, TransitLine,
};
