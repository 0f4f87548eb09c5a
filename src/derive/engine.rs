//! The derivation engine: exclusive owner of the derivation store, entry
//! point for full rebuilds and per-edit incremental re-derivation.

use tokio::sync::mpsc::UnboundedSender;

use crate::{
    check::{self, Diagnostic},
    config::ForgeConfig,
    derive::{
        propagate::{affected_closure, Closure},
        store::{Departure, DerivationStore, DerivedLink, DerivedNode},
        transit::{self, group_kind, GroupKind},
    },
    error::NetforgeError,
    event::{ForgeEvent, SourceEvent},
    export::{self, ExportGraph},
    relevance::is_relevant,
    resolve::{resolve_line, TAG_ID},
    source::SourceGraph,
};

/// Derives and maintains the network and transit overlay for one editing
/// session.
///
/// Single-threaded, edit-apply-then-notify: [`NetworkEngine::apply`]
/// processes one source mutation to completion, then emits exactly one
/// [`ForgeEvent::DerivedChanged`] on the optional notification channel.
/// Readers get `&` views of the store; nothing outside the engine mutates
/// derived state.
#[derive(Debug)]
pub struct NetworkEngine {
    config: ForgeConfig,
    store: DerivationStore,
    notifier: Option<UnboundedSender<ForgeEvent>>,
}

impl NetworkEngine {
    pub fn new(config: ForgeConfig) -> Self {
        NetworkEngine {
            config,
            store: DerivationStore::new(),
            notifier: None,
        }
    }

    pub fn with_notifier(config: ForgeConfig, notifier: UnboundedSender<ForgeEvent>) -> Self {
        NetworkEngine {
            config,
            store: DerivationStore::new(),
            notifier: Some(notifier),
        }
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    /// Replace the configuration. Qualification and relevance both depend on
    /// it, so follow with [`NetworkEngine::visit_all`].
    pub fn set_config(&mut self, config: ForgeConfig) {
        self.config = config;
    }

    pub fn store(&self) -> &DerivationStore {
        &self.store
    }

    /// Full rebuild from scratch, used at session start or bulk reload.
    /// Deterministic: rebuilding an unchanged source graph reproduces the
    /// derived maps exactly.
    pub fn visit_all(&mut self, graph: &SourceGraph) -> Result<(), NetforgeError> {
        tracing::debug!("Full derivation rebuild");
        self.store.clear();
        let closure = Closure {
            points: graph.points().map(|p| p.id).collect(),
            lines: graph.lines().map(|l| l.id).collect(),
            groups: graph.groups().map(|g| g.id).collect(),
        };
        self.rederive(graph, &closure)?;
        self.notify()
    }

    /// Process one source mutation: compute the affected closure, re-derive
    /// it, notify.
    pub fn apply(&mut self, graph: &SourceGraph, event: &SourceEvent) -> Result<(), NetforgeError> {
        let closure = affected_closure(graph, &event.touched());
        tracing::debug!(
            "{event}: re-deriving {} points, {} lines, {} groups",
            closure.points.len(),
            closure.lines.len(),
            closure.groups.len()
        );
        self.rederive(graph, &closure)?;
        self.notify()
    }

    /// Attach departures to a route slot. They ride along through later
    /// re-derivations of the backing group.
    pub fn set_departures(
        &mut self,
        group: i64,
        departures: Vec<Departure>,
    ) -> Result<(), NetforgeError> {
        let route = self
            .store
            .routes
            .get_mut(&group)
            .ok_or_else(|| NetforgeError::NotFound(format!("no route for group {group}")))?;
        route.departures = departures;
        Ok(())
    }

    /// Current consistency findings, computed on demand.
    pub fn diagnostics(&self, graph: &SourceGraph) -> Vec<Diagnostic> {
        check::run_all(graph, &self.store, &self.config)
    }

    /// Standalone projection of the derived graph onto stable identifiers,
    /// computed on demand.
    pub fn export(&self, graph: &SourceGraph) -> ExportGraph {
        export::project(graph, &self.store)
    }

    /// Re-derive one closure in fixed order: points, lines, then groups
    /// (stop areas before routes before masters, cleanup-only groups first).
    fn rederive(&mut self, graph: &SourceGraph, closure: &Closure) -> Result<(), NetforgeError> {
        for &point in &closure.points {
            self.derive_point(graph, point);
        }
        for &line in &closure.lines {
            self.derive_line(graph, line)?;
        }

        let mut stop_areas = Vec::new();
        let mut routes = Vec::new();
        let mut masters = Vec::new();
        let mut cleanup = Vec::new();
        for &group in &closure.groups {
            let kind = graph
                .group(group)
                .filter(|g| g.live)
                .and_then(|g| group_kind(&g.tags));
            match kind {
                Some(GroupKind::StopArea) => stop_areas.push(group),
                Some(GroupKind::Route(_)) => routes.push(group),
                Some(GroupKind::Master) => masters.push(group),
                None => cleanup.push(group),
            }
        }
        for group in cleanup
            .into_iter()
            .chain(stop_areas)
            .chain(routes)
            .chain(masters)
        {
            self.derive_group(graph, group);
        }
        Ok(())
    }

    /// Re-derive one point: drop any existing node, insert a fresh one iff
    /// the relevance predicate holds.
    fn derive_point(&mut self, graph: &SourceGraph, point_id: i64) {
        self.store.nodes.remove(&point_id);
        if !is_relevant(graph, &self.config, point_id) {
            return;
        }
        let Some(point) = graph.point(point_id) else {
            return;
        };
        self.store.nodes.insert(
            point_id,
            DerivedNode {
                original_id: point
                    .tags
                    .get(TAG_ID)
                    .map(str::to_string)
                    .unwrap_or_else(|| point_id.to_string()),
                coord: point.coord,
                point: point_id,
            },
        );
    }

    /// Re-derive one line: its whole link set is replaced atomically.
    ///
    /// Non-qualifying, closed-off or dead lines contribute nothing. For the
    /// rest, consecutive pairs of currently relevant points become one or
    /// two links each; segment length is the great-circle sum over the
    /// original points spanned, or the prorated share of an explicit length
    /// tag.
    fn derive_line(&mut self, graph: &SourceGraph, line_id: i64) -> Result<(), NetforgeError> {
        self.store.links.remove(&line_id);
        let Some(line) = graph.line(line_id) else {
            return Ok(());
        };
        if !line.live {
            return Ok(());
        }
        let Some(spec) =
            resolve_line(&line.tags, &self.config.defaults, self.config.hierarchy_cutoff)
        else {
            return Ok(());
        };
        if !spec.is_open() {
            return Ok(());
        }

        let pts: Vec<(i64, crate::source::Coord)> = line
            .points
            .iter()
            .filter_map(|p| {
                graph
                    .point(*p)
                    .filter(|point| point.live)
                    .map(|point| (*p, point.coord))
            })
            .collect();
        if pts.len() < 2 {
            return Ok(());
        }
        let total_geom: f64 = pts
            .windows(2)
            .map(|w| w[0].1.distance_m(&w[1].1))
            .sum();

        let relevant: Vec<usize> = {
            let config = &self.config;
            pts.iter()
                .enumerate()
                .filter(|(_, (p, _))| is_relevant(graph, config, *p))
                .map(|(i, _)| i)
                .collect()
        };
        if relevant.len() < 2 {
            return Ok(());
        }

        let base_orig = line
            .tags
            .get(TAG_ID)
            .map(str::to_string)
            .unwrap_or_else(|| line_id.to_string());
        let segment_count = relevant.len() - 1;
        let mut links = Vec::new();

        for (segment, pair) in relevant.windows(2).enumerate() {
            let (i0, i1) = (pair[0], pair[1]);
            let (from, to) = (pts[i0].0, pts[i1].0);
            if from == to {
                // A loop closing back on the same relevant point spans no
                // distinct endpoints.
                continue;
            }
            let geom: f64 = pts[i0..=i1]
                .windows(2)
                .map(|w| w[0].1.distance_m(&w[1].1))
                .sum();
            let length_m = match spec.length_override {
                Some(total) if total_geom > 0.0 => total * geom / total_geom,
                Some(total) => total / segment_count as f64,
                None => geom,
            };
            let span: Vec<i64> = pts[i0..=i1].iter().map(|(p, _)| *p).collect();
            let session_id = format!("{line_id}_{segment}");
            let original_id = format!("{base_orig}_{segment}");

            for (id, original_id, from_point, to_point, reversed, enabled) in [
                (
                    session_id.clone(),
                    original_id.clone(),
                    from,
                    to,
                    false,
                    spec.forward,
                ),
                (
                    format!("{session_id}_r"),
                    format!("{original_id}_r"),
                    to,
                    from,
                    true,
                    spec.backward,
                ),
            ] {
                if !enabled {
                    continue;
                }
                for endpoint in [from_point, to_point] {
                    if !self.store.nodes.contains_key(&endpoint) {
                        return Err(NetforgeError::Invariant(format!(
                            "link {id} endpoint point {endpoint} has no derived node; \
                             change propagation missed it"
                        )));
                    }
                }
                let mut segment_points = span.clone();
                if reversed {
                    segment_points.reverse();
                }
                links.push(DerivedLink {
                    id,
                    original_id,
                    from_point,
                    to_point,
                    length_m,
                    freespeed: spec.freespeed,
                    capacity: spec.capacity,
                    lanes_per_direction: spec.lanes_per_direction,
                    modes: spec.modes.clone(),
                    segment_points,
                    reversed,
                });
            }
        }

        if !links.is_empty() {
            self.store.links.insert(line_id, links);
        }
        Ok(())
    }

    /// Re-derive one group, reconciling all three transit maps for its id so
    /// a retagged group sheds its previous derived shape.
    fn derive_group(&mut self, graph: &SourceGraph, group_id: i64) {
        if !self.config.transit_support {
            self.store.stop_areas.remove(&group_id);
            self.store.routes.remove(&group_id);
            self.store.transit_lines.remove(&group_id);
            return;
        }
        let kind = graph
            .group(group_id)
            .filter(|g| g.live)
            .and_then(|g| group_kind(&g.tags));

        if !matches!(kind, Some(GroupKind::StopArea)) {
            self.store.stop_areas.remove(&group_id);
        }
        if !matches!(kind, Some(GroupKind::Route(_))) {
            transit::tombstone_route(&mut self.store, group_id);
        }
        if !matches!(kind, Some(GroupKind::Master)) {
            self.store.transit_lines.remove(&group_id);
        }

        match kind {
            Some(GroupKind::StopArea) => transit::derive_stop_area(graph, &mut self.store, group_id),
            Some(GroupKind::Route(_)) => {
                transit::derive_route(graph, &self.config, &mut self.store, group_id)
            }
            Some(GroupKind::Master) => transit::derive_master(graph, &mut self.store, group_id),
            None => {}
        }
    }

    fn notify(&self) -> Result<(), NetforgeError> {
        if let Some(notifier) = &self.notifier {
            notifier.send(ForgeEvent::DerivedChanged {
                nodes: self.store.nodes.len(),
                links: self.store.link_count(),
            })?;
        }
        Ok(())
    }
}
