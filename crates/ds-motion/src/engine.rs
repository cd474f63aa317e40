//! The motion engine: one vehicle driving a planned route, tick by tick.

use std::sync::Arc;

use tracing::{debug, info, trace};

use ds_core::{GeoPoint, NodeId, SimConfig};
use ds_spatial::{RouteGraph, Router, SpatialError};

use crate::cursor::{edge_polyline, Cursor, JunctionPolicy, Step};
use crate::{MotionError, MotionResult, MotionSnapshot, Phase, TickOutcome};

/// Drives a single vehicle along a route through a [`RouteGraph`].
///
/// # Type parameters
///
/// * `G` is the road graph, shared by `Arc` so a session and the engine can
///   both hold it.
/// * `R` is the planner used when a junction choice leaves the planned
///   route.
///
/// # Distance per tick
///
/// Each [`tick`][Self::tick] moves the vehicle `speed × tick_interval`
/// metres along the cached edge polyline, carrying leftover distance across
/// segment and edge boundaries.  Leftover distance is dropped when the
/// vehicle stops on a junction or the destination.
pub struct MotionEngine<G: RouteGraph, R: Router> {
    router: R,
    graph:  Option<Arc<G>>,
    route:  Option<Vec<NodeId>>,
    phase:  Phase,
    cursor: Option<Cursor>,

    speed_mps:          f64,
    tick_interval_secs: f64,
    junction_hint_m:    f64,
    stop_at_junctions:  bool,
    /// Value `stop_at_junctions` returns to on `reset`.
    default_stop:       bool,
    route_changed:      bool,
}

impl<G: RouteGraph, R: Router> MotionEngine<G, R> {
    /// An empty engine using the tick interval, initial speed, junction mode,
    /// and hint distance from `config`.
    ///
    /// `config` is assumed validated; see [`SimConfig::validate`].
    pub fn new(router: R, config: &SimConfig) -> Self {
        Self {
            router,
            graph:  None,
            route:  None,
            phase:  Phase::Empty,
            cursor: None,

            speed_mps:          config.initial_speed_mps,
            tick_interval_secs: config.tick_interval_secs,
            junction_hint_m:    config.junction_hint_m,
            stop_at_junctions:  config.stop_at_junctions,
            default_stop:       config.stop_at_junctions,
            route_changed:      false,
        }
    }

    // ── Setup ─────────────────────────────────────────────────────────────

    /// Attach a graph and a planned route.
    ///
    /// Replaces anything loaded before and returns the engine to
    /// [`Phase::Loaded`]; call [`start`][Self::start] to place the vehicle.
    pub fn load(&mut self, graph: Arc<G>, route: Vec<NodeId>) -> MotionResult<()> {
        if route.is_empty() {
            return Err(MotionError::EmptyRoute);
        }
        debug!(nodes = route.len(), "route loaded");
        self.graph = Some(graph);
        self.route = Some(route);
        self.cursor = None;
        self.phase = Phase::Loaded;
        self.route_changed = false;
        Ok(())
    }

    /// Place the vehicle on the first route node.
    ///
    /// A single-node route finishes immediately with the speed forced to 0.
    /// Calling `start` again restarts from the first node of the current
    /// route.
    pub fn start(&mut self) -> MotionResult<()> {
        let (Some(graph), Some(route)) = (self.graph.as_deref(), self.route.as_deref()) else {
            return Err(MotionError::NotLoaded);
        };
        let cursor = Cursor::at_start(graph, route)?;

        if route.len() == 1 {
            self.speed_mps = 0.0;
            self.phase = Phase::Finished;
            info!(node = %cursor.node, "single-node route, already at destination");
        } else {
            self.phase = Phase::Running;
            info!(from = %route[0], to = %route[route.len() - 1], nodes = route.len(), "drive started");
        }
        self.cursor = Some(cursor);
        Ok(())
    }

    /// [`load`][Self::load] then [`start`][Self::start], checking the first
    /// edge beforehand so a failure leaves the current drive as it was.
    pub fn begin(&mut self, graph: Arc<G>, route: Vec<NodeId>) -> MotionResult<()> {
        Cursor::at_start(&*graph, &route)?;
        self.load(graph, route)?;
        self.start()
    }

    /// Set the vehicle speed in m/s.  Takes effect on the next tick.
    pub fn set_speed(&mut self, speed_mps: f64) -> MotionResult<()> {
        if !(speed_mps.is_finite() && speed_mps >= 0.0) {
            return Err(MotionError::InvalidSpeed(speed_mps));
        }
        self.speed_mps = speed_mps;
        Ok(())
    }

    pub fn set_tick_interval(&mut self, secs: f64) -> MotionResult<()> {
        if !(secs.is_finite() && secs > 0.0) {
            return Err(MotionError::InvalidTickInterval(secs));
        }
        self.tick_interval_secs = secs;
        Ok(())
    }

    // ── Stepping ──────────────────────────────────────────────────────────

    /// Advance the vehicle by one tick.
    ///
    /// Does nothing while paused or finished.  An invariant-violation error
    /// aborts the tick part-way; the engine should be reset afterwards.
    pub fn tick(&mut self) -> MotionResult<TickOutcome> {
        match self.phase {
            Phase::Running => {}
            Phase::Paused { .. } | Phase::Finished => return Ok(TickOutcome::Skipped),
            Phase::Empty | Phase::Loaded => return Err(MotionError::NotStarted),
        }

        if !(self.tick_interval_secs.is_finite() && self.tick_interval_secs > 0.0) {
            return Err(MotionError::InvalidTickInterval(self.tick_interval_secs));
        }
        if !(self.speed_mps.is_finite() && self.speed_mps >= 0.0) {
            return Err(MotionError::InvalidSpeed(self.speed_mps));
        }
        let distance_m = self.speed_mps * self.tick_interval_secs;
        let policy = JunctionPolicy { stop: self.stop_at_junctions, hint_m: self.junction_hint_m };

        let (Some(graph), Some(route), Some(cursor)) =
            (self.graph.as_deref(), self.route.as_deref(), self.cursor.as_mut())
        else {
            return Err(MotionError::NotLoaded);
        };

        match cursor.advance(graph, route, distance_m, policy)? {
            Step::Moved => {
                trace!(distance_m, position = %cursor.position, "moved");
                Ok(TickOutcome::Moved)
            }
            Step::Junction(options) => {
                let node = cursor.node;
                debug!(%node, options = options.len(), "junction reached, awaiting choice");
                self.phase = Phase::Paused { junction: Some(options) };
                Ok(TickOutcome::JunctionReached(node))
            }
            Step::Arrived => {
                info!(node = %cursor.node, "destination reached");
                self.phase = Phase::Finished;
                Ok(TickOutcome::Finished)
            }
        }
    }

    /// Continue from the current junction towards `node`.
    ///
    /// `node` must be one of the pending junction options.  If it is the
    /// planned next node the route is kept; otherwise the rest of the route
    /// is replanned from `node` to the original destination and
    /// [`MotionSnapshot::route_changed`] is raised.  On any error the engine
    /// stays at the junction with its route unchanged.
    ///
    /// Returns `true` when the route was replanned.
    pub fn choose_junction_node(&mut self, node: NodeId) -> MotionResult<bool> {
        let options = self.phase.junction_options();
        if !self.phase.awaiting_junction() {
            return Err(MotionError::NotAtJunction);
        }
        if !options.iter().any(|o| o.node == node) {
            return Err(MotionError::InvalidJunctionChoice(node));
        }

        let (Some(graph), Some(route), Some(cursor)) =
            (self.graph.as_deref(), self.route.as_deref(), self.cursor.as_mut())
        else {
            return Err(MotionError::NotLoaded);
        };
        let here = cursor.node;
        let on_plan = cursor.next_planned(route).ok() == Some(node);

        if on_plan {
            cursor.load_edge(graph, here, node)?;
            debug!(%node, "continuing on planned route");
        } else {
            let destination = route[route.len() - 1];
            let partial = match self.router.route(graph, node, destination) {
                Ok(partial) => partial,
                Err(SpatialError::NoRoute { .. }) => {
                    return Err(MotionError::Unreachable { from: node, to: destination });
                }
                Err(e) => return Err(e.into()),
            };
            // Validate the new first edge before committing anything.
            edge_polyline(graph, here, node)?;

            let mut rerouted = Vec::with_capacity(partial.nodes.len() + 1);
            rerouted.push(here);
            rerouted.extend_from_slice(&partial.nodes);

            cursor.load_edge(graph, here, node)?;
            cursor.route_index = 0;
            info!(
                at = %here,
                via = %node,
                nodes = rerouted.len(),
                travel_secs = partial.total_travel_secs,
                "rerouted from junction"
            );
            self.route = Some(rerouted);
            self.route_changed = true;
        }

        cursor.bearing_deg = Some(cursor.geometry[0].bearing_deg(cursor.geometry[1]));
        self.phase = Phase::Running;
        Ok(!on_plan)
    }

    /// Pause a running vehicle.  No effect in any other phase.
    pub fn pause(&mut self) {
        if self.phase == Phase::Running {
            self.phase = Phase::Paused { junction: None };
            debug!("paused");
        }
    }

    /// Resume after [`pause`][Self::pause].
    ///
    /// No effect while waiting for a junction choice; the choice must be
    /// made with [`choose_junction_node`][Self::choose_junction_node].
    pub fn resume(&mut self) {
        match self.phase {
            Phase::Paused { junction: None } => {
                self.phase = Phase::Running;
                debug!("resumed");
            }
            Phase::Paused { junction: Some(_) } => {
                debug!("resume ignored while awaiting a junction choice");
            }
            _ => {}
        }
    }

    /// Turn junction stops on or off.
    ///
    /// Turning them off while waiting at a junction drops the pending
    /// options and continues on the planned route.
    pub fn set_stop_at_junctions(&mut self, enabled: bool) -> MotionResult<()> {
        if !enabled && self.phase.awaiting_junction() {
            let (Some(graph), Some(route), Some(cursor)) =
                (self.graph.as_deref(), self.route.as_deref(), self.cursor.as_mut())
            else {
                return Err(MotionError::NotLoaded);
            };
            let here = cursor.node;
            let next = cursor.next_planned(route)?;
            cursor.load_edge(graph, here, next)?;
            cursor.bearing_deg = Some(cursor.geometry[0].bearing_deg(cursor.geometry[1]));
            self.phase = Phase::Running;
            debug!(%next, "junction stops disabled, continuing on planned route");
        }
        self.stop_at_junctions = enabled;
        Ok(())
    }

    /// Clear the `route_changed` flag after the presentation layer has
    /// picked up the new route.
    pub fn acknowledge_route_change(&mut self) {
        self.route_changed = false;
    }

    /// Drop the graph, route, and cursor.
    ///
    /// The speed setting survives; junction stops go back to the configured
    /// default.
    pub fn reset(&mut self) {
        self.graph = None;
        self.route = None;
        self.cursor = None;
        self.phase = Phase::Empty;
        self.route_changed = false;
        self.stop_at_junctions = self.default_stop;
        debug!("motion engine reset");
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn state(&self) -> MotionSnapshot {
        MotionSnapshot {
            position:                 self.cursor.as_ref().map(|c| c.position),
            bearing_deg:              self.cursor.as_ref().and_then(|c| c.bearing_deg),
            finished:                 self.phase == Phase::Finished,
            paused:                   matches!(self.phase, Phase::Paused { .. }),
            awaiting_junction_choice: self.phase.awaiting_junction(),
            junction_options:         self.phase.junction_options().to_vec(),
            route_changed:            self.route_changed,
        }
    }

    /// Polyline of the route from the node the vehicle last passed to the
    /// destination, suitable for drawing.
    ///
    /// Degenerates to the current position alone when no edges remain, and
    /// is empty before `start` with nothing loaded.
    pub fn route_geometry(&self) -> MotionResult<Vec<GeoPoint>> {
        let mut points = match (self.graph.as_deref(), self.route.as_deref()) {
            (Some(graph), Some(route)) => {
                let from = self.cursor.as_ref().map_or(0, |c| c.route_index).min(route.len() - 1);
                graph.path_geometry(&route[from..]).ok_or_else(|| missing_edge(graph, &route[from..]))?
            }
            _ => Vec::new(),
        };
        if points.is_empty() {
            if let Some(cursor) = &self.cursor {
                points.push(cursor.position);
            }
        }
        Ok(points)
    }

    #[inline]
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// The route currently being driven, which may differ from the loaded
    /// one after a reroute.
    pub fn route(&self) -> Option<&[NodeId]> {
        self.route.as_deref()
    }

    /// The planner used for reroutes.
    pub fn router(&self) -> &R {
        &self.router
    }

    pub fn graph(&self) -> Option<&Arc<G>> {
        self.graph.as_ref()
    }

    /// The last route node reached, once started.
    pub fn current_node(&self) -> Option<NodeId> {
        self.cursor.as_ref().map(|c| c.node)
    }

    /// The next node on the current route, if any remain.
    pub fn planned_next(&self) -> Option<NodeId> {
        let (Some(route), Some(cursor)) = (self.route.as_deref(), self.cursor.as_ref()) else {
            return None;
        };
        cursor.next_planned(route).ok()
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.speed_mps
    }

    #[inline]
    pub fn tick_interval_secs(&self) -> f64 {
        self.tick_interval_secs
    }

    #[inline]
    pub fn stop_at_junctions(&self) -> bool {
        self.stop_at_junctions
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    #[cfg(test)]
    pub(crate) fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }
}

/// Error for the first pair in `nodes` that has no connecting edge.
fn missing_edge<G: RouteGraph>(graph: &G, nodes: &[NodeId]) -> MotionError {
    nodes
        .windows(2)
        .find(|pair| graph.edge_between(pair[0], pair[1]).is_none())
        .map_or(MotionError::NotLoaded, |pair| MotionError::MissingEdge { from: pair[0], to: pair[1] })
}
