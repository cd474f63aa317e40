//! The `Session` struct: one vehicle, one engine, one writer.

use std::sync::Arc;

use tracing::{debug, info};

use ds_core::{GeoPoint, NodeId, SimClock, SimConfig};
use ds_motion::{MotionEngine, MotionSnapshot, TickOutcome};
use ds_spatial::{RoadNetwork, Route, Router};

use crate::{NoopObserver, SessionError, SessionObserver, SessionResult};

/// Drives one [`MotionEngine`] on behalf of a single caller.
///
/// A session owns its engine outright, so every mutating call takes
/// `&mut self`.  Callers that share a session between threads wrap it in a
/// `Mutex`; the engine itself has no internal locking.
///
/// Create via [`SessionBuilder`][crate::SessionBuilder].
pub struct Session<R: Router> {
    pub(crate) config:  SimConfig,
    pub(crate) clock:   SimClock,
    pub(crate) network: Arc<RoadNetwork>,
    pub(crate) engine:  MotionEngine<RoadNetwork, R>,
    /// The route planned by the last `start_*` call.
    pub(crate) plan:    Option<Route>,
}

impl<R: Router> Session<R> {
    // ── Starting a drive ──────────────────────────────────────────────────

    /// Snap both coordinates to their nearest road nodes, plan between them,
    /// and start driving.
    pub fn start_between(&mut self, from: GeoPoint, to: GeoPoint) -> SessionResult<&Route> {
        let origin = self.network.snap_to_node(from).ok_or(SessionError::NoNearbyNode(from))?;
        let destination = self.network.snap_to_node(to).ok_or(SessionError::NoNearbyNode(to))?;
        debug!(%from, %origin, %to, %destination, "endpoints snapped");
        self.start_nodes(origin, destination)
    }

    /// Plan from `from` to `to` and start driving.
    ///
    /// An unreachable destination fails with
    /// [`SpatialError::NoRoute`][ds_spatial::SpatialError::NoRoute] and
    /// leaves any previous drive untouched.
    pub fn start_nodes(&mut self, from: NodeId, to: NodeId) -> SessionResult<&Route> {
        let route = self.engine.router().route(&*self.network, from, to)?;
        info!(
            %from,
            %to,
            nodes = route.len(),
            travel_secs = route.total_travel_secs,
            "route planned"
        );

        self.engine.begin(Arc::clone(&self.network), route.nodes.clone())?;
        self.clock.restart();
        let plan = self.plan.insert(route);
        Ok(&*plan)
    }

    // ── Controls ──────────────────────────────────────────────────────────

    pub fn set_speed(&mut self, speed_mps: f64) -> SessionResult<()> {
        self.engine.set_speed(speed_mps)?;
        Ok(())
    }

    pub fn pause(&mut self) {
        self.engine.pause();
    }

    pub fn resume(&mut self) {
        self.engine.resume();
    }

    /// Turn manual junction stops on or off.
    pub fn set_junction_mode(&mut self, stop_at_junctions: bool) -> SessionResult<()> {
        self.engine.set_stop_at_junctions(stop_at_junctions)?;
        info!(stop_at_junctions, "junction mode changed");
        Ok(())
    }

    /// Pick the next node at the current junction.
    ///
    /// Returns `true` when the choice left the planned route and the rest of
    /// the route was replanned.
    pub fn choose_junction<O: SessionObserver>(
        &mut self,
        node:     NodeId,
        observer: &mut O,
    ) -> SessionResult<bool> {
        let rerouted = self.engine.choose_junction_node(node)?;
        if rerouted {
            if let Some(route) = self.engine.route() {
                observer.on_reroute(route);
            }
        }
        Ok(rerouted)
    }

    // ── Stepping ──────────────────────────────────────────────────────────

    /// One tick with no observer.
    pub fn tick(&mut self) -> SessionResult<TickOutcome> {
        self.step(&mut NoopObserver)
    }

    /// One tick, reporting to `observer`.
    ///
    /// The clock only advances on ticks that were not skipped.
    pub fn step<O: SessionObserver>(&mut self, observer: &mut O) -> SessionResult<TickOutcome> {
        let now = self.clock.current_tick;
        observer.on_tick_start(now);

        let outcome = self.engine.tick()?;
        if outcome != TickOutcome::Skipped {
            self.clock.advance();
        }

        let state = self.engine.state();
        match outcome {
            TickOutcome::JunctionReached(node) => {
                observer.on_junction(now, node, &state.junction_options);
            }
            TickOutcome::Finished => {
                if let Some(position) = state.position {
                    info!(tick = %now, elapsed_secs = self.clock.elapsed_secs(), "drive finished");
                    observer.on_finished(now, position);
                }
            }
            TickOutcome::Moved | TickOutcome::Skipped => {}
        }
        observer.on_tick_end(now, &state);
        Ok(outcome)
    }

    /// Run exactly `n` ticks and return the last outcome
    /// ([`TickOutcome::Skipped`] when `n` is 0).
    pub fn run_ticks<O: SessionObserver>(
        &mut self,
        n:        u64,
        observer: &mut O,
    ) -> SessionResult<TickOutcome> {
        let mut last = TickOutcome::Skipped;
        for _ in 0..n {
            last = self.step(observer)?;
        }
        Ok(last)
    }

    /// Tick until the vehicle stops (junction, destination, or pause) or
    /// `max_ticks` have run, whichever comes first.
    pub fn run_until_stopped<O: SessionObserver>(
        &mut self,
        max_ticks: u64,
        observer:  &mut O,
    ) -> SessionResult<TickOutcome> {
        let mut last = TickOutcome::Skipped;
        for _ in 0..max_ticks {
            last = self.step(observer)?;
            if last != TickOutcome::Moved {
                break;
            }
        }
        Ok(last)
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn state(&self) -> MotionSnapshot {
        self.engine.state()
    }

    /// Remaining route geometry for drawing.  Reading it acknowledges any
    /// pending route change.
    pub fn route_geometry(&mut self) -> SessionResult<Vec<GeoPoint>> {
        let points = self.engine.route_geometry()?;
        self.engine.acknowledge_route_change();
        Ok(points)
    }

    /// Drop the current drive.  Speed is kept; the clock rewinds to tick 0.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.plan = None;
        self.clock.restart();
        info!("session reset");
    }

    /// The route planned at start, before any reroute.
    pub fn plan(&self) -> Option<&Route> {
        self.plan.as_ref()
    }

    #[inline]
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    #[inline]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn network(&self) -> &Arc<RoadNetwork> {
        &self.network
    }

    pub fn engine(&self) -> &MotionEngine<RoadNetwork, R> {
        &self.engine
    }
}
