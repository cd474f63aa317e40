//! Fluent builder for constructing a [`Session`].

use std::sync::Arc;

use ds_core::SimConfig;
use ds_motion::MotionEngine;
use ds_spatial::{AStarRouter, RoadNetwork, Router, SpatialError};

use crate::{Session, SessionResult};

/// Fluent builder for [`Session<R>`].
///
/// # Required inputs
///
/// - the road network, shared by `Arc`
/// - `R: Router` — the planner (e.g. [`AStarRouter`])
///
/// # Optional inputs (have defaults)
///
/// | Method       | Default                |
/// |--------------|------------------------|
/// | `.config(c)` | `SimConfig::default()` |
///
/// # Example
///
/// ```rust,ignore
/// let mut session = SessionBuilder::new(Arc::new(network), DijkstraRouter)
///     .config(config)
///     .build()?;
/// session.start_between(from, to)?;
/// session.run_until_stopped(10_000, &mut NoopObserver)?;
/// ```
pub struct SessionBuilder<R: Router> {
    network: Arc<RoadNetwork>,
    router:  R,
    config:  SimConfig,
}

impl<R: Router> SessionBuilder<R> {
    pub fn new(network: Arc<RoadNetwork>, router: R) -> Self {
        Self {
            network,
            router,
            config: SimConfig::default(),
        }
    }

    pub fn config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and return an idle [`Session`].
    ///
    /// Fails on an invalid config or an empty network.
    pub fn build(self) -> SessionResult<Session<R>> {
        self.config.validate()?;
        if self.network.is_empty() {
            return Err(SpatialError::EmptyNetwork.into());
        }

        let engine = MotionEngine::new(self.router, &self.config);
        Ok(Session {
            clock:   self.config.make_clock(),
            config:  self.config,
            network: self.network,
            engine,
            plan:    None,
        })
    }
}

impl SessionBuilder<AStarRouter> {
    /// A* planning with the heuristic speed bound taken from `config`.
    pub fn astar(network: Arc<RoadNetwork>, config: SimConfig) -> Self {
        Self {
            network,
            router: AStarRouter::new(config.max_speed_mps),
            config,
        }
    }
}
