//! Session observer trait for progress reporting.

use ds_core::{GeoPoint, NodeId, Tick};
use ds_motion::{JunctionOption, MotionSnapshot};

/// Callbacks invoked by [`Session`][crate::Session] while stepping.
///
/// All methods have default no-op implementations so implementors only need to
/// override what they care about.
///
/// # Example — junction logger
///
/// ```rust,ignore
/// struct JunctionLogger;
///
/// impl SessionObserver for JunctionLogger {
///     fn on_junction(&mut self, tick: Tick, node: NodeId, options: &[JunctionOption]) {
///         println!("{tick}: {node} has {} ways out", options.len());
///     }
/// }
/// ```
pub trait SessionObserver {
    /// Called before the engine is ticked.
    fn on_tick_start(&mut self, _tick: Tick) {}

    /// Called after every tick with the snapshot the tick produced.
    fn on_tick_end(&mut self, _tick: Tick, _state: &MotionSnapshot) {}

    /// The vehicle stopped at `node` and is waiting for a choice.
    fn on_junction(&mut self, _tick: Tick, _node: NodeId, _options: &[JunctionOption]) {}

    /// A junction choice replaced the rest of the route.
    fn on_reroute(&mut self, _route: &[NodeId]) {}

    /// The vehicle reached its destination.
    fn on_finished(&mut self, _tick: Tick, _position: GeoPoint) {}
}

/// A [`SessionObserver`] that does nothing.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}
