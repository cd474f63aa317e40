//! Lifecycle phase, junction options, and the public state snapshot.

use ds_core::{GeoPoint, NodeId};

/// Where the engine is in its lifecycle.
///
/// ```text
///  Empty ──load──▶ Loaded ──start──▶ Running ──arrive──▶ Finished
///                                     ▲    │
///                       resume/choose │    │ pause / junction
///                                     │    ▼
///                                     Paused
/// ```
///
/// `reset` returns to `Empty` from any phase.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Nothing loaded.
    Empty,
    /// Graph and route loaded, `start` not yet called.
    Loaded,
    Running,
    /// Halted.  `junction` is `Some` while waiting for the driver to pick one
    /// of the listed options; `None` for a plain user pause.
    Paused { junction: Option<Vec<JunctionOption>> },
    Finished,
}

impl Phase {
    #[inline]
    pub fn awaiting_junction(&self) -> bool {
        matches!(self, Phase::Paused { junction: Some(_) })
    }

    pub fn junction_options(&self) -> &[JunctionOption] {
        match self {
            Phase::Paused { junction: Some(options) } => options,
            _ => &[],
        }
    }
}

/// One outgoing choice at a junction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JunctionOption {
    /// Node at the far end of the outgoing edge.
    pub node: NodeId,

    /// Street name of the outgoing edge (`"Unnamed Road"` when absent).
    pub street: String,

    /// Initial bearing of the outgoing edge in degrees, `[0, 360)`.
    pub bearing_deg: f64,

    /// A point a few metres along the outgoing bearing, for drawing an arrow
    /// or placing a label.
    pub hint: GeoPoint,
}

/// Presentation-facing view of the engine.
///
/// Produced by [`MotionEngine::state`][crate::MotionEngine::state]; reading
/// it never changes the engine.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionSnapshot {
    /// `None` until `start` has been called.
    pub position: Option<GeoPoint>,

    /// Bearing of the segment being driven, degrees `[0, 360)`.
    pub bearing_deg: Option<f64>,

    pub finished: bool,
    pub paused: bool,
    pub awaiting_junction_choice: bool,

    /// Empty unless `awaiting_junction_choice`.
    pub junction_options: Vec<JunctionOption>,

    /// Set when a junction choice replaced the remaining route; cleared by
    /// [`MotionEngine::acknowledge_route_change`][crate::MotionEngine::acknowledge_route_change].
    pub route_changed: bool,
}

/// What a single call to `tick` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Paused or finished; nothing moved.
    Skipped,
    Moved,
    /// Arrived at a junction and paused there awaiting a choice.
    JunctionReached(NodeId),
    /// Arrived at the final route node.
    Finished,
}
