use ds_core::NodeId;
use ds_spatial::SpatialError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MotionError {
    // ── Precondition ──────────────────────────────────────────────────────
    #[error("graph or route missing")]
    NotLoaded,

    #[error("route must contain at least one node")]
    EmptyRoute,

    #[error("simulation has not been started")]
    NotStarted,

    #[error("not waiting for a junction choice")]
    NotAtJunction,

    #[error("{0} is not one of the current junction options")]
    InvalidJunctionChoice(NodeId),

    // ── Invalid argument ──────────────────────────────────────────────────
    #[error("speed must be a non-negative number of m/s, got {0}")]
    InvalidSpeed(f64),

    #[error("tick interval must be positive, got {0}")]
    InvalidTickInterval(f64),

    // ── Invariant violation (malformed graph or route) ────────────────────
    #[error("segment index {segment} out of bounds for geometry of {points} points")]
    SegmentOutOfBounds { segment: usize, points: usize },

    #[error("route ended early: no node after index {index} of {len}")]
    RouteExhausted { index: usize, len: usize },

    #[error("no edge from {from} to {to}")]
    MissingEdge { from: NodeId, to: NodeId },

    #[error("edge {from} → {to} has {points} geometry points, need at least 2")]
    InvalidGeometry { from: NodeId, to: NodeId, points: usize },

    #[error("routing failed: {0}")]
    Routing(#[from] SpatialError),

    // ── Unreachable ───────────────────────────────────────────────────────
    #[error("destination {to} is unreachable from {from}")]
    Unreachable { from: NodeId, to: NodeId },
}

/// Coarse classification of [`MotionError`]s.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation not valid in the current state; nothing was changed.
    Precondition,
    /// Bad caller-supplied value; nothing was changed.
    InvalidArgument,
    /// Malformed graph or route data.  The failing tick may have left the
    /// cursor part-way through an update.
    InvariantViolation,
    /// The planner found no path; nothing was changed.
    Unreachable,
}

impl MotionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MotionError::NotLoaded
            | MotionError::EmptyRoute
            | MotionError::NotStarted
            | MotionError::NotAtJunction
            | MotionError::InvalidJunctionChoice(_) => ErrorKind::Precondition,

            MotionError::InvalidSpeed(_) | MotionError::InvalidTickInterval(_) => {
                ErrorKind::InvalidArgument
            }

            MotionError::SegmentOutOfBounds { .. }
            | MotionError::RouteExhausted { .. }
            | MotionError::MissingEdge { .. }
            | MotionError::InvalidGeometry { .. }
            | MotionError::Routing(_) => ErrorKind::InvariantViolation,

            MotionError::Unreachable { .. } => ErrorKind::Unreachable,
        }
    }
}

pub type MotionResult<T> = Result<T, MotionError>;
