//! Spatial-subsystem error type.

use thiserror::Error;

use ds_core::NodeId;

/// Errors produced by `ds-spatial`.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// The goal cannot be reached from the start.  This is the planner's
    /// explicit "unreachable" answer, not a malfunction.
    #[error("no route from {from} to {to}")]
    NoRoute { from: NodeId, to: NodeId },

    #[error("node {0} not found in network")]
    NodeNotFound(NodeId),

    #[error("network has no nodes")]
    EmptyNetwork,

    #[error("network parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SpatialResult<T> = Result<T, SpatialError>;
