use ds_core::{CoreError, GeoPoint};
use ds_motion::MotionError;
use ds_spatial::SpatialError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("no road node near {0}")]
    NoNearbyNode(GeoPoint),

    #[error("planning error: {0}")]
    Spatial(#[from] SpatialError),

    #[error("motion error: {0}")]
    Motion(#[from] MotionError),
}

impl SessionError {
    /// `true` when planning found no path, either for the initial route or
    /// for a junction reroute.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            SessionError::Spatial(SpatialError::NoRoute { .. })
                | SessionError::Motion(MotionError::Unreachable { .. })
        )
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
