//! `ds-core` — foundational types for the `drive_sim` route simulator.
//!
//! This crate is a dependency of every other `ds-*` crate.  It has no
//! `ds-*` dependencies and a single required external one (`thiserror`,
//! plus optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `NodeId`, `EdgeId`                                    |
//! | [`geo`]         | `GeoPoint`: distance, bearing, destination            |
//! | [`time`]        | `Tick`, `SimClock`, `SimConfig`                       |
//! | [`error`]       | `CoreError`, `CoreResult`                             |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod error;
pub mod geo;
pub mod ids;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use geo::GeoPoint;
pub use ids::{EdgeId, NodeId};
pub use time::{SimClock, SimConfig, Tick, DEFAULT_MAX_SPEED_MPS};
