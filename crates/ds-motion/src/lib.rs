//! `ds-motion` — tick-driven motion of one vehicle along a planned route.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                     |
//! |--------------|--------------------------------------------------------------|
//! | [`engine`]   | `MotionEngine<G, R>` — lifecycle, ticks, junction choices    |
//! | [`state`]    | `Phase`, `JunctionOption`, `MotionSnapshot`, `TickOutcome`   |
//! | [`junction`] | `junction_options` — outgoing choices at a branch node       |
//! | [`error`]    | `MotionError`, `ErrorKind`, `MotionResult<T>`                |
//!
//! # Movement model
//!
//! The vehicle follows the polyline geometry of each route edge:
//!
//! 1. `start` places it on the first route node and caches the first edge's
//!    polyline.
//! 2. Every `tick` moves it `speed × tick_interval` metres, crossing segment
//!    and edge boundaries and carrying leftover distance forward.
//! 3. On reaching an intermediate node with two or more outgoing edges (and
//!    junction stops enabled) it halts and lists the options.  The driver
//!    picks one with `choose_junction_node`; leaving the plan triggers a
//!    replan from the chosen node to the original destination.
//! 4. On reaching the last route node the engine is finished.
//!
//! Presentation code reads only [`MotionSnapshot`] and
//! [`MotionEngine::route_geometry`].

mod cursor;
pub mod engine;
pub mod error;
pub mod junction;
pub mod state;

#[cfg(test)]
mod tests;

pub use engine::MotionEngine;
pub use error::{ErrorKind, MotionError, MotionResult};
pub use junction::junction_options;
pub use state::{JunctionOption, MotionSnapshot, Phase, TickOutcome};
