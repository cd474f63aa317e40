//! Simulation clock and run configuration.
//!
//! # Design
//!
//! The motion engine has no timer of its own.  An external driver calls
//! `tick()` and each call stands for a fixed slice of simulated time:
//!
//!   elapsed_secs = tick * tick_interval_secs
//!
//! Counting ticks as integers keeps the clock exact; only the conversion to
//! seconds is floating point.

use std::fmt;

use crate::{CoreError, CoreResult};

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute simulation tick counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// Counts driver ticks and maps them to simulated seconds.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    /// Simulated seconds represented by one tick.
    pub tick_interval_secs: f64,
    /// The current tick — advanced by `SimClock::advance()` each iteration.
    pub current_tick: Tick,
}

impl SimClock {
    pub fn new(tick_interval_secs: f64) -> Self {
        Self {
            tick_interval_secs,
            current_tick: Tick::ZERO,
        }
    }

    /// Advance the clock by one tick.
    #[inline]
    pub fn advance(&mut self) {
        self.current_tick = Tick(self.current_tick.0 + 1);
    }

    /// Elapsed simulated seconds since tick 0.
    #[inline]
    pub fn elapsed_secs(&self) -> f64 {
        self.current_tick.0 as f64 * self.tick_interval_secs
    }

    /// Rewind to tick 0 (used when a session is reset).
    pub fn restart(&mut self) {
        self.current_tick = Tick::ZERO;
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.1} s)", self.current_tick, self.elapsed_secs())
    }
}

// ── SimConfig ─────────────────────────────────────────────────────────────────

/// 70 mph in metres per second — the optimistic top speed assumed by the
/// A* heuristic.
pub const DEFAULT_MAX_SPEED_MPS: f64 = 70.0 * 1609.34 / 3600.0;

/// Top-level simulation configuration.
///
/// Typically loaded from a TOML file by the application crate and passed to
/// the session builder.  Missing fields take their [`Default`] values.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimConfig {
    /// Simulated seconds per tick.  Default: 0.2.
    pub tick_interval_secs: f64,

    /// Vehicle speed applied when a session starts, in m/s.  Default: 0.
    pub initial_speed_mps: f64,

    /// Pause at every branch node and wait for a manual choice.
    /// Default: `true`.
    pub stop_at_junctions: bool,

    /// Optimistic maximum speed used by the A* heuristic, in m/s.
    ///
    /// Planning is only optimal if no edge in the network is traversed
    /// faster than this.
    pub max_speed_mps: f64,

    /// Distance along a candidate edge at which a junction option's
    /// rendering hint is placed, in metres.  Default: 8.
    pub junction_hint_m: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 0.2,
            initial_speed_mps:  0.0,
            stop_at_junctions:  true,
            max_speed_mps:      DEFAULT_MAX_SPEED_MPS,
            junction_hint_m:    8.0,
        }
    }
}

impl SimConfig {
    /// Check every field for values the engine cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.tick_interval_secs.is_finite() && self.tick_interval_secs > 0.0) {
            return Err(CoreError::Config(format!(
                "tick_interval_secs must be positive, got {}",
                self.tick_interval_secs
            )));
        }
        if !(self.initial_speed_mps.is_finite() && self.initial_speed_mps >= 0.0) {
            return Err(CoreError::Config(format!(
                "initial_speed_mps must be non-negative, got {}",
                self.initial_speed_mps
            )));
        }
        if !(self.max_speed_mps.is_finite() && self.max_speed_mps > 0.0) {
            return Err(CoreError::Config(format!(
                "max_speed_mps must be positive, got {}",
                self.max_speed_mps
            )));
        }
        if !(self.junction_hint_m.is_finite() && self.junction_hint_m > 0.0) {
            return Err(CoreError::Config(format!(
                "junction_hint_m must be positive, got {}",
                self.junction_hint_m
            )));
        }
        Ok(())
    }

    /// Construct a `SimClock` pre-configured for this run.
    pub fn make_clock(&self) -> SimClock {
        SimClock::new(self.tick_interval_secs)
    }
}
