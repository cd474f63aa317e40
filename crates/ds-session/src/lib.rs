//! `ds-session` — single-writer driver around a [`MotionEngine`][ds_motion::MotionEngine].
//!
//! A session turns two coordinates into a running drive:
//!
//! ```text
//! start_between(from, to)
//!   ① Snap     — nearest road node to each coordinate (R-tree lookup)
//!   ② Plan     — Router::route(origin, destination)
//!   ③ Load     — MotionEngine::load(network, route) + start()
//!
//! step(observer), repeated by the caller's clock:
//!   ④ Tick     — MotionEngine::tick(); clock advances unless skipped
//!   ⑤ Report   — observer hooks for junctions, arrival, tick end
//! ```
//!
//! Junction choices go through `choose_junction`, which reports reroutes to
//! the observer.
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use ds_session::{NoopObserver, SessionBuilder};
//!
//! let mut session = SessionBuilder::astar(Arc::new(network), config).build()?;
//! session.start_between(from, to)?;
//! session.set_speed(13.4)?;
//! session.run_until_stopped(10_000, &mut NoopObserver)?;
//! ```

pub mod builder;
pub mod error;
pub mod observer;
pub mod session;


pub use builder::SessionBuilder;
pub use error::{SessionError, SessionResult};
pub use observer::{NoopObserver, SessionObserver};
pub use session::Session;
