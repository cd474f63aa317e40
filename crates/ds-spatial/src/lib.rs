//! `ds-spatial` — road network, nearest-node lookup, and route planning.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                        |
//! |-------------|-----------------------------------------------------------------|
//! | [`network`] | `RouteGraph` trait, `RoadNetwork` (CSR + R-tree), `RoadNetworkBuilder`, `EdgeSpec` |
//! | [`router`]  | `Router` trait, `Route`, `AStarRouter`, `DijkstraRouter`        |
//! | [`loader`]  | `load_network_csv` for networks preprocessed elsewhere          |
//! | [`error`]   | `SpatialError`, `SpatialResult<T>`                              |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on `ds-core` types.        |

pub mod error;
pub mod loader;
pub mod network;
pub mod router;


pub use error::{SpatialError, SpatialResult};
pub use loader::{load_network_csv, load_network_readers, LoadedNetwork, FALLBACK_SPEED_KPH};
pub use network::{EdgeSpec, RoadNetwork, RoadNetworkBuilder, RouteGraph, UNNAMED_ROAD};
pub use router::{AStarRouter, DijkstraRouter, Route, Router};
