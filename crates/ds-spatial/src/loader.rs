//! CSV road network loader.
//!
//! Reads a network that was downloaded and preprocessed elsewhere.  Nothing
//! here talks to a mapping service.
//!
//! # CSV format
//!
//! `nodes.csv` — one row per intersection:
//!
//! ```csv
//! id,lon,lat
//! 42443213,-73.9857,40.7484
//! 42443220,-73.9846,40.7490
//! ```
//!
//! `edges.csv` — one row per **directed** edge (two-way streets need a row
//! each way):
//!
//! ```csv
//! from,to,name,travel_time_s,speed_kph,geometry
//! 42443213,42443220,W 34th St,9.1,,
//! 42443220,42443213,W 34th St,,40,-73.9846 40.7490;-73.9851 40.7487;-73.9857 40.7484
//! ```
//!
//! | Column          | Required | Meaning                                         |
//! |-----------------|----------|-------------------------------------------------|
//! | `from`, `to`    | yes      | node ids from `nodes.csv`                       |
//! | `name`          | no       | street display name                             |
//! | `travel_time_s` | no       | edge cost; derived from length and speed if empty, `inf` = closed |
//! | `speed_kph`     | no       | used only to derive a missing travel time       |
//! | `geometry`      | no       | `lon lat;lon lat;...`, empty = straight line    |
//!
//! A missing speed falls back to [`FALLBACK_SPEED_KPH`].

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use ds_core::{GeoPoint, NodeId};

use crate::network::{EdgeSpec, RoadNetwork, RoadNetworkBuilder};
use crate::{SpatialError, SpatialResult};

/// Speed assumed for edges without a travel time or a usable speed (≈30 mph).
pub const FALLBACK_SPEED_KPH: f64 = 48.0;

// ── CSV records ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct NodeRecord {
    id:  i64,
    lon: f64,
    lat: f64,
}

#[derive(Deserialize)]
struct EdgeRecord {
    from: i64,
    to:   i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    travel_time_s: Option<f64>,
    #[serde(default)]
    speed_kph: Option<f64>,
    #[serde(default)]
    geometry: Option<String>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// A loaded network plus the mapping from source ids to dense `NodeId`s.
pub struct LoadedNetwork {
    pub network: RoadNetwork,
    pub node_ids: HashMap<i64, NodeId>,
}

impl LoadedNetwork {
    /// Dense id of the node that `nodes.csv` called `source_id`.
    pub fn node(&self, source_id: i64) -> Option<NodeId> {
        self.node_ids.get(&source_id).copied()
    }
}

/// Load a network from a pair of CSV files.
pub fn load_network_csv(nodes_path: &Path, edges_path: &Path) -> SpatialResult<LoadedNetwork> {
    let nodes = std::fs::File::open(nodes_path)?;
    let edges = std::fs::File::open(edges_path)?;
    let loaded = load_network_readers(nodes, edges)?;
    info!(
        nodes = loaded.network.node_count(),
        edges = loaded.network.edge_count(),
        path = %nodes_path.display(),
        "road network loaded"
    );
    Ok(loaded)
}

/// Like [`load_network_csv`] but accepts any `Read` sources.
///
/// Useful for testing (pass a `std::io::Cursor`).
pub fn load_network_readers<N: Read, E: Read>(nodes: N, edges: E) -> SpatialResult<LoadedNetwork> {
    let mut builder = RoadNetworkBuilder::new();
    let mut node_ids: HashMap<i64, NodeId> = HashMap::new();

    // ── Nodes ─────────────────────────────────────────────────────────────
    let mut node_reader = csv::Reader::from_reader(nodes);
    for result in node_reader.deserialize::<NodeRecord>() {
        let row = result.map_err(|e| SpatialError::Parse(e.to_string()))?;
        if node_ids.contains_key(&row.id) {
            return Err(SpatialError::Parse(format!("duplicate node id {}", row.id)));
        }
        let id = builder.add_node(GeoPoint::new(row.lon, row.lat));
        node_ids.insert(row.id, id);
    }

    // ── Edges ─────────────────────────────────────────────────────────────
    let mut edge_reader = csv::Reader::from_reader(edges);
    for result in edge_reader.deserialize::<EdgeRecord>() {
        let row = result.map_err(|e| SpatialError::Parse(e.to_string()))?;
        let from = lookup(&node_ids, row.from)?;
        let to   = lookup(&node_ids, row.to)?;

        let geometry = match row.geometry.as_deref().map(str::trim) {
            None | Some("") => Vec::new(),
            Some(text) => parse_geometry(text)?,
        };

        let travel_secs = match row.travel_time_s {
            // `inf` marks the edge unusable; negatives are rejected by the builder.
            Some(t) if !t.is_nan() => t,
            _ => {
                let length = polyline_length(&geometry, &builder, from, to);
                let kph = row
                    .speed_kph
                    .filter(|s| s.is_finite() && *s > 0.0)
                    .unwrap_or(FALLBACK_SPEED_KPH);
                length / (kph / 3.6)
            }
        };

        let mut spec = EdgeSpec::new(from, to, travel_secs).with_geometry(geometry);
        if let Some(name) = row.name.filter(|n| !n.trim().is_empty()) {
            spec = spec.named(name);
        }
        builder.add_edge(spec);
    }

    Ok(LoadedNetwork { network: builder.build(), node_ids })
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn lookup(ids: &HashMap<i64, NodeId>, source_id: i64) -> SpatialResult<NodeId> {
    ids.get(&source_id)
        .copied()
        .ok_or_else(|| SpatialError::Parse(format!("edge references unknown node {source_id}")))
}

fn parse_geometry(text: &str) -> SpatialResult<Vec<GeoPoint>> {
    text.split(';')
        .map(|pair| {
            let mut parts = pair.split_whitespace().map(str::parse::<f64>);
            match (parts.next(), parts.next(), parts.next()) {
                (Some(Ok(lon)), Some(Ok(lat)), None) => Ok(GeoPoint::new(lon, lat)),
                _ => Err(SpatialError::Parse(format!(
                    "invalid geometry point {pair:?}: expected \"lon lat\""
                ))),
            }
        })
        .collect()
}

fn polyline_length(geometry: &[GeoPoint], builder: &RoadNetworkBuilder, from: NodeId, to: NodeId) -> f64 {
    if geometry.len() >= 2 {
        return geometry.windows(2).map(|w| w[0].distance_m(w[1])).sum();
    }
    match (builder.node_pos(from), builder.node_pos(to)) {
        (Some(a), Some(b)) => a.distance_m(b),
        _ => 0.0,
    }
}
