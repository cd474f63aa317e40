//! Synthetic street grid used when no CSV network is given.

use ds_core::{GeoPoint, NodeId};
use ds_spatial::{EdgeSpec, RoadNetwork, RoadNetworkBuilder};

/// Midtown Manhattan, roughly.
pub const GRID_ORIGIN: GeoPoint = GeoPoint { lon: -73.9950, lat: 40.7480 };

const BLOCK_M: f64 = 120.0;

// Avenues run north–south and are faster than cross streets.
const AVENUE_MPS: f64 = 13.4;
const STREET_MPS: f64 = 8.9;

/// Build a `cols × rows` grid of two-way streets starting at [`GRID_ORIGIN`].
///
/// Returns `(network, [south_west, north_east])`.
pub fn build_grid(cols: usize, rows: usize) -> (RoadNetwork, [NodeId; 2]) {
    let mut b = RoadNetworkBuilder::with_capacity(cols * rows, 4 * cols * rows);

    let mut ids = Vec::with_capacity(cols * rows);
    for row in 0..rows {
        let west = GRID_ORIGIN.destination(row as f64 * BLOCK_M, 0.0);
        for col in 0..cols {
            ids.push(b.add_node(west.destination(col as f64 * BLOCK_M, 90.0)));
        }
    }
    let at = |col: usize, row: usize| ids[row * cols + col];

    for row in 0..rows {
        for col in 0..cols {
            if col + 1 < cols {
                let secs = BLOCK_M / STREET_MPS;
                b.add_two_way(
                    EdgeSpec::new(at(col, row), at(col + 1, row), secs)
                        .named(format!("{} Street", row + 30)),
                );
            }
            if row + 1 < rows {
                let secs = BLOCK_M / AVENUE_MPS;
                b.add_two_way(
                    EdgeSpec::new(at(col, row), at(col, row + 1), secs)
                        .named(format!("Avenue {}", col + 1)),
                );
            }
        }
    }

    let corners = [at(0, 0), at(cols - 1, rows - 1)];
    (b.build(), corners)
}
