//! Junction detection.

use ds_core::NodeId;
use ds_spatial::RouteGraph;

use crate::JunctionOption;

/// Outgoing choices at `node`, or an empty list when `node` is not a
/// junction.
///
/// A node is a junction when its outgoing edges reach at least two distinct
/// nodes; parallel edges count once.  The edge leading back to `came_from` is excluded from the options, so a
/// two-way street with a single continuation still counts as a junction with
/// one option.  Parallel edges to the same target collapse into one option
/// built from the first edge the graph enumerates.  Edges with fewer than two
/// geometry points are skipped.
pub fn junction_options<G: RouteGraph>(
    graph:     &G,
    node:      NodeId,
    came_from: Option<NodeId>,
    hint_m:    f64,
) -> Vec<JunctionOption> {
    if graph.out_degree(node) < 2 {
        return Vec::new();
    }
    let mut targets = graph.out_edges(node).map(|e| graph.edge_target(e));
    let Some(first_target) = targets.next() else {
        return Vec::new();
    };
    if targets.all(|t| t == first_target) {
        return Vec::new();
    }

    let mut options: Vec<JunctionOption> = Vec::new();
    for edge in graph.out_edges(node) {
        let target = graph.edge_target(edge);
        if Some(target) == came_from || options.iter().any(|o| o.node == target) {
            continue;
        }
        let geometry = graph.edge_geometry(edge);
        let (Some(&first), Some(&second)) = (geometry.first(), geometry.get(1)) else {
            continue;
        };

        let bearing_deg = first.bearing_deg(second);
        let hint = first.destination(hint_m, bearing_deg);
        options.push(JunctionOption {
            node:   target,
            street: graph.edge_name(edge).to_owned(),
            bearing_deg,
            hint:   if hint.is_finite() { hint } else { second },
        });
    }
    options
}
