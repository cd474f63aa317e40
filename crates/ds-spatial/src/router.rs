//! Routing trait, A* planner, and the Dijkstra reference planner.
//!
//! # Pluggability
//!
//! The motion engine plans and re-plans through the [`Router`] trait, so
//! applications can swap in another search (contraction hierarchies, a
//! cached planner) without touching the engine.
//!
//! # Cost units
//!
//! All costs are **seconds** of travel time (`f64`).  Edges with a
//! non-finite or negative cost are never expanded.
//!
//! # Heuristic bound
//!
//! [`AStarRouter`] estimates remaining cost as great-circle distance divided
//! by `max_speed_mps`.  That estimate is admissible and consistent only if
//! no edge is traversed faster than `max_speed_mps`; the network provider
//! must respect this bound, otherwise returned routes may be suboptimal.
//! It is not checked at runtime.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::debug;

use ds_core::{NodeId, DEFAULT_MAX_SPEED_MPS};

use crate::network::RouteGraph;
use crate::{SpatialError, SpatialResult};

// ── Route ─────────────────────────────────────────────────────────────────────

/// The result of a routing query: the ordered node sequence from source to
/// destination and its total travel time.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Nodes to visit in order.  Never empty; a single node means source
    /// and destination coincide.
    pub nodes: Vec<NodeId>,
    /// Sum of the cheapest parallel edge cost of every hop, in seconds.
    pub total_travel_secs: f64,
}

impl Route {
    /// `true` if the source and destination are the same node.
    pub fn is_trivial(&self) -> bool {
        self.nodes.len() < 2
    }

    /// Number of nodes on the route.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn destination(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }
}

// ── Router trait ──────────────────────────────────────────────────────────────

/// Pluggable routing engine.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync` so one planner can serve many
/// sessions.
pub trait Router: Send + Sync {
    /// Compute the minimum-travel-time route from `from` to `to`.
    ///
    /// `from == to` yields a one-node route.  An unreachable `to` yields
    /// [`SpatialError::NoRoute`]; unknown ids yield
    /// [`SpatialError::NodeNotFound`].
    fn route<G: RouteGraph>(&self, graph: &G, from: NodeId, to: NodeId) -> SpatialResult<Route>;
}

// ── AStarRouter ───────────────────────────────────────────────────────────────

/// A* over travel time with a great-circle / top-speed heuristic.
///
/// Ties on `f = g + h` are broken by ascending `NodeId`, so equal-cost
/// alternatives always resolve the same way.
#[derive(Debug, Clone, Copy)]
pub struct AStarRouter {
    /// Optimistic top speed in m/s.  See the module docs for the bound it
    /// must respect.
    pub max_speed_mps: f64,
}

impl AStarRouter {
    pub fn new(max_speed_mps: f64) -> Self {
        Self { max_speed_mps }
    }
}

impl Default for AStarRouter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SPEED_MPS)
    }
}

impl Router for AStarRouter {
    fn route<G: RouteGraph>(&self, graph: &G, from: NodeId, to: NodeId) -> SpatialResult<Route> {
        let goal = graph.node_pos(to).ok_or(SpatialError::NodeNotFound(to))?;
        let speed = self.max_speed_mps;
        search(graph, from, to, |node| {
            graph
                .node_pos(node)
                .map_or(0.0, |pos| pos.distance_m(goal) / speed)
        })
    }
}

// ── DijkstraRouter ────────────────────────────────────────────────────────────

/// Plain Dijkstra (A* with a zero heuristic).
///
/// Always optimal regardless of edge speeds; explores more of the graph than
/// [`AStarRouter`].  Useful as a reference and for networks whose speeds
/// exceed the A* bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct DijkstraRouter;

impl Router for DijkstraRouter {
    fn route<G: RouteGraph>(&self, graph: &G, from: NodeId, to: NodeId) -> SpatialResult<Route> {
        search(graph, from, to, |_| 0.0)
    }
}

// ── Search internals ──────────────────────────────────────────────────────────

/// Frontier entry ordered so that `BinaryHeap` (a max-heap) pops the lowest
/// `f` first, then the lowest `NodeId`.
#[derive(Clone, Copy, Debug)]
struct Candidate {
    f: f64,
    node: NodeId,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

fn search<G, H>(graph: &G, from: NodeId, to: NodeId, heuristic: H) -> SpatialResult<Route>
where
    G: RouteGraph,
    H: Fn(NodeId) -> f64,
{
    if !graph.contains(from) {
        return Err(SpatialError::NodeNotFound(from));
    }
    if !graph.contains(to) {
        return Err(SpatialError::NodeNotFound(to));
    }
    if from == to {
        return Ok(Route { nodes: vec![from], total_travel_secs: 0.0 });
    }

    let n = graph.node_count();
    // g[v] = best known travel time to v.
    let mut g = vec![f64::INFINITY; n];
    // prev[v] = predecessor of v on the best known path.
    let mut prev = vec![NodeId::INVALID; n];
    // Popped nodes are final; with a consistent heuristic they never improve.
    let mut closed = vec![false; n];

    g[from.index()] = 0.0;
    let mut frontier = BinaryHeap::new();
    frontier.push(Candidate { f: heuristic(from), node: from });

    let mut expanded = 0usize;
    while let Some(Candidate { node, .. }) = frontier.pop() {
        // Stale duplicate of a node that was already finalised.
        if closed[node.index()] {
            continue;
        }
        closed[node.index()] = true;
        expanded += 1;

        if node == to {
            debug!(%from, %to, expanded, cost = g[to.index()], "route found");
            return Ok(reconstruct(&prev, from, to, g[to.index()]));
        }

        let base = g[node.index()];
        for edge in graph.out_edges(node) {
            let cost = graph.edge_travel_secs(edge);
            if !(cost.is_finite() && cost >= 0.0) {
                continue;
            }
            let next = graph.edge_target(edge);
            if next.index() >= n || closed[next.index()] {
                continue;
            }
            let tentative = base + cost;
            if tentative < g[next.index()] {
                g[next.index()] = tentative;
                prev[next.index()] = node;
                frontier.push(Candidate { f: tentative + heuristic(next), node: next });
            }
        }
    }

    debug!(%from, %to, expanded, "frontier exhausted");
    Err(SpatialError::NoRoute { from, to })
}

fn reconstruct(prev: &[NodeId], from: NodeId, to: NodeId, total_travel_secs: f64) -> Route {
    let mut nodes = vec![to];
    let mut cur = to;
    while cur != from {
        cur = prev[cur.index()];
        nodes.push(cur);
    }
    nodes.reverse();
    Route { nodes, total_travel_secs }
}
