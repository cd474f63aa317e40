//! Road network representation, the read-only [`RouteGraph`] capability,
//! and the network builder.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format for outgoing edges.
//! Given a `NodeId n`, its outgoing edges occupy the slice:
//!
//! ```text
//! edge_to[ node_out_start[n] .. node_out_start[n+1] ]
//! ```
//!
//! Edge polylines are stored the same way: the points of edge `e` are
//! `geom_points[ edge_geom_start[e] .. edge_geom_start[e+1] ]`, always at
//! least two of them.
//!
//! Edges keep their insertion order within a source node, so "the first
//! enumerated edge" between two nodes is the first one added.  Parallel
//! edges are allowed.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) maps `(lon, lat)` to the nearest `NodeId`.  Used
//! to resolve geocoded coordinates into start/end nodes before planning.

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use tracing::{debug, info, warn};

use ds_core::{EdgeId, GeoPoint, NodeId};

/// Display name given to edges that carry none.
pub const UNNAMED_ROAD: &str = "Unnamed Road";

// ── RouteGraph capability ─────────────────────────────────────────────────────

/// Read-only view of a directed road multigraph.
///
/// The planner and the motion engine depend on this trait rather than on
/// [`RoadNetwork`] so that tests and applications can substitute their own
/// graph storage.  Implementations must be immutable for the lifetime of a
/// simulation; any number of readers may share one.
///
/// Edge ids passed to the `edge_*` accessors must come from
/// [`out_edges`](Self::out_edges) of the same graph.
pub trait RouteGraph {
    fn node_count(&self) -> usize;

    /// Position of `node`, or `None` if the graph has no such node.
    fn node_pos(&self, node: NodeId) -> Option<GeoPoint>;

    /// Outgoing edges of `node` in enumeration order.  Empty for unknown nodes.
    fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_;

    fn edge_target(&self, edge: EdgeId) -> NodeId;

    /// Travel-time cost in seconds.  `+∞` marks an edge unusable for planning.
    fn edge_travel_secs(&self, edge: EdgeId) -> f64;

    /// Polyline of the edge, source end first.
    fn edge_geometry(&self, edge: EdgeId) -> &[GeoPoint];

    fn edge_name(&self, edge: EdgeId) -> &str;

    // ── Provided queries ──────────────────────────────────────────────────

    #[inline]
    fn contains(&self, node: NodeId) -> bool {
        node.index() < self.node_count()
    }

    fn out_degree(&self, node: NodeId) -> usize {
        self.out_edges(node).count()
    }

    /// First enumerated edge from `from` to `to`.  Used for geometry and
    /// name lookups.
    fn edge_between(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        self.out_edges(from).find(|&e| self.edge_target(e) == to)
    }

    /// Cheapest usable edge from `from` to `to` and its cost.  Used for cost
    /// queries.
    fn cheapest_edge_between(&self, from: NodeId, to: NodeId) -> Option<(EdgeId, f64)> {
        self.out_edges(from)
            .filter(|&e| self.edge_target(e) == to)
            .map(|e| (e, self.edge_travel_secs(e)))
            .filter(|(_, cost)| cost.is_finite())
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Concatenated geometry of the edges joining consecutive `nodes`.
    ///
    /// Shared joints between edges appear once.  Returns `None` if some
    /// consecutive pair has no connecting edge.
    fn path_geometry(&self, nodes: &[NodeId]) -> Option<Vec<GeoPoint>> {
        let mut points: Vec<GeoPoint> = Vec::new();
        for pair in nodes.windows(2) {
            let edge = self.edge_between(pair[0], pair[1])?;
            let geometry = self.edge_geometry(edge);
            let skip = usize::from(points.last() == geometry.first());
            points.extend_from_slice(&geometry[skip.min(geometry.len())..]);
        }
        Some(points)
    }
}

// ── R-tree node entry ─────────────────────────────────────────────────────────

/// Entry stored in the R-tree spatial index: a 2-D `[lon, lat]` point with
/// the associated `NodeId`.
#[derive(Clone)]
struct NodeEntry {
    point: [f64; 2], // [lon, lat]
    id: NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    /// Squared Euclidean distance in lon/lat space.  Good enough for picking
    /// the nearest intersection within a city.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlon = self.point[0] - point[0];
        let dlat = self.point[1] - point[1];
        dlon * dlon + dlat * dlat
    }
}

// ── RoadNetwork ───────────────────────────────────────────────────────────────

/// Directed road multigraph in CSR format plus a spatial index for node
/// snapping.
///
/// All fields are `pub` for direct indexed access on hot paths.  Do not
/// construct directly; use [`RoadNetworkBuilder`].
pub struct RoadNetwork {
    // ── Node data ─────────────────────────────────────────────────────────
    /// Geographic position of each node.  Indexed by `NodeId`.
    pub node_pos: Vec<GeoPoint>,

    // ── CSR edge adjacency ────────────────────────────────────────────────
    /// CSR row pointer.  Outgoing edges of node `n` are at EdgeIds
    /// `node_out_start[n] .. node_out_start[n+1]`.
    /// Length = `node_count + 1`.
    pub node_out_start: Vec<u32>,

    // ── Edge data (indexed by EdgeId = position in sorted order) ──────────
    pub edge_from: Vec<NodeId>,

    pub edge_to: Vec<NodeId>,

    /// Polyline length of each edge in metres.
    pub edge_length_m: Vec<f64>,

    /// Travel time in seconds; `f64::INFINITY` for unusable edges.
    pub edge_travel_secs: Vec<f64>,

    /// Street display name of each edge.
    pub edge_name: Vec<String>,

    /// Geometry row pointer, length = `edge_count + 1`.
    pub edge_geom_start: Vec<u32>,

    /// Flattened polyline points of all edges.
    pub geom_points: Vec<GeoPoint>,

    // ── Spatial index ─────────────────────────────────────────────────────
    spatial_idx: RTree<NodeEntry>,
}

impl RoadNetwork {
    /// Construct an empty network with no nodes or edges.
    ///
    /// Any routing request against an empty network fails with
    /// [`SpatialError::NodeNotFound`](crate::SpatialError::NodeNotFound).
    pub fn empty() -> Self {
        RoadNetworkBuilder::new().build()
    }

    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Iterator over the `EdgeId`s of all outgoing edges from `node`.
    ///
    /// This is a contiguous index range — no heap allocation.  Unknown nodes
    /// yield nothing.
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let (start, end) = match self.node_out_start.get(node.index()..node.index() + 2) {
            Some(&[s, e]) => (s as usize, e as usize),
            _ => (0, 0),
        };
        (start..end).map(|i| EdgeId(i as u32))
    }

    /// Polyline of `edge` (always at least two points).
    #[inline]
    pub fn geometry(&self, edge: EdgeId) -> &[GeoPoint] {
        let start = self.edge_geom_start[edge.index()] as usize;
        let end   = self.edge_geom_start[edge.index() + 1] as usize;
        &self.geom_points[start..end]
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Return the `NodeId` of the nearest road node to `pos`.
    ///
    /// Returns `None` only if the network has no nodes.
    pub fn snap_to_node(&self, pos: GeoPoint) -> Option<NodeId> {
        self.spatial_idx
            .nearest_neighbor(&[pos.lon, pos.lat])
            .map(|e| e.id)
    }

    /// Return up to `k` nearest nodes to `pos`, sorted by ascending distance.
    pub fn k_nearest_nodes(&self, pos: GeoPoint, k: usize) -> Vec<NodeId> {
        self.spatial_idx
            .nearest_neighbor_iter(&[pos.lon, pos.lat])
            .take(k)
            .map(|e| e.id)
            .collect()
    }
}

impl RouteGraph for RoadNetwork {
    #[inline]
    fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    #[inline]
    fn node_pos(&self, node: NodeId) -> Option<GeoPoint> {
        self.node_pos.get(node.index()).copied()
    }

    #[inline]
    fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        RoadNetwork::out_edges(self, node)
    }

    #[inline]
    fn edge_target(&self, edge: EdgeId) -> NodeId {
        self.edge_to[edge.index()]
    }

    #[inline]
    fn edge_travel_secs(&self, edge: EdgeId) -> f64 {
        self.edge_travel_secs[edge.index()]
    }

    #[inline]
    fn edge_geometry(&self, edge: EdgeId) -> &[GeoPoint] {
        self.geometry(edge)
    }

    #[inline]
    fn edge_name(&self, edge: EdgeId) -> &str {
        &self.edge_name[edge.index()]
    }
}

// ── EdgeSpec ──────────────────────────────────────────────────────────────────

/// Description of one directed edge handed to [`RoadNetworkBuilder::add_edge`].
#[derive(Clone, Debug)]
pub struct EdgeSpec {
    pub from: NodeId,
    pub to: NodeId,
    pub travel_secs: f64,
    pub name: Option<String>,
    /// Polyline from `from` to `to`.  Fewer than two points means "straight
    /// line between the endpoint nodes".
    pub geometry: Vec<GeoPoint>,
}

impl EdgeSpec {
    pub fn new(from: NodeId, to: NodeId, travel_secs: f64) -> Self {
        Self { from, to, travel_secs, name: None, geometry: Vec::new() }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_geometry(mut self, geometry: Vec<GeoPoint>) -> Self {
        self.geometry = geometry;
        self
    }

    /// The same road travelled the other way.
    pub fn reversed(&self) -> Self {
        let mut geometry = self.geometry.clone();
        geometry.reverse();
        Self {
            from: self.to,
            to: self.from,
            travel_secs: self.travel_secs,
            name: self.name.clone(),
            geometry,
        }
    }
}

// ── RoadNetworkBuilder ────────────────────────────────────────────────────────

/// Construct a [`RoadNetwork`] incrementally, then call [`build`](Self::build).
///
/// The builder accepts nodes and directed edges in any order.  `build()`
/// groups edges by source node (keeping insertion order within a node),
/// resolves missing geometry, and bulk-loads the R-tree.
///
/// # Example
///
/// ```
/// use ds_core::GeoPoint;
/// use ds_spatial::RoadNetworkBuilder;
///
/// let mut b = RoadNetworkBuilder::new();
/// let a = b.add_node(GeoPoint::new(-73.99, 40.75));
/// let c = b.add_node(GeoPoint::new(-73.98, 40.75));
/// b.add_road(a, c, 90.0);
/// let net = b.build();
/// assert_eq!(net.node_count(), 2);
/// assert_eq!(net.edge_count(), 2); // bidirectional
/// ```
pub struct RoadNetworkBuilder {
    nodes: Vec<GeoPoint>,
    edges: Vec<EdgeSpec>,
}

impl RoadNetworkBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new(), edges: Vec::new() }
    }

    /// Pre-allocate for the expected number of nodes and edges.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes),
            edges: Vec::with_capacity(edges),
        }
    }

    /// Add a road node and return its `NodeId` (sequential from 0).
    pub fn add_node(&mut self, pos: GeoPoint) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(pos);
        id
    }

    /// Add a fully described directed edge.
    pub fn add_edge(&mut self, spec: EdgeSpec) {
        self.edges.push(spec);
    }

    /// Add a straight, unnamed **directed** edge.
    pub fn add_directed_edge(&mut self, from: NodeId, to: NodeId, travel_secs: f64) {
        self.add_edge(EdgeSpec::new(from, to, travel_secs));
    }

    /// Add `spec` and its reverse.
    pub fn add_two_way(&mut self, spec: EdgeSpec) {
        let back = spec.reversed();
        self.add_edge(spec);
        self.add_edge(back);
    }

    /// Convenience: straight, unnamed edges in **both directions**.
    pub fn add_road(&mut self, a: NodeId, b: NodeId, travel_secs: f64) {
        self.add_two_way(EdgeSpec::new(a, b, travel_secs));
    }

    /// Position of a node added earlier.
    pub fn node_pos(&self, id: NodeId) -> Option<GeoPoint> {
        self.nodes.get(id.index()).copied()
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.edges.len() }

    /// Consume the builder and produce a [`RoadNetwork`].
    ///
    /// Edges that reference unknown nodes are dropped.  Negative or NaN
    /// travel times are replaced by `+∞` (unusable for planning).
    pub fn build(self) -> RoadNetwork {
        let node_count = self.nodes.len();

        let mut edges: Vec<EdgeSpec> = Vec::with_capacity(self.edges.len());
        for spec in self.edges {
            if spec.from.index() >= node_count || spec.to.index() >= node_count {
                warn!(from = %spec.from, to = %spec.to, "dropping edge with unknown endpoint");
                continue;
            }
            edges.push(spec);
        }

        // Stable: parallel edges keep their insertion order.
        edges.sort_by_key(|e| e.from.0);

        let edge_count = edges.len();
        let mut edge_from        = Vec::with_capacity(edge_count);
        let mut edge_to          = Vec::with_capacity(edge_count);
        let mut edge_length_m    = Vec::with_capacity(edge_count);
        let mut edge_travel_secs = Vec::with_capacity(edge_count);
        let mut edge_name        = Vec::with_capacity(edge_count);
        let mut edge_geom_start  = Vec::with_capacity(edge_count + 1);
        let mut geom_points: Vec<GeoPoint> = Vec::with_capacity(edge_count * 2);

        edge_geom_start.push(0u32);
        for spec in edges {
            let points = if spec.geometry.len() >= 2 {
                spec.geometry
            } else {
                if !spec.geometry.is_empty() {
                    debug!(from = %spec.from, to = %spec.to, "single-point geometry, using endpoints");
                }
                vec![self.nodes[spec.from.index()], self.nodes[spec.to.index()]]
            };

            let length: f64 = points.windows(2).map(|w| w[0].distance_m(w[1])).sum();

            let travel_secs = if spec.travel_secs >= 0.0 {
                spec.travel_secs
            } else {
                warn!(from = %spec.from, to = %spec.to, cost = spec.travel_secs, "unusable travel time");
                f64::INFINITY
            };

            edge_from.push(spec.from);
            edge_to.push(spec.to);
            edge_length_m.push(length);
            edge_travel_secs.push(travel_secs);
            edge_name.push(spec.name.unwrap_or_else(|| UNNAMED_ROAD.to_owned()));
            geom_points.extend(points);
            edge_geom_start.push(geom_points.len() as u32);
        }

        // Build CSR row pointer (node_out_start).
        let mut node_out_start = vec![0u32; node_count + 1];
        for from in &edge_from {
            node_out_start[from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_out_start[i] += node_out_start[i - 1];
        }
        debug_assert_eq!(node_out_start[node_count] as usize, edge_count);

        // Bulk-load R-tree for O(N log N) construction (faster than N inserts).
        let entries: Vec<NodeEntry> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, &pos)| NodeEntry {
                point: [pos.lon, pos.lat],
                id: NodeId(i as u32),
            })
            .collect();
        let spatial_idx = RTree::bulk_load(entries);

        info!(nodes = node_count, edges = edge_count, "road network built");

        RoadNetwork {
            node_pos: self.nodes,
            node_out_start,
            edge_from,
            edge_to,
            edge_length_m,
            edge_travel_secs,
            edge_name,
            edge_geom_start,
            geom_points,
            spatial_idx,
        }
    }
}

impl Default for RoadNetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}
