//! Position along the route and the per-tick advance loop.

use ds_core::{GeoPoint, NodeId};
use ds_spatial::{RouteGraph, SpatialError};

use crate::junction::junction_options;
use crate::{JunctionOption, MotionError, MotionResult};

/// Remaining segment lengths within this many metres of the distance left in
/// the tick count as fully traversed.  Absorbs rounding in the spherical
/// formulas so a vehicle lands exactly on a node instead of a hair short.
pub(crate) const SNAP_EPSILON_M: f64 = 1e-6;

/// Where the vehicle is.
///
/// `geometry` caches the polyline of the edge from `route[route_index]` to
/// `route[route_index + 1]`; `segment` indexes its start point and
/// `progress_m` is the distance covered along that segment.
#[derive(Debug, Clone)]
pub(crate) struct Cursor {
    pub(crate) route_index: usize,
    pub(crate) node:        NodeId,
    pub(crate) geometry:    Vec<GeoPoint>,
    pub(crate) segment:     usize,
    pub(crate) progress_m:  f64,
    pub(crate) position:    GeoPoint,
    pub(crate) bearing_deg: Option<f64>,
}

/// How a call to [`Cursor::advance`] ended.
#[derive(Debug)]
pub(crate) enum Step {
    /// The whole distance was consumed.
    Moved,
    /// Stopped on a junction node; leftover distance is discarded.
    Junction(Vec<JunctionOption>),
    /// Stopped on the last route node.
    Arrived,
}

/// Junction behaviour for one call to [`Cursor::advance`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct JunctionPolicy {
    pub(crate) stop:   bool,
    pub(crate) hint_m: f64,
}

impl Cursor {
    /// Cursor at the first node of `route`, with the first edge loaded when
    /// the route has one.
    pub(crate) fn at_start<G: RouteGraph>(graph: &G, route: &[NodeId]) -> MotionResult<Self> {
        let first = *route.first().ok_or(MotionError::EmptyRoute)?;
        let position = graph
            .node_pos(first)
            .ok_or(MotionError::Routing(SpatialError::NodeNotFound(first)))?;

        let mut cursor = Cursor {
            route_index: 0,
            node:        first,
            geometry:    Vec::new(),
            segment:     0,
            progress_m:  0.0,
            position,
            bearing_deg: None,
        };
        if let Some(&second) = route.get(1) {
            cursor.load_edge(graph, first, second)?;
            cursor.bearing_deg = Some(cursor.geometry[0].bearing_deg(cursor.geometry[1]));
        }
        Ok(cursor)
    }

    /// Replace the cached polyline with the edge `from → to` and rewind to
    /// its first point.
    ///
    /// Nothing is modified if the edge is missing or has too few points.
    pub(crate) fn load_edge<G: RouteGraph>(
        &mut self,
        graph: &G,
        from:  NodeId,
        to:    NodeId,
    ) -> MotionResult<()> {
        let geometry = edge_polyline(graph, from, to)?;
        self.geometry.clear();
        self.geometry.extend_from_slice(geometry);
        self.segment = 0;
        self.progress_m = 0.0;
        self.position = geometry[0];
        Ok(())
    }

    /// Move `distance_m` metres along `route`.
    ///
    /// Crosses segment and edge boundaries as needed.  Stops early on the
    /// final route node or, when `policy.stop` is set, on a junction node.
    pub(crate) fn advance<G: RouteGraph>(
        &mut self,
        graph:      &G,
        route:      &[NodeId],
        distance_m: f64,
        policy:     JunctionPolicy,
    ) -> MotionResult<Step> {
        let mut remaining = distance_m;

        while remaining > 0.0 {
            if self.segment + 1 >= self.geometry.len() {
                return Err(MotionError::SegmentOutOfBounds {
                    segment: self.segment,
                    points:  self.geometry.len(),
                });
            }
            let start = self.geometry[self.segment];
            let end = self.geometry[self.segment + 1];
            let length = start.distance_m(end);

            // Duplicate points: step over without spending distance.
            if length == 0.0 {
                self.segment += 1;
                self.progress_m = 0.0;
                self.position = end;
                if let Some(step) = self.end_of_segment(graph, route, policy)? {
                    return Ok(step);
                }
                continue;
            }

            let bearing = start.bearing_deg(end);
            self.bearing_deg = Some(bearing);

            let left_on_segment = length - self.progress_m;
            if left_on_segment > remaining + SNAP_EPSILON_M {
                self.progress_m += remaining;
                self.position = start.destination(self.progress_m, bearing);
                return Ok(Step::Moved);
            }

            remaining -= left_on_segment;
            self.segment += 1;
            self.progress_m = 0.0;
            self.position = end;
            if let Some(step) = self.end_of_segment(graph, route, policy)? {
                return Ok(step);
            }
        }
        Ok(Step::Moved)
    }

    /// Called after `segment` was incremented.  Loads the next edge when the
    /// current one is used up, or reports an arrival or junction stop.
    fn end_of_segment<G: RouteGraph>(
        &mut self,
        graph:  &G,
        route:  &[NodeId],
        policy: JunctionPolicy,
    ) -> MotionResult<Option<Step>> {
        if self.segment + 1 < self.geometry.len() {
            return Ok(None);
        }

        if self.route_index + 2 >= route.len() {
            self.route_index = route.len().saturating_sub(1);
            self.node = route[self.route_index];
            return Ok(Some(Step::Arrived));
        }

        self.route_index += 1;
        self.node = route[self.route_index];

        if policy.stop {
            let came_from = route[self.route_index - 1];
            let options = junction_options(graph, self.node, Some(came_from), policy.hint_m);
            if !options.is_empty() {
                return Ok(Some(Step::Junction(options)));
            }
        }

        let next = self.next_planned(route)?;
        self.load_edge(graph, self.node, next)?;
        Ok(None)
    }

    /// The route node after the one the cursor stands on.
    pub(crate) fn next_planned(&self, route: &[NodeId]) -> MotionResult<NodeId> {
        route.get(self.route_index + 1).copied().ok_or(MotionError::RouteExhausted {
            index: self.route_index,
            len:   route.len(),
        })
    }
}

/// Polyline of the first edge `from → to`, checked to have at least two
/// points.
pub(crate) fn edge_polyline<G: RouteGraph>(
    graph: &G,
    from:  NodeId,
    to:    NodeId,
) -> MotionResult<&[GeoPoint]> {
    let edge = graph.edge_between(from, to).ok_or(MotionError::MissingEdge { from, to })?;
    let geometry = graph.edge_geometry(edge);
    if geometry.len() < 2 {
        return Err(MotionError::InvalidGeometry { from, to, points: geometry.len() });
    }
    Ok(geometry)
}
