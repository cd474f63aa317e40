//! Unit tests for ds-motion.

use std::sync::Arc;

use ds_core::{GeoPoint, NodeId, SimConfig};
use ds_spatial::{AStarRouter, EdgeSpec, RoadNetwork, RoadNetworkBuilder};

use crate::MotionEngine;

// ── Helpers ───────────────────────────────────────────────────────────────────

type Engine = MotionEngine<RoadNetwork, AStarRouter>;

fn origin() -> GeoPoint {
    GeoPoint::new(-73.99, 40.75)
}

fn one_second_config() -> SimConfig {
    SimConfig { tick_interval_secs: 1.0, ..SimConfig::default() }
}

/// A → B → C due east, 100 m per edge, one-way so B is not a junction.
fn line_network() -> (RoadNetwork, [NodeId; 3]) {
    let mut b = RoadNetworkBuilder::new();
    let pa = origin();
    let pb = pa.destination(100.0, 90.0);
    let pc = pb.destination(100.0, 90.0);
    let a = b.add_node(pa);
    let n = b.add_node(pb);
    let c = b.add_node(pc);
    b.add_directed_edge(a, n, 10.0);
    b.add_directed_edge(n, c, 10.0);
    (b.build(), [a, n, c])
}

/// A ↔ B two-way, B → C one-way ("Main St").  B has two outgoing edges, one
/// of which leads back, so it is a junction with exactly one option.
fn junction_network() -> (RoadNetwork, [NodeId; 3]) {
    let mut b = RoadNetworkBuilder::new();
    let pa = origin();
    let pb = pa.destination(100.0, 90.0);
    let pc = pb.destination(100.0, 90.0);
    let a = b.add_node(pa);
    let n = b.add_node(pb);
    let c = b.add_node(pc);
    b.add_two_way(EdgeSpec::new(a, n, 10.0));
    b.add_edge(EdgeSpec::new(n, c, 10.0).named("Main St"));
    (b.build(), [a, n, c])
}

/// One-way branch network, nodes (lon, lat) about 111 m apart:
///
/// ```text
///        D ──25──▶ E
///        ▲         ▲
///   A ─▶ B ──10──▶ C
///        ▼
///        F  (dead end)
/// ```
///
/// Fastest A → E is A, B, C, E (30 s); via D takes 45 s.
fn branch_network() -> (RoadNetwork, [NodeId; 6]) {
    let mut b = RoadNetworkBuilder::new();
    let a = b.add_node(GeoPoint::new(0.000, 0.000));
    let n = b.add_node(GeoPoint::new(0.001, 0.000));
    let c = b.add_node(GeoPoint::new(0.002, 0.000));
    let d = b.add_node(GeoPoint::new(0.001, 0.001));
    let e = b.add_node(GeoPoint::new(0.002, 0.001));
    let f = b.add_node(GeoPoint::new(0.001, -0.001));
    b.add_directed_edge(a, n, 10.0);
    b.add_edge(EdgeSpec::new(n, c, 10.0).named("Front St"));
    b.add_directed_edge(c, e, 10.0);
    b.add_edge(EdgeSpec::new(n, d, 10.0).named("Hill Rd"));
    b.add_directed_edge(d, e, 25.0);
    b.add_directed_edge(n, f, 10.0);
    (b.build(), [a, n, c, d, e, f])
}

fn started(net: RoadNetwork, route: Vec<NodeId>, speed_mps: f64) -> Engine {
    let mut engine = Engine::new(AStarRouter::default(), &one_second_config());
    engine.load(Arc::new(net), route).unwrap();
    engine.set_speed(speed_mps).unwrap();
    engine.start().unwrap();
    engine
}

fn angle_diff(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

// ── Motion along the route ────────────────────────────────────────────────────

#[cfg(test)]
mod driving {
    use super::*;
    use crate::TickOutcome;

    #[test]
    fn straight_line_scenario() {
        let (net, [a, b, c]) = line_network();
        let (pa, pb, pc) = (net.node_pos[0], net.node_pos[1], net.node_pos[2]);
        let mut engine = started(net, vec![a, b, c], 10.0);

        assert_eq!(engine.tick().unwrap(), TickOutcome::Moved);
        let cursor = engine.cursor().unwrap();
        assert!((cursor.progress_m - 10.0).abs() < 1e-9);
        assert_eq!(cursor.route_index, 0);
        assert!((pa.distance_m(cursor.position) - 10.0).abs() < 1e-6);

        for _ in 2..=10 {
            assert_eq!(engine.tick().unwrap(), TickOutcome::Moved);
        }
        let cursor = engine.cursor().unwrap();
        assert_eq!(cursor.route_index, 1);
        assert_eq!(cursor.node, b);
        assert_eq!(cursor.segment, 0);
        assert!(cursor.progress_m < 1e-6);
        assert!(pb.distance_m(cursor.position) < 1e-6);

        for _ in 11..=19 {
            assert_eq!(engine.tick().unwrap(), TickOutcome::Moved);
        }
        assert!(!engine.is_finished());
        assert_eq!(engine.tick().unwrap(), TickOutcome::Finished);

        let state = engine.state();
        assert!(state.finished);
        assert_eq!(state.position, Some(pc));
        assert_eq!(engine.current_node(), Some(c));
        assert_eq!(engine.tick().unwrap(), TickOutcome::Skipped);
    }

    #[test]
    fn distance_per_tick_is_speed_times_interval() {
        let mut bld = RoadNetworkBuilder::new();
        let pa = origin();
        let a = bld.add_node(pa);
        let b = bld.add_node(pa.destination(1000.0, 45.0));
        bld.add_directed_edge(a, b, 100.0);

        let mut engine = started(bld.build(), vec![a, b], 7.0);
        engine.set_tick_interval(0.5).unwrap();

        for n in 1..=280 {
            engine.tick().unwrap();
            let cursor = engine.cursor().unwrap();
            let expected = 3.5 * n as f64;
            assert!((cursor.progress_m - expected).abs() < 1e-9, "tick {n}");
            assert!((pa.distance_m(cursor.position) - expected).abs() < 1e-6, "tick {n}");
        }
    }

    #[test]
    fn bearing_follows_polyline_segments() {
        let mut bld = RoadNetworkBuilder::new();
        let pa = origin();
        let bend = pa.destination(50.0, 90.0);
        let pb = bend.destination(50.0, 0.0);
        let a = bld.add_node(pa);
        let b = bld.add_node(pb);
        bld.add_edge(EdgeSpec::new(a, b, 10.0).with_geometry(vec![pa, bend, pb]));

        let mut engine = started(bld.build(), vec![a, b], 10.0);
        assert!(angle_diff(engine.state().bearing_deg.unwrap(), 90.0) < 0.01);

        for _ in 0..6 {
            engine.tick().unwrap();
        }
        let cursor = engine.cursor().unwrap();
        assert_eq!(cursor.segment, 1);
        assert!((cursor.progress_m - 10.0).abs() < 1e-6);
        assert!(angle_diff(engine.state().bearing_deg.unwrap(), 0.0) < 0.01);

        for _ in 0..4 {
            engine.tick().unwrap();
        }
        assert!(engine.is_finished());
        assert_eq!(engine.state().position, Some(pb));
    }

    #[test]
    fn zero_speed_does_not_move() {
        let (net, [a, b, c]) = line_network();
        let mut engine = started(net, vec![a, b, c], 0.0);
        let before = engine.state();
        for _ in 0..5 {
            assert_eq!(engine.tick().unwrap(), TickOutcome::Moved);
        }
        assert_eq!(engine.state(), before);
    }

    #[test]
    fn single_node_route_finishes_on_start() {
        let (net, [a, _, _]) = line_network();
        let pa = net.node_pos[0];
        let engine = started(net, vec![a], 10.0);

        let state = engine.state();
        assert!(state.finished);
        assert_eq!(state.position, Some(pa));
        assert_eq!(state.bearing_deg, None);
        assert_eq!(engine.speed(), 0.0);
        assert_eq!(engine.route_geometry().unwrap(), vec![pa]);
    }

    #[test]
    fn finished_tick_is_skipped() {
        let (net, [a, _, _]) = line_network();
        let mut engine = started(net, vec![a], 0.0);
        assert_eq!(engine.tick().unwrap(), TickOutcome::Skipped);
    }

    #[test]
    fn state_is_idempotent() {
        let (net, [a, b, c]) = line_network();
        let mut engine = started(net, vec![a, b, c], 13.0);
        engine.tick().unwrap();
        assert_eq!(engine.state(), engine.state());
    }
}

// ── Degenerate geometry ───────────────────────────────────────────────────────

#[cfg(test)]
mod zero_length {
    use super::*;
    use crate::TickOutcome;

    #[test]
    fn coincident_nodes_finish_immediately() {
        let mut bld = RoadNetworkBuilder::new();
        let p = bld.add_node(origin());
        let q = bld.add_node(origin());
        bld.add_directed_edge(p, q, 1.0);

        let mut engine = started(bld.build(), vec![p, q], 1.0);
        assert_eq!(engine.tick().unwrap(), TickOutcome::Finished);
        assert_eq!(engine.state().position, Some(origin()));
    }

    #[test]
    fn duplicate_points_are_skipped() {
        let mut bld = RoadNetworkBuilder::new();
        let pa = origin();
        let pb = pa.destination(100.0, 180.0);
        let a = bld.add_node(pa);
        let b = bld.add_node(pb);
        bld.add_edge(EdgeSpec::new(a, b, 10.0).with_geometry(vec![pa, pa, pb, pb]));

        let mut engine = started(bld.build(), vec![a, b], 10.0);
        let mut ticks = 0;
        while !engine.is_finished() && ticks < 20 {
            engine.tick().unwrap();
            ticks += 1;
        }
        assert!(engine.is_finished());
        assert!(ticks <= 11);
        assert_eq!(engine.state().position, Some(pb));
    }
}

// ── Junctions ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod junctions {
    use super::*;
    use crate::{Phase, TickOutcome, junction_options};

    #[test]
    fn back_edge_is_not_an_option() {
        let (net, [a, b, c]) = junction_network();
        let options = junction_options(&net, b, Some(a), 8.0);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].node, c);
        assert_eq!(options[0].street, "Main St");
        assert!(angle_diff(options[0].bearing_deg, 90.0) < 0.01);
        assert!((net.node_pos[1].distance_m(options[0].hint) - 8.0).abs() < 1e-6);
    }

    #[test]
    fn single_outgoing_edge_is_not_a_junction() {
        let (net, [a, b, _]) = line_network();
        assert!(junction_options(&net, b, Some(a), 8.0).is_empty());
    }

    #[test]
    fn parallel_edges_are_not_a_junction() {
        let mut builder = RoadNetworkBuilder::new();
        let pa = origin();
        let pb = pa.destination(100.0, 90.0);
        let pc = pb.destination(100.0, 90.0);
        let a = builder.add_node(pa);
        let b = builder.add_node(pb);
        let c = builder.add_node(pc);
        builder.add_directed_edge(a, b, 10.0);
        builder.add_edge(EdgeSpec::new(b, c, 10.0).named("Main St"));
        builder.add_edge(EdgeSpec::new(b, c, 12.0).named("Main St Service Rd"));
        let net = builder.build();
        assert!(junction_options(&net, b, Some(a), 8.0).is_empty());

        let mut engine = started(net, vec![a, b, c], 10.0);
        let mut outcomes = Vec::new();
        for _ in 0..25 {
            let outcome = engine.tick().unwrap();
            outcomes.push(outcome);
            if outcome == TickOutcome::Finished {
                break;
            }
        }
        assert!(!outcomes.iter().any(|o| matches!(o, TickOutcome::JunctionReached(_))));
        assert_eq!(outcomes.last(), Some(&TickOutcome::Finished));
        assert!(!engine.state().awaiting_junction_choice);
    }

    #[test]
    fn stops_at_junction_and_lists_options() {
        let (net, [a, b, c]) = junction_network();
        let pb = net.node_pos[1];
        let mut engine = started(net, vec![a, b, c], 10.0);

        for _ in 0..9 {
            assert_eq!(engine.tick().unwrap(), TickOutcome::Moved);
        }
        assert_eq!(engine.tick().unwrap(), TickOutcome::JunctionReached(b));

        let state = engine.state();
        assert!(state.paused);
        assert!(state.awaiting_junction_choice);
        assert_eq!(state.position, Some(pb));
        assert_eq!(state.junction_options.len(), 1);
        assert_eq!(state.junction_options[0].node, c);

        // Neither ticking nor resuming leaves the junction.
        assert_eq!(engine.tick().unwrap(), TickOutcome::Skipped);
        engine.resume();
        assert!(engine.state().awaiting_junction_choice);
        assert_eq!(engine.state().position, Some(pb));
    }

    #[test]
    fn choosing_planned_node_keeps_route() {
        let (net, [a, b, c]) = junction_network();
        let mut engine = started(net, vec![a, b, c], 10.0);
        for _ in 0..10 {
            engine.tick().unwrap();
        }
        engine.choose_junction_node(c).unwrap();

        assert_eq!(engine.phase(), &Phase::Running);
        assert_eq!(engine.route(), Some(&[a, b, c][..]));
        assert!(!engine.state().route_changed);
        assert!(angle_diff(engine.state().bearing_deg.unwrap(), 90.0) < 0.01);

        engine.tick().unwrap();
        assert!((engine.cursor().unwrap().progress_m - 10.0).abs() < 1e-9);
    }

    #[test]
    fn leaving_the_plan_reroutes_from_the_chosen_node() {
        let (net, [a, b, c, d, e, _]) = branch_network();
        let (pb, pe) = (net.node_pos[1], net.node_pos[4]);
        let mut engine = started(net, vec![a, b, c, e], 200.0);

        assert_eq!(engine.tick().unwrap(), TickOutcome::JunctionReached(b));
        let options: Vec<NodeId> = engine.state().junction_options.iter().map(|o| o.node).collect();
        assert_eq!(options.len(), 3);
        assert!(options.contains(&c) && options.contains(&d));
        assert!(!options.contains(&a));

        engine.choose_junction_node(d).unwrap();
        assert_eq!(engine.route(), Some(&[b, d, e][..]));
        assert_eq!(engine.cursor().unwrap().route_index, 0);

        let state = engine.state();
        assert!(state.route_changed);
        assert!(!state.paused);
        assert_eq!(state.position, Some(pb));
        assert!(angle_diff(state.bearing_deg.unwrap(), 0.0) < 0.01);

        let geometry = engine.route_geometry().unwrap();
        assert_eq!(geometry.first(), Some(&pb));
        assert_eq!(geometry.last(), Some(&pe));

        engine.acknowledge_route_change();
        assert!(!engine.state().route_changed);

        while !engine.is_finished() {
            engine.tick().unwrap();
        }
        assert_eq!(engine.state().position, Some(pe));
    }

    #[test]
    fn unreachable_choice_leaves_state_unchanged() {
        let (net, [a, b, c, _, e, f]) = branch_network();
        let mut engine = started(net, vec![a, b, c, e], 200.0);
        engine.tick().unwrap();
        let before = engine.state();

        let err = engine.choose_junction_node(f).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Unreachable);
        assert_eq!(engine.state(), before);
        assert_eq!(engine.route(), Some(&[a, b, c, e][..]));
    }

    #[test]
    fn choice_outside_options_is_rejected() {
        let (net, [a, b, c, _, e, _]) = branch_network();
        let mut engine = started(net, vec![a, b, c, e], 200.0);
        engine.tick().unwrap();

        let err = engine.choose_junction_node(a).unwrap_err();
        assert!(matches!(err, crate::MotionError::InvalidJunctionChoice(n) if n == a));
        assert!(engine.state().awaiting_junction_choice);
    }

    #[test]
    fn choice_without_junction_is_rejected() {
        let (net, [a, b, c]) = line_network();
        let mut engine = started(net, vec![a, b, c], 10.0);
        let err = engine.choose_junction_node(b).unwrap_err();
        assert!(matches!(err, crate::MotionError::NotAtJunction));
    }

    #[test]
    fn junction_stops_disabled_drives_through() {
        let (net, [a, b, c]) = junction_network();
        let mut engine = Engine::new(AStarRouter::default(), &one_second_config());
        engine.set_stop_at_junctions(false).unwrap();
        engine.load(Arc::new(net), vec![a, b, c]).unwrap();
        engine.set_speed(10.0).unwrap();
        engine.start().unwrap();

        for _ in 0..30 {
            let outcome = engine.tick().unwrap();
            assert!(!matches!(outcome, TickOutcome::JunctionReached(_)));
        }
        assert!(engine.is_finished());
    }

    #[test]
    fn disabling_stops_while_waiting_resumes_on_plan() {
        let (net, [a, b, c]) = junction_network();
        let mut engine = started(net, vec![a, b, c], 10.0);
        for _ in 0..10 {
            engine.tick().unwrap();
        }
        assert!(engine.state().awaiting_junction_choice);

        engine.set_stop_at_junctions(false).unwrap();
        let state = engine.state();
        assert!(!state.paused);
        assert!(state.junction_options.is_empty());

        assert_eq!(engine.tick().unwrap(), TickOutcome::Moved);
        let cursor = engine.cursor().unwrap();
        assert_eq!(cursor.node, b);
        assert!((cursor.progress_m - 10.0).abs() < 1e-9);
    }
}

// ── Lifecycle & errors ────────────────────────────────────────────────────────

#[cfg(test)]
mod lifecycle {
    use super::*;
    use crate::{ErrorKind, MotionError, MotionSnapshot, Phase, TickOutcome};

    #[test]
    fn start_without_load_is_precondition_error() {
        let mut engine = Engine::new(AStarRouter::default(), &one_second_config());
        let err = engine.start().unwrap_err();
        assert!(matches!(err, MotionError::NotLoaded));
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn empty_route_rejected() {
        let (net, _) = line_network();
        let mut engine = Engine::new(AStarRouter::default(), &one_second_config());
        let err = engine.load(Arc::new(net), Vec::new()).unwrap_err();
        assert!(matches!(err, MotionError::EmptyRoute));
        assert_eq!(engine.phase(), &Phase::Empty);
    }

    #[test]
    fn tick_before_start_is_error() {
        let (net, [a, b, c]) = line_network();
        let mut engine = Engine::new(AStarRouter::default(), &one_second_config());
        assert!(matches!(engine.tick(), Err(MotionError::NotStarted)));
        engine.load(Arc::new(net), vec![a, b, c]).unwrap();
        assert!(matches!(engine.tick(), Err(MotionError::NotStarted)));
    }

    #[test]
    fn invalid_speed_and_interval_rejected() {
        let mut engine = Engine::new(AStarRouter::default(), &one_second_config());
        engine.set_speed(5.0).unwrap();

        let err = engine.set_speed(-1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(engine.set_speed(f64::NAN).is_err());
        assert_eq!(engine.speed(), 5.0);

        assert!(engine.set_tick_interval(0.0).is_err());
        assert!(engine.set_tick_interval(f64::INFINITY).is_err());
        assert_eq!(engine.tick_interval_secs(), 1.0);
    }

    #[test]
    fn missing_edge_is_invariant_violation() {
        let (net, [a, _, c]) = line_network();
        let mut engine = Engine::new(AStarRouter::default(), &one_second_config());
        engine.load(Arc::new(net), vec![a, c]).unwrap();
        let err = engine.start().unwrap_err();
        assert!(matches!(err, MotionError::MissingEdge { from, to } if from == a && to == c));
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);
    }

    #[test]
    fn failed_begin_keeps_current_drive() {
        let (net, [a, b, c]) = line_network();
        let net = Arc::new(net);
        let mut engine = Engine::new(AStarRouter::default(), &one_second_config());
        engine.set_speed(10.0).unwrap();
        engine.begin(Arc::clone(&net), vec![a, b, c]).unwrap();
        engine.tick().unwrap();
        let before = engine.state();

        let err = engine.begin(Arc::clone(&net), vec![a, c]).unwrap_err();
        assert!(matches!(err, MotionError::MissingEdge { .. }));
        assert_eq!(engine.route(), Some(&[a, b, c][..]));
        assert_eq!(engine.phase(), &Phase::Running);
        assert_eq!(engine.state(), before);
        assert_eq!(engine.tick().unwrap(), TickOutcome::Moved);
    }

    #[test]
    fn pause_and_resume() {
        let (net, [a, b, c]) = line_network();
        let mut engine = started(net, vec![a, b, c], 10.0);
        engine.tick().unwrap();

        engine.pause();
        let paused = engine.state();
        assert!(paused.paused);
        assert!(!paused.awaiting_junction_choice);
        assert_eq!(engine.tick().unwrap(), TickOutcome::Skipped);
        assert_eq!(engine.state(), paused);

        engine.resume();
        assert_eq!(engine.tick().unwrap(), TickOutcome::Moved);
        assert!((engine.cursor().unwrap().progress_m - 20.0).abs() < 1e-9);
    }

    #[test]
    fn pause_after_finish_is_noop() {
        let (net, [a, _, _]) = line_network();
        let mut engine = started(net, vec![a], 0.0);
        engine.pause();
        assert_eq!(engine.phase(), &Phase::Finished);
        assert!(!engine.state().paused);
    }

    #[test]
    fn reset_clears_everything_but_speed() {
        let (net, [a, b, c]) = line_network();
        let mut engine = started(net, vec![a, b, c], 12.0);
        engine.set_stop_at_junctions(false).unwrap();
        engine.tick().unwrap();

        engine.reset();
        assert_eq!(engine.state(), MotionSnapshot::default());
        assert_eq!(engine.phase(), &Phase::Empty);
        assert_eq!(engine.speed(), 12.0);
        assert!(engine.stop_at_junctions());
        assert!(engine.route().is_none());
        assert!(engine.route_geometry().unwrap().is_empty());
        assert!(matches!(engine.tick(), Err(MotionError::NotStarted)));
    }

    #[test]
    fn route_geometry_shrinks_as_nodes_are_passed() {
        let (net, [a, b, c]) = line_network();
        let (pa, pb, pc) = (net.node_pos[0], net.node_pos[1], net.node_pos[2]);
        let mut engine = started(net, vec![a, b, c], 10.0);

        assert_eq!(engine.route_geometry().unwrap(), vec![pa, pb, pc]);
        for _ in 0..10 {
            engine.tick().unwrap();
        }
        assert_eq!(engine.route_geometry().unwrap(), vec![pb, pc]);
        for _ in 0..10 {
            engine.tick().unwrap();
        }
        assert_eq!(engine.route_geometry().unwrap(), vec![pc]);
    }

    #[test]
    fn restart_returns_to_first_node() {
        let (net, [a, b, c]) = line_network();
        let pa = net.node_pos[0];
        let mut engine = started(net, vec![a, b, c], 10.0);
        for _ in 0..5 {
            engine.tick().unwrap();
        }
        engine.start().unwrap();
        assert_eq!(engine.state().position, Some(pa));
        assert_eq!(engine.phase(), &Phase::Running);
    }
}
