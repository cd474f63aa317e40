//! grid_drive — drive one simulated vehicle across a road network.
//!
//! Uses a synthetic Manhattan-style grid unless `--nodes`/`--edges` point at
//! a preprocessed CSV network.  Junction choices are made automatically by
//! the `--turn` strategy; `--json` prints one state snapshot per tick.
//!
//! ```text
//! RUST_LOG=debug grid_drive --cols 8 --rows 6 --speed 12 --turn first
//! grid_drive --nodes nodes.csv --edges edges.csv --from=-73.99,40.75 --to=-73.98,40.76
//! ```

mod network;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ds_core::{GeoPoint, NodeId, SimConfig, Tick};
use ds_motion::{JunctionOption, MotionSnapshot, TickOutcome};
use ds_session::{Session, SessionBuilder, SessionObserver};
use ds_spatial::{AStarRouter, RouteGraph, load_network_csv};

use network::build_grid;

// ── Command line ──────────────────────────────────────────────────────────────

/// How to answer a junction stop.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Turn {
    /// Keep to the planned route.
    Plan,
    /// Take the first listed exit.
    First,
    /// Take the last listed exit.
    Last,
}

#[derive(Parser, Debug)]
#[command(name = "grid_drive", about = "Drive a simulated vehicle along a planned route")]
struct Args {
    /// nodes.csv of a preprocessed network (needs --edges).
    #[arg(long, requires = "edges")]
    nodes: Option<PathBuf>,

    /// edges.csv of a preprocessed network (needs --nodes).
    #[arg(long, requires = "nodes")]
    edges: Option<PathBuf>,

    /// Synthetic grid width in blocks.
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u16).range(2..))]
    cols: u16,

    /// Synthetic grid height in blocks.
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u16).range(2..))]
    rows: u16,

    /// TOML file with simulation settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start as "lon,lat"; snapped to the nearest node.
    #[arg(long, value_parser = parse_point)]
    from: Option<GeoPoint>,

    /// Destination as "lon,lat"; snapped to the nearest node.
    #[arg(long, value_parser = parse_point)]
    to: Option<GeoPoint>,

    /// Vehicle speed in m/s.
    #[arg(long, default_value_t = 13.4)]
    speed: f64,

    #[arg(long, value_enum, default_value_t = Turn::Plan)]
    turn: Turn,

    /// Drive straight through junctions without stopping.
    #[arg(long)]
    no_stops: bool,

    /// Give up after this many ticks.
    #[arg(long, default_value_t = 100_000)]
    max_ticks: u64,

    /// Print every tick's snapshot as a JSON line.
    #[arg(long)]
    json: bool,
}

fn parse_point(text: &str) -> Result<GeoPoint, String> {
    let (lon, lat) = text.split_once(',').ok_or("expected \"lon,lat\"")?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("bad longitude: {e}"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {e}"))?;
    Ok(GeoPoint::new(lon, lat))
}

fn load_config(path: Option<&Path>) -> Result<SimConfig> {
    let config: SimConfig = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => SimConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

// ── Observer ──────────────────────────────────────────────────────────────────

struct ConsoleObserver {
    json:      bool,
    junctions: usize,
    reroutes:  usize,
}

impl SessionObserver for ConsoleObserver {
    fn on_tick_end(&mut self, _tick: Tick, state: &MotionSnapshot) {
        if self.json {
            match serde_json::to_string(state) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "snapshot not serializable"),
            }
        }
    }

    fn on_junction(&mut self, tick: Tick, node: NodeId, options: &[JunctionOption]) {
        self.junctions += 1;
        let streets: Vec<&str> = options.iter().map(|o| o.street.as_str()).collect();
        info!(%tick, %node, ?streets, "junction");
    }

    fn on_reroute(&mut self, route: &[NodeId]) {
        self.reroutes += 1;
        info!(nodes = route.len(), "rerouted");
    }

    fn on_finished(&mut self, tick: Tick, position: GeoPoint) {
        info!(%tick, %position, "arrived");
    }
}

// ── Junction strategy ─────────────────────────────────────────────────────────

fn pick_exit(turn: Turn, options: &[JunctionOption], planned: Option<NodeId>) -> Option<NodeId> {
    let planned = planned.filter(|n| options.iter().any(|o| o.node == *n));
    let preferred = match turn {
        Turn::Plan => planned,
        Turn::First => options.first().map(|o| o.node),
        Turn::Last => options.last().map(|o| o.node),
    };
    preferred.or(planned)
}

fn answer_junction(
    session:  &mut Session<AStarRouter>,
    turn:     Turn,
    observer: &mut ConsoleObserver,
) -> Result<()> {
    let state = session.state();
    let planned = session.engine().planned_next();
    let Some(choice) = pick_exit(turn, &state.junction_options, planned) else {
        bail!("no usable exit at junction");
    };

    match session.choose_junction(choice, observer) {
        Err(e) if e.is_unreachable() => {
            let Some(planned) = planned else { return Err(e.into()) };
            warn!(%choice, "exit leads nowhere, keeping to the plan");
            session.choose_junction(planned, observer)?;
        }
        result => {
            result?;
        }
    }

    if session.state().route_changed {
        let geometry = session.route_geometry()?;
        info!(points = geometry.len(), "new route geometry");
    }
    Ok(())
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    // 1. Road network.
    let (network, default_from, default_to) = match (&args.nodes, &args.edges) {
        (Some(nodes), Some(edges)) => {
            let loaded = load_network_csv(nodes, edges)?;
            let network = loaded.network;
            let first = network.node_pos(NodeId(0)).context("network has no nodes")?;
            let last_id = NodeId::try_from(network.node_count() - 1)?;
            let last = network.node_pos(last_id).context("network has no nodes")?;
            (network, first, last)
        }
        _ => {
            let (network, [sw, ne]) = build_grid(args.cols.into(), args.rows.into());
            let from = network.node_pos[sw.index()];
            let to = network.node_pos[ne.index()];
            (network, from, to)
        }
    };
    info!(nodes = network.node_count(), edges = network.edge_count(), "network ready");

    // 2. Session.
    let mut session = SessionBuilder::astar(Arc::new(network), config).build()?;
    session.set_junction_mode(!args.no_stops)?;
    session.set_speed(args.speed)?;

    let route = session.start_between(args.from.unwrap_or(default_from), args.to.unwrap_or(default_to))?;
    info!(nodes = route.len(), travel_secs = route.total_travel_secs, "planned");

    // 3. Drive.
    let mut observer = ConsoleObserver { json: args.json, junctions: 0, reroutes: 0 };
    loop {
        let used = session.clock().current_tick.0;
        if used >= args.max_ticks {
            warn!(max_ticks = args.max_ticks, "tick budget exhausted before arrival");
            break;
        }
        match session.run_until_stopped(args.max_ticks - used, &mut observer)? {
            TickOutcome::JunctionReached(_) => answer_junction(&mut session, args.turn, &mut observer)?,
            TickOutcome::Finished => break,
            TickOutcome::Moved => continue,
            TickOutcome::Skipped => bail!("vehicle stopped unexpectedly"),
        }
    }

    // 4. Summary.
    let state = session.state();
    let summary = serde_json::json!({
        "ticks":        session.clock().current_tick.0,
        "elapsed_secs": session.clock().elapsed_secs(),
        "finished":     state.finished,
        "position":     state.position,
        "junctions":    observer.junctions,
        "reroutes":     observer.reroutes,
    });
    println!("{summary}");
    Ok(())
}
