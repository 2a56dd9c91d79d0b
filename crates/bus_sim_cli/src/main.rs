use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bus_sim_cli::{load_route, resolve_config, ConfigOverrides, JsonLinesSink};
use bus_sim_core::{PositionSample, PositionSink, SimulatorRegistry, Stop};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "bus-sim",
    about = "Simulate buses looping over a route and stream GPS samples as JSON lines"
)]
struct Cli {
    /// Route file (route_id, stops, vehicles)
    #[arg(long)]
    route: PathBuf,
    /// Optional simulator config file
    #[arg(long, env = "BUS_SIM_CONFIG")]
    config: Option<PathBuf>,
    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
    /// Override the tick interval (ms)
    #[arg(long)]
    tick_ms: Option<u64>,
    /// Scale speeds by the time-of-day traffic multiplier
    #[arg(long)]
    apply_traffic: bool,
    /// Stop after this many seconds
    #[arg(long, default_value_t = 60)]
    duration_secs: u64,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging();
    let cli = Cli::parse();

    let route = load_route(&cli.route)?;
    let config = resolve_config(
        cli.config.as_deref(),
        &ConfigOverrides {
            seed: cli.seed,
            tick_ms: cli.tick_ms,
            apply_traffic: cli.apply_traffic,
        },
    )?;
    let registry = SimulatorRegistry::current()?.with_config(config)?;

    let stops: Arc<[Stop]> = route.stops.into();
    let sink = Arc::new(JsonLinesSink::new(std::io::stdout()));
    for vehicle in &route.vehicles {
        let sink = Arc::clone(&sink);
        registry.start(
            vehicle.clone(),
            route.route_id.clone(),
            Arc::clone(&stops),
            move |sample: PositionSample| sink.on_position(sample),
        )?;
    }
    info!(
        route_id = %route.route_id,
        vehicles = registry.count(),
        tick_ms = registry.config().tick_interval_ms,
        apply_traffic = registry.config().apply_traffic,
        duration_secs = cli.duration_secs,
        "simulation running"
    );

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(cli.duration_secs)) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
        }
    }

    registry.shutdown().await;
    Ok(())
}
