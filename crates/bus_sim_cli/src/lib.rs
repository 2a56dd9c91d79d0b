//! Route loading and sample output for the `bus-sim` binary.
//!
//! A route file is JSON:
//!
//! ```json
//! {
//!   "route_id": "R1",
//!   "stops": [{ "name": "Abids", "lat": 17.385, "lng": 78.4867 }, ...],
//!   "vehicles": ["BUS_1", "BUS_2"]
//! }
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use bus_sim_core::{PositionSample, PositionSink, SimError, SimulatorConfig, Stop};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("route `{0}` lists no vehicles")]
    NoVehicles(String),
    #[error(transparent)]
    Sim(#[from] SimError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteFile {
    pub route_id: String,
    pub stops: Vec<Stop>,
    pub vehicles: Vec<String>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let raw = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and sanity-check a route file. Empty stop lists are rejected here,
/// before any simulator is started.
pub fn load_route(path: &Path) -> Result<RouteFile, CliError> {
    let route: RouteFile = read_json(path)?;
    if route.vehicles.is_empty() {
        return Err(CliError::NoVehicles(route.route_id));
    }
    if route.stops.is_empty() {
        return Err(SimError::EmptyRoute {
            entity_id: route.vehicles[0].clone(),
        }
        .into());
    }
    Ok(route)
}

/// Command-line overrides applied on top of the config file (or defaults).
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub seed: Option<u64>,
    pub tick_ms: Option<u64>,
    pub apply_traffic: bool,
}

pub fn resolve_config(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<SimulatorConfig, CliError> {
    let mut config = match path {
        Some(path) => read_json(path)?,
        None => SimulatorConfig::default(),
    };
    if let Some(seed) = overrides.seed {
        config.seed = Some(seed);
    }
    if let Some(tick_ms) = overrides.tick_ms {
        config.tick_interval_ms = tick_ms;
    }
    if overrides.apply_traffic {
        config.apply_traffic = true;
    }
    config.validate()?;
    Ok(config)
}

/// Writes each sample as one JSON line.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> PositionSink for JsonLinesSink<W> {
    fn on_position(&self, sample: PositionSample) {
        let line = match serde_json::to_string(&sample) {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "failed to encode sample");
                return;
            }
        };
        let mut writer = self.writer.lock();
        if let Err(err) = writeln!(writer, "{line}").and_then(|_| writer.flush()) {
            warn!(entity_id = %sample.entity_id, error = %err, "failed to write sample");
        }
    }
}
