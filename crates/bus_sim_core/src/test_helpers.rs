//! Test helpers for common route fixtures and sample collection.
//!
//! Shared by the unit tests, the integration tests under `tests/` and the
//! benches, so route coordinates stay consistent across them.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::SimulatorConfig;
use crate::simulator::{PositionSample, PositionSink, Stop};

/// Two stops one degree of longitude apart on the equator (~111.19 km).
pub fn equator_hop() -> Vec<Stop> {
    vec![Stop::new(0.0, 0.0), Stop::new(0.0, 1.0)]
}

/// Three stops a few hundred metres apart around central Hyderabad.
pub fn short_loop() -> Vec<Stop> {
    vec![
        Stop::named("Abids", 17.3850, 78.4867),
        Stop::named("Central Bus Stop", 17.3900, 78.4900),
        Stop::named("Koti", 17.3870, 78.4950),
    ]
}

/// Two stops at identical coordinates, so every leg arrives in one tick.
pub fn zero_length_hop() -> Vec<Stop> {
    vec![Stop::new(17.39, 78.49), Stop::new(17.39, 78.49)]
}

/// Config with a constant speed, no jitter and no GPS noise.
pub fn fixed_speed_config(speed_kmh: f64) -> SimulatorConfig {
    SimulatorConfig {
        initial_speed_min_kmh: speed_kmh,
        initial_speed_max_kmh: speed_kmh,
        speed_variation: 0.0,
        gps_noise_deg: 0.0,
        seed: Some(1),
        ..SimulatorConfig::default()
    }
}

/// Sink that keeps every sample it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    samples: Arc<Mutex<Vec<PositionSample>>>,
}

impl RecordingSink {
    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    pub fn samples(&self) -> Vec<PositionSample> {
        self.samples.lock().clone()
    }

    pub fn last(&self) -> Option<PositionSample> {
        self.samples.lock().last().cloned()
    }
}

impl PositionSink for RecordingSink {
    fn on_position(&self, sample: PositionSample) {
        self.samples.lock().push(sample);
    }
}
