use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Default cadence of the recurring tick (ms).
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 3_000;
/// Default time spent stationary at each stop (ms).
pub const DEFAULT_DWELL_MS: u64 = 30_000;

/// Per-simulator tuning. Every simulator started by a registry shares one copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Interval between regular ticks.
    pub tick_interval_ms: u64,
    /// Dwell duration at each stop, timed independently of the tick cadence.
    pub dwell_ms: u64,
    /// Initial speed is drawn uniformly from `[initial_speed_min_kmh, initial_speed_max_kmh]`.
    pub initial_speed_min_kmh: f64,
    pub initial_speed_max_kmh: f64,
    /// Speed is clamped to `[min_speed_kmh, max_speed_kmh]` after every jitter step.
    pub min_speed_kmh: f64,
    pub max_speed_kmh: f64,
    /// Relative jitter scale: `speed *= 1 + u(-0.5, 0.5) * speed_variation`.
    pub speed_variation: f64,
    /// Full width (degrees) of the uniform GPS noise added to moving samples.
    pub gps_noise_deg: f64,
    /// Scale travel speed by the time-of-day traffic multiplier.
    pub apply_traffic: bool,
    /// Seed for the random source. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            dwell_ms: DEFAULT_DWELL_MS,
            initial_speed_min_kmh: 30.0,
            initial_speed_max_kmh: 50.0,
            min_speed_kmh: 20.0,
            max_speed_kmh: 60.0,
            speed_variation: 0.1,
            gps_noise_deg: 0.0001,
            apply_traffic: false,
            seed: None,
        }
    }
}

impl SimulatorConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.tick_interval_ms == 0 {
            return Err(SimError::InvalidConfig(
                "tick_interval_ms must be greater than 0".to_string(),
            ));
        }
        if !(self.min_speed_kmh > 0.0 && self.min_speed_kmh <= self.max_speed_kmh) {
            return Err(SimError::InvalidConfig(format!(
                "speed clamp range [{}, {}] is invalid",
                self.min_speed_kmh, self.max_speed_kmh
            )));
        }
        if self.initial_speed_min_kmh > self.initial_speed_max_kmh {
            return Err(SimError::InvalidConfig(format!(
                "initial speed range [{}, {}] is inverted",
                self.initial_speed_min_kmh, self.initial_speed_max_kmh
            )));
        }
        if self.speed_variation < 0.0 || self.gps_noise_deg < 0.0 {
            return Err(SimError::InvalidConfig(
                "speed_variation and gps_noise_deg must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}
