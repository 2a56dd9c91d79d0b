use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SimulatorConfig;

/// Seeded source for initial speed, speed jitter and GPS noise.
///
/// Each simulator owns one, so a fixed seed reproduces a run exactly.
#[derive(Debug)]
pub struct SpeedModel {
    rng: StdRng,
    initial_min_kmh: f64,
    initial_max_kmh: f64,
    min_kmh: f64,
    max_kmh: f64,
    variation: f64,
    gps_noise_deg: f64,
}

impl SpeedModel {
    pub fn new(seed: Option<u64>) -> Self {
        Self::from_config(&SimulatorConfig {
            seed,
            ..SimulatorConfig::default()
        })
    }

    pub fn from_config(config: &SimulatorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            initial_min_kmh: config.initial_speed_min_kmh,
            initial_max_kmh: config.initial_speed_max_kmh,
            min_kmh: config.min_speed_kmh,
            max_kmh: config.max_speed_kmh,
            variation: config.speed_variation,
            gps_noise_deg: config.gps_noise_deg,
        }
    }

    pub fn min_kmh(&self) -> f64 {
        self.min_kmh
    }

    pub fn max_kmh(&self) -> f64 {
        self.max_kmh
    }

    pub fn clamp(&self, speed_kmh: f64) -> f64 {
        speed_kmh.clamp(self.min_kmh, self.max_kmh)
    }

    pub fn initial_kmh(&mut self) -> f64 {
        let base = self
            .rng
            .gen_range(self.initial_min_kmh..=self.initial_max_kmh);
        self.clamp(base)
    }

    /// Apply one step of relative jitter and clamp the result.
    pub fn jitter(&mut self, speed_kmh: f64) -> f64 {
        let u: f64 = self.rng.gen_range(-0.5..0.5);
        self.clamp(speed_kmh * (1.0 + u * self.variation))
    }

    /// Independent `(dlat, dlng)` offsets in `[-noise/2, noise/2)`.
    pub fn gps_noise(&mut self) -> (f64, f64) {
        let dlat: f64 = self.rng.gen_range(-0.5..0.5);
        let dlng: f64 = self.rng.gen_range(-0.5..0.5);
        (dlat * self.gps_noise_deg, dlng * self.gps_noise_deg)
    }
}
