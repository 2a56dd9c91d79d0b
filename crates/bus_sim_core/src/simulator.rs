//! Vehicle simulator: moves one entity around a looping sequence of stops.
//!
//! The simulator is a plain state machine with two states:
//!
//! - **Traveling**: every tick advances `progress` toward the next stop by the
//!   distance covered at the current speed, and emits a jittered sample on the
//!   eased straight line between the two stops.
//! - **Dwelling**: entered on arrival (with one sample at the stop itself).
//!   Ticks emit nothing until [`VehicleSimulator::release_dwell`] moves the
//!   simulator on to the next leg.
//!
//! Nothing here touches timers. The caller supplies the time of each tick and
//! decides when the dwell is over; see [`crate::registry`] for the driver.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::config::SimulatorConfig;
use crate::error::SimError;
use crate::geo;
use crate::speed::SpeedModel;
use crate::traffic::TrafficModel;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// A fixed waypoint on a route. The name is for display only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude", alias = "lon")]
    pub lng: f64,
}

impl Stop {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            name: None,
            lat,
            lng,
        }
    }

    pub fn named(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            name: Some(name.into()),
            lat,
            lng,
        }
    }

    pub fn distance_km_to(&self, other: &Stop) -> f64 {
        geo::distance_km(self.lat, self.lng, other.lat, other.lng)
    }

    pub fn heading_to(&self, other: &Stop) -> f64 {
        geo::heading_degrees(self.lat, self.lng, other.lat, other.lng)
    }
}

/// One emitted observation of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSample {
    pub entity_id: String,
    pub route_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kmh: f64,
    pub heading_degrees: f64,
    pub timestamp_ms: u64,
}

/// Receives every sample a simulator produces.
///
/// Called synchronously from the tick; implementations must return promptly.
/// Reading registry state (snapshots, handles, counts) from inside the call is
/// fine. Starting or stopping simulators from inside it is not: both wait for
/// in-flight sink calls and would deadlock.
pub trait PositionSink: Send + Sync {
    fn on_position(&self, sample: PositionSample);
}

impl<F> PositionSink for F
where
    F: Fn(PositionSample) + Send + Sync,
{
    fn on_position(&self, sample: PositionSample) {
        self(sample)
    }
}

/// Wall-clock inputs for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickTime {
    pub now_ms: u64,
    pub hour: u32,
}

impl TickTime {
    pub fn new(now_ms: u64, hour: u32) -> Self {
        Self { now_ms, hour }
    }

    pub fn from_clock(clock: &dyn Clock) -> Self {
        Self {
            now_ms: clock.now_ms(),
            hour: clock.local_hour(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionState {
    Traveling { progress: f64 },
    Dwelling { since_ms: u64 },
}

/// Point-in-time view of a simulator, for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatorSnapshot {
    pub entity_id: String,
    pub route_id: String,
    pub current_stop_index: usize,
    pub next_stop_index: usize,
    pub progress: f64,
    pub speed_kmh: f64,
    pub is_at_stop: bool,
    pub running: bool,
    /// Minutes to the next stop at the current speed; `None` when the route
    /// cannot be travelled.
    pub eta_to_next_stop_min: Option<f64>,
}

#[derive(Debug)]
pub struct VehicleSimulator {
    entity_id: String,
    route_id: String,
    stops: Arc<[Stop]>,
    current_stop_index: usize,
    state: MotionState,
    speed_kmh: f64,
    running: bool,
    tick_interval_ms: u64,
    dwell_ms: u64,
    apply_traffic: bool,
    speed_model: SpeedModel,
    traffic: TrafficModel,
    last_timestamp_ms: u64,
}

impl VehicleSimulator {
    /// Build a simulator at the first stop with a random initial speed.
    ///
    /// An empty stop list is rejected. A single stop is accepted, but such a
    /// simulator never emits a sample.
    pub fn new(
        entity_id: impl Into<String>,
        route_id: impl Into<String>,
        stops: Arc<[Stop]>,
        config: &SimulatorConfig,
    ) -> Result<Self, SimError> {
        let entity_id = entity_id.into();
        if stops.is_empty() {
            return Err(SimError::EmptyRoute { entity_id });
        }
        config.validate()?;
        let mut speed_model = SpeedModel::from_config(config);
        let speed_kmh = speed_model.initial_kmh();
        Ok(Self {
            entity_id,
            route_id: route_id.into(),
            stops,
            current_stop_index: 0,
            state: MotionState::Traveling { progress: 0.0 },
            speed_kmh,
            running: true,
            tick_interval_ms: config.tick_interval_ms,
            dwell_ms: config.dwell_ms,
            apply_traffic: config.apply_traffic,
            speed_model,
            traffic: TrafficModel::standard(),
            last_timestamp_ms: 0,
        })
    }

    pub fn with_traffic(mut self, traffic: TrafficModel) -> Self {
        self.traffic = traffic;
        self
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn current_stop_index(&self) -> usize {
        self.current_stop_index
    }

    pub fn next_stop_index(&self) -> usize {
        (self.current_stop_index + 1) % self.stops.len()
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    /// Fractional advance toward the next stop; `0.0` while dwelling.
    pub fn progress(&self) -> f64 {
        match self.state {
            MotionState::Traveling { progress } => progress,
            MotionState::Dwelling { .. } => 0.0,
        }
    }

    pub fn speed_kmh(&self) -> f64 {
        self.speed_kmh
    }

    pub fn is_at_stop(&self) -> bool {
        matches!(self.state, MotionState::Dwelling { .. })
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn dwell_ms(&self) -> u64 {
        self.dwell_ms
    }

    /// Whether the route has enough stops to move at all.
    pub fn can_move(&self) -> bool {
        self.stops.len() >= 2
    }

    /// Halt the simulator. Returns `false` if it was already stopped.
    pub fn stop(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }

    /// Whether a dwell that began at `since_ms` has lasted `dwell_ms` by `now_ms`.
    pub fn dwell_elapsed(&self, now_ms: u64) -> bool {
        match self.state {
            MotionState::Dwelling { since_ms } => now_ms.saturating_sub(since_ms) >= self.dwell_ms,
            MotionState::Traveling { .. } => false,
        }
    }

    /// End the dwell: advance to the stop just reached and start the next leg.
    ///
    /// Returns `false` (and changes nothing) unless the simulator is running and dwelling.
    pub fn release_dwell(&mut self) -> bool {
        if !self.running || !self.is_at_stop() {
            return false;
        }
        self.current_stop_index = self.next_stop_index();
        self.state = MotionState::Traveling { progress: 0.0 };
        debug!(
            entity_id = %self.entity_id,
            stop_index = self.current_stop_index,
            "dwell finished, departing"
        );
        true
    }

    /// Timer-free driver step: release a dwell whose time is up, then tick.
    pub fn step(&mut self, time: TickTime) -> Option<PositionSample> {
        if self.dwell_elapsed(time.now_ms) {
            self.release_dwell();
        }
        self.tick(time)
    }

    /// Advance one tick. Emits a sample while traveling or on arrival.
    pub fn tick(&mut self, time: TickTime) -> Option<PositionSample> {
        if !self.running || !self.can_move() {
            return None;
        }
        let MotionState::Traveling { progress } = self.state else {
            return None;
        };

        let current = &self.stops[self.current_stop_index];
        let next = &self.stops[self.next_stop_index()];
        let distance_km = current.distance_km_to(next);
        let heading = current.heading_to(next);

        let travel_speed = self.effective_speed(self.speed_kmh, time.hour);
        let travelled_km = travel_speed * (self.tick_interval_ms as f64 / MS_PER_HOUR);
        let increment = if distance_km > 0.0 {
            travelled_km / distance_km
        } else {
            1.0
        };
        let progress = progress + increment;

        self.speed_kmh = self.speed_model.jitter(self.speed_kmh);
        let timestamp_ms = time.now_ms.max(self.last_timestamp_ms);
        self.last_timestamp_ms = timestamp_ms;

        if progress >= 1.0 {
            self.state = MotionState::Dwelling {
                since_ms: timestamp_ms,
            };
            debug!(
                entity_id = %self.entity_id,
                stop_index = self.next_stop_index(),
                "arrived at stop"
            );
            return Some(PositionSample {
                entity_id: self.entity_id.clone(),
                route_id: self.route_id.clone(),
                latitude: next.lat,
                longitude: next.lng,
                speed_kmh: 0.0,
                heading_degrees: heading,
                timestamp_ms,
            });
        }

        self.state = MotionState::Traveling { progress };
        let (lat, lng) = geo::interpolate(
            current.lat,
            current.lng,
            next.lat,
            next.lng,
            geo::ease(progress),
        );
        let (noise_lat, noise_lng) = self.speed_model.gps_noise();
        let sample = PositionSample {
            entity_id: self.entity_id.clone(),
            route_id: self.route_id.clone(),
            latitude: lat + noise_lat,
            longitude: lng + noise_lng,
            speed_kmh: self.effective_speed(self.speed_kmh, time.hour),
            heading_degrees: heading,
            timestamp_ms,
        };
        trace!(
            entity_id = %sample.entity_id,
            lat = sample.latitude,
            lng = sample.longitude,
            speed_kmh = sample.speed_kmh,
            "position sample"
        );
        Some(sample)
    }

    fn effective_speed(&self, speed_kmh: f64, hour: u32) -> f64 {
        if self.apply_traffic {
            self.speed_model
                .clamp(speed_kmh * self.traffic.speed_multiplier(hour))
        } else {
            speed_kmh
        }
    }

    pub fn snapshot(&self) -> SimulatorSnapshot {
        let eta_to_next_stop_min = if !self.can_move() {
            None
        } else if self.is_at_stop() {
            Some(0.0)
        } else {
            let current = &self.stops[self.current_stop_index];
            let next = &self.stops[self.next_stop_index()];
            let remaining_km = current.distance_km_to(next) * (1.0 - geo::ease(self.progress()));
            geo::eta_minutes(remaining_km, self.speed_kmh)
        };
        SimulatorSnapshot {
            entity_id: self.entity_id.clone(),
            route_id: self.route_id.clone(),
            current_stop_index: self.current_stop_index,
            next_stop_index: self.next_stop_index(),
            progress: self.progress(),
            speed_kmh: self.speed_kmh,
            is_at_stop: self.is_at_stop(),
            running: self.running,
            eta_to_next_stop_min,
        }
    }
}
