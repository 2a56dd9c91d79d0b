//! Traffic model: time-of-day conditions and their speed multipliers.
//!
//! The model is a static, ordered table of hour windows. Lookups walk the
//! table in order and the first window containing the hour wins; hours not
//! covered by any window are [`TrafficCondition::Normal`].

use serde::{Deserialize, Serialize};

use crate::clock::Clock;

/// Named traffic condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrafficCondition {
    RushHourMorning,
    RushHourEvening,
    Late,
    Normal,
}

impl TrafficCondition {
    pub fn name(self) -> &'static str {
        match self {
            TrafficCondition::RushHourMorning => "rushHourMorning",
            TrafficCondition::RushHourEvening => "rushHourEvening",
            TrafficCondition::Late => "late",
            TrafficCondition::Normal => "normal",
        }
    }
}

impl std::fmt::Display for TrafficCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the condition table: `[start_hour, end_hour)` on a 24h clock.
///
/// When `end_hour <= start_hour` the window wraps past midnight.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConditionWindow {
    pub condition: TrafficCondition,
    pub start_hour: u32,
    pub end_hour: u32,
    pub speed_multiplier: f64,
}

impl ConditionWindow {
    pub fn contains(&self, hour: u32) -> bool {
        let hour = hour % 24;
        if self.start_hour < self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// Ordered condition table plus the multiplier used when nothing matches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrafficModel {
    windows: Vec<ConditionWindow>,
    normal_multiplier: f64,
}

impl Default for TrafficModel {
    fn default() -> Self {
        Self::standard()
    }
}

impl TrafficModel {
    /// City bus pattern.
    ///
    /// - 07–10: 0.6 (morning rush)
    /// - 17–20: 0.6 (evening rush)
    /// - 22–06: 1.2 (late, wraps midnight)
    /// - otherwise 1.0
    pub fn standard() -> Self {
        Self {
            windows: vec![
                ConditionWindow {
                    condition: TrafficCondition::RushHourMorning,
                    start_hour: 7,
                    end_hour: 10,
                    speed_multiplier: 0.6,
                },
                ConditionWindow {
                    condition: TrafficCondition::RushHourEvening,
                    start_hour: 17,
                    end_hour: 20,
                    speed_multiplier: 0.6,
                },
                ConditionWindow {
                    condition: TrafficCondition::Late,
                    start_hour: 22,
                    end_hour: 6,
                    speed_multiplier: 1.2,
                },
            ],
            normal_multiplier: 1.0,
        }
    }

    /// No windows; every hour is `Normal` at 1.0.
    pub fn free_flow() -> Self {
        Self {
            windows: Vec::new(),
            normal_multiplier: 1.0,
        }
    }

    pub fn windows(&self) -> &[ConditionWindow] {
        &self.windows
    }

    fn matching_window(&self, hour: u32) -> Option<&ConditionWindow> {
        self.windows.iter().find(|window| window.contains(hour))
    }

    pub fn current_condition(&self, hour: u32) -> TrafficCondition {
        self.matching_window(hour)
            .map(|window| window.condition)
            .unwrap_or(TrafficCondition::Normal)
    }

    pub fn speed_multiplier(&self, hour: u32) -> f64 {
        self.matching_window(hour)
            .map(|window| window.speed_multiplier)
            .unwrap_or(self.normal_multiplier)
    }

    /// Condition for the clock's current local hour.
    pub fn condition_now(&self, clock: &dyn Clock) -> TrafficCondition {
        self.current_condition(clock.local_hour())
    }

    /// Multiplier for each hour of the day (index 0 = midnight).
    pub fn hourly_factors(&self) -> [f64; 24] {
        let mut factors = [self.normal_multiplier; 24];
        for (hour, slot) in factors.iter_mut().enumerate() {
            *slot = self.speed_multiplier(hour as u32);
        }
        factors
    }
}
