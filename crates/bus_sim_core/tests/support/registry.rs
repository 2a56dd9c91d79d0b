use std::sync::Arc;
use std::time::Duration;

use bus_sim_core::clock::ManualClock;
use bus_sim_core::{SimulatorConfig, SimulatorRegistry};

/// Registry on the ambient (usually paused) test runtime, with a manual clock.
pub fn test_registry(config: SimulatorConfig) -> (SimulatorRegistry, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000, 12));
    let registry = SimulatorRegistry::current()
        .expect("tokio runtime")
        .with_config(config)
        .expect("valid config")
        .with_clock(clock.clone());
    (registry, clock)
}

/// Let paused tokio time run forward by `ms`, firing every timer on the way.
pub async fn advance_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
