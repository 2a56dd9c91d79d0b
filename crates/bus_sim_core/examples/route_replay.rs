//! Step one simulator around a short loop without timers and print each sample.
//!
//! Run with: cargo run -p bus_sim_core --example route_replay

use bus_sim_core::simulator::TickTime;
use bus_sim_core::test_helpers::short_loop;
use bus_sim_core::{SimulatorConfig, VehicleSimulator};

fn main() {
    const SIMULATED_MINUTES: u64 = 10;

    let config = SimulatorConfig::default().with_seed(123);
    let mut sim = match VehicleSimulator::new("BUS_1", "R1", short_loop().into(), &config) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("cannot build simulator: {err}");
            return;
        }
    };

    let start_ms = 1_700_000_000_000;
    let ticks = SIMULATED_MINUTES * 60_000 / config.tick_interval_ms;
    let mut emitted = 0;
    let mut arrivals = 0;
    for i in 0..ticks {
        let now = start_ms + i * config.tick_interval_ms;
        if let Some(sample) = sim.step(TickTime::new(now, 12)) {
            emitted += 1;
            if sample.speed_kmh == 0.0 {
                arrivals += 1;
            }
            println!(
                "t+{:>4}s lat {:.6} lng {:.6} speed {:>5.1} km/h heading {:>5.1}",
                (now - start_ms) / 1000,
                sample.latitude,
                sample.longitude,
                sample.speed_kmh,
                sample.heading_degrees
            );
        }
    }

    println!("--- {} ticks, {} samples, {} stop arrivals ---", ticks, emitted, arrivals);
}
