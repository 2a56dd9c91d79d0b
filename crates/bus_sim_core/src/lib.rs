pub mod clock;
pub mod config;
pub mod error;
pub mod geo;
pub mod registry;
pub mod simulator;
pub mod speed;
pub mod traffic;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use config::SimulatorConfig;
pub use error::SimError;
pub use registry::{SimulatorHandle, SimulatorRegistry};
pub use simulator::{PositionSample, PositionSink, Stop, VehicleSimulator};
pub use traffic::{TrafficCondition, TrafficModel};
