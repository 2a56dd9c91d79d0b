use std::fs;
use std::path::PathBuf;

use bus_sim_cli::{load_route, resolve_config, CliError, ConfigOverrides};
use bus_sim_core::SimError;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).expect("write fixture");
    path
}

#[test]
fn loads_route_with_named_stops() {
    let dir = TempDir::new().expect("tempdir");
    let path = write(
        &dir,
        "route.json",
        r#"{
            "route_id": "R1",
            "stops": [
                { "name": "Abids", "lat": 17.385, "lng": 78.4867 },
                { "name": "Central Bus Stop", "lat": 17.39, "lng": 78.49 },
                { "latitude": 17.387, "longitude": 78.495 }
            ],
            "vehicles": ["BUS_1", "BUS_2"]
        }"#,
    );
    let route = load_route(&path).expect("route");
    assert_eq!(route.route_id, "R1");
    assert_eq!(route.stops.len(), 3);
    assert_eq!(route.stops[1].name.as_deref(), Some("Central Bus Stop"));
    assert_eq!(route.stops[2].name, None);
    assert_eq!(route.stops[2].lng, 78.495);
    assert_eq!(route.vehicles, vec!["BUS_1", "BUS_2"]);
}

#[test]
fn rejects_route_without_stops_or_vehicles() {
    let dir = TempDir::new().expect("tempdir");
    let no_stops = write(
        &dir,
        "no_stops.json",
        r#"{ "route_id": "R1", "stops": [], "vehicles": ["BUS_1"] }"#,
    );
    assert!(matches!(
        load_route(&no_stops),
        Err(CliError::Sim(SimError::EmptyRoute { .. }))
    ));

    let no_vehicles = write(
        &dir,
        "no_vehicles.json",
        r#"{ "route_id": "R1", "stops": [{ "lat": 0.0, "lng": 0.0 }], "vehicles": [] }"#,
    );
    assert!(matches!(load_route(&no_vehicles), Err(CliError::NoVehicles(_))));
}

#[test]
fn reports_missing_and_malformed_files() {
    let dir = TempDir::new().expect("tempdir");
    assert!(matches!(
        load_route(&dir.path().join("absent.json")),
        Err(CliError::Io { .. })
    ));
    let broken = write(&dir, "broken.json", "{ not json");
    let err = load_route(&broken).expect_err("malformed route");
    assert!(matches!(err, CliError::Json { .. }));
    assert!(err.to_string().contains("broken.json"));
}

#[test]
fn config_file_then_overrides() {
    let dir = TempDir::new().expect("tempdir");
    let path = write(
        &dir,
        "config.json",
        r#"{ "tick_interval_ms": 1000, "dwell_ms": 10000, "seed": 1 }"#,
    );
    let config = resolve_config(
        Some(&path),
        &ConfigOverrides {
            seed: Some(99),
            ..ConfigOverrides::default()
        },
    )
    .expect("config");
    assert_eq!(config.tick_interval_ms, 1000);
    assert_eq!(config.dwell_ms, 10_000);
    assert_eq!(config.seed, Some(99));
    assert!(!config.apply_traffic);
}
