mod support;

use std::sync::Arc;
use std::thread;

use bus_sim_core::test_helpers::{equator_hop, fixed_speed_config, short_loop, RecordingSink};
use bus_sim_core::{PositionSample, SimulatorConfig, SimulatorRegistry, Stop};
use parking_lot::Mutex;
use support::registry::{advance_ms, test_registry};

#[tokio::test(start_paused = true)]
async fn restart_supersedes_previous_simulator() {
    let (registry, _clock) = test_registry(fixed_speed_config(40.0));
    let first = RecordingSink::default();
    let second = RecordingSink::default();

    let old = registry
        .start("BUS_1", "R1", equator_hop(), first.clone())
        .expect("start");
    assert_eq!(registry.count(), 1);
    registry
        .start("BUS_1", "R2", short_loop(), second.clone())
        .expect("restart");
    assert_eq!(registry.count(), 1);
    assert!(!old.is_running());

    advance_ms(10_000).await;
    assert_eq!(first.len(), 1);
    // Immediate tick plus ticks at 3 s, 6 s and 9 s.
    assert_eq!(second.len(), 4);
    assert!(second.samples().iter().all(|s| s.route_id == "R2"));
    registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn stop_silences_the_entity() {
    let (registry, _clock) = test_registry(SimulatorConfig::default().with_seed(3));
    let sink = RecordingSink::default();
    registry
        .start("BUS_1", "R1", short_loop(), sink.clone())
        .expect("start");
    advance_ms(6_500).await;
    let seen = sink.len();
    assert_eq!(seen, 3);

    assert!(registry.stop("BUS_1"));
    assert!(!registry.stop("BUS_1"));
    assert_eq!(registry.count(), 0);

    advance_ms(120_000).await;
    assert_eq!(sink.len(), seen);
}

#[tokio::test(start_paused = true)]
async fn stop_of_unknown_entity_is_a_no_op() {
    let (registry, _clock) = test_registry(SimulatorConfig::default());
    assert!(!registry.stop("GHOST"));
    assert_eq!(registry.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn stop_all_clears_every_entry() {
    let (registry, _clock) = test_registry(SimulatorConfig::default().with_seed(9));
    let sinks: Vec<RecordingSink> = (0..4).map(|_| RecordingSink::default()).collect();
    for (i, sink) in sinks.iter().enumerate() {
        registry
            .start(format!("BUS_{i}"), "R1", short_loop(), sink.clone())
            .expect("start");
    }
    assert_eq!(registry.count(), 4);
    assert_eq!(registry.snapshots().len(), 4);

    registry.stop_all();
    assert_eq!(registry.count(), 0);
    advance_ms(60_000).await;
    for sink in &sinks {
        assert_eq!(sink.len(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn entities_tick_independently() {
    let (registry, _clock) = test_registry(fixed_speed_config(40.0));
    let a = RecordingSink::default();
    let b = RecordingSink::default();
    registry.start("BUS_A", "R1", equator_hop(), a.clone()).expect("start a");
    advance_ms(1_500).await;
    registry.start("BUS_B", "R1", equator_hop(), b.clone()).expect("start b");
    advance_ms(2_000).await;
    // A ticked at 3 s; B's first scheduled tick is at 4.5 s.
    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 1);

    assert!(registry.stop("BUS_A"));
    advance_ms(6_000).await;
    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 3);
    registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn closure_sinks_receive_samples() {
    let (registry, _clock) = test_registry(fixed_speed_config(40.0));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<PositionSample>();
    registry
        .start("BUS_1", "R1", equator_hop(), move |sample: PositionSample| {
            let _ = tx.send(sample);
        })
        .expect("start");
    let first = rx.recv().await.expect("first sample");
    assert_eq!(first.entity_id, "BUS_1");
    assert_eq!(first.timestamp_ms, 1_700_000_000_000);
    registry.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_restarts_leave_one_simulator() {
    let registry = Arc::new(SimulatorRegistry::current().expect("runtime"));
    let workers: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..25 {
                    registry
                        .start("BUS_1", "R1", short_loop(), RecordingSink::default())
                        .expect("start");
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker thread");
    }
    assert_eq!(registry.count(), 1);
    assert!(registry.handle("BUS_1").expect("handle").is_running());

    let registry = Arc::try_unwrap(registry).expect("sole owner");
    registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_handles() {
    let (registry, _clock) = test_registry(SimulatorConfig::default());
    let handle = registry
        .start("BUS_1", "R1", short_loop(), RecordingSink::default())
        .expect("start");
    registry.shutdown().await;
    assert!(!handle.is_running());
}

#[tokio::test(start_paused = true)]
async fn single_stop_route_runs_silently() {
    let (registry, _clock) = test_registry(fixed_speed_config(40.0));
    let sink = RecordingSink::default();
    let handle = registry
        .start("BUS_1", "R1", vec![Stop::new(17.39, 78.49)], sink.clone())
        .expect("single stop is accepted");
    assert_eq!(registry.count(), 1);

    advance_ms(120_000).await;
    assert!(sink.is_empty());
    assert!(handle.is_running());
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.current_stop_index, 0);
    assert!(!snapshot.is_at_stop);
    assert!(snapshot.eta_to_next_stop_min.is_none());
    registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn sink_can_read_registry_state_while_ticking() {
    let (registry, _clock) = test_registry(fixed_speed_config(40.0));
    let registry = Arc::new(registry);
    let weak = Arc::downgrade(&registry);
    let running_seen = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&running_seen);
    registry
        .start("BUS_1", "R1", equator_hop(), move |sample: PositionSample| {
            let Some(registry) = weak.upgrade() else {
                return;
            };
            let running = registry.snapshots().iter().filter(|s| s.running).count();
            if let Some(handle) = registry.handle(&sample.entity_id) {
                assert!(handle.is_running());
                assert!(handle.snapshot().progress > 0.0);
            }
            seen.lock().push(running);
        })
        .expect("start");

    advance_ms(10_000).await;
    // The immediate tick runs before the entity is registered.
    assert_eq!(*running_seen.lock(), vec![0, 1, 1, 1]);

    assert!(registry.stop("BUS_1"));
    advance_ms(10_000).await;
    assert_eq!(running_seen.lock().len(), 4);
    Arc::try_unwrap(registry)
        .expect("sole owner")
        .shutdown()
        .await;
}
