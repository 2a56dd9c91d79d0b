//! Registry of running simulators, one per tracked entity.
//!
//! Each started simulator gets its own tokio task that drives the recurring
//! tick and, while the vehicle is dwelling, a one-shot dwell timer. A handle
//! carries two locks: `state` guards the simulator itself and is only held
//! for the tick or a read, while `emit` is held from the running check until
//! the sink returns. [`SimulatorRegistry::stop`] takes `emit` before flipping
//! the running flag, so once `stop` returns the sink for that entity is never
//! called again. Sinks may read snapshots and handles freely.
//!
//! Start/stop calls are serialized by a lifecycle lock that the tick tasks
//! never touch, so a slow start never delays another entity's ticks.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior, Sleep};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::SimulatorConfig;
use crate::error::SimError;
use crate::simulator::{PositionSink, SimulatorSnapshot, Stop, TickTime, VehicleSimulator};
use crate::traffic::TrafficModel;

/// Shared view of one started simulator.
///
/// Cheap to clone. Stays valid after the simulator is stopped, reporting
/// `is_running() == false` from then on. The read accessors never wait on a
/// sink call, so they are safe to use from inside [`PositionSink::on_position`].
#[derive(Debug, Clone)]
pub struct SimulatorHandle {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<VehicleSimulator>,
    emit: Mutex<()>,
}

impl SimulatorHandle {
    fn new(simulator: VehicleSimulator) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(simulator),
                emit: Mutex::new(()),
            }),
        }
    }

    pub fn entity_id(&self) -> String {
        self.shared.state.lock().entity_id().to_string()
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().is_running()
    }

    pub fn is_at_stop(&self) -> bool {
        self.shared.state.lock().is_at_stop()
    }

    pub fn snapshot(&self) -> SimulatorSnapshot {
        self.shared.state.lock().snapshot()
    }

    /// Tick once and forward any sample. Returns `false` once stopped.
    fn tick_now(&self, clock: &dyn Clock, sink: &dyn PositionSink) -> bool {
        let _emit = self.shared.emit.lock();
        let sample = {
            let mut simulator = self.shared.state.lock();
            if !simulator.is_running() {
                return false;
            }
            simulator.tick(TickTime::from_clock(clock))
        };
        if let Some(sample) = sample {
            sink.on_position(sample);
        }
        true
    }

    fn release_dwell(&self) {
        self.shared.state.lock().release_dwell();
    }

    /// Waits for an in-flight sink call, then clears the running flag.
    fn halt(&self) -> bool {
        let _emit = self.shared.emit.lock();
        self.shared.state.lock().stop()
    }
}

struct Entry {
    handle: SimulatorHandle,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Entry {
    fn stop(&self) {
        self.handle.halt();
        // The task may already have exited; nothing left to wake then.
        let _ = self.shutdown.send(true);
    }
}

pub struct SimulatorRegistry {
    runtime: Handle,
    config: SimulatorConfig,
    traffic: TrafficModel,
    clock: Arc<dyn Clock>,
    entries: DashMap<String, Entry>,
    lifecycle: Mutex<()>,
    started: AtomicU64,
}

impl std::fmt::Debug for SimulatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatorRegistry")
            .field("config", &self.config)
            .field("active", &self.entries.len())
            .finish()
    }
}

impl SimulatorRegistry {
    /// Empty registry that schedules ticks on `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            config: SimulatorConfig::default(),
            traffic: TrafficModel::standard(),
            clock: Arc::new(SystemClock),
            entries: DashMap::new(),
            lifecycle: Mutex::new(()),
            started: AtomicU64::new(0),
        }
    }

    /// Empty registry bound to the ambient tokio runtime.
    pub fn current() -> Result<Self, SimError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| SimError::NoRuntime)
    }

    pub fn with_config(mut self, config: SimulatorConfig) -> Result<Self, SimError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_traffic(mut self, traffic: TrafficModel) -> Self {
        self.traffic = traffic;
        self
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Start simulating `entity_id` along `stops`, replacing any simulator
    /// already running for that entity.
    ///
    /// The first tick runs before this returns, so a position is available
    /// immediately. Fails on an empty stop list without touching an existing
    /// simulator for the entity.
    pub fn start(
        &self,
        entity_id: impl Into<String>,
        route_id: impl Into<String>,
        stops: impl Into<Arc<[Stop]>>,
        sink: impl PositionSink + 'static,
    ) -> Result<SimulatorHandle, SimError> {
        let entity_id = entity_id.into();
        let config = self.next_config();
        let simulator = VehicleSimulator::new(entity_id.clone(), route_id, stops.into(), &config)?
            .with_traffic(self.traffic.clone());
        let route_id = simulator.route_id().to_string();
        let stop_count = simulator.stops().len();
        let handle = SimulatorHandle::new(simulator);
        let sink: Arc<dyn PositionSink> = Arc::new(sink);

        let _guard = self.lifecycle.lock();
        if let Some((_, previous)) = self.entries.remove(&entity_id) {
            previous.stop();
            info!(entity_id = %entity_id, "superseding running simulator");
        }

        handle.tick_now(self.clock.as_ref(), sink.as_ref());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = self.runtime.spawn(drive(
            handle.clone(),
            sink,
            Arc::clone(&self.clock),
            config.tick_interval(),
            config.dwell(),
            shutdown_rx,
        ));
        self.entries.insert(
            entity_id.clone(),
            Entry {
                handle: handle.clone(),
                shutdown: shutdown_tx,
                task,
            },
        );
        info!(
            entity_id = %entity_id,
            route_id = %route_id,
            stops = stop_count,
            "simulator started"
        );
        Ok(handle)
    }

    /// Stop and forget the simulator for `entity_id`. Returns whether one existed.
    pub fn stop(&self, entity_id: &str) -> bool {
        let _guard = self.lifecycle.lock();
        match self.entries.remove(entity_id) {
            Some((_, entry)) => {
                entry.stop();
                info!(entity_id = %entity_id, "simulator stopped");
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&self) {
        let stopped = self.drain();
        if !stopped.is_empty() {
            info!(count = stopped.len(), "all simulators stopped");
        }
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.entries.contains_key(entity_id)
    }

    pub fn handle(&self, entity_id: &str) -> Option<SimulatorHandle> {
        self.entries
            .get(entity_id)
            .map(|entry| entry.handle.clone())
    }

    pub fn snapshots(&self) -> Vec<SimulatorSnapshot> {
        let handles: Vec<SimulatorHandle> = self
            .entries
            .iter()
            .map(|entry| entry.handle.clone())
            .collect();
        handles.iter().map(SimulatorHandle::snapshot).collect()
    }

    /// Stop everything and wait for every tick task to exit.
    pub async fn shutdown(self) {
        let stopped = self.drain();
        let count = stopped.len();
        for entry in stopped {
            if let Err(err) = entry.task.await {
                warn!(error = %err, "simulator task ended abnormally");
            }
        }
        info!(count, "simulator registry shut down");
    }

    fn drain(&self) -> Vec<Entry> {
        let _guard = self.lifecycle.lock();
        let keys: Vec<String> = self.entries.iter().map(|entry| entry.key().clone()).collect();
        let mut stopped = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some((_, entry)) = self.entries.remove(&key) {
                entry.stop();
                stopped.push(entry);
            }
        }
        stopped
    }

    /// Config for the next simulator; a seeded registry gives each one its own stream.
    fn next_config(&self) -> SimulatorConfig {
        let n = self.started.fetch_add(1, Ordering::Relaxed);
        let mut config = self.config.clone();
        config.seed = config.seed.map(|seed| seed.wrapping_add(n));
        config
    }
}

impl Drop for SimulatorRegistry {
    fn drop(&mut self) {
        self.drain();
    }
}

async fn wait_for_dwell(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer.as_mut() {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn drive(
    handle: SimulatorHandle,
    sink: Arc<dyn PositionSink>,
    clock: Arc<dyn Clock>,
    tick_every: Duration,
    dwell: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = time::interval_at(Instant::now() + tick_every, tick_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut dwell_timer: Option<Pin<Box<Sleep>>> = None;

    loop {
        if dwell_timer.is_none() && handle.is_at_stop() {
            dwell_timer = Some(Box::pin(time::sleep(dwell)));
        }
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if !handle.tick_now(clock.as_ref(), sink.as_ref()) {
                    break;
                }
            }
            _ = wait_for_dwell(&mut dwell_timer) => {
                dwell_timer = None;
                handle.release_dwell();
            }
        }
    }
    debug!("simulator task exiting");
}
