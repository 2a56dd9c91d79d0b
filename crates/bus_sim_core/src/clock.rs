//! Time sources for sample timestamps and traffic hour-of-day lookups.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use chrono::{Local, Timelike, Utc};

/// Wall-clock view used by simulators.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Unix time in milliseconds.
    fn now_ms(&self) -> u64;
    /// Local hour of day, `0..24`.
    fn local_hour(&self) -> u32;
}

/// The real clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        Utc::now().timestamp_millis().max(0) as u64
    }

    fn local_hour(&self) -> u32 {
        Local::now().hour()
    }
}

/// Settable clock for tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
    hour: AtomicU32,
}

impl ManualClock {
    pub fn new(now_ms: u64, hour: u32) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
            hour: AtomicU32::new(hour % 24),
        }
    }

    pub fn set_now_ms(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    pub fn set_hour(&self, hour: u32) {
        self.hour.store(hour % 24, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn local_hour(&self) -> u32 {
        self.hour.load(Ordering::SeqCst)
    }
}
