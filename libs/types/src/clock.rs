//! Clocks for request timing and window bucketing
//!
//! Taps stamp requests and replies with `Clock::now_nanos`, and the throughput
//! stage derives window boundaries from the same readings, so one clock must be
//! shared by every component of a pipeline. `MonotonicClock` is the production
//! clock; `ManualClock` is advanced explicitly and is what deterministic tests
//! and offline re-measurement use.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// Nanosecond clock. Values are only meaningful relative to each other.
pub trait Clock: Send + Sync {
    fn now_nanos(&self) -> i64;
}

/// Process-wide anchor so every `MonotonicClock` agrees on the origin
static ANCHOR: OnceLock<Instant> = OnceLock::new();

/// Monotonic nanoseconds since the first clock read in this process
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    #[inline]
    fn now_nanos(&self) -> i64 {
        let anchor = ANCHOR.get_or_init(Instant::now);
        i64::try_from(anchor.elapsed().as_nanos()).unwrap_or(i64::MAX)
    }
}

/// Clock that only moves when told to
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_nanos: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_nanos: i64) -> Self {
        Self {
            now_nanos: Arc::new(AtomicI64::new(start_nanos)),
        }
    }

    pub fn set_nanos(&self, nanos: i64) {
        self.now_nanos.store(nanos, Ordering::SeqCst);
    }

    pub fn set_millis(&self, millis: i64) {
        self.set_nanos(millis * 1_000_000);
    }

    pub fn advance_nanos(&self, delta: i64) {
        self.now_nanos.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn advance_millis(&self, delta: i64) {
        self.advance_nanos(delta * 1_000_000);
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> i64 {
        self.now_nanos.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_nanos(&self) -> i64 {
        (**self).now_nanos()
    }
}

/// Wall-clock milliseconds since the UNIX epoch
pub fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
