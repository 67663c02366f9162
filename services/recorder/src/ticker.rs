//! Periodic wall-clock markers
//!
//! Publishes a `Timestamp` event at a fixed interval so long captures can be
//! lined up against external logs. The first tick fires immediately.

use crate::error::{RecorderError, Result};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;
use types::{epoch_millis, TraceEvent, TracePublisher};

pub struct TimestampTicker {
    task: JoinHandle<()>,
    period: Duration,
}

impl TimestampTicker {
    /// Spawns onto the current tokio runtime
    pub fn start<P: TracePublisher + 'static>(publisher: P, period: Duration) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| RecorderError::NoRuntime)?;
        let task = runtime.spawn(async move {
            let mut ticks = interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                publisher.publish(TraceEvent::timestamp(epoch_millis()));
            }
        });
        debug!(period_ms = period.as_millis() as u64, "Timestamp ticker started");
        Ok(Self { task, period })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn stop(self) {
        self.task.abort();
        debug!("Timestamp ticker stopped");
    }
}

impl Drop for TimestampTicker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
