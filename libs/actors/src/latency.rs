//! Latency stage: derives one `LatencyMeasurement` per `Operation`

use crate::actor::{Actor, ActorState};
use types::{TraceEvent, TIMEOUT_SENTINEL};

/// Emits the measurement ahead of the operation it was derived from, so a
/// reader always sees a sample before its source event.
pub struct LatencyMeasuringActor<A> {
    delegate: A,
}

impl<A: Actor<TraceEvent>> LatencyMeasuringActor<A> {
    pub fn new(delegate: A) -> Self {
        Self { delegate }
    }

    pub fn delegate(&self) -> &A {
        &self.delegate
    }
}

/// Round-trip micros of an `Operation`, the timeout sentinel if it never completed
pub fn latency_micros(event: &TraceEvent) -> Option<i64> {
    match event {
        TraceEvent::Operation { .. } => {
            Some(event.latency_nanos().map_or(TIMEOUT_SENTINEL, |nanos| nanos / 1_000))
        }
        _ => None,
    }
}

impl<A: Actor<TraceEvent>> Actor<TraceEvent> for LatencyMeasuringActor<A> {
    fn send(&self, event: TraceEvent) -> bool {
        if let Some(micros) = latency_micros(&event) {
            if !self.delegate.send(TraceEvent::latency(micros)) {
                return false;
            }
        }
        self.delegate.send(event)
    }

    fn state(&self) -> ActorState {
        self.delegate.state()
    }

    fn stop(&self) -> bool {
        self.delegate.stop()
    }
}
