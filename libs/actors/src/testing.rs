//! Test doubles for pipeline stages

use crate::actor::{Actor, ActorState};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use types::TraceEvent;

#[derive(Debug, Default)]
struct Collected {
    events: Mutex<Vec<TraceEvent>>,
    stopped: AtomicBool,
    stop_calls: AtomicU64,
}

/// Synchronous actor that keeps everything it accepts, in order.
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct CollectingActor {
    inner: Arc<Collected>,
}

impl CollectingActor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.inner.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.events.lock().is_empty()
    }

    /// How many times `stop` was called, including no-op repeats
    pub fn stop_calls(&self) -> u64 {
        self.inner.stop_calls.load(Ordering::SeqCst)
    }
}

impl Actor<TraceEvent> for CollectingActor {
    fn send(&self, event: TraceEvent) -> bool {
        if self.inner.stopped.load(Ordering::SeqCst) {
            return false;
        }
        self.inner.events.lock().push(event);
        true
    }

    fn state(&self) -> ActorState {
        if self.inner.stopped.load(Ordering::SeqCst) {
            ActorState::Terminated
        } else {
            ActorState::Waiting
        }
    }

    fn stop(&self) -> bool {
        self.inner.stop_calls.fetch_add(1, Ordering::SeqCst);
        !self.inner.stopped.swap(true, Ordering::SeqCst)
    }
}
