//! Publishing seam between observation points and the trace pipeline

use crate::event::TraceEvent;
use parking_lot::Mutex;
use std::sync::Arc;

/// Anything observation points can hand events to without blocking
pub trait TracePublisher: Send + Sync {
    fn publish(&self, event: TraceEvent);
}

impl<P: TracePublisher + ?Sized> TracePublisher for Arc<P> {
    fn publish(&self, event: TraceEvent) {
        (**self).publish(event)
    }
}

/// Publisher that keeps everything it receives, in order
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    events: Arc<Mutex<Vec<TraceEvent>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<TraceEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl TracePublisher for RecordingPublisher {
    fn publish(&self, event: TraceEvent) {
        self.events.lock().push(event);
    }
}
