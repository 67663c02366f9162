//! Kind filter stage

use crate::actor::{Actor, ActorState};
use std::collections::BTreeSet;
use types::{EventKind, TraceEvent};

type KindPredicate = Box<dyn Fn(EventKind) -> bool + Send + Sync>;

/// Forwards only events whose kind passes the predicate. Rejected events are
/// accepted and dropped, so producers cannot tell them apart from written ones.
pub struct FilteringActor<A> {
    delegate: A,
    predicate: KindPredicate,
}

impl<A: Actor<TraceEvent>> FilteringActor<A> {
    pub fn new(delegate: A, predicate: impl Fn(EventKind) -> bool + Send + Sync + 'static) -> Self {
        Self {
            delegate,
            predicate: Box::new(predicate),
        }
    }

    /// Keep exactly the kinds listed in a capture header
    pub fn for_kinds(kinds: impl IntoIterator<Item = EventKind>, delegate: A) -> Self {
        let kinds: BTreeSet<EventKind> = kinds.into_iter().collect();
        Self::new(delegate, move |kind| kinds.contains(&kind))
    }

    pub fn delegate(&self) -> &A {
        &self.delegate
    }
}

impl<A: Actor<TraceEvent>> Actor<TraceEvent> for FilteringActor<A> {
    fn send(&self, event: TraceEvent) -> bool {
        if (self.predicate)(event.kind()) {
            self.delegate.send(event)
        } else {
            self.delegate.state() != ActorState::Terminated
        }
    }

    fn state(&self) -> ActorState {
        self.delegate.state()
    }

    fn stop(&self) -> bool {
        self.delegate.stop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CollectingActor;
    use types::{OpCode, Request};

    #[test]
    fn test_only_listed_kinds_pass() {
        let sink = CollectingActor::new();
        let filter = FilteringActor::for_kinds(
            [EventKind::LatencyMeasurement, EventKind::Timestamp],
            sink.clone(),
        );

        assert!(filter.send(TraceEvent::latency(5)));
        assert!(filter.send(TraceEvent::throughput(1, 10)));
        assert!(filter.send(TraceEvent::ProtocolRequest {
            session_id: 3,
            request: Request::new(1, OpCode::GetData),
        }));
        assert!(filter.send(TraceEvent::timestamp(9)));

        assert_eq!(
            sink.events(),
            vec![TraceEvent::latency(5), TraceEvent::timestamp(9)]
        );
    }

    #[test]
    fn test_dropped_event_reports_terminated_delegate() {
        let sink = CollectingActor::new();
        let filter = FilteringActor::new(sink.clone(), |_| false);
        assert!(filter.send(TraceEvent::latency(1)));

        assert!(filter.stop());
        assert_eq!(filter.state(), ActorState::Terminated);
        assert!(!filter.send(TraceEvent::latency(1)));
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_filters_compose_as_intersection() {
        let sink = CollectingActor::new();
        let inner = FilteringActor::new(sink.clone(), |kind| kind.is_derived());
        let outer = FilteringActor::new(inner, |kind| kind != EventKind::ThroughputMeasurement);

        for event in [
            TraceEvent::latency(1),
            TraceEvent::throughput(2, 3),
            TraceEvent::timestamp(4),
        ] {
            outer.send(event);
        }
        assert_eq!(sink.events(), vec![TraceEvent::latency(1)]);
    }
}
