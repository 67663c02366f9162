//! Throughput stage: fixed-width windows over completed operations
//!
//! Window boundaries are a pure function of the first observed request time
//! and the window width:
//!
//! ```text
//! start      start+W     start+2W    start+3W
//!   │  count=2  │  count=0  │  count=1  │ ...
//!   └───────────┴───────────┴───────────┘
//!        op op     (idle)        op
//! ```
//!
//! A window is closed only when a later completion falls past its end, and
//! idle windows are emitted with a zero count instead of being skipped. The
//! still-open window is flushed with its actual elapsed length on `stop`.

use crate::actor::{Actor, ActorState};
use parking_lot::Mutex;
use std::time::Duration;
use tracing::debug;
use types::{Clock, MonotonicClock, Request, TraceEvent};

#[derive(Debug, Default)]
struct Window {
    /// Nanos; set by the first completed operation
    start: Option<i64>,
    count: u64,
}

pub struct ThroughputMeasuringActor<A, K = MonotonicClock> {
    delegate: A,
    clock: K,
    window_nanos: i64,
    window_millis: u64,
    window: Mutex<Window>,
}

impl<A: Actor<TraceEvent>> ThroughputMeasuringActor<A> {
    pub fn new(delegate: A, window: Duration) -> Self {
        Self::with_clock(delegate, window, MonotonicClock)
    }
}

impl<A: Actor<TraceEvent>, K: Clock> ThroughputMeasuringActor<A, K> {
    /// `clock` must be the one the taps stamp operations with
    pub fn with_clock(delegate: A, window: Duration, clock: K) -> Self {
        let window_nanos = i64::try_from(window.as_nanos()).unwrap_or(i64::MAX).max(1);
        Self {
            delegate,
            clock,
            window_nanos,
            window_millis: window.as_millis() as u64,
            window: Mutex::new(Window::default()),
        }
    }

    pub fn delegate(&self) -> &A {
        &self.delegate
    }

    pub fn window(&self) -> Duration {
        Duration::from_nanos(self.window_nanos as u64)
    }

    /// Operations counted in the still-open window
    pub fn pending_count(&self) -> u64 {
        self.window.lock().count
    }
}

/// `(request_nanos, response_nanos)` of an operation that counts toward throughput
fn completion(event: &TraceEvent) -> Option<(i64, i64)> {
    match event {
        TraceEvent::Operation {
            request,
            request_nanos,
            response: Some(_),
            response_nanos,
            ..
        } if !request.as_ref().is_some_and(Request::is_session_close) => {
            Some((*request_nanos, *response_nanos))
        }
        _ => None,
    }
}

impl<A: Actor<TraceEvent>, K: Clock> Actor<TraceEvent> for ThroughputMeasuringActor<A, K> {
    fn send(&self, event: TraceEvent) -> bool {
        let Some((request_nanos, response_nanos)) = completion(&event) else {
            return self.delegate.send(event);
        };

        // Held across forwarding so closed windows reach the delegate before
        // any operation of a later window.
        let mut window = self.window.lock();
        let mut start = *window.start.get_or_insert(request_nanos);
        while response_nanos - start > self.window_nanos {
            self.delegate.send(TraceEvent::throughput(window.count, self.window_millis));
            window.count = 0;
            start += self.window_nanos;
        }
        window.start = Some(start);
        window.count += 1;
        self.delegate.send(event)
    }

    fn state(&self) -> ActorState {
        self.delegate.state()
    }

    fn stop(&self) -> bool {
        {
            let mut window = self.window.lock();
            if let Some(start) = window.start.filter(|_| window.count > 0) {
                let elapsed_millis = (self.clock.now_nanos() - start).max(0) / 1_000_000;
                debug!(
                    count = window.count,
                    elapsed_ms = elapsed_millis,
                    "Flushing partial throughput window"
                );
                let partial = TraceEvent::throughput(window.count, elapsed_millis as u64);
                self.delegate.send(partial);
                window.count = 0;
            }
        }
        self.delegate.stop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CollectingActor;
    use types::{ManualClock, OpCode, Request, Response};

    const MS: i64 = 1_000_000;

    fn op(xid: i32, request_ms: i64, response_ms: i64) -> TraceEvent {
        TraceEvent::operation(
            1,
            Request::new(xid, OpCode::GetData),
            request_ms * MS,
            Response::new(xid, 0, OpCode::GetData),
            response_ms * MS,
        )
    }

    fn throughput_events(events: &[TraceEvent]) -> Vec<(u64, u64)> {
        events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::ThroughputMeasurement { count, millis } => Some((*count, *millis)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_half_second_windows_with_idle_gap() {
        let sink = CollectingActor::new();
        let clock = ManualClock::new(0);
        let throughput = ThroughputMeasuringActor::with_clock(
            sink.clone(),
            Duration::from_millis(500),
            clock.clone(),
        );

        throughput.send(op(1, 0, 100));
        assert!(throughput_events(&sink.events()).is_empty());

        throughput.send(op(2, 1_150, 1_200));
        assert_eq!(throughput_events(&sink.events()), vec![(1, 500), (0, 500)]);
        assert_eq!(throughput.pending_count(), 1);

        clock.set_millis(1_300);
        assert!(throughput.stop());
        assert_eq!(
            throughput_events(&sink.events()),
            vec![(1, 500), (0, 500), (1, 300)]
        );

        // measurements precede the operation that closed their window
        let kinds: Vec<_> = sink.events().iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                types::EventKind::Operation,
                types::EventKind::ThroughputMeasurement,
                types::EventKind::ThroughputMeasurement,
                types::EventKind::Operation,
                types::EventKind::ThroughputMeasurement,
            ]
        );
    }

    #[test]
    fn test_boundary_completion_stays_in_window() {
        let sink = CollectingActor::new();
        let throughput = ThroughputMeasuringActor::with_clock(
            sink.clone(),
            Duration::from_millis(100),
            ManualClock::new(0),
        );
        throughput.send(op(1, 0, 10));
        throughput.send(op(2, 50, 100));
        assert!(throughput_events(&sink.events()).is_empty());
        assert_eq!(throughput.pending_count(), 2);
    }

    #[test]
    fn test_timeouts_and_session_close_not_counted() {
        let sink = CollectingActor::new();
        let throughput = ThroughputMeasuringActor::new(sink.clone(), Duration::from_secs(1));

        throughput.send(TraceEvent::timeout(1, Request::new(1, OpCode::Create), 0));
        throughput.send(TraceEvent::operation(
            1,
            Request::close_session(2),
            0,
            Response::new(2, 0, OpCode::CloseSession),
            10,
        ));
        throughput.send(TraceEvent::latency(5));

        assert_eq!(throughput.pending_count(), 0);
        assert_eq!(sink.events().len(), 3);
        assert!(throughput.stop());
        assert!(throughput_events(&sink.events()).is_empty());
    }

    #[test]
    fn test_busy_window_counts_every_completion() {
        let sink = CollectingActor::new();
        let clock = ManualClock::new(0);
        let throughput = ThroughputMeasuringActor::with_clock(
            sink.clone(),
            Duration::from_millis(100),
            clock.clone(),
        );
        for (xid, done_ms) in [(1, 10), (2, 20), (3, 100), (4, 150), (5, 420)] {
            throughput.send(op(xid, 0, done_ms));
        }
        clock.set_millis(450);
        throughput.stop();

        assert_eq!(
            throughput_events(&sink.events()),
            vec![(3, 100), (1, 100), (0, 100), (0, 100), (1, 50)]
        );
    }

    proptest::proptest! {
        #[test]
        fn prop_windows_match_bucketed_completions(
            mut done_ms in proptest::collection::vec(0i64..3_000, 1..40),
            window_ms in 10i64..700,
            linger_ms in 0i64..300,
        ) {
            done_ms.sort_unstable();
            let sink = CollectingActor::new();
            let clock = ManualClock::new(0);
            let throughput = ThroughputMeasuringActor::with_clock(
                sink.clone(),
                Duration::from_millis(window_ms as u64),
                clock.clone(),
            );

            // every request starts at 0, so window k covers (k*W, (k+1)*W]
            for (xid, done) in done_ms.iter().enumerate() {
                throughput.send(op(xid as i32, 0, *done));
            }
            let last = *done_ms.last().unwrap();
            let stop_ms = last + linger_ms;
            clock.set_millis(stop_ms);
            proptest::prop_assert!(throughput.stop());

            let bucket = |done: i64| if done == 0 { 0 } else { ((done - 1) / window_ms) as usize };
            let open = bucket(last);
            let mut counts = vec![0u64; open + 1];
            for done in &done_ms {
                counts[bucket(*done)] += 1;
            }
            let mut expected: Vec<(u64, u64)> = counts[..open]
                .iter()
                .map(|count| (*count, window_ms as u64))
                .collect();
            expected.push((counts[open], (stop_ms - open as i64 * window_ms) as u64));

            let events = sink.events();
            proptest::prop_assert_eq!(throughput_events(&events), expected);
            let operations = events
                .iter()
                .filter(|e| e.kind() == types::EventKind::Operation)
                .count();
            proptest::prop_assert_eq!(operations, done_ms.len());
        }
    }

    #[test]
    fn test_stop_without_operations_emits_nothing() {
        let sink = CollectingActor::new();
        let throughput = ThroughputMeasuringActor::new(sink.clone(), Duration::from_secs(1));
        assert!(throughput.stop());
        assert!(sink.events().is_empty());
        assert_eq!(throughput.state(), ActorState::Terminated);
    }
}
