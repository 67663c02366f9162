//! Pipeline Integration Tests
//!
//! End-to-end behavior of the actor chain:
//! - Many producer threads feeding one consumer, order preserved per producer
//! - Never more than one `apply` in flight
//! - Codec tap ─> bus ─> pipeline ─> file, read back with the codec reader

use actors::{
    Actor, ActorState, Handler, MailboxActor, PipelineOptions, TraceEventBus, TracePipeline,
};
use bytes::BytesMut;
use codec::{
    encode_frame, read_all, ConnectionState, JsonFrameCodec, TapMode, TracingCodec,
    DEFAULT_MAX_FRAME,
};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use types::{EventKind, ManualClock, OpCode, Request, Response, TraceEvent, TraceHeader};

/// Fails the test if two `apply` calls ever overlap
struct ExclusiveRecorder {
    in_flight: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<(usize, u64)>>>,
}

impl Handler<(usize, u64)> for ExclusiveRecorder {
    fn apply(&mut self, msg: (usize, u64)) -> actors::Result<()> {
        let before = self.in_flight.fetch_add(1, Ordering::SeqCst);
        assert_eq!(before, 0, "concurrent apply");
        thread::yield_now();
        self.seen.lock().push(msg);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

fn run_producers(producers: usize, per_producer: u64) -> Vec<(usize, u64)> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let actor = Arc::new(
        MailboxActor::spawn(
            "exclusive",
            ExclusiveRecorder {
                in_flight: Arc::new(AtomicUsize::new(0)),
                seen: Arc::clone(&seen),
            },
        )
        .unwrap(),
    );

    let handles: Vec<_> = (0..producers)
        .map(|producer| {
            let actor = Arc::clone(&actor);
            thread::spawn(move || {
                for seq in 0..per_producer {
                    assert!(actor.send((producer, seq)));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(actor.stop());
    assert_eq!(actor.state(), ActorState::Terminated);
    let seen = seen.lock().clone();
    seen
}

#[test]
fn test_many_producers_single_consumer() {
    let seen = run_producers(8, 2_000);
    assert_eq!(seen.len(), 16_000);

    let mut last: HashMap<usize, u64> = HashMap::new();
    for (producer, seq) in seen {
        if let Some(previous) = last.insert(producer, seq) {
            assert_eq!(seq, previous + 1, "producer {producer} reordered");
        } else {
            assert_eq!(seq, 0);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_every_accepted_message_applied_once(producers in 1usize..6, per_producer in 0u64..200) {
        let seen = run_producers(producers, per_producer);
        prop_assert_eq!(seen.len() as u64, producers as u64 * per_producer);
    }
}

type BusTap = TracingCodec<JsonFrameCodec, Arc<TraceEventBus>, ManualClock>;

fn reply(tap: &mut BusTap, response: Response) {
    let mut src = BytesMut::new();
    encode_frame(&response, &mut src, DEFAULT_MAX_FRAME).unwrap();
    tap.decode(&mut src).unwrap();
}

#[test]
fn test_tap_to_file_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("e2e.trace");
    let clock = ManualClock::new(0);
    let header = TraceHeader::new(
        "end to end",
        [
            EventKind::Operation,
            EventKind::LatencyMeasurement,
            EventKind::ThroughputMeasurement,
        ],
    );

    let pipeline = Arc::new(
        TracePipeline::create(
            &path,
            &header,
            PipelineOptions {
                throughput_window: std::time::Duration::from_millis(500),
                clock: Arc::new(clock.clone()),
            },
        )
        .unwrap(),
    );
    let bus = Arc::new(TraceEventBus::new());
    let subscription = bus.subscribe(pipeline.clone());

    let mut tap = TracingCodec::with_clock(
        JsonFrameCodec::new(),
        Arc::clone(&bus),
        TapMode::Operations,
        clock.clone(),
    );
    tap.bind_session(0x77);
    let mut wire = BytesMut::new();

    // req1 answered at 100ms, req2 at 1200ms, req3 never answered
    tap.encode(&Request::new(1, OpCode::GetData), &mut wire).unwrap();
    clock.set_millis(100);
    reply(&mut tap, Response::new(1, 1, OpCode::GetData));

    clock.set_millis(1_150);
    tap.encode(&Request::new(2, OpCode::SetData), &mut wire).unwrap();
    clock.set_millis(1_200);
    reply(&mut tap, Response::new(2, 2, OpCode::SetData));

    tap.encode(&Request::new(3, OpCode::Delete), &mut wire).unwrap();
    tap.on_connection_state(ConnectionState::Closed);

    clock.set_millis(1_300);
    assert!(bus.unsubscribe(subscription));
    assert!(pipeline.stop());

    let (read_header, events) = read_all(&path).unwrap();
    assert_eq!(read_header, header);

    let latencies: Vec<i64> = events
        .iter()
        .filter_map(|e| match e {
            TraceEvent::LatencyMeasurement { micros } => Some(*micros),
            _ => None,
        })
        .collect();
    assert_eq!(latencies, vec![100_000, 50_000, types::TIMEOUT_SENTINEL]);

    let windows: Vec<(u64, u64)> =
        codec::throughput_series(events.iter().cloned().map(Ok::<_, ()>))
            .map(|r| r.unwrap())
            .collect();
    assert_eq!(windows, vec![(1, 500), (0, 500), (1, 300)]);

    let timeouts = events.iter().filter(|e| e.is_timeout()).count();
    assert_eq!(timeouts, 1);
    assert!(events.iter().all(|e| e.session_id().map_or(true, |id| id == 0x77)));
}
