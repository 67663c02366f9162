//! Pipeline composition
//!
//! Assembles the stages a capture header asks for in front of a writer:
//!
//! ```text
//! head ─> [Throughput] ─> [Latency] ─> Filter(header kinds) ─> Writer
//! ```
//!
//! Measuring stages sit upstream of the filter so the filter also governs the
//! events they derive. Stopping starts at the head: each stage flushes what it
//! still holds into the next one before passing the stop along, so the writer
//! closes last.

use crate::actor::{Actor, ActorState};
use crate::error::Result;
use crate::filter::FilteringActor;
use crate::latency::LatencyMeasuringActor;
use crate::throughput::ThroughputMeasuringActor;
use crate::writer::spawn_writer;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use types::{Clock, EventKind, MonotonicClock, TraceEvent, TraceHeader};

pub type SharedActor = Arc<dyn Actor<TraceEvent>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Throughput,
    Latency,
    Filter,
    Writer,
}

#[derive(Clone)]
pub struct PipelineOptions {
    pub throughput_window: Duration,
    /// Must match the clock of the taps feeding the pipeline
    pub clock: Arc<dyn Clock>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            throughput_window: Duration::from_secs(1),
            clock: Arc::new(MonotonicClock),
        }
    }
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("throughput_window", &self.throughput_window)
            .finish_non_exhaustive()
    }
}

pub struct TracePipeline {
    head: SharedActor,
    /// Head first
    stages: Vec<StageKind>,
}

impl TracePipeline {
    pub fn build(header: &TraceHeader, writer: SharedActor, options: PipelineOptions) -> Self {
        let mut stages = vec![StageKind::Writer, StageKind::Filter];
        let mut head: SharedActor = Arc::new(FilteringActor::for_kinds(
            header.kinds().iter().copied(),
            writer,
        ));

        if header.is_enabled(EventKind::LatencyMeasurement) {
            head = Arc::new(LatencyMeasuringActor::new(head));
            stages.push(StageKind::Latency);
        }
        if header.is_enabled(EventKind::ThroughputMeasurement) {
            head = Arc::new(ThroughputMeasuringActor::with_clock(
                head,
                options.throughput_window,
                Arc::clone(&options.clock),
            ));
            stages.push(StageKind::Throughput);
        }
        stages.reverse();

        info!(
            stages = ?stages,
            throughput_window_ms = options.throughput_window.as_millis() as u64,
            "Trace pipeline assembled"
        );
        Self { head, stages }
    }

    /// Pipeline writing to a new trace file at `path`
    pub fn create(
        path: impl AsRef<Path>,
        header: &TraceHeader,
        options: PipelineOptions,
    ) -> Result<Self> {
        let writer = spawn_writer(path, header)?;
        Ok(Self::build(header, Arc::new(writer), options))
    }

    /// Entry stage; what producers and the bus send to
    pub fn head(&self) -> SharedActor {
        Arc::clone(&self.head)
    }

    pub fn stages(&self) -> &[StageKind] {
        &self.stages
    }
}

impl Actor<TraceEvent> for TracePipeline {
    fn send(&self, event: TraceEvent) -> bool {
        self.head.send(event)
    }

    fn state(&self) -> ActorState {
        self.head.state()
    }

    fn stop(&self) -> bool {
        self.head.stop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CollectingActor;
    use types::{ManualClock, OpCode, Request, Response};

    fn header(kinds: &[EventKind]) -> TraceHeader {
        TraceHeader::new("pipeline", kinds.iter().copied())
    }

    #[test]
    fn test_stage_selection() {
        let sink = Arc::new(CollectingActor::new());
        let minimal = TracePipeline::build(
            &header(&[EventKind::Operation]),
            sink.clone(),
            PipelineOptions::default(),
        );
        assert_eq!(minimal.stages(), &[StageKind::Filter, StageKind::Writer]);

        let full = TracePipeline::build(
            &header(&EventKind::ALL),
            sink,
            PipelineOptions::default(),
        );
        assert_eq!(
            full.stages(),
            &[
                StageKind::Throughput,
                StageKind::Latency,
                StageKind::Filter,
                StageKind::Writer
            ]
        );
    }

    #[test]
    fn test_derived_events_are_filtered_by_header() {
        let sink = CollectingActor::new();
        let pipeline = TracePipeline::build(
            &header(&[EventKind::LatencyMeasurement]),
            Arc::new(sink.clone()),
            PipelineOptions::default(),
        );

        let op = TraceEvent::operation(
            1,
            Request::new(1, OpCode::GetData),
            0,
            Response::new(1, 0, OpCode::GetData),
            4_000,
        );
        assert!(pipeline.send(op));
        assert!(pipeline.send(TraceEvent::timestamp(1)));
        assert_eq!(sink.events(), vec![TraceEvent::latency(4)]);
    }

    #[test]
    fn test_stop_flushes_throughput_before_writer_stops() {
        let sink = CollectingActor::new();
        let clock = ManualClock::new(0);
        let pipeline = TracePipeline::build(
            &header(&[EventKind::ThroughputMeasurement]),
            Arc::new(sink.clone()),
            PipelineOptions {
                throughput_window: Duration::from_millis(100),
                clock: Arc::new(clock.clone()),
            },
        );

        let op = TraceEvent::operation(
            1,
            Request::new(1, OpCode::Create),
            0,
            Response::new(1, 0, OpCode::Create),
            1_000_000,
        );
        pipeline.send(op);
        clock.set_millis(40);

        assert!(pipeline.stop());
        assert_eq!(sink.events(), vec![TraceEvent::throughput(1, 40)]);
        assert_eq!(sink.stop_calls(), 1);
        assert_eq!(pipeline.state(), ActorState::Terminated);
    }
}
