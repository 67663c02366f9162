//! Single-Consumer Trace Pipeline
//!
//! Producer threads (codec taps, tickers) publish trace events; one consumer
//! per pipeline applies them in order and writes them to disk. Measuring
//! stages are plain decorators around the next stage, so only the writer owns
//! a thread.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌───────────────┐    ┌──────────────────────────────────┐
//! │  Codec taps  │    │ TraceEventBus │    │          TracePipeline           │
//! │  Ticker      │───>│  publish()    │───>│ Throughput ─> Latency ─> Filter  │
//! │  (N threads) │    │  fan-out      │    │          ─> MailboxActor(writer) │
//! └──────────────┘    └───────────────┘    └──────────────────────────────────┘
//!                                                    one consumer thread
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use actors::{Actor, PipelineOptions, TraceEventBus, TracePipeline};
//! use std::sync::Arc;
//! use types::{EventKind, TraceEvent, TraceHeader};
//!
//! let header = TraceHeader::new("load run", [EventKind::Operation, EventKind::LatencyMeasurement]);
//! let pipeline = Arc::new(TracePipeline::create("run.trace", &header, PipelineOptions::default())?);
//!
//! let bus = TraceEventBus::new();
//! bus.subscribe(pipeline.clone());
//! bus.publish(TraceEvent::timestamp(types::epoch_millis()));
//! pipeline.stop();
//! # Ok::<(), actors::ActorError>(())
//! ```

pub mod actor;
pub mod bus;
pub mod error;
pub mod filter;
pub mod latency;
pub mod pipeline;
pub mod testing;
pub mod throughput;
pub mod writer;

pub use actor::{Actor, ActorState, Handler, MailboxActor};
pub use bus::{SubscriptionId, TraceEventBus};
pub use error::{ActorError, Result};
pub use filter::FilteringActor;
pub use latency::{latency_micros, LatencyMeasuringActor};
pub use pipeline::{PipelineOptions, SharedActor, StageKind, TracePipeline};
pub use throughput::ThroughputMeasuringActor;
pub use writer::{spawn_writer, TraceWriter};
