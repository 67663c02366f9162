//! # Trace Codec
//!
//! ## Purpose
//!
//! The "Rules" layer of the trace pipeline: how captures are laid out on disk,
//! how they are read back, and how protocol traffic is turned into trace
//! events at the point where it is encoded and decoded.
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [codec] → libs/actors → services/recorder
//!     ↑           ↓            ↓
//! Pure Data   File framing   Single-consumer
//! TraceEvent  Replay         pipeline stages
//! Request     Protocol taps
//! ```
//!
//! ## What This Crate Contains
//! - **TraceFileWriter**: streaming writer for `[ header, [ event, ... ] ]`
//! - **TraceEventIterator**: lazy, validating reader over the same framing
//! - **Replay**: request extraction and measurement projections
//! - **TracingCodec**: transparent tap correlating requests with replies
//! - **JsonFrameCodec**: length-prefixed JSON default wire codec
//!
//! ## What This Crate Does NOT Contain
//! - Threads or queues (belongs in libs/actors)
//! - The session protocol itself; taps only observe it
//!
//! ## Examples
//!
//! ```no_run
//! use codec::{requests, SessionSelector, TraceEventIterator};
//!
//! let events = TraceEventIterator::open("capture.trace")?;
//! for request in requests(events, SessionSelector::First) {
//!     println!("{:?}", request?);
//! }
//! # Ok::<(), codec::TraceFileError>(())
//! ```

pub mod error;
pub mod frame;
pub mod framing;
pub mod reader;
pub mod replay;
pub mod tap;

pub use error::{CodecError, CodecResult, Result, TraceFileError};
pub use frame::{decode_frame, encode_frame, JsonFrameCodec, DEFAULT_MAX_FRAME, FRAME_HEADER_SIZE};
pub use framing::TraceFileWriter;
pub use reader::{read_all, TraceEventIterator};
pub use replay::{
    latencies_micros, operations, requests, throughput_series, Requests, SessionSelector,
};
pub use tap::{ClientCodec, ConnectionState, PendingRequest, TapMode, TracingCodec};
