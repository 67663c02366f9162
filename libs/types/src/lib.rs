//! # Trace Types
//!
//! Pure data for the protocol trace pipeline: the event model, the capture
//! header, the observed protocol messages and the clocks used to time them.
//!
//! ## Event Flow
//!
//! ```text
//! codec tap ──publish──> bus ──> throughput ─> latency ─> filter ─> writer ─> file
//!    │                                                                       │
//!    └─ Request / Response                          [ header, [ event, ... ] ]
//! ```
//!
//! Encoding rules for the on-disk form live next to the types (`encoding`),
//! framing and replay live in the `codec` crate, and the actor chain in
//! `actors`.

pub mod clock;
pub mod encoding;
pub mod error;
pub mod event;
pub mod header;
pub mod protocol;
pub mod publisher;

pub use clock::{epoch_millis, Clock, ManualClock, MonotonicClock};
pub use error::{EncodingError, Result};
pub use event::{EventKind, TraceEvent, TIMEOUT_SENTINEL};
pub use header::TraceHeader;
pub use protocol::{
    OpCode, Request, Response, AUTH_XID, NOTIFICATION_XID, PING_XID, SET_WATCHES_XID,
};
pub use publisher::{RecordingPublisher, TracePublisher};
