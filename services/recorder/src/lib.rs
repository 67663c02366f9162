//! # Trace Recorder
//!
//! Service wiring for protocol trace capture. A `TraceService` owns one
//! capture file and everything feeding it:
//!
//! ```text
//! ┌────────────────┐
//! │ client codec   │── tap() ──┐
//! │ client codec   │── tap() ──┤     ┌───────────────┐     ┌────────────────┐
//! └────────────────┘           ├────>│ TraceEventBus │────>│ TracePipeline  │──> file
//! ┌────────────────┐           │     └───────────────┘     └────────────────┘
//! │ TimestampTicker│───────────┘
//! └────────────────┘
//! ```
//!
//! The same crate reads captures back: `summarize` for an overview and
//! `dump_requests` to extract replayable requests as JSON lines.
//!
//! ## Usage
//!
//! ```no_run
//! use actors::TraceEventBus;
//! use codec::JsonFrameCodec;
//! use trace_recorder::{RecorderConfig, TraceService};
//!
//! # async fn run() -> trace_recorder::Result<()> {
//! let config = RecorderConfig::load("recorder.toml")?;
//! let service = TraceService::start(&config, TraceEventBus::global())?;
//! let tap = service.tap(JsonFrameCodec::new(), 0x1234);
//! // ... drive the connection through `tap` ...
//! # drop(tap);
//! service.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod inspect;
pub mod service;
pub mod ticker;

pub use config::RecorderConfig;
pub use error::{RecorderError, Result};
pub use inspect::{summarize, TraceSummary};
pub use service::{BusTap, TraceService};
pub use ticker::TimestampTicker;

use codec::{requests, SessionSelector, TraceEventIterator};
use std::io::Write;
use std::path::Path;

/// Writes the replayable requests of a capture to `out`, one JSON object per
/// line, and returns how many were written
pub fn dump_requests(
    path: impl AsRef<Path>,
    selector: SessionSelector,
    mut out: impl Write,
) -> Result<u64> {
    let mut written = 0;
    for request in requests(TraceEventIterator::open(path)?, selector) {
        let request = request?;
        serde_json::to_writer(&mut out, &request).map_err(std::io::Error::from)?;
        out.write_all(b"\n")?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}
