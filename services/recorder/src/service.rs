//! Trace capture service
//!
//! Owns one capture: the file pipeline, its bus subscription and the optional
//! timestamp ticker. Client connections join the capture through `tap`, which
//! wraps their codec so every correlated request lands in the same file.

use crate::config::RecorderConfig;
use crate::error::Result;
use crate::ticker::TimestampTicker;
use actors::{Actor, SubscriptionId, TraceEventBus, TracePipeline};
use codec::{ClientCodec, TapMode, TracingCodec};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use types::TraceHeader;

/// Tap type handed out by the service
pub type BusTap<C> = TracingCodec<C, Arc<TraceEventBus>>;

pub struct TraceService {
    bus: Arc<TraceEventBus>,
    pipeline: Arc<TracePipeline>,
    subscription: SubscriptionId,
    ticker: Mutex<Option<TimestampTicker>>,
    header: TraceHeader,
    output: PathBuf,
    capture_messages: bool,
}

impl TraceService {
    /// Opens the trace file and starts recording everything published on `bus`.
    ///
    /// The ticker is spawned onto the current tokio runtime, so a config with a
    /// timestamp interval must be started from inside one.
    pub fn start(config: &RecorderConfig, bus: Arc<TraceEventBus>) -> Result<Self> {
        config.validate()?;
        let header = config.header()?;
        let pipeline = Arc::new(TracePipeline::create(
            &config.output,
            &header,
            config.pipeline_options(),
        )?);

        // Subscribe first: the ticker publishes its first tick immediately
        let subscription = bus.subscribe(pipeline.clone());
        let ticker = match config.timestamp_interval() {
            Some(period) => match TimestampTicker::start(Arc::clone(&bus), period) {
                Ok(ticker) => Some(ticker),
                Err(e) => {
                    bus.unsubscribe(subscription);
                    pipeline.stop();
                    return Err(e);
                }
            },
            None => None,
        };

        info!(
            output = %config.output.display(),
            kinds = ?header.kinds(),
            subscription = %subscription,
            "Trace service started"
        );
        Ok(Self {
            bus,
            pipeline,
            subscription,
            ticker: Mutex::new(ticker),
            header,
            output: config.output.clone(),
            capture_messages: config.capture_messages,
        })
    }

    /// Wraps a client codec so its traffic is traced into this capture
    pub fn tap<C: ClientCodec>(&self, codec: C, session_id: i64) -> BusTap<C> {
        // Latency is derived by the pipeline; the tap only reports operations.
        let mut tap = TracingCodec::new(codec, Arc::clone(&self.bus), TapMode::Operations)
            .capture_messages(self.capture_messages);
        tap.bind_session(session_id);
        tap
    }

    pub fn bus(&self) -> &Arc<TraceEventBus> {
        &self.bus
    }

    pub fn header(&self) -> &TraceHeader {
        &self.header
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn is_running(&self) -> bool {
        self.pipeline.state() != actors::ActorState::Terminated
    }

    /// Stops the ticker, leaves the bus and closes the file. Idempotent.
    pub fn shutdown(&self) -> bool {
        if let Some(ticker) = self.ticker.lock().take() {
            ticker.stop();
        }
        self.bus.unsubscribe(self.subscription);
        let stopped = self.pipeline.stop();
        if stopped {
            info!(output = %self.output.display(), "Trace service stopped");
        } else {
            warn!(output = %self.output.display(), "Trace pipeline had already terminated");
        }
        stopped
    }
}

impl Drop for TraceService {
    fn drop(&mut self) {
        if self.is_running() {
            self.shutdown();
        }
    }
}
