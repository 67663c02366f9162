//! Recorder configuration

use crate::error::{RecorderError, Result};
use actors::PipelineOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use types::{EventKind, TraceHeader};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Trace file to create; an existing file is truncated
    pub output: PathBuf,

    /// Free text stored in the trace header
    pub description: String,

    /// Event kind names recorded in the body, e.g. `operation`
    pub kinds: Vec<String>,

    /// Width of a throughput window in milliseconds
    pub throughput_window_ms: u64,

    /// Period of `timestamp` events in milliseconds; 0 disables the ticker
    pub timestamp_interval_ms: u64,

    /// Also publish raw request and reply events from taps
    pub capture_messages: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("session.trace"),
            description: "session trace".to_string(),
            kinds: [
                EventKind::Timestamp,
                EventKind::Operation,
                EventKind::LatencyMeasurement,
                EventKind::ThroughputMeasurement,
            ]
            .iter()
            .map(|kind| kind.name().to_string())
            .collect(),
            throughput_window_ms: 1000,
            timestamp_interval_ms: 1000,
            capture_messages: false,
        }
    }
}

impl RecorderConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.throughput_window_ms == 0 {
            return Err(RecorderError::configuration(
                "throughput_window_ms must be greater than zero",
            ));
        }
        self.event_kinds()?;
        Ok(())
    }

    pub fn event_kinds(&self) -> Result<Vec<EventKind>> {
        Ok(self
            .kinds
            .iter()
            .map(|name| name.parse())
            .collect::<types::Result<_>>()?)
    }

    pub fn header(&self) -> Result<TraceHeader> {
        Ok(TraceHeader::new(self.description.clone(), self.event_kinds()?))
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            throughput_window: Duration::from_millis(self.throughput_window_ms),
            ..PipelineOptions::default()
        }
    }

    pub fn timestamp_interval(&self) -> Option<Duration> {
        (self.timestamp_interval_ms > 0).then(|| Duration::from_millis(self.timestamp_interval_ms))
    }
}
