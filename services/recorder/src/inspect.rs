//! Offline capture inspection

use crate::error::Result;
use codec::TraceEventIterator;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use types::{EventKind, TraceEvent, TraceHeader, TIMEOUT_SENTINEL};

/// What a trace file contains, gathered in one streaming pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceSummary {
    pub header: TraceHeader,
    pub counts: BTreeMap<EventKind, u64>,
    pub sessions: BTreeSet<i64>,
    pub timeouts: u64,
    /// Mean of the recorded latency measurements, timeouts excluded
    pub mean_latency_micros: Option<f64>,
    /// Operations per second over the recorded throughput windows
    pub mean_throughput: Option<f64>,
}

impl TraceSummary {
    pub fn total_events(&self) -> u64 {
        self.counts.values().sum()
    }
}

pub fn summarize(path: impl AsRef<Path>) -> Result<TraceSummary> {
    let mut events = TraceEventIterator::open(path)?;
    let header = events.header().clone();

    let mut counts = BTreeMap::new();
    let mut sessions = BTreeSet::new();
    let mut timeouts = 0;
    let (mut latency_sum, mut latency_count) = (0i128, 0u64);
    // Sums of arbitrary u64 fields; widened so they cannot overflow
    let (mut completed, mut window_millis) = (0u128, 0u128);

    for event in &mut events {
        let event = event?;
        *counts.entry(event.kind()).or_insert(0u64) += 1;
        if let Some(session_id) = event.session_id() {
            sessions.insert(session_id);
        }
        if event.is_timeout() {
            timeouts += 1;
        }
        match event {
            TraceEvent::LatencyMeasurement { micros } if micros != TIMEOUT_SENTINEL => {
                latency_sum += i128::from(micros);
                latency_count += 1;
            }
            TraceEvent::ThroughputMeasurement { count, millis } => {
                completed += u128::from(count);
                window_millis += u128::from(millis);
            }
            _ => {}
        }
    }

    Ok(TraceSummary {
        header,
        counts,
        sessions,
        timeouts,
        mean_latency_micros: (latency_count > 0)
            .then(|| latency_sum as f64 / latency_count as f64),
        mean_throughput: (window_millis > 0)
            .then(|| completed as f64 * 1000.0 / window_millis as f64),
    })
}

impl fmt::Display for TraceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "description: {}", self.header.description)?;
        writeln!(f, "started:     {} ms since epoch", self.header.timestamp)?;
        let kinds: Vec<&str> = self.header.kinds().iter().map(|k| k.name()).collect();
        writeln!(f, "kinds:       {}", kinds.join(", "))?;
        writeln!(f, "events:      {}", self.total_events())?;
        for (kind, count) in &self.counts {
            writeln!(f, "  {:<24}{}", kind.name(), count)?;
        }
        writeln!(f, "sessions:    {}", self.sessions.len())?;
        writeln!(f, "timeouts:    {}", self.timeouts)?;
        if let Some(mean) = self.mean_latency_micros {
            writeln!(f, "latency:     {:.1} us mean", mean)?;
        }
        if let Some(rate) = self.mean_throughput {
            writeln!(f, "throughput:  {:.1} ops/s", rate)?;
        }
        Ok(())
    }
}
