//! Replay extraction
//!
//! Turns a stream of trace events back into something a load driver or an
//! exporter can consume. All projections are lazy and pass read errors
//! through untouched so a malformed file still aborts the consumer.

use std::fmt;
use std::str::FromStr;
use types::{Request, TraceEvent, TIMEOUT_SENTINEL};

/// Which captured sessions contribute requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionSelector {
    #[default]
    All,
    Session(i64),
    /// Whichever session issues the first captured request
    First,
}

impl fmt::Display for SessionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Session(id) => write!(f, "{}", id),
            Self::First => f.write_str("first"),
        }
    }
}

impl FromStr for SessionSelector {
    type Err = std::num::ParseIntError;

    /// `all`, `first`, a decimal id or a `0x` hex id
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(Self::All),
            "first" => Ok(Self::First),
            other => match other.strip_prefix("0x") {
                Some(hex) => i64::from_str_radix(hex, 16).map(Self::Session),
                None => other.parse().map(Self::Session),
            },
        }
    }
}

/// Requests recorded as `ProtocolRequest` events, in capture order
pub struct Requests<I> {
    events: I,
    selector: SessionSelector,
    locked: Option<i64>,
}

impl<I> Requests<I> {
    /// Session `First` locked onto, once a request has been seen
    pub fn locked_session(&self) -> Option<i64> {
        self.locked
    }

    fn accepts(&mut self, session_id: i64) -> bool {
        match self.selector {
            SessionSelector::All => true,
            SessionSelector::Session(id) => id == session_id,
            SessionSelector::First => *self.locked.get_or_insert(session_id) == session_id,
        }
    }
}

impl<I, E> Iterator for Requests<I>
where
    I: Iterator<Item = Result<TraceEvent, E>>,
{
    type Item = Result<Request, E>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.events.next()? {
                Err(e) => return Some(Err(e)),
                Ok(TraceEvent::ProtocolRequest {
                    session_id,
                    request,
                }) => {
                    if self.accepts(session_id) {
                        return Some(Ok(request));
                    }
                }
                Ok(_) => {}
            }
        }
    }
}

pub fn requests<I, E>(events: I, selector: SessionSelector) -> Requests<I::IntoIter>
where
    I: IntoIterator<Item = Result<TraceEvent, E>>,
{
    Requests {
        events: events.into_iter(),
        selector,
        locked: None,
    }
}

/// Only the `Operation` events
pub fn operations<I, E>(events: I) -> impl Iterator<Item = Result<TraceEvent, E>>
where
    I: IntoIterator<Item = Result<TraceEvent, E>>,
{
    events.into_iter().filter(|event| match event {
        Ok(event) => matches!(event, TraceEvent::Operation { .. }),
        Err(_) => true,
    })
}

/// Recorded latency samples, timeout sentinels skipped
pub fn latencies_micros<I, E>(events: I) -> impl Iterator<Item = Result<i64, E>>
where
    I: IntoIterator<Item = Result<TraceEvent, E>>,
{
    events.into_iter().filter_map(|event| match event {
        Ok(TraceEvent::LatencyMeasurement { micros }) if micros != TIMEOUT_SENTINEL => {
            Some(Ok(micros))
        }
        Ok(_) => None,
        Err(e) => Some(Err(e)),
    })
}

/// `(count, millis)` per recorded throughput window
pub fn throughput_series<I, E>(events: I) -> impl Iterator<Item = Result<(u64, u64), E>>
where
    I: IntoIterator<Item = Result<TraceEvent, E>>,
{
    events.into_iter().filter_map(|event| match event {
        Ok(TraceEvent::ThroughputMeasurement { count, millis }) => Some(Ok((count, millis))),
        Ok(_) => None,
        Err(e) => Some(Err(e)),
    })
}
