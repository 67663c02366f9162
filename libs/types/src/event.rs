//! Trace Events
//!
//! One immutable observation or derived measurement recorded during a capture.
//! Events are created where they are observed (codec tap, measuring stage),
//! flow through the actor chain unchanged and are dropped once written.

use crate::error::{EncodingError, Result};
use crate::protocol::{Request, Response};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;
use std::str::FromStr;

/// Marks a request that never got a reply (`response_nanos`, latency micros)
pub const TIMEOUT_SENTINEL: i64 = -1;

/// Event kind with its stable on-disk ordinal
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, TryFromPrimitive, IntoPrimitive,
)]
#[repr(u8)]
pub enum EventKind {
    Timestamp = 0,
    ProtocolRequest = 1,
    ProtocolResponse = 2,
    Operation = 3,
    LatencyMeasurement = 4,
    ThroughputMeasurement = 5,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        Self::Timestamp,
        Self::ProtocolRequest,
        Self::ProtocolResponse,
        Self::Operation,
        Self::LatencyMeasurement,
        Self::ThroughputMeasurement,
    ];

    #[inline]
    pub fn ordinal(self) -> u8 {
        self.into()
    }

    pub fn from_ordinal(ordinal: u8) -> Result<Self> {
        Self::try_from(ordinal).map_err(|_| EncodingError::UnknownOrdinal { ordinal })
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::ProtocolRequest => "protocol_request",
            Self::ProtocolResponse => "protocol_response",
            Self::Operation => "operation",
            Self::LatencyMeasurement => "latency_measurement",
            Self::ThroughputMeasurement => "throughput_measurement",
        }
    }

    /// Kinds produced by a measuring stage rather than observed on the wire
    pub const fn is_derived(self) -> bool {
        matches!(self, Self::LatencyMeasurement | Self::ThroughputMeasurement)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| EncodingError::UnknownName {
                name: s.to_string(),
            })
    }
}

/// A single trace observation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TraceEvent {
    /// Periodic / boundary wall-clock marker
    Timestamp { epoch_millis: i64 },
    ProtocolRequest { session_id: i64, request: Request },
    ProtocolResponse { session_id: i64, response: Response },
    /// Correlated request/reply pair; `response: None` with
    /// `response_nanos == TIMEOUT_SENTINEL` for an abandoned request.
    /// `request` is `None` only in captures whose producer did not record it.
    Operation {
        session_id: i64,
        request: Option<Request>,
        request_nanos: i64,
        response: Option<Response>,
        response_nanos: i64,
    },
    LatencyMeasurement { micros: i64 },
    /// Completed operations observed during one window of `millis`
    ThroughputMeasurement { count: u64, millis: u64 },
}

impl TraceEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Timestamp { .. } => EventKind::Timestamp,
            Self::ProtocolRequest { .. } => EventKind::ProtocolRequest,
            Self::ProtocolResponse { .. } => EventKind::ProtocolResponse,
            Self::Operation { .. } => EventKind::Operation,
            Self::LatencyMeasurement { .. } => EventKind::LatencyMeasurement,
            Self::ThroughputMeasurement { .. } => EventKind::ThroughputMeasurement,
        }
    }

    pub fn timestamp(epoch_millis: i64) -> Self {
        Self::Timestamp { epoch_millis }
    }

    pub fn operation(
        session_id: i64,
        request: Request,
        request_nanos: i64,
        response: Response,
        response_nanos: i64,
    ) -> Self {
        Self::Operation {
            session_id,
            request: Some(request),
            request_nanos,
            response: Some(response),
            response_nanos,
        }
    }

    pub fn timeout(session_id: i64, request: Request, request_nanos: i64) -> Self {
        Self::Operation {
            session_id,
            request: Some(request),
            request_nanos,
            response: None,
            response_nanos: TIMEOUT_SENTINEL,
        }
    }

    pub fn latency(micros: i64) -> Self {
        Self::LatencyMeasurement { micros }
    }

    pub fn throughput(count: u64, millis: u64) -> Self {
        Self::ThroughputMeasurement { count, millis }
    }

    /// True for an `Operation` whose connection went away before the reply
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Operation {
                response: None,
                ..
            }
        )
    }

    /// Round-trip time of a completed operation, clamped at zero
    pub fn latency_nanos(&self) -> Option<i64> {
        match self {
            Self::Operation {
                request_nanos,
                response: Some(_),
                response_nanos,
                ..
            } => Some((response_nanos - request_nanos).max(0)),
            _ => None,
        }
    }

    pub fn session_id(&self) -> Option<i64> {
        match self {
            Self::ProtocolRequest { session_id, .. }
            | Self::ProtocolResponse { session_id, .. }
            | Self::Operation { session_id, .. } => Some(*session_id),
            _ => None,
        }
    }
}
