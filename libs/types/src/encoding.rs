//! Canonical Array Encoding
//!
//! Every event is written as a fixed-shape array whose first element is the
//! kind ordinal:
//!
//! ```text
//! Timestamp              [0, epochMillis]
//! ProtocolRequest        [1, sessionId, request]
//! ProtocolResponse       [2, sessionId, response]
//! Operation              [3, sessionId, request|null, requestNanos, response|null, responseNanos]
//! LatencyMeasurement     [4, micros]
//! ThroughputMeasurement  [5, count, millis]
//! ```
//!
//! The same encoding is used on the way into the writer and on disk. Decoding
//! dispatches on the ordinal through a static match; an unknown ordinal, a
//! short array or trailing elements are decode errors.

use crate::event::{EventKind, TraceEvent};
use serde::de::{self, Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeTuple, Serializer};
use std::fmt;

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.ordinal())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ordinal = u8::deserialize(deserializer)?;
        EventKind::from_ordinal(ordinal).map_err(de::Error::custom)
    }
}

impl Serialize for TraceEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let ordinal = self.kind().ordinal();
        match self {
            TraceEvent::Timestamp { epoch_millis } => {
                let mut tuple = serializer.serialize_tuple(2)?;
                tuple.serialize_element(&ordinal)?;
                tuple.serialize_element(epoch_millis)?;
                tuple.end()
            }
            TraceEvent::ProtocolRequest {
                session_id,
                request,
            } => {
                let mut tuple = serializer.serialize_tuple(3)?;
                tuple.serialize_element(&ordinal)?;
                tuple.serialize_element(session_id)?;
                tuple.serialize_element(request)?;
                tuple.end()
            }
            TraceEvent::ProtocolResponse {
                session_id,
                response,
            } => {
                let mut tuple = serializer.serialize_tuple(3)?;
                tuple.serialize_element(&ordinal)?;
                tuple.serialize_element(session_id)?;
                tuple.serialize_element(response)?;
                tuple.end()
            }
            TraceEvent::Operation {
                session_id,
                request,
                request_nanos,
                response,
                response_nanos,
            } => {
                let mut tuple = serializer.serialize_tuple(6)?;
                tuple.serialize_element(&ordinal)?;
                tuple.serialize_element(session_id)?;
                tuple.serialize_element(request)?;
                tuple.serialize_element(request_nanos)?;
                tuple.serialize_element(response)?;
                tuple.serialize_element(response_nanos)?;
                tuple.end()
            }
            TraceEvent::LatencyMeasurement { micros } => {
                let mut tuple = serializer.serialize_tuple(2)?;
                tuple.serialize_element(&ordinal)?;
                tuple.serialize_element(micros)?;
                tuple.end()
            }
            TraceEvent::ThroughputMeasurement { count, millis } => {
                let mut tuple = serializer.serialize_tuple(3)?;
                tuple.serialize_element(&ordinal)?;
                tuple.serialize_element(count)?;
                tuple.serialize_element(millis)?;
                tuple.end()
            }
        }
    }
}

struct TraceEventVisitor;

/// Reads element `index` or fails with the arity the kind expects
fn element<'de, A, T>(seq: &mut A, index: usize, arity: usize) -> Result<T, A::Error>
where
    A: SeqAccess<'de>,
    T: Deserialize<'de>,
{
    seq.next_element()?
        .ok_or_else(|| de::Error::invalid_length(index, &ArityExpectation(arity)))
}

struct ArityExpectation(usize);

impl de::Expected for ArityExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "an event array of {} elements", self.0)
    }
}

impl<'de> Visitor<'de> for TraceEventVisitor {
    type Value = TraceEvent;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a trace event array [kindOrdinal, field...]")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<TraceEvent, A::Error> {
        let ordinal: u8 = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let kind = EventKind::from_ordinal(ordinal).map_err(de::Error::custom)?;

        let (event, arity) = match kind {
            EventKind::Timestamp => (
                TraceEvent::Timestamp {
                    epoch_millis: element(&mut seq, 1, 2)?,
                },
                2,
            ),
            EventKind::ProtocolRequest => (
                TraceEvent::ProtocolRequest {
                    session_id: element(&mut seq, 1, 3)?,
                    request: element(&mut seq, 2, 3)?,
                },
                3,
            ),
            EventKind::ProtocolResponse => (
                TraceEvent::ProtocolResponse {
                    session_id: element(&mut seq, 1, 3)?,
                    response: element(&mut seq, 2, 3)?,
                },
                3,
            ),
            EventKind::Operation => (
                TraceEvent::Operation {
                    session_id: element(&mut seq, 1, 6)?,
                    request: element(&mut seq, 2, 6)?,
                    request_nanos: element(&mut seq, 3, 6)?,
                    response: element(&mut seq, 4, 6)?,
                    response_nanos: element(&mut seq, 5, 6)?,
                },
                6,
            ),
            EventKind::LatencyMeasurement => (
                TraceEvent::LatencyMeasurement {
                    micros: element(&mut seq, 1, 2)?,
                },
                2,
            ),
            EventKind::ThroughputMeasurement => (
                TraceEvent::ThroughputMeasurement {
                    count: element(&mut seq, 1, 3)?,
                    millis: element(&mut seq, 2, 3)?,
                },
                3,
            ),
        };

        if seq.next_element::<de::IgnoredAny>()?.is_some() {
            return Err(de::Error::invalid_length(
                arity + 1,
                &ArityExpectation(arity),
            ));
        }
        Ok(event)
    }
}

impl<'de> Deserialize<'de> for TraceEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(TraceEventVisitor)
    }
}
