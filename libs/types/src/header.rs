//! Trace file header, written once at the start of every capture

use crate::clock::epoch_millis;
use crate::event::EventKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Capture metadata and the set of event kinds recorded in the body.
///
/// Readers consult `types` to decide which derived series are meaningful: a
/// kind absent here never appears in the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceHeader {
    /// Capture start, milliseconds since the UNIX epoch
    pub timestamp: i64,
    pub description: String,
    #[serde(rename = "types")]
    kinds: BTreeSet<EventKind>,
}

impl TraceHeader {
    pub fn new(description: impl Into<String>, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Self {
            timestamp: epoch_millis(),
            description: description.into(),
            kinds: kinds.into_iter().collect(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn kinds(&self) -> &BTreeSet<EventKind> {
        &self.kinds
    }

    pub fn is_enabled(&self, kind: EventKind) -> bool {
        self.kinds.contains(&kind)
    }
}
