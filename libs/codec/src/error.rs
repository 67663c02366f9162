//! Errors for trace file framing and the protocol-tap codecs
//!
//! Reading errors abort a replay and surface to the caller; the live pipeline
//! never propagates them to producers.

use thiserror::Error;

/// Trace file read / write failures
#[derive(Debug, Error)]
pub enum TraceFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Structural token did not match the `[ header, [ event, ... ] ]` framing
    #[error("Malformed trace file: expected {expected}, found {found} (after {events_read} events)")]
    Malformed {
        expected: &'static str,
        found: String,
        events_read: u64,
    },

    /// Write attempted after the closing brackets were emitted
    #[error("Trace file already closed")]
    Closed,

    /// An earlier write failed part-way; the stream may end inside a record
    #[error("Trace file poisoned by an earlier write failure")]
    Poisoned,
}

impl TraceFileError {
    pub(crate) fn malformed(expected: &'static str, found: Option<u8>, events_read: u64) -> Self {
        let found = match found {
            Some(byte) if byte.is_ascii_graphic() => format!("'{}'", byte as char),
            Some(byte) => format!("byte {:#04x}", byte),
            None => "end of stream".to_string(),
        };
        TraceFileError::Malformed {
            expected,
            found,
            events_read,
        }
    }

    /// True for framing / decoding problems as opposed to IO failures
    pub fn is_malformed(&self) -> bool {
        matches!(self, TraceFileError::Malformed { .. } | TraceFileError::Json(_))
    }
}

pub type Result<T> = std::result::Result<T, TraceFileError>;

/// Wire codec failures
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame too large: {size} bytes exceeds limit {limit}")]
    FrameTooLarge { size: usize, limit: usize },
}

pub type CodecResult<T> = std::result::Result<T, CodecError>;
