//! Actor failures
//!
//! A failing handler terminates its own actor; these errors are logged on the
//! consumer thread and never returned to the producers that called `send`.

use codec::TraceFileError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActorError {
    #[error("Failed to spawn consumer for actor '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Trace file error: {0}")]
    TraceFile(#[from] TraceFileError),

    #[error("Handler failed: {0}")]
    Handler(String),
}

impl ActorError {
    pub fn handler(message: impl Into<String>) -> Self {
        ActorError::Handler(message.into())
    }

    /// Short category for structured log fields
    pub fn category(&self) -> &'static str {
        match self {
            ActorError::Spawn { .. } => "spawn",
            ActorError::TraceFile(e) if e.is_malformed() => "encoding",
            ActorError::TraceFile(_) => "io",
            ActorError::Handler(_) => "handler",
        }
    }
}

pub type Result<T> = std::result::Result<T, ActorError>;
