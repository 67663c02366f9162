//! Error types for the trace recorder service

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Unknown event kind: {0}")]
    Kind(#[from] types::EncodingError),

    #[error("Pipeline error: {0}")]
    Actor(#[from] actors::ActorError),

    #[error("Trace file error: {0}")]
    TraceFile(#[from] codec::TraceFileError),

    #[error("Timestamp ticker needs a tokio runtime")]
    NoRuntime,
}

impl RecorderError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RecorderError>;
