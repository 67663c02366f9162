//! Errors raised while interpreting trace event tags

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// Event tag outside the fixed kind table
    #[error("Unknown event kind ordinal {ordinal}: valid ordinals are 0-5")]
    UnknownOrdinal { ordinal: u8 },

    /// Event kind name that does not match any kind (config / CLI input)
    #[error("Unknown event kind name '{name}'")]
    UnknownName { name: String },
}

pub type Result<T> = std::result::Result<T, EncodingError>;
