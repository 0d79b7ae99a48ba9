use crate::{DocumentId, RowIndex, TopicId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecError>;

#[derive(Debug, Error)]
pub enum RecError {
    #[error("document id {0} appears more than once")]
    DuplicateIdentifier(DocumentId),

    #[error("unknown document id {0}")]
    UnknownIdentifier(DocumentId),

    #[error("row index {index} out of range for {len} rows")]
    IndexOutOfRange { index: RowIndex, len: usize },

    #[error("k must be at least 1, got {0}")]
    InvalidK(usize),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("invalid weight {weight} for topic {topic} in row {row}")]
    InvalidWeight { row: RowIndex, topic: TopicId, weight: f32 },

    /// Only produced while reading a cached artifact; the cache recovers from
    /// it by recomputing.
    #[error("corrupt cache artifact: {0}")]
    CacheCorrupt(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RecError {
    fn from(e: serde_json::Error) -> Self {
        RecError::Serialization(e.to_string())
    }
}

impl From<bincode::Error> for RecError {
    fn from(e: bincode::Error) -> Self {
        RecError::Serialization(e.to_string())
    }
}
