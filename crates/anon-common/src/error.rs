//! Error types for the anonymizer

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for anonymizer operations
pub type Result<T> = std::result::Result<T, AnonError>;

/// Main error type for the anonymizer
///
/// Every variant except [`AnonError::Chunk`] is fatal for a run. Chunk errors
/// are caught by the dispatcher and reported per chunk index.
#[derive(Error, Debug)]
pub enum AnonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Checkpoint file '{path}' is unreadable: {reason}. Inspect or delete it to start over.")]
    CheckpointCorrupt { path: PathBuf, reason: String },

    #[error("Chunk {index} failed: {reason}")]
    Chunk { index: u64, reason: String },

    #[error("Consolidation error: {0}")]
    Consolidation(String),
}

impl AnonError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an input error
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Create a per-chunk error
    pub fn chunk(index: u64, reason: impl Into<String>) -> Self {
        Self::Chunk {
            index,
            reason: reason.into(),
        }
    }

    /// Create a consolidation error
    pub fn consolidation(msg: impl Into<String>) -> Self {
        Self::Consolidation(msg.into())
    }
}
