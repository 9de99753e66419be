//! Error types for ChunkKV
//!
//! Provides a unified error type for all operations.
//!
//! A missing key is never an error: reads report absence as `Ok(None)`.

use thiserror::Error;

/// Result type alias using ChunkError
pub type Result<T> = std::result::Result<T, ChunkError>;

/// Unified error type for ChunkKV operations
#[derive(Debug, Error)]
pub enum ChunkError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking I/O handed to the runtime's blocking pool panicked or was cancelled
    #[error("Blocking task failed: {0}")]
    BlockingTask(#[from] tokio::task::JoinError),

    // -------------------------------------------------------------------------
    // Record Log Errors
    // -------------------------------------------------------------------------
    #[error("Log corruption detected: {0}")]
    LogCorruption(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Block Store Errors
    // -------------------------------------------------------------------------
    #[error("Value of {len} bytes exceeds block store cap of {cap} bytes")]
    ValueTooLarge { len: usize, cap: usize },

    // -------------------------------------------------------------------------
    // Consistency Errors (fatal)
    // -------------------------------------------------------------------------
    #[error("Size record for key {key:?} is corrupt: {raw:?}")]
    CorruptSizeRecord { key: String, raw: String },

    #[error("Block {index} of {expected} missing for key {key:?}")]
    MissingBlock { key: String, index: u64, expected: u64 },

    #[error("Value for key {key:?} is corrupt: {reason}")]
    CorruptValue { key: String, reason: String },

    #[error("Write verification failed for key {key:?}: {reason}")]
    WriteVerification { key: String, reason: String },

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ChunkError {
    /// True for errors meaning the stored size record and blocks disagree.
    ///
    /// These are not recoverable by retrying: the data under the key was
    /// written by something that broke the block layout.
    pub fn is_consistency_failure(&self) -> bool {
        matches!(
            self,
            ChunkError::CorruptSizeRecord { .. }
                | ChunkError::MissingBlock { .. }
                | ChunkError::CorruptValue { .. }
                | ChunkError::WriteVerification { .. }
        )
    }
}

impl From<bincode::Error> for ChunkError {
    fn from(e: bincode::Error) -> Self {
        ChunkError::Serialization(e.to_string())
    }
}
