//! Error types for SensorLedger
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using LedgerError
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Unified error type for SensorLedger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    // -------------------------------------------------------------------------
    // Reading Errors
    // -------------------------------------------------------------------------
    #[error("Reading already exists: {key}")]
    AlreadyExists { key: String },

    #[error("Reading not found: {key}")]
    NotFound { key: String },

    #[error("Corrupt record at {key}: {source}")]
    CorruptRecord {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    // -------------------------------------------------------------------------
    // World State Errors
    // -------------------------------------------------------------------------
    #[error("World state unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Transaction conflict: {0}")]
    Conflict(String),

    #[error("Malformed composite key: {0}")]
    KeyDecode(String),

    // -------------------------------------------------------------------------
    // Journal Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Journal corruption detected: {0}")]
    JournalCorruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Invocation / Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    /// True for the two "expected" outcomes a caller can recover from by
    /// choosing a different key.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LedgerError::AlreadyExists { .. } | LedgerError::NotFound { .. }
        )
    }
}
