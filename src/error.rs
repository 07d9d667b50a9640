//! Error types for VellumDB
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using VellumError
pub type Result<T> = std::result::Result<T, VellumError>;

/// Unified error type for VellumDB operations
#[derive(Debug, Error)]
pub enum VellumError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Journal Errors
    // -------------------------------------------------------------------------
    #[error("Journal corruption detected: {0}")]
    JournalCorruption(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Record not found at address {address}")]
    RecordNotFound { address: u64 },

    #[error("B-tree node not found at address {address}")]
    NodeNotFound { address: u64 },

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    #[error("Duplicate key {key} in unique index '{index}'")]
    DuplicateKey { index: String, key: String },

    #[error("Unknown index: {0}")]
    UnknownIndex(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for VellumError {
    fn from(err: bincode::Error) -> Self {
        VellumError::Serialization(err.to_string())
    }
}
