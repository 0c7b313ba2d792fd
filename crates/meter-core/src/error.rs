//! Error types for meter-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Malformed script: {0}")]
    MalformedScript(String),

    #[error("Malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Invalid identity key: {0}")]
    InvalidKey(String),

    #[error("Invalid signature encoding: {0}")]
    InvalidSignature(String),

    #[error("Invalid outpoint: {0}")]
    InvalidOutpoint(String),

    #[error("Hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
