//! Overlay error types.

use meter_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Wrong lookup result type: {0}")]
    WrongResultType(String),

    #[error("Lookup answer has no outputs")]
    MissingOutputs,

    #[error("Lookup failed: {0}")]
    LookupFailed(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

pub type OverlayResult<T> = Result<T, OverlayError>;
