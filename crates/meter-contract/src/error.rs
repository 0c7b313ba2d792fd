//! Contract error types.

use meter_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Missing token data: {0}")]
    MissingTokenData(String),

    #[error("Script evaluation failed: {0}")]
    ScriptEvaluation(String),

    #[error("Value {value} would fall below floor {floor}")]
    BelowFloor { value: i64, floor: i64 },

    #[error("Value overflow applying delta to {0}")]
    ValueOverflow(i64),
}

pub type ContractResult<T> = Result<T, ContractError>;
