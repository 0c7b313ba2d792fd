//! Application error types.
//!
//! Every lower-layer error is folded into one taxonomy so callers can match on
//! what went wrong rather than where.

use meter_contract::ContractError;
use meter_core::{CoreError, Outpoint};
use meter_overlay::OverlayError;
use meter_wallet::WalletError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeterError {
    #[error("Malformed script: {0}")]
    MalformedScript(String),

    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    #[error("Wrong lookup result type: {0}")]
    WrongResultType(String),

    #[error("Lookup answer has no outputs")]
    MissingOutputs,

    #[error("Missing token data: {0}")]
    MissingTokenData(String),

    #[error("Script evaluation failed: {0}")]
    ScriptEvaluation(String),

    #[error("Broadcast failed: {0}")]
    Broadcast(String),

    #[error("Wallet returned no transaction")]
    TransactionUndefined,

    #[error("Wallet error: {0}")]
    Wallet(WalletError),

    #[error("Lookup error: {0}")]
    Lookup(String),

    #[error("Ledger data error: {0}")]
    Core(CoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Meter not found: {0}")]
    MeterNotFound(Outpoint),

    #[error("Value {value} would fall below floor {floor}")]
    BelowFloor { value: i64, floor: i64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MeterResult<T> = Result<T, MeterError>;

impl From<CoreError> for MeterError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::MalformedScript(reason) => Self::MalformedScript(reason),
            CoreError::InvalidSignature(reason) => Self::SignatureInvalid(reason),
            other => Self::Core(other),
        }
    }
}

impl From<ContractError> for MeterError {
    fn from(e: ContractError) -> Self {
        match e {
            ContractError::Core(core) => core.into(),
            ContractError::MissingTokenData(reason) => Self::MissingTokenData(reason),
            ContractError::ScriptEvaluation(reason) => Self::ScriptEvaluation(reason),
            ContractError::BelowFloor { value, floor } => Self::BelowFloor { value, floor },
            overflow @ ContractError::ValueOverflow(_) => {
                Self::ScriptEvaluation(overflow.to_string())
            }
        }
    }
}

impl From<OverlayError> for MeterError {
    fn from(e: OverlayError) -> Self {
        match e {
            OverlayError::WrongResultType(kind) => Self::WrongResultType(kind),
            OverlayError::MissingOutputs => Self::MissingOutputs,
            OverlayError::Core(core) => core.into(),
            other => Self::Lookup(other.to_string()),
        }
    }
}

impl From<WalletError> for MeterError {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::Core(core) => core.into(),
            other => Self::Wallet(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_errors_map_to_taxonomy() {
        let err: MeterError = ContractError::BelowFloor { value: -1, floor: 0 }.into();
        assert!(matches!(err, MeterError::BelowFloor { value: -1, floor: 0 }));

        let err: MeterError = ContractError::Core(CoreError::MalformedScript("x".into())).into();
        assert!(matches!(err, MeterError::MalformedScript(_)));
    }

    #[test]
    fn test_overlay_errors_map_to_taxonomy() {
        let err: MeterError = OverlayError::WrongResultType("freeform".into()).into();
        assert!(matches!(err, MeterError::WrongResultType(_)));

        let err: MeterError = OverlayError::MissingOutputs.into();
        assert!(matches!(err, MeterError::MissingOutputs));

        let err: MeterError = OverlayError::HttpClient("refused".into()).into();
        assert!(matches!(err, MeterError::Lookup(_)));
    }
}
