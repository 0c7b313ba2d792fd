//! Wallet error types.

use crate::local::KeyError;
use meter_core::{CoreError, Outpoint};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Input {0} is not proven by the supplied envelope")]
    UnknownInput(Outpoint),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

pub type WalletResult<T> = Result<T, WalletError>;
