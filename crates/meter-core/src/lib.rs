//! Core domain types for the meter protocol.
//!
//! A meter is a counter whose state lives in a single unspent ledger output.
//! This crate provides:
//! - `MeterState`, `Token`, `Meter`: the logical state and its backing output
//! - `codec`: the fixed script template carrying a `MeterState`
//! - `tx`: ledger transactions, txids and the atomic envelope
//! - `protocol`: the domain tag shared by signers and verifiers

pub mod codec;
pub mod error;
pub mod protocol;
pub mod tx;
pub mod types;

pub use codec::{decode, encode, is_meter_script, SCRIPT_LEN};
pub use error::{CoreError, Result};
pub use protocol::{
    signing_preimage, Counterparty, ProtocolId, SecurityLevel, OWNERSHIP_DATA, OWNERSHIP_KEY_ID,
    OWNERSHIP_PROTOCOL,
};
pub use tx::{sha256d, Envelope, Transaction, TxInput, TxOutput, SEQUENCE_FINAL};
pub use types::{
    Direction, IdentityKey, Meter, MeterState, Outpoint, OwnershipSignature, Token, Txid,
};
