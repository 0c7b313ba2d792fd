//! Wallet boundary for meters.
//!
//! The core treats the wallet as a trusted oracle for identity, signatures and
//! transaction assembly. [`Wallet`] is that boundary; [`LocalWallet`] is a
//! reference implementation holding one secp256k1 key in process.

pub mod action;
pub mod error;
pub mod local;
pub mod wallet;

pub use action::{
    ActionInput, ActionOptions, ActionOutput, CreateActionArgs, CreateActionResult, SignatureArgs,
};
pub use error::{WalletError, WalletResult};
pub use local::{KeyError, KeyManager, KeySource, LocalWallet};
pub use wallet::{BoxFuture, DynWallet, Wallet};
