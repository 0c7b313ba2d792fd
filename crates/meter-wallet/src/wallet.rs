//! Wallet trait.
//!
//! Trait-based abstraction over identity, signing and action assembly so the
//! service can be driven by a local key, a remote wallet or a test double.

use std::pin::Pin;
use std::sync::Arc;

use meter_core::IdentityKey;

use crate::action::{CreateActionArgs, CreateActionResult, SignatureArgs};
use crate::error::WalletResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Wallet collaborator.
pub trait Wallet: Send + Sync {
    /// Identity public key of the wallet owner.
    fn identity_key(&self) -> BoxFuture<'_, WalletResult<IdentityKey>>;

    /// Sign `args.data` under the given protocol, key id and counterparty.
    ///
    /// Returns a compact 64-byte signature.
    fn create_signature(&self, args: SignatureArgs) -> BoxFuture<'_, WalletResult<Vec<u8>>>;

    /// Assemble and sign a transaction with the given inputs and outputs.
    ///
    /// `CreateActionResult::tx` is the atomic envelope of the new transaction,
    /// or `None` if the wallet produced nothing to broadcast.
    fn create_action(
        &self,
        args: CreateActionArgs,
    ) -> BoxFuture<'_, WalletResult<CreateActionResult>>;
}

/// Arc wrapper for Wallet trait objects.
pub type DynWallet = Arc<dyn Wallet>;
