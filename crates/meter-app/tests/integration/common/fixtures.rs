//! Wallets and service builders used across integration tests.

use std::sync::Arc;

use meter_app::config::ProtocolConfig;
use meter_app::MeterService;
use meter_contract::{TransitionBuilder, TransitionRules};
use meter_core::IdentityKey;
use meter_overlay::{DiscoveryClient, DynBroadcaster, DynLookupResolver, MemoryLedger};
use meter_wallet::{
    BoxFuture, CreateActionArgs, CreateActionResult, DynWallet, LocalWallet, SignatureArgs,
    Wallet, WalletResult,
};

// Well-known development keys (DO NOT use in production)
pub const KEY_A: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const KEY_B: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

pub fn local_wallet(key: &str) -> LocalWallet {
    LocalWallet::from_bytes(&hex::decode(key).unwrap()).unwrap()
}

/// Wallet that yields to the runtime before every call, like a remote wallet.
pub struct YieldingWallet(pub LocalWallet);

impl Wallet for YieldingWallet {
    fn identity_key(&self) -> BoxFuture<'_, WalletResult<IdentityKey>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.0.identity_key().await
        })
    }

    fn create_signature(&self, args: SignatureArgs) -> BoxFuture<'_, WalletResult<Vec<u8>>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.0.create_signature(args).await
        })
    }

    fn create_action(
        &self,
        args: CreateActionArgs,
    ) -> BoxFuture<'_, WalletResult<CreateActionResult>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.0.create_action(args).await
        })
    }
}

/// Wallet that signs but never produces a transaction.
pub struct NoTransactionWallet(pub LocalWallet);

impl Wallet for NoTransactionWallet {
    fn identity_key(&self) -> BoxFuture<'_, WalletResult<IdentityKey>> {
        self.0.identity_key()
    }

    fn create_signature(&self, args: SignatureArgs) -> BoxFuture<'_, WalletResult<Vec<u8>>> {
        self.0.create_signature(args)
    }

    fn create_action(
        &self,
        _args: CreateActionArgs,
    ) -> BoxFuture<'_, WalletResult<CreateActionResult>> {
        Box::pin(async move { Ok(CreateActionResult::default()) })
    }
}

pub fn service(
    wallet: DynWallet,
    broadcaster: DynBroadcaster,
    resolver: DynLookupResolver,
    rules: TransitionRules,
) -> MeterService {
    MeterService::new(
        wallet,
        broadcaster,
        DiscoveryClient::new(resolver, "ls_meter"),
        TransitionBuilder::new(rules),
        ProtocolConfig::default(),
    )
}

/// Service over a shared in-memory ledger.
pub fn memory_service(ledger: &Arc<MemoryLedger>, wallet: DynWallet) -> MeterService {
    service(
        wallet,
        ledger.clone(),
        ledger.clone(),
        TransitionRules::default(),
    )
}
