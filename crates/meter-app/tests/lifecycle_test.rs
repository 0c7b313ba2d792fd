//! Meter lifecycle integration tests.
//!
//! Runs the service against the in-memory overlay:
//! - Create / Increment / Decrement scenario
//! - Concurrent transitions on one snapshot
//! - Discovery with corrupted candidates
//! - Wallet and floor failures

mod integration;
use integration::common::fixtures::{
    local_wallet, memory_service, service, NoTransactionWallet, YieldingWallet, KEY_A, KEY_B,
};

use meter_app::MeterError;
use meter_contract::{verify, TransitionRules};
use meter_core::{codec, Envelope, Transaction, TxOutput};
use meter_overlay::{DiscoveryFailure, MemoryLedger};
use std::sync::Arc;

#[tokio::test]
async fn test_create_increment_decrement_scenario() {
    let ledger = Arc::new(MemoryLedger::new());
    let service = memory_service(&ledger, Arc::new(local_wallet(KEY_A)));

    let created = service.create().await.unwrap();
    assert_eq!(created.value(), 1);
    assert!(verify(&created.state));
    assert!(ledger.is_unspent(&created.outpoint()));

    let incremented = service.increment(&created.outpoint()).await.unwrap();
    assert_eq!(incremented.value(), 2);
    assert_ne!(incremented.token.txid, created.token.txid);
    assert!(service.get(&created.outpoint()).is_none());
    assert!(!ledger.is_unspent(&created.outpoint()));
    assert_eq!(incremented.state.owner, created.state.owner);
    assert_eq!(incremented.token.units, created.token.units);

    let decremented = service.decrement(&incremented.outpoint()).await.unwrap();
    assert_eq!(decremented.value(), 1);
    assert!(verify(&decremented.state));

    let meters = service.meters();
    assert_eq!(meters.len(), 1);
    assert_eq!(meters[0].outpoint(), decremented.outpoint());
    assert_eq!(ledger.unspent_count(), 1);
}

#[tokio::test]
async fn test_concurrent_increments_one_wins() {
    let ledger = Arc::new(MemoryLedger::new());
    let service = memory_service(&ledger, Arc::new(YieldingWallet(local_wallet(KEY_A))));
    let meter = service.create().await.unwrap();
    let outpoint = meter.outpoint();

    let (first, second) = tokio::join!(service.increment(&outpoint), service.increment(&outpoint));

    let results = [first, second];
    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].value(), 2);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(MeterError::Broadcast(reason)) if reason.contains("double spend"))));

    // The ledger holds exactly one live successor.
    service.refresh().await.unwrap();
    let meters = service.meters();
    assert_eq!(meters.len(), 1);
    assert_eq!(meters[0].value(), 2);
}

#[tokio::test]
async fn test_refresh_discovers_every_owner() {
    let ledger = Arc::new(MemoryLedger::new());
    let alice = memory_service(&ledger, Arc::new(local_wallet(KEY_A)));
    let bob = memory_service(&ledger, Arc::new(local_wallet(KEY_B)));

    alice.create().await.unwrap();
    alice.create().await.unwrap();
    let bobs = bob.create().await.unwrap();

    let fresh = memory_service(&ledger, Arc::new(local_wallet(KEY_A)));
    let report = fresh.refresh().await.unwrap();
    assert_eq!(report.meters, 3);
    assert!(report.diagnostics.is_empty());
    assert!(fresh.get(&bobs.outpoint()).is_some());
}

#[tokio::test]
async fn test_refresh_skips_corrupted_candidate() {
    let ledger = Arc::new(MemoryLedger::new());
    let service = memory_service(&ledger, Arc::new(local_wallet(KEY_A)));
    let meter = service.create().await.unwrap();
    service.create().await.unwrap();

    let mut corrupt = meter.token.script.clone();
    corrupt[codec::SCRIPT_LEN - 1] ^= 0xff;
    let tx = Transaction::new(vec![], vec![TxOutput::new(1, corrupt)]);
    ledger.push_raw_output(Envelope::single(tx).to_bytes(), 0);

    let report = service.refresh().await.unwrap();
    assert_eq!(report.meters, 2);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].position, 2);
    assert!(matches!(
        report.diagnostics[0].failure,
        DiscoveryFailure::MalformedScript(_)
    ));
}

#[tokio::test]
async fn test_discovered_meter_can_transition() {
    let ledger = Arc::new(MemoryLedger::new());
    let creator = memory_service(&ledger, Arc::new(local_wallet(KEY_A)));
    let meter = creator.create().await.unwrap();

    // Any wallet may move a meter; ownership is not re-checked on spend.
    let other = memory_service(&ledger, Arc::new(local_wallet(KEY_B)));
    other.refresh().await.unwrap();
    let next = other.increment(&meter.outpoint()).await.unwrap();
    assert_eq!(next.value(), 2);
    assert_eq!(next.state.owner, meter.state.owner);
}

#[tokio::test]
async fn test_wallet_without_transaction() {
    let ledger = Arc::new(MemoryLedger::new());
    let service = memory_service(&ledger, Arc::new(NoTransactionWallet(local_wallet(KEY_A))));
    assert!(matches!(
        service.create().await,
        Err(MeterError::TransactionUndefined)
    ));
    assert!(service.meters().is_empty());
    assert_eq!(ledger.unspent_count(), 0);
}

#[tokio::test]
async fn test_floor_blocks_decrement() {
    let ledger = Arc::new(MemoryLedger::new());
    let service = service(
        Arc::new(local_wallet(KEY_A)),
        ledger.clone(),
        ledger.clone(),
        TransitionRules { floor: Some(0) },
    );
    let meter = service.create().await.unwrap();
    let zero = service.decrement(&meter.outpoint()).await.unwrap();
    assert_eq!(zero.value(), 0);

    let result = service.decrement(&zero.outpoint()).await;
    assert!(matches!(
        result,
        Err(MeterError::BelowFloor { value: -1, floor: 0 })
    ));
    assert!(!service.is_stale(&zero.outpoint()));
    assert!(ledger.is_unspent(&zero.outpoint()));
}

#[tokio::test]
async fn test_negative_values_allowed_without_floor() {
    let ledger = Arc::new(MemoryLedger::new());
    let service = memory_service(&ledger, Arc::new(local_wallet(KEY_A)));
    let mut meter = service.create().await.unwrap();
    for _ in 0..3 {
        meter = service.decrement(&meter.outpoint()).await.unwrap();
    }
    assert_eq!(meter.value(), -2);
}
