//! Service wiring from configuration.

use std::sync::Arc;

use meter_contract::TransitionBuilder;
use meter_overlay::{DiscoveryClient, HttpBroadcaster, HttpLookupResolver};
use meter_wallet::{KeyManager, LocalWallet, WalletError};
use tracing::info;

use crate::config::AppConfig;
use crate::error::{MeterError, MeterResult};
use crate::service::MeterService;

/// Build a service talking to the configured overlay with the reference
/// local wallet.
///
/// # Errors
/// - `Wallet` if the identity key cannot be loaded or does not match
///   `wallet.expected_identity`
/// - `Lookup` if an HTTP client cannot be constructed
pub fn build_service(config: &AppConfig) -> MeterResult<MeterService> {
    let keys = KeyManager::load(config.wallet.key_source(), config.wallet.expected_identity)
        .map_err(WalletError::from)?;
    let wallet = Arc::new(LocalWallet::new(keys));

    let timeout = config.network.request_timeout();
    let broadcaster = Arc::new(HttpBroadcaster::new(
        &config.network.broadcast_url,
        &config.protocol.topic,
        timeout,
    )?);
    let resolver = Arc::new(HttpLookupResolver::new(&config.network.lookup_url, timeout)?);

    info!(
        lookup_url = %config.network.lookup_url,
        broadcast_url = %config.network.broadcast_url,
        topic = %config.protocol.topic,
        floor = ?config.transitions.floor,
        "Service configured"
    );

    Ok(MeterService::new(
        wallet,
        broadcaster,
        DiscoveryClient::new(resolver, config.protocol.service.clone()),
        TransitionBuilder::new(config.transitions),
        config.protocol.clone(),
    ))
}
