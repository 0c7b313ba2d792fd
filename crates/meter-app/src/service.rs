//! Meter service.
//!
//! Orchestrates Create / Increment / Decrement / Refresh over injected
//! collaborators:
//!
//! ```text
//! Create:     wallet identity + signature -> encode -> wallet action -> broadcast -> repository.insert
//! Transition: repository snapshot -> TransitionBuilder -> wallet action -> broadcast -> repository.replace
//! Refresh:    DiscoveryClient pass -> repository.reconcile
//! ```
//!
//! There is no per-meter lock. Two transitions started from the same snapshot
//! both reach the overlay, which rejects the second spend; the loser surfaces
//! as `MeterError::Broadcast`.

use meter_contract::{verify, TransitionBuilder};
use meter_core::{
    codec, Direction, Envelope, Meter, MeterState, Outpoint, OwnershipSignature, Token,
};
use meter_overlay::{Diagnostic, DiscoveryClient, DynBroadcaster};
use meter_telemetry::Metrics;
use meter_wallet::{
    ActionInput, ActionOptions, ActionOutput, CreateActionArgs, DynWallet, SignatureArgs,
};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::ProtocolConfig;
use crate::error::{MeterError, MeterResult};
use crate::repository::MeterRepository;

/// Result of a refresh.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    /// Meters now held by the repository.
    pub meters: usize,
    /// Candidates skipped during discovery.
    pub diagnostics: Vec<Diagnostic>,
}

pub struct MeterService {
    wallet: DynWallet,
    broadcaster: DynBroadcaster,
    discovery: DiscoveryClient,
    builder: TransitionBuilder,
    protocol: ProtocolConfig,
    repository: RwLock<MeterRepository>,
}

impl MeterService {
    pub fn new(
        wallet: DynWallet,
        broadcaster: DynBroadcaster,
        discovery: DiscoveryClient,
        builder: TransitionBuilder,
        protocol: ProtocolConfig,
    ) -> Self {
        Self {
            wallet,
            broadcaster,
            discovery,
            builder,
            protocol,
            repository: RwLock::new(MeterRepository::new()),
        }
    }

    /// Snapshot of the repository in display order.
    pub fn meters(&self) -> Vec<Meter> {
        self.repository.read().iter().cloned().collect()
    }

    pub fn get(&self, outpoint: &Outpoint) -> Option<Meter> {
        self.repository.read().get(outpoint).cloned()
    }

    /// Whether a failed transition left this meter out of sync with the ledger.
    pub fn is_stale(&self, outpoint: &Outpoint) -> bool {
        self.repository.read().is_stale(outpoint)
    }

    /// Create a new meter with value 1 owned by the wallet identity.
    ///
    /// # Errors
    /// - `SignatureInvalid` if the wallet's ownership signature does not verify
    /// - `TransactionUndefined` if the wallet produced no transaction
    /// - `Broadcast` if the overlay rejected the transaction
    pub async fn create(&self) -> MeterResult<Meter> {
        let owner = self.wallet.identity_key().await?;
        let signature = self
            .wallet
            .create_signature(SignatureArgs::ownership())
            .await?;
        let signature = OwnershipSignature::try_from(signature.as_slice())?;

        let state = MeterState::new(1, owner, signature);
        if !verify(&state) {
            return Err(MeterError::SignatureInvalid(format!(
                "wallet signature does not verify for {owner}"
            )));
        }
        let script = codec::encode(&state);

        let args = CreateActionArgs {
            description: "Create a meter".to_string(),
            inputs: vec![],
            input_envelope: None,
            outputs: vec![ActionOutput {
                script: script.clone(),
                units: self.protocol.units,
                basket: Some(self.protocol.basket.clone()),
                description: "Meter output".to_string(),
            }],
            options: ActionOptions {
                randomize_outputs: false,
                accept_delayed_broadcast: false,
            },
        };
        let envelope_bytes = self
            .wallet
            .create_action(args)
            .await?
            .tx
            .ok_or(MeterError::TransactionUndefined)?;

        let envelope = Envelope::from_bytes(&envelope_bytes)?;
        let subject = envelope.subject();
        let output_index = subject
            .outputs
            .iter()
            .position(|output| output.script == script)
            .ok_or_else(|| {
                MeterError::MissingTokenData("wallet transaction lacks the meter output".to_string())
            })?;
        let txid = subject.txid();

        self.broadcast(envelope_bytes.clone()).await?;

        let meter = Meter::new(
            state,
            Token {
                txid,
                output_index: output_index as u32,
                script,
                units: self.protocol.units,
                envelope: envelope_bytes,
            },
        );

        let count = {
            let mut repository = self.repository.write();
            repository.insert(meter.clone());
            repository.len()
        };
        Metrics::repository_size(count);
        info!(outpoint = %meter.outpoint(), owner = %owner, "Meter created");
        Ok(meter)
    }

    pub async fn increment(&self, outpoint: &Outpoint) -> MeterResult<Meter> {
        self.transition(outpoint, Direction::Increment).await
    }

    pub async fn decrement(&self, outpoint: &Outpoint) -> MeterResult<Meter> {
        self.transition(outpoint, Direction::Decrement).await
    }

    /// Move the meter at `outpoint` one step in `direction`.
    ///
    /// On success the repository entry is replaced in place by the meter at
    /// its new outpoint. If the overlay rejects the signed transition the
    /// meter is marked stale and left as is.
    pub async fn transition(&self, outpoint: &Outpoint, direction: Direction) -> MeterResult<Meter> {
        let label = direction.as_str();
        let current = self
            .get(outpoint)
            .ok_or(MeterError::MeterNotFound(*outpoint))?;

        let transition = self.builder.build(&current, direction).map_err(|e| {
            Metrics::transition(label, "build_failed");
            MeterError::from(e)
        })?;
        debug!(
            %outpoint,
            direction = label,
            next_value = transition.next_state.value,
            "Transition built"
        );

        let (description, input_description) = match direction {
            Direction::Increment => ("Increment a counter", "Increment meter token"),
            Direction::Decrement => ("Decrement a counter", "Decrement meter token"),
        };
        let args = CreateActionArgs {
            description: description.to_string(),
            inputs: vec![ActionInput {
                outpoint: transition.spends,
                unlocking_script: transition.spend_proof.clone(),
                description: input_description.to_string(),
            }],
            input_envelope: Some(current.token.envelope.clone()),
            outputs: vec![ActionOutput {
                script: transition.next_script.clone(),
                units: transition.units,
                basket: Some(self.protocol.basket.clone()),
                description: "Counter token".to_string(),
            }],
            options: ActionOptions {
                randomize_outputs: false,
                accept_delayed_broadcast: false,
            },
        };

        let action = match self.wallet.create_action(args).await {
            Ok(action) => action,
            Err(e) => {
                Metrics::transition(label, "wallet_failed");
                return Err(e.into());
            }
        };
        let envelope_bytes = action.tx.ok_or_else(|| {
            Metrics::transition(label, "wallet_failed");
            MeterError::TransactionUndefined
        })?;
        let envelope = Envelope::from_bytes(&envelope_bytes)?;

        if let Err(e) = self.broadcast(envelope_bytes).await {
            Metrics::transition(label, "broadcast_failed");
            self.repository.write().mark_stale(*outpoint);
            return Err(e);
        }

        let next = transition.settle(&envelope)?;
        self.repository.write().replace(outpoint, next.clone());
        Metrics::transition(label, "ok");
        info!(
            previous = %outpoint,
            outpoint = %next.outpoint(),
            direction = label,
            value = next.value(),
            "Meter transitioned"
        );
        Ok(next)
    }

    /// Replace the repository with the live meters reported by discovery.
    ///
    /// # Errors
    /// Lookup-level failures only; skipped candidates are reported in
    /// `RefreshReport::diagnostics`.
    pub async fn refresh(&self) -> MeterResult<RefreshReport> {
        let mut pass = self.discovery.query_all().await?;
        let meters: Vec<Meter> = pass.by_ref().collect();
        let diagnostics = pass.into_diagnostics();
        Metrics::discovery(meters.len(), diagnostics.len());

        let count = meters.len();
        self.repository.write().reconcile(meters);
        Metrics::repository_size(count);

        if diagnostics.is_empty() {
            info!(meters = count, "Repository refreshed");
        } else {
            warn!(
                meters = count,
                skipped = diagnostics.len(),
                "Repository refreshed with skipped candidates"
            );
        }
        Ok(RefreshReport {
            meters: count,
            diagnostics,
        })
    }

    async fn broadcast(&self, envelope: Vec<u8>) -> MeterResult<()> {
        let result = self.broadcaster.submit(envelope).await;
        Metrics::broadcast(result.is_success());
        if result.is_success() {
            Ok(())
        } else {
            warn!(reason = %result.description, "Broadcast rejected");
            Err(MeterError::Broadcast(result.description))
        }
    }
}
