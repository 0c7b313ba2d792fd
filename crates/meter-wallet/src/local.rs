//! Local key wallet.
//!
//! Holds a single secp256k1 identity key and assembles meter transactions
//! in process. Assembly does no fee funding: creation transactions have no
//! inputs, transitions have exactly the inputs the caller supplies.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use alloy::signers::local::PrivateKeySigner;
use k256::ecdsa::signature::Signer as _;
use k256::ecdsa::Signature;
use meter_core::{
    signing_preimage, Envelope, IdentityKey, Transaction, TxInput, TxOutput,
};
use thiserror::Error;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::action::{CreateActionArgs, CreateActionResult, SignatureArgs};
use crate::error::{WalletError, WalletResult};
use crate::wallet::{BoxFuture, Wallet};

// =============================================================================
// KeySource and KeyManager
// =============================================================================

/// Source of the identity private key.
#[derive(Debug, Clone)]
pub enum KeySource {
    /// Load from environment variable (development).
    EnvVar { var_name: String },
    /// Load from file (production, recommend 0600 permissions).
    File { path: PathBuf },
}

/// Owns the identity key.
///
/// Security notes:
/// - The secret is held by `PrivateKeySigner`; raw bytes only pass through
///   `Zeroizing` buffers.
/// - Never log private key material.
pub struct KeyManager {
    signer: PrivateKeySigner,
    identity: IdentityKey,
}

impl KeyManager {
    /// Load the key from `source` and optionally check the derived identity.
    ///
    /// # Errors
    /// Returns `KeyError` if:
    /// - Environment variable not found
    /// - File read fails
    /// - Hex decoding fails
    /// - Private key is invalid
    /// - Identity mismatch
    pub fn load(source: KeySource, expected: Option<IdentityKey>) -> Result<Self, KeyError> {
        // Parse hex key from string (supports 0x prefix and whitespace trimming)
        fn parse_hex_key(hex_str: &str) -> Result<Zeroizing<Vec<u8>>, KeyError> {
            let trimmed = hex_str.trim().trim_start_matches("0x");
            Ok(Zeroizing::new(hex::decode(trimmed)?))
        }

        let secret_bytes: Zeroizing<Vec<u8>> = match source {
            KeySource::EnvVar { ref var_name } => {
                let hex = Zeroizing::new(
                    std::env::var(var_name)
                        .map_err(|_| KeyError::EnvVarNotFound(var_name.clone()))?,
                );
                parse_hex_key(&hex)?
            }
            KeySource::File { ref path } => {
                let content = Zeroizing::new(std::fs::read_to_string(path)?);
                parse_hex_key(&content)?
            }
        };

        Self::from_bytes(&secret_bytes, expected)
    }

    /// Build from raw secret bytes (no environment dependency).
    pub fn from_bytes(secret_bytes: &[u8], expected: Option<IdentityKey>) -> Result<Self, KeyError> {
        let signer = PrivateKeySigner::from_slice(secret_bytes)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;

        let point = signer.credential().verifying_key().to_encoded_point(true);
        let identity = IdentityKey::try_from(point.as_bytes())
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;

        if let Some(expected) = expected {
            if identity != expected {
                return Err(KeyError::IdentityMismatch {
                    expected,
                    actual: identity,
                });
            }
        }

        Ok(Self { signer, identity })
    }

    pub fn identity(&self) -> IdentityKey {
        self.identity
    }

    /// Sign arbitrary bytes (SHA-256, RFC 6979 ECDSA), compact encoding.
    fn sign(&self, message: &[u8]) -> Result<Signature, KeyError> {
        self.signer
            .credential()
            .try_sign(message)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))
    }
}

/// Key management errors.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Failed to decode hex: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Identity mismatch: expected {expected}, got {actual}")]
    IdentityMismatch {
        expected: IdentityKey,
        actual: IdentityKey,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// LocalWallet
// =============================================================================

/// In-process wallet backed by a `KeyManager`.
pub struct LocalWallet {
    keys: KeyManager,
    /// Lock-time nonce keeping otherwise identical transactions distinct.
    nonce: AtomicU32,
}

impl LocalWallet {
    pub fn new(keys: KeyManager) -> Self {
        let seed = chrono::Utc::now().timestamp_millis() as u32;
        info!(identity = %keys.identity(), "Local wallet ready");
        Self {
            keys,
            nonce: AtomicU32::new(seed),
        }
    }

    /// Convenience constructor from raw secret bytes.
    pub fn from_bytes(secret_bytes: &[u8]) -> WalletResult<Self> {
        Ok(Self::new(KeyManager::from_bytes(secret_bytes, None)?))
    }

    pub fn identity(&self) -> IdentityKey {
        self.keys.identity()
    }

    fn sign_sync(&self, args: &SignatureArgs) -> WalletResult<Vec<u8>> {
        let preimage = signing_preimage(&args.protocol, &args.key_id, &args.counterparty, &args.data);
        // NOTE: Do not log signature material
        let signature = self
            .keys
            .sign(&preimage)
            .map_err(|e| WalletError::SigningFailed(e.to_string()))?;
        Ok(signature.to_bytes().to_vec())
    }

    fn assemble(&self, args: &CreateActionArgs) -> WalletResult<CreateActionResult> {
        if args.outputs.is_empty() {
            return Err(WalletError::InvalidAction("action has no outputs".to_string()));
        }

        let input_envelope = match &args.input_envelope {
            Some(bytes) => Some(Envelope::from_bytes(bytes)?),
            None => None,
        };

        let mut sources: Vec<Transaction> = Vec::new();
        let mut inputs = Vec::with_capacity(args.inputs.len());
        for input in &args.inputs {
            let source = input_envelope
                .as_ref()
                .and_then(|envelope| envelope.find(&input.outpoint.txid))
                .filter(|tx| (input.outpoint.index as usize) < tx.outputs.len())
                .ok_or(WalletError::UnknownInput(input.outpoint))?;
            if !sources.iter().any(|known| known == source) {
                sources.push(source.clone());
            }
            inputs.push(TxInput::new(input.outpoint, input.unlocking_script.clone()));
        }

        let outputs = args
            .outputs
            .iter()
            .map(|output| TxOutput::new(output.units, output.script.clone()))
            .collect();

        let lock_time = self.nonce.fetch_add(1, Ordering::Relaxed);
        let tx = Transaction::new(inputs, outputs).with_lock_time(lock_time);
        let txid = tx.txid();

        debug!(
            %txid,
            description = %args.description,
            inputs = args.inputs.len(),
            outputs = args.outputs.len(),
            randomize_outputs = args.options.randomize_outputs,
            "Assembled action"
        );

        Ok(CreateActionResult {
            txid: Some(txid),
            tx: Some(Envelope::new(sources, tx).to_bytes()),
        })
    }
}

impl Wallet for LocalWallet {
    fn identity_key(&self) -> BoxFuture<'_, WalletResult<IdentityKey>> {
        Box::pin(async move { Ok(self.keys.identity()) })
    }

    fn create_signature(&self, args: SignatureArgs) -> BoxFuture<'_, WalletResult<Vec<u8>>> {
        Box::pin(async move { self.sign_sync(&args) })
    }

    fn create_action(
        &self,
        args: CreateActionArgs,
    ) -> BoxFuture<'_, WalletResult<CreateActionResult>> {
        Box::pin(async move { self.assemble(&args) })
    }
}

// =============================================================================
// Tests
// =============================================================================
