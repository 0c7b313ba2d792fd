//! Wallet request and response types.

use meter_core::{
    Counterparty, Outpoint, ProtocolId, Txid, OWNERSHIP_DATA, OWNERSHIP_KEY_ID,
};
use serde::{Deserialize, Serialize};

/// Arguments of `Wallet::create_signature`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureArgs {
    pub data: Vec<u8>,
    #[serde(rename = "protocolID")]
    pub protocol: ProtocolId,
    #[serde(rename = "keyID")]
    pub key_id: String,
    pub counterparty: Counterparty,
}

impl SignatureArgs {
    /// The publicly verifiable ownership signature request made at creation.
    pub fn ownership() -> Self {
        Self {
            data: OWNERSHIP_DATA.to_vec(),
            protocol: ProtocolId::ownership(),
            key_id: OWNERSHIP_KEY_ID.to_string(),
            counterparty: Counterparty::Anyone,
        }
    }
}

/// Input of an action: an outpoint and the script unlocking it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInput {
    pub outpoint: Outpoint,
    #[serde(with = "hex::serde")]
    pub unlocking_script: Vec<u8>,
    #[serde(rename = "inputDescription")]
    pub description: String,
}

/// Output of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutput {
    #[serde(rename = "lockingScript", with = "hex::serde")]
    pub script: Vec<u8>,
    #[serde(rename = "satoshis")]
    pub units: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basket: Option<String>,
    #[serde(rename = "outputDescription")]
    pub description: String,
}

/// Assembly options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOptions {
    /// Whether the wallet may reorder outputs. Meters rely on output 0.
    pub randomize_outputs: bool,
    /// Whether the wallet may hold the transaction for later broadcast.
    pub accept_delayed_broadcast: bool,
}

/// Arguments of `Wallet::create_action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActionArgs {
    pub description: String,
    #[serde(default)]
    pub inputs: Vec<ActionInput>,
    /// Envelope proving the outputs consumed by `inputs`.
    #[serde(rename = "inputBEEF", default, skip_serializing_if = "Option::is_none")]
    pub input_envelope: Option<Vec<u8>>,
    pub outputs: Vec<ActionOutput>,
    #[serde(default)]
    pub options: ActionOptions,
}

/// Result of `Wallet::create_action`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateActionResult {
    pub txid: Option<Txid>,
    /// Atomic envelope of the signed transaction.
    pub tx: Option<Vec<u8>>,
}
