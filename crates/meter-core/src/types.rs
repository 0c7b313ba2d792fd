//! Meter domain types.
//!
//! `MeterState` is the logical counter, `Token` is the ledger output backing it,
//! and `Meter` pairs the two. Identifiers (`Txid`, `Outpoint`) and key material
//! (`IdentityKey`, `OwnershipSignature`) are fixed-size newtypes so that the
//! script template can be encoded without fallible length checks.

use crate::error::CoreError;
use alloy::primitives::B256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transaction identifier.
///
/// Stored in internal byte order (the raw double SHA-256 output) and
/// displayed byte-reversed, following ledger convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Txid(pub B256);

impl Txid {
    pub const ZERO: Self = Self(B256::ZERO);

    /// Wrap a hash in internal byte order.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(B256::from(hash))
    }

    /// Internal byte order, as serialized inside transactions.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0 .0
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = *self.as_bytes();
        reversed.reverse();
        write!(f, "{}", hex::encode(reversed))
    }
}

impl FromStr for Txid {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())?;
        let mut hash: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| CoreError::InvalidOutpoint(format!("txid has {} bytes", b.len())))?;
        hash.reverse();
        Ok(Self::from_hash(hash))
    }
}

impl From<Txid> for String {
    fn from(txid: Txid) -> Self {
        txid.to_string()
    }
}

impl TryFrom<String> for Txid {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Reference to a transaction output: `<txid>.<index>`.
///
/// This is the identifier of a meter in the repository; it changes on every
/// transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Outpoint {
    pub txid: Txid,
    pub index: u32,
}

impl Outpoint {
    pub fn new(txid: Txid, index: u32) -> Self {
        Self { txid, index }
    }
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.txid, self.index)
    }
}

impl FromStr for Outpoint {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, index) = s
            .split_once('.')
            .ok_or_else(|| CoreError::InvalidOutpoint(format!("expected <txid>.<index>, got {s}")))?;
        let index = index
            .parse::<u32>()
            .map_err(|e| CoreError::InvalidOutpoint(format!("bad output index {index}: {e}")))?;
        Ok(Self::new(txid.parse()?, index))
    }
}

impl From<Outpoint> for String {
    fn from(outpoint: Outpoint) -> Self {
        outpoint.to_string()
    }
}

impl TryFrom<String> for Outpoint {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Compressed secp256k1 public key identifying a meter's owner.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct IdentityKey(pub [u8; 33]);

impl IdentityKey {
    pub const LEN: usize = 33;

    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }
}

impl TryFrom<&[u8]> for IdentityKey {
    type Error = CoreError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let key: [u8; 33] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidKey(format!("expected 33 bytes, got {}", bytes.len())))?;
        if key[0] != 0x02 && key[0] != 0x03 {
            return Err(CoreError::InvalidKey(format!(
                "not a compressed key (prefix 0x{:02x})",
                key[0]
            )));
        }
        Ok(Self(key))
    }
}

impl fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityKey({self})")
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for IdentityKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())?;
        Self::try_from(bytes.as_slice())
    }
}

impl From<IdentityKey> for String {
    fn from(key: IdentityKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for IdentityKey {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Compact ECDSA signature (r || s) proving the owner created the meter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct OwnershipSignature(pub [u8; 64]);

impl OwnershipSignature {
    pub const LEN: usize = 64;

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl TryFrom<&[u8]> for OwnershipSignature {
    type Error = CoreError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let sig: [u8; 64] = bytes.try_into().map_err(|_| {
            CoreError::InvalidSignature(format!("expected 64 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(sig))
    }
}

impl fmt::Debug for OwnershipSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnershipSignature({}..)", hex::encode(&self.0[..8]))
    }
}

impl From<OwnershipSignature> for String {
    fn from(sig: OwnershipSignature) -> Self {
        hex::encode(sig.0)
    }
}

impl TryFrom<String> for OwnershipSignature {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let bytes = hex::decode(s.trim())?;
        Self::try_from(bytes.as_slice())
    }
}

/// Logical state of a meter, as carried by its script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterState {
    /// Counter value. Signed: decrement has no floor unless configured.
    pub value: i64,
    /// Identity key of the creator. Never changes across transitions.
    pub owner: IdentityKey,
    /// Signature by `owner` under the ownership domain tag.
    pub signature: OwnershipSignature,
}

impl MeterState {
    pub fn new(value: i64, owner: IdentityKey, signature: OwnershipSignature) -> Self {
        Self {
            value,
            owner,
            signature,
        }
    }

    /// State with the same owner and signature but a different value.
    pub fn with_value(&self, value: i64) -> Self {
        Self { value, ..*self }
    }
}

/// Ledger output currently backing a meter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub txid: Txid,
    pub output_index: u32,
    /// Encoded `MeterState`.
    #[serde(with = "hex::serde")]
    pub script: Vec<u8>,
    /// Ledger-native amount; preserved across every transition of a meter.
    pub units: u64,
    /// Atomic envelope proving this output without external lookup.
    #[serde(with = "hex::serde")]
    pub envelope: Vec<u8>,
}

impl Token {
    pub fn outpoint(&self) -> Outpoint {
        Outpoint::new(self.txid, self.output_index)
    }

    /// Whether every field needed to spend this output is present.
    pub fn is_complete(&self) -> bool {
        !self.script.is_empty() && !self.envelope.is_empty() && self.txid != Txid::ZERO
    }
}

/// A decoded, verified meter and its backing output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meter {
    pub state: MeterState,
    pub token: Token,
}

impl Meter {
    pub fn new(state: MeterState, token: Token) -> Self {
        Self { state, token }
    }

    pub fn outpoint(&self) -> Outpoint {
        self.token.outpoint()
    }

    pub fn value(&self) -> i64 {
        self.state.value
    }

    pub fn owner(&self) -> &IdentityKey {
        &self.state.owner
    }
}

/// Direction of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increment,
    Decrement,
}

impl Direction {
    /// Value delta applied by this direction.
    pub fn delta(&self) -> i64 {
        match self {
            Self::Increment => 1,
            Self::Decrement => -1,
        }
    }

    /// Method selector pushed in the spend proof.
    pub fn selector(&self) -> u8 {
        match self {
            Self::Increment => 0x00,
            Self::Decrement => 0x01,
        }
    }

    pub fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            0x00 => Some(Self::Increment),
            0x01 => Some(Self::Decrement),
            _ => None,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::Increment => Self::Decrement,
            Self::Decrement => Self::Increment,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increment => "increment",
            Self::Decrement => "decrement",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
