//! Domain tag for ownership signatures.
//!
//! Signers (the wallet) and verifiers (anyone) must agree on the exact bytes
//! being signed. The preimage binds the protocol id, key id and counterparty
//! scope to the data:
//!
//! ```text
//! security_level (1) || len (1) || protocol || len (1) || key_id || scope (1..34) || data
//! ```
//!
//! Scope `0x00` is the public counterparty: signatures made under it verify
//! for any caller, which is how meter ownership is proven.

use crate::types::IdentityKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol security level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityLevel {
    /// Same key for every counterparty and application.
    Silent = 0,
    /// Key per application.
    App = 1,
    /// Key per application and counterparty.
    Counterparty = 2,
}

/// Protocol identifier: security level plus protocol name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProtocolId {
    pub level: SecurityLevel,
    pub name: String,
}

impl ProtocolId {
    pub fn new(level: SecurityLevel, name: impl Into<String>) -> Self {
        Self {
            level,
            name: name.into(),
        }
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.level as u8, self.name)
    }
}

/// Who a signature is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Counterparty {
    /// Publicly verifiable.
    Anyone,
    /// Only the signer itself.
    #[serde(rename = "self")]
    Myself,
    /// A specific identity.
    Other(IdentityKey),
}

impl Counterparty {
    fn scope_bytes(&self, out: &mut Vec<u8>) {
        match self {
            Self::Anyone => out.push(0x00),
            Self::Myself => out.push(0x01),
            Self::Other(key) => {
                out.push(0x02);
                out.extend_from_slice(key.as_bytes());
            }
        }
    }
}

/// Protocol name of meter ownership signatures.
pub const OWNERSHIP_PROTOCOL: &str = "meter";

/// Key id of meter ownership signatures.
pub const OWNERSHIP_KEY_ID: &str = "1";

/// Data signed at creation.
pub const OWNERSHIP_DATA: &[u8] = &[1];

impl ProtocolId {
    /// `[0, "meter"]`.
    pub fn ownership() -> Self {
        Self::new(SecurityLevel::Silent, OWNERSHIP_PROTOCOL)
    }
}

/// Build the bytes an identity key signs for `data` under the given domain.
///
/// Protocol names and key ids longer than 255 bytes are truncated to keep the
/// single-byte length prefixes; neither appears in practice.
pub fn signing_preimage(
    protocol: &ProtocolId,
    key_id: &str,
    counterparty: &Counterparty,
    data: &[u8],
) -> Vec<u8> {
    let name = &protocol.name.as_bytes()[..protocol.name.len().min(255)];
    let key_id = &key_id.as_bytes()[..key_id.len().min(255)];

    let mut out = Vec::with_capacity(4 + name.len() + key_id.len() + 34 + data.len());
    out.push(protocol.level as u8);
    out.push(name.len() as u8);
    out.extend_from_slice(name);
    out.push(key_id.len() as u8);
    out.extend_from_slice(key_id);
    counterparty.scope_bytes(&mut out);
    out.extend_from_slice(data);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ownership_preimage_layout() {
        let preimage = signing_preimage(
            &ProtocolId::ownership(),
            OWNERSHIP_KEY_ID,
            &Counterparty::Anyone,
            OWNERSHIP_DATA,
        );
        assert_eq!(
            preimage,
            vec![0x00, 5, b'm', b'e', b't', b'e', b'r', 1, b'1', 0x00, 0x01]
        );
    }

    #[test]
    fn test_preimage_depends_on_scope() {
        let protocol = ProtocolId::ownership();
        let public = signing_preimage(&protocol, "1", &Counterparty::Anyone, &[1]);
        let private = signing_preimage(&protocol, "1", &Counterparty::Myself, &[1]);
        assert_ne!(public, private);
    }

    #[test]
    fn test_protocol_display() {
        assert_eq!(ProtocolId::ownership().to_string(), "[0, meter]");
    }
}
