//! State codec: `MeterState` <-> locking script.
//!
//! The script is a fixed template. Every field sits at a fixed offset behind a
//! fixed push opcode:
//!
//! ```text
//! offset  len  content
//!      0    4  template tag   "MTR" 0x01
//!      4    1  0x21           push 33
//!      5   33  owner identity key (compressed)
//!     38    1  0x40           push 64
//!     39   64  ownership signature (r || s)
//!    103    1  0x08           push 8
//!    104    8  value, i64 little-endian
//!    112    2  0x6a 0x75      contract body marker
//! ```
//!
//! Anything that does not match byte-for-byte is rejected as malformed.

use crate::error::{CoreError, Result};
use crate::types::{IdentityKey, MeterState, OwnershipSignature};

/// Template tag identifying meter scripts.
pub const TEMPLATE_TAG: [u8; 4] = [b'M', b'T', b'R', 0x01];

/// Contract body marker closing the template.
pub const TEMPLATE_TRAILER: [u8; 2] = [0x6a, 0x75];

const PUSH_OWNER: u8 = IdentityKey::LEN as u8;
const PUSH_SIGNATURE: u8 = OwnershipSignature::LEN as u8;
const PUSH_VALUE: u8 = 8;

const OWNER_AT: usize = TEMPLATE_TAG.len();
const SIGNATURE_AT: usize = OWNER_AT + 1 + IdentityKey::LEN;
const VALUE_AT: usize = SIGNATURE_AT + 1 + OwnershipSignature::LEN;
const TRAILER_AT: usize = VALUE_AT + 1 + 8;

/// Exact length of every meter script.
pub const SCRIPT_LEN: usize = TRAILER_AT + TEMPLATE_TRAILER.len();

/// Encode a state into its locking script.
pub fn encode(state: &MeterState) -> Vec<u8> {
    let mut script = Vec::with_capacity(SCRIPT_LEN);
    script.extend_from_slice(&TEMPLATE_TAG);
    script.push(PUSH_OWNER);
    script.extend_from_slice(state.owner.as_bytes());
    script.push(PUSH_SIGNATURE);
    script.extend_from_slice(state.signature.as_bytes());
    script.push(PUSH_VALUE);
    script.extend_from_slice(&state.value.to_le_bytes());
    script.extend_from_slice(&TEMPLATE_TRAILER);
    script
}

/// Decode a locking script into a state.
///
/// # Errors
/// Returns `CoreError::MalformedScript` on any deviation from the template,
/// including an owner field that is not a compressed public key encoding.
pub fn decode(script: &[u8]) -> Result<MeterState> {
    if script.len() != SCRIPT_LEN {
        return Err(CoreError::MalformedScript(format!(
            "expected {SCRIPT_LEN} bytes, got {}",
            script.len()
        )));
    }
    if script[..OWNER_AT] != TEMPLATE_TAG {
        return Err(CoreError::MalformedScript("unknown template tag".to_string()));
    }
    expect_push(script, OWNER_AT, PUSH_OWNER, "owner")?;
    expect_push(script, SIGNATURE_AT, PUSH_SIGNATURE, "signature")?;
    expect_push(script, VALUE_AT, PUSH_VALUE, "value")?;
    if script[TRAILER_AT..] != TEMPLATE_TRAILER {
        return Err(CoreError::MalformedScript("missing contract body".to_string()));
    }

    let owner = IdentityKey::try_from(&script[OWNER_AT + 1..SIGNATURE_AT])
        .map_err(|e| CoreError::MalformedScript(format!("owner field: {e}")))?;
    let signature = OwnershipSignature::try_from(&script[SIGNATURE_AT + 1..VALUE_AT])
        .map_err(|e| CoreError::MalformedScript(format!("signature field: {e}")))?;

    let mut value = [0u8; 8];
    value.copy_from_slice(&script[VALUE_AT + 1..TRAILER_AT]);

    Ok(MeterState::new(i64::from_le_bytes(value), owner, signature))
}

/// Whether a script carries the meter template, without full validation.
pub fn is_meter_script(script: &[u8]) -> bool {
    script.len() == SCRIPT_LEN && script.starts_with(&TEMPLATE_TAG)
}

fn expect_push(script: &[u8], at: usize, opcode: u8, field: &str) -> Result<()> {
    if script[at] != opcode {
        return Err(CoreError::MalformedScript(format!(
            "{field} push: expected 0x{opcode:02x}, got 0x{:02x}",
            script[at]
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state(value: i64) -> MeterState {
        let mut owner = [0x11u8; 33];
        owner[0] = 0x02;
        MeterState::new(value, IdentityKey(owner), OwnershipSignature([0x22; 64]))
    }

    #[test]
    fn test_script_length_is_fixed() {
        assert_eq!(SCRIPT_LEN, 114);
        assert_eq!(encode(&sample_state(1)).len(), SCRIPT_LEN);
    }

    #[test]
    fn test_decode_inverts_encode() {
        for value in [0, 1, -1, 42, i64::MAX, i64::MIN] {
            let state = sample_state(value);
            assert_eq!(decode(&encode(&state)).unwrap(), state);
        }
    }

    #[test]
    fn test_encode_is_deterministic() {
        assert_eq!(encode(&sample_state(7)), encode(&sample_state(7)));
        assert_ne!(encode(&sample_state(7)), encode(&sample_state(8)));
    }

    #[test]
    fn test_decode_rejects_truncated_script() {
        let script = encode(&sample_state(1));
        let err = decode(&script[..SCRIPT_LEN - 1]).unwrap_err();
        assert!(matches!(err, CoreError::MalformedScript(_)));
    }

    #[test]
    fn test_decode_rejects_wrong_push_opcode() {
        let mut script = encode(&sample_state(1));
        script[SIGNATURE_AT] = 0x41;
        assert!(matches!(decode(&script), Err(CoreError::MalformedScript(_))));
    }

    #[test]
    fn test_decode_rejects_foreign_template() {
        let mut script = encode(&sample_state(1));
        script[0] = b'X';
        assert!(matches!(decode(&script), Err(CoreError::MalformedScript(_))));
        assert!(!is_meter_script(&script));

        let mut script = encode(&sample_state(1));
        script[SCRIPT_LEN - 1] = 0x00;
        assert!(matches!(decode(&script), Err(CoreError::MalformedScript(_))));
    }

    #[test]
    fn test_decode_rejects_invalid_owner_prefix() {
        let mut script = encode(&sample_state(1));
        script[OWNER_AT + 1] = 0x05;
        assert!(matches!(decode(&script), Err(CoreError::MalformedScript(_))));
    }
}
