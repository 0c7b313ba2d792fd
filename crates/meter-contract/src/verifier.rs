//! Ownership signature verification.
//!
//! A meter's signature is made by its owner's identity key over the fixed
//! ownership preimage (protocol `[0, "meter"]`, key id `"1"`, public
//! counterparty, data `[1]`). No private material is needed to check it.

use k256::ecdsa::signature::Verifier;
use k256::ecdsa::{Signature, VerifyingKey};
use meter_core::{
    signing_preimage, Counterparty, IdentityKey, MeterState, ProtocolId, OWNERSHIP_DATA,
    OWNERSHIP_KEY_ID,
};
use tracing::debug;

/// Check that `state.signature` was produced by `state.owner`.
///
/// Returns `false` for a mismatch and for key or signature bytes that do not
/// parse; the caller decides whether to reject.
pub fn verify(state: &MeterState) -> bool {
    let preimage = signing_preimage(
        &ProtocolId::ownership(),
        OWNERSHIP_KEY_ID,
        &Counterparty::Anyone,
        OWNERSHIP_DATA,
    );
    verify_signature(&state.owner, &preimage, state.signature.as_bytes())
}

/// Verify a compact ECDSA signature over `preimage` by `key`.
pub fn verify_signature(key: &IdentityKey, preimage: &[u8], signature: &[u8]) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_sec1_bytes(key.as_bytes()) else {
        debug!(owner = %key, "Owner key is not a curve point");
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        debug!(owner = %key, "Signature bytes do not parse");
        return false;
    };
    verifying_key.verify(preimage, &signature).is_ok()
}
