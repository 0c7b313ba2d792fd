//! Spend proofs and the meter spend rule.
//!
//! The unlocking script of a transition is a fixed 35-byte proof:
//!
//! ```text
//! 0x01 <selector>      method: 0x00 increment, 0x01 decrement
//! 0x20 <digest 32>     sha256d of the spending transaction's outputs
//! ```
//!
//! A meter output may only be spent by a transaction with exactly one input
//! (consuming it) and exactly one output that carries the same owner and
//! signature, the same unit amount, and a value moved by one in the direction
//! the proof names. The digest pins the proof to that single output.

use crate::error::{ContractError, ContractResult};
use meter_core::{codec, Direction, Outpoint, Transaction, TxOutput};

/// Exact length of a spend proof.
pub const SPEND_PROOF_LEN: usize = 35;

/// Decoded unlocking script of a meter transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpendProof {
    pub direction: Direction,
    pub outputs_digest: [u8; 32],
}

impl SpendProof {
    pub fn new(direction: Direction, outputs_digest: [u8; 32]) -> Self {
        Self {
            direction,
            outputs_digest,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SPEND_PROOF_LEN);
        out.push(0x01);
        out.push(self.direction.selector());
        out.push(0x20);
        out.extend_from_slice(&self.outputs_digest);
        out
    }

    /// # Errors
    /// `ContractError::ScriptEvaluation` if the bytes are not a spend proof.
    pub fn decode(bytes: &[u8]) -> ContractResult<Self> {
        if bytes.len() != SPEND_PROOF_LEN || bytes[0] != 0x01 || bytes[2] != 0x20 {
            return Err(ContractError::ScriptEvaluation(
                "unlocking script is not a meter spend proof".to_string(),
            ));
        }
        let direction = Direction::from_selector(bytes[1]).ok_or_else(|| {
            ContractError::ScriptEvaluation(format!("unknown method selector 0x{:02x}", bytes[1]))
        })?;
        let mut outputs_digest = [0u8; 32];
        outputs_digest.copy_from_slice(&bytes[3..]);
        Ok(Self::new(direction, outputs_digest))
    }
}

fn reject<T>(reason: impl Into<String>) -> ContractResult<T> {
    Err(ContractError::ScriptEvaluation(reason.into()))
}

/// Evaluate the meter spend rule for input `input_index` of `spending`, which
/// claims to consume `source` at `source_outpoint`.
///
/// Returns the direction of the accepted transition.
///
/// # Errors
/// `ContractError::ScriptEvaluation` describing the first violated rule.
pub fn evaluate_spend(
    source: &TxOutput,
    source_outpoint: &Outpoint,
    spending: &Transaction,
    input_index: usize,
) -> ContractResult<Direction> {
    if spending.inputs.len() != 1 || spending.outputs.len() != 1 {
        return reject(format!(
            "transition must have one input and one output, got {} and {}",
            spending.inputs.len(),
            spending.outputs.len()
        ));
    }
    if input_index != 0 {
        return reject(format!("input index {input_index} out of range"));
    }

    let input = &spending.inputs[0];
    if input.outpoint != *source_outpoint {
        return reject(format!(
            "input spends {}, expected {source_outpoint}",
            input.outpoint
        ));
    }

    let proof = SpendProof::decode(&input.unlocking_script)?;
    let current = codec::decode(&source.script)
        .map_err(|e| ContractError::ScriptEvaluation(format!("source script: {e}")))?;

    let output = &spending.outputs[0];
    if output.units != source.units {
        return reject(format!(
            "unit amount changed from {} to {}",
            source.units, output.units
        ));
    }
    if proof.outputs_digest != spending.outputs_digest() {
        return reject("spend proof does not commit to the spending outputs");
    }

    let next = codec::decode(&output.script)
        .map_err(|e| ContractError::ScriptEvaluation(format!("next script: {e}")))?;
    if next.owner != current.owner {
        return reject("owner identity changed");
    }
    if next.signature != current.signature {
        return reject("ownership signature changed");
    }

    let expected = current
        .value
        .checked_add(proof.direction.delta())
        .ok_or(ContractError::ValueOverflow(current.value))?;
    if next.value != expected {
        return reject(format!(
            "{} from {} must yield {expected}, got {}",
            proof.direction, current.value, next.value
        ));
    }

    Ok(proof.direction)
}
