//! Transition builder.
//!
//! Builds the next state, its script and the spend proof from an explicit
//! current meter. The result is an immutable value; nothing here signs,
//! assembles a full transaction or talks to the network.

use crate::error::{ContractError, ContractResult};
use crate::proof::SpendProof;
use meter_core::{
    codec, Direction, Envelope, Meter, MeterState, Outpoint, Token, Transaction, TxInput, TxOutput,
};
use serde::{Deserialize, Serialize};

/// Local rules applied before a transition is built.
///
/// The script itself only enforces the ±1 step; a floor is a policy of the
/// caller and is not visible on the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRules {
    /// Lowest value a decrement may produce. `None` = unbounded.
    #[serde(default)]
    pub floor: Option<i64>,
}

/// A built, unsigned transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub direction: Direction,
    /// Output being consumed.
    pub spends: Outpoint,
    /// Unit amount carried over from the consumed output.
    pub units: u64,
    pub next_state: MeterState,
    pub next_script: Vec<u8>,
    /// Encoded `SpendProof`, used as the input's unlocking script.
    pub spend_proof: Vec<u8>,
}

impl Transition {
    /// The single output of the transition.
    pub fn next_output(&self) -> TxOutput {
        TxOutput::new(self.units, self.next_script.clone())
    }

    /// Single-input/single-output template the proof commits to.
    pub fn template(&self) -> Transaction {
        Transaction::new(
            vec![TxInput::new(self.spends, self.spend_proof.clone())],
            vec![self.next_output()],
        )
    }

    /// Build the meter backed by the broadcast transaction in `envelope`.
    ///
    /// # Errors
    /// `ContractError::ScriptEvaluation` if the subject does not carry the
    /// next script at the preserved unit amount in output 0.
    pub fn settle(&self, envelope: &Envelope) -> ContractResult<Meter> {
        let subject = envelope.subject();
        match subject.outputs.first() {
            Some(output) if output.script == self.next_script && output.units == self.units => {}
            _ => {
                return Err(ContractError::ScriptEvaluation(
                    "broadcast transaction does not carry the next meter output".to_string(),
                ))
            }
        }

        Ok(Meter::new(
            self.next_state,
            Token {
                txid: subject.txid(),
                output_index: 0,
                script: self.next_script.clone(),
                units: self.units,
                envelope: envelope.to_bytes(),
            },
        ))
    }
}

/// Builds transitions under a fixed set of rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionBuilder {
    rules: TransitionRules,
}

impl TransitionBuilder {
    pub fn new(rules: TransitionRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &TransitionRules {
        &self.rules
    }

    /// Build the transition moving `current` one step in `direction`.
    ///
    /// Owner and signature are carried forward unchanged.
    ///
    /// # Errors
    /// - `MissingTokenData` if the token is incomplete or its script does not
    ///   encode `current.state`
    /// - `ValueOverflow` at the `i64` bounds
    /// - `BelowFloor` if a floor is configured and would be crossed
    pub fn build(&self, current: &Meter, direction: Direction) -> ContractResult<Transition> {
        let token = &current.token;
        if !token.is_complete() {
            return Err(ContractError::MissingTokenData(format!(
                "token {} lacks script, envelope or txid",
                token.outpoint()
            )));
        }
        match codec::decode(&token.script) {
            Ok(decoded) if decoded == current.state => {}
            _ => {
                return Err(ContractError::MissingTokenData(format!(
                    "script of {} does not encode the meter state",
                    token.outpoint()
                )))
            }
        }

        let value = current
            .state
            .value
            .checked_add(direction.delta())
            .ok_or(ContractError::ValueOverflow(current.state.value))?;
        if let Some(floor) = self.rules.floor {
            if direction == Direction::Decrement && value < floor {
                return Err(ContractError::BelowFloor { value, floor });
            }
        }

        let next_state = current.state.with_value(value);
        let next_script = codec::encode(&next_state);
        let committed = Transaction::new(vec![], vec![TxOutput::new(token.units, next_script.clone())]);
        let proof = SpendProof::new(direction, committed.outputs_digest());

        Ok(Transition {
            direction,
            spends: token.outpoint(),
            units: token.units,
            next_state,
            next_script,
            spend_proof: proof.encode(),
        })
    }
}

/// Build a transition with no floor.
pub fn build_transition(current: &Meter, direction: Direction) -> ContractResult<Transition> {
    TransitionBuilder::default().build(current, direction)
}
