//! In-memory overlay.
//!
//! Acts as ledger, topic manager and lookup service in one process:
//! - rejects malformed envelopes, duplicate transactions, missing inputs and
//!   double spends
//! - evaluates the meter spend rule for every input consuming a meter output
//! - admits only outputs that decode as meter scripts with a verifying
//!   ownership signature
//! - answers `findAll` for the meter lookup service in admission order
//!
//! State sits behind a single `parking_lot::Mutex`; no lock is held across an
//! await point.

use std::collections::HashSet;

use indexmap::IndexMap;
use meter_contract::{evaluate_spend, verify};
use meter_core::{codec, Envelope, Outpoint, TxOutput, Txid};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::broadcast::{BoxFuture, BroadcastResult, Broadcaster};
use crate::error::OverlayResult;
use crate::lookup::{LookupAnswer, LookupOutput, LookupQuestion, LookupResolver, METER_SERVICE};

#[derive(Debug, Clone)]
struct Unspent {
    output: TxOutput,
    /// Envelope the output was admitted with.
    envelope: Vec<u8>,
}

#[derive(Debug, Default)]
struct LedgerState {
    unspent: IndexMap<Outpoint, Unspent>,
    spent: HashSet<Outpoint>,
    known: HashSet<Txid>,
    /// Entries served verbatim by lookups, after the admitted outputs.
    raw: Vec<LookupOutput>,
}

/// In-process overlay implementing [`Broadcaster`] and [`LookupResolver`].
#[derive(Debug)]
pub struct MemoryLedger {
    service: String,
    state: Mutex<LedgerState>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::with_service(METER_SERVICE)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Whether `outpoint` is an admitted, unspent meter output.
    pub fn is_unspent(&self, outpoint: &Outpoint) -> bool {
        self.state.lock().unspent.contains_key(outpoint)
    }

    /// Number of admitted, unspent meter outputs.
    pub fn unspent_count(&self) -> usize {
        self.state.lock().unspent.len()
    }

    /// Serve an entry verbatim from lookups, bypassing admission.
    pub fn push_raw_output(&self, beef: Vec<u8>, output_index: u32) {
        self.state.lock().raw.push(LookupOutput { beef, output_index });
    }

    fn process(&self, bytes: Vec<u8>) -> BroadcastResult {
        let envelope = match Envelope::from_bytes(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => return BroadcastResult::error(format!("malformed envelope: {e}")),
        };
        let tx = envelope.subject();
        let txid = tx.txid();

        let mut state = self.state.lock();
        if state.known.contains(&txid) {
            return BroadcastResult::error(format!("transaction {txid} already known"));
        }

        for (index, input) in tx.inputs.iter().enumerate() {
            if state.spent.contains(&input.outpoint) {
                return BroadcastResult::error(format!("double spend of {}", input.outpoint));
            }
            let Some(source) = state.unspent.get(&input.outpoint) else {
                return BroadcastResult::error(format!("missing input {}", input.outpoint));
            };
            if codec::is_meter_script(&source.output.script) {
                if let Err(e) = evaluate_spend(&source.output, &input.outpoint, tx, index) {
                    return BroadcastResult::error(format!(
                        "input {index} rejected by meter contract: {e}"
                    ));
                }
            }
        }

        for input in &tx.inputs {
            state.unspent.shift_remove(&input.outpoint);
            state.spent.insert(input.outpoint);
        }
        state.known.insert(txid);

        let mut admitted = 0usize;
        for (index, output) in tx.outputs.iter().enumerate() {
            let admissible = codec::decode(&output.script).is_ok_and(|s| verify(&s));
            if !admissible {
                debug!(%txid, index, "Output not admitted");
                continue;
            }
            state.unspent.insert(
                tx.outpoint(index as u32),
                Unspent {
                    output: output.clone(),
                    envelope: bytes.clone(),
                },
            );
            admitted += 1;
        }

        info!(%txid, inputs = tx.inputs.len(), admitted, "Transaction accepted");
        BroadcastResult::success(txid, format!("admitted {admitted} outputs"))
    }

    fn answer(&self, question: &LookupQuestion) -> LookupAnswer {
        if question.service != self.service {
            return LookupAnswer::Error {
                description: format!("unknown lookup service {}", question.service),
            };
        }
        if !question.is_find_all() {
            return LookupAnswer::Error {
                description: "unsupported query".to_string(),
            };
        }

        let state = self.state.lock();
        let outputs = state
            .unspent
            .iter()
            .map(|(outpoint, entry)| LookupOutput {
                beef: entry.envelope.clone(),
                output_index: outpoint.index,
            })
            .chain(state.raw.iter().cloned())
            .collect();
        LookupAnswer::output_list(outputs)
    }
}

impl Broadcaster for MemoryLedger {
    fn submit(&self, envelope: Vec<u8>) -> BoxFuture<'_, BroadcastResult> {
        Box::pin(async move {
            let result = self.process(envelope);
            if !result.is_success() {
                warn!(reason = %result.description, "Transaction rejected");
            }
            result
        })
    }
}

impl LookupResolver for MemoryLedger {
    fn query(&self, question: LookupQuestion) -> BoxFuture<'_, OverlayResult<LookupAnswer>> {
        Box::pin(async move { Ok(self.answer(&question)) })
    }
}
