//! Discovery of live meters.
//!
//! One lookup round-trip produces a [`DiscoveryPass`]: a lazy, finite iterator
//! that decodes and verifies each candidate as it is pulled. A candidate that
//! fails any step is skipped and recorded as a [`Diagnostic`]; the pass never
//! aborts on a single bad entry.

use meter_contract::verify;
use meter_core::{codec, Envelope, Meter, Outpoint, Token};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::OverlayResult;
use crate::lookup::{DynLookupResolver, LookupOutput, LookupQuestion};

/// Reason a candidate was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryFailure {
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("output index {index} out of range ({outputs} outputs)")]
    OutputIndexOutOfRange { index: u32, outputs: usize },

    #[error("malformed script: {0}")]
    MalformedScript(String),

    #[error("ownership signature does not verify")]
    SignatureInvalid,
}

/// A skipped candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Position of the candidate in the lookup answer.
    pub position: usize,
    /// Outpoint, when the envelope parsed far enough to know it.
    pub outpoint: Option<Outpoint>,
    pub failure: DiscoveryFailure,
}

/// Decode and verify one candidate.
fn resolve_candidate(candidate: LookupOutput) -> Result<Meter, (Option<Outpoint>, DiscoveryFailure)> {
    let envelope = Envelope::from_bytes(&candidate.beef)
        .map_err(|e| (None, DiscoveryFailure::MalformedEnvelope(e.to_string())))?;
    let subject = envelope.subject();
    let outpoint = subject.outpoint(candidate.output_index);

    let output = subject
        .outputs
        .get(candidate.output_index as usize)
        .ok_or((
            Some(outpoint),
            DiscoveryFailure::OutputIndexOutOfRange {
                index: candidate.output_index,
                outputs: subject.outputs.len(),
            },
        ))?;

    let state = codec::decode(&output.script)
        .map_err(|e| (Some(outpoint), DiscoveryFailure::MalformedScript(e.to_string())))?;
    if !verify(&state) {
        return Err((Some(outpoint), DiscoveryFailure::SignatureInvalid));
    }

    let token = Token {
        txid: outpoint.txid,
        output_index: candidate.output_index,
        script: output.script.clone(),
        units: output.units,
        envelope: candidate.beef,
    };
    Ok(Meter::new(state, token))
}

/// Lazy iterator over the meters of one lookup answer.
///
/// Finite and not restartable; run a new query for a fresh pass.
#[derive(Debug)]
pub struct DiscoveryPass {
    candidates: std::iter::Enumerate<std::vec::IntoIter<LookupOutput>>,
    total: usize,
    diagnostics: Vec<Diagnostic>,
}

impl DiscoveryPass {
    pub fn new(candidates: Vec<LookupOutput>) -> Self {
        Self {
            total: candidates.len(),
            candidates: candidates.into_iter().enumerate(),
            diagnostics: Vec::new(),
        }
    }

    /// Number of candidates in the answer.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Candidates skipped so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl Iterator for DiscoveryPass {
    type Item = Meter;

    fn next(&mut self) -> Option<Meter> {
        for (position, candidate) in self.candidates.by_ref() {
            match resolve_candidate(candidate) {
                Ok(meter) => {
                    debug!(position, outpoint = %meter.outpoint(), value = meter.value(), "Discovered meter");
                    return Some(meter);
                }
                Err((outpoint, failure)) => {
                    warn!(
                        position,
                        outpoint = ?outpoint.map(|o| o.to_string()),
                        reason = %failure,
                        "Skipping meter candidate"
                    );
                    self.diagnostics.push(Diagnostic {
                        position,
                        outpoint,
                        failure,
                    });
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.candidates.size_hint().1)
    }
}

/// Queries the index for every live meter.
#[derive(Clone)]
pub struct DiscoveryClient {
    resolver: DynLookupResolver,
    service: String,
}

impl DiscoveryClient {
    pub fn new(resolver: DynLookupResolver, service: impl Into<String>) -> Self {
        Self {
            resolver,
            service: service.into(),
        }
    }

    /// Ask the index for all live meter outputs.
    ///
    /// # Errors
    /// Transport failures and non-`output-list` answers (`WrongResultType`,
    /// `MissingOutputs`, `LookupFailed`). Per-candidate failures are not
    /// errors; they are recorded on the returned pass.
    pub async fn query_all(&self) -> OverlayResult<DiscoveryPass> {
        let answer = self
            .resolver
            .query(LookupQuestion::find_all(self.service.clone()))
            .await?;
        let candidates = answer.into_outputs()?;
        info!(service = %self.service, candidates = candidates.len(), "Lookup answered");
        Ok(DiscoveryPass::new(candidates))
    }
}
