//! Ledger transaction model.
//!
//! Transactions use a Bitcoin-style little-endian layout with compact-size
//! length prefixes:
//!
//! ```text
//! version u32 | n_in | (txid 32 | vout u32 | len | unlocking | sequence u32)*
//!             | n_out | (units u64 | len | script)* | lock_time u32
//! ```
//!
//! `txid = sha256(sha256(serialized))`.
//!
//! An `Envelope` carries a subject transaction together with the source
//! transactions of its inputs, so an output can be checked without a lookup:
//!
//! ```text
//! prefix u32 (0x01010101) | subject txid 32 | count | transactions...
//! ```
//!
//! The subject is always the last transaction.

use crate::error::{CoreError, Result};
use crate::types::{Outpoint, Txid};
use sha2::{Digest, Sha256};

/// Default transaction version.
pub const TX_VERSION: u32 = 1;

/// Final sequence number.
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

/// Envelope prefix, little-endian on the wire.
pub const ENVELOPE_PREFIX: u32 = 0x0101_0101;

/// Double SHA-256.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// Transaction input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    /// Output being spent.
    pub outpoint: Outpoint,
    /// Proof authorizing the spend.
    pub unlocking_script: Vec<u8>,
    pub sequence: u32,
}

impl TxInput {
    pub fn new(outpoint: Outpoint, unlocking_script: Vec<u8>) -> Self {
        Self {
            outpoint,
            unlocking_script,
            sequence: SEQUENCE_FINAL,
        }
    }
}

/// Transaction output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub units: u64,
    pub script: Vec<u8>,
}

impl TxOutput {
    pub fn new(units: u64, script: Vec<u8>) -> Self {
        Self { units, script }
    }
}

/// Ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        Self {
            version: TX_VERSION,
            inputs,
            outputs,
            lock_time: 0,
        }
    }

    pub fn with_lock_time(mut self, lock_time: u32) -> Self {
        self.lock_time = lock_time;
        self
    }

    /// Serialize to wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());
        write_compact_size(&mut out, self.inputs.len() as u64);
        for input in &self.inputs {
            out.extend_from_slice(input.outpoint.txid.as_bytes());
            out.extend_from_slice(&input.outpoint.index.to_le_bytes());
            write_var_bytes(&mut out, &input.unlocking_script);
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }
        out.extend_from_slice(&outputs_bytes(&self.outputs));
        out.extend_from_slice(&self.lock_time.to_le_bytes());
        out
    }

    /// Parse from wire bytes. Trailing bytes are rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let tx = Self::read(&mut reader)?;
        reader.finish()?;
        Ok(tx)
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let version = reader.u32()?;

        let n_in = reader.compact_size()?;
        let mut inputs = Vec::with_capacity(n_in.min(1024) as usize);
        for _ in 0..n_in {
            let txid = Txid::from_hash(reader.array::<32>()?);
            let index = reader.u32()?;
            let unlocking_script = reader.var_bytes()?.to_vec();
            let sequence = reader.u32()?;
            inputs.push(TxInput {
                outpoint: Outpoint::new(txid, index),
                unlocking_script,
                sequence,
            });
        }

        let n_out = reader.compact_size()?;
        let mut outputs = Vec::with_capacity(n_out.min(1024) as usize);
        for _ in 0..n_out {
            let units = reader.u64()?;
            let script = reader.var_bytes()?.to_vec();
            outputs.push(TxOutput { units, script });
        }

        let lock_time = reader.u32()?;

        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    /// Transaction id.
    pub fn txid(&self) -> Txid {
        Txid::from_hash(sha256d(&self.to_bytes()))
    }

    /// Outpoint of output `index` of this transaction.
    pub fn outpoint(&self, index: u32) -> Outpoint {
        Outpoint::new(self.txid(), index)
    }

    /// Digest committing to every output, as referenced by spend proofs.
    pub fn outputs_digest(&self) -> [u8; 32] {
        sha256d(&outputs_bytes(&self.outputs))
    }
}

fn outputs_bytes(outputs: &[TxOutput]) -> Vec<u8> {
    let mut out = Vec::new();
    write_compact_size(&mut out, outputs.len() as u64);
    for output in outputs {
        out.extend_from_slice(&output.units.to_le_bytes());
        write_var_bytes(&mut out, &output.script);
    }
    out
}

/// A subject transaction plus the source transactions of its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    transactions: Vec<Transaction>,
}

impl Envelope {
    /// Envelope carrying a single transaction with no ancestry.
    pub fn single(subject: Transaction) -> Self {
        Self {
            transactions: vec![subject],
        }
    }

    /// Envelope for `subject` with the given source transactions.
    pub fn new(sources: Vec<Transaction>, subject: Transaction) -> Self {
        let mut transactions = sources;
        transactions.push(subject);
        Self { transactions }
    }

    /// The transaction this envelope proves.
    pub fn subject(&self) -> &Transaction {
        // Construction and parsing both guarantee at least one transaction.
        &self.transactions[self.transactions.len() - 1]
    }

    /// Source transactions, without the subject.
    pub fn sources(&self) -> &[Transaction] {
        &self.transactions[..self.transactions.len() - 1]
    }

    /// Find a transaction in the envelope by id.
    pub fn find(&self, txid: &Txid) -> Option<&Transaction> {
        self.transactions.iter().find(|tx| tx.txid() == *txid)
    }

    pub fn into_subject(mut self) -> Transaction {
        // Non-empty by construction.
        self.transactions.swap_remove(self.transactions.len() - 1)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&ENVELOPE_PREFIX.to_le_bytes());
        out.extend_from_slice(self.subject().txid().as_bytes());
        write_compact_size(&mut out, self.transactions.len() as u64);
        for tx in &self.transactions {
            out.extend_from_slice(&tx.to_bytes());
        }
        out
    }

    /// Parse an envelope.
    ///
    /// # Errors
    /// `CoreError::MalformedEnvelope` on a bad prefix, an empty transaction
    /// list, a subject id mismatch, or any transaction parse failure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let envelope = Self::read(&mut reader).map_err(|e| match e {
            CoreError::MalformedEnvelope(_) => e,
            other => CoreError::MalformedEnvelope(other.to_string()),
        })?;
        reader
            .finish()
            .map_err(|e| CoreError::MalformedEnvelope(e.to_string()))?;
        Ok(envelope)
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let prefix = reader.u32()?;
        if prefix != ENVELOPE_PREFIX {
            return Err(CoreError::MalformedEnvelope(format!(
                "unexpected prefix 0x{prefix:08x}"
            )));
        }
        let subject_txid = Txid::from_hash(reader.array::<32>()?);

        let count = reader.compact_size()?;
        if count == 0 {
            return Err(CoreError::MalformedEnvelope("no transactions".to_string()));
        }
        let mut transactions = Vec::with_capacity(count.min(64) as usize);
        for _ in 0..count {
            transactions.push(Transaction::read(reader)?);
        }

        let envelope = Self { transactions };
        let actual = envelope.subject().txid();
        if actual != subject_txid {
            return Err(CoreError::MalformedEnvelope(format!(
                "subject txid mismatch: header {subject_txid}, actual {actual}"
            )));
        }
        Ok(envelope)
    }
}

fn write_compact_size(out: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}

fn write_var_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_compact_size(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

/// Bounds-checked cursor over wire bytes.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(CoreError::MalformedTransaction(format!(
                "unexpected end of data at byte {} (need {n})",
                self.pos
            ))),
        }
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn compact_size(&mut self) -> Result<u64> {
        let first = self.array::<1>()?[0];
        Ok(match first {
            0xfd => u64::from(self.u16()?),
            0xfe => u64::from(self.u32()?),
            0xff => self.u64()?,
            n => u64::from(n),
        })
    }

    fn var_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.compact_size()?;
        let len = usize::try_from(len)
            .map_err(|_| CoreError::MalformedTransaction(format!("length {len} too large")))?;
        self.take(len)
    }

    fn finish(&self) -> Result<()> {
        if self.pos != self.bytes.len() {
            return Err(CoreError::MalformedTransaction(format!(
                "{} trailing bytes",
                self.bytes.len() - self.pos
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx() -> Transaction {
        let source = Transaction::new(vec![], vec![TxOutput::new(1, vec![0xaa; 3])]);
        Transaction::new(
            vec![TxInput::new(source.outpoint(0), vec![0x00, 0x20])],
            vec![TxOutput::new(1, vec![0xbb; 300])],
        )
    }

    #[test]
    fn test_transaction_wire_roundtrip() {
        let tx = sample_tx();
        let parsed = Transaction::from_bytes(&tx.to_bytes()).unwrap();
        assert_eq!(parsed, tx);
        assert_eq!(parsed.txid(), tx.txid());
    }

    #[test]
    fn test_txid_changes_with_lock_time() {
        let tx = sample_tx();
        let other = tx.clone().with_lock_time(7);
        assert_ne!(tx.txid(), other.txid());
    }

    #[test]
    fn test_transaction_rejects_trailing_bytes() {
        let mut bytes = sample_tx().to_bytes();
        bytes.push(0);
        assert!(matches!(
            Transaction::from_bytes(&bytes),
            Err(CoreError::MalformedTransaction(_))
        ));
    }

    #[test]
    fn test_transaction_rejects_truncation() {
        let bytes = sample_tx().to_bytes();
        assert!(Transaction::from_bytes(&bytes[..bytes.len() - 5]).is_err());
    }

    #[test]
    fn test_compact_size_boundaries() {
        let mut out = Vec::new();
        write_compact_size(&mut out, 0xfc);
        assert_eq!(out, vec![0xfc]);

        let mut out = Vec::new();
        write_compact_size(&mut out, 0xfd);
        assert_eq!(out, vec![0xfd, 0xfd, 0x00]);

        let mut reader = Reader::new(&out);
        assert_eq!(reader.compact_size().unwrap(), 0xfd);
    }

    #[test]
    fn test_envelope_roundtrip_keeps_subject_last() {
        let source = Transaction::new(vec![], vec![TxOutput::new(1, vec![0xaa])]);
        let subject = Transaction::new(
            vec![TxInput::new(source.outpoint(0), vec![])],
            vec![TxOutput::new(1, vec![0xbb])],
        );
        let envelope = Envelope::new(vec![source.clone()], subject.clone());

        let parsed = Envelope::from_bytes(&envelope.to_bytes()).unwrap();
        assert_eq!(parsed.subject(), &subject);
        assert_eq!(parsed.sources(), &[source.clone()]);
        assert!(parsed.find(&source.txid()).is_some());
    }

    #[test]
    fn test_envelope_rejects_subject_mismatch() {
        let envelope = Envelope::single(sample_tx());
        let mut bytes = envelope.to_bytes();
        bytes[4] ^= 0xff;
        assert!(matches!(
            Envelope::from_bytes(&bytes),
            Err(CoreError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_envelope_rejects_bad_prefix_and_garbage() {
        assert!(matches!(
            Envelope::from_bytes(&[0xde, 0xad, 0xbe, 0xef]),
            Err(CoreError::MalformedEnvelope(_))
        ));
        assert!(matches!(
            Envelope::from_bytes(&[]),
            Err(CoreError::MalformedEnvelope(_))
        ));
    }
}
