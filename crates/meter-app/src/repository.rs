//! Ordered in-memory meter repository.
//!
//! Keyed by outpoint, newest first. A transition changes a meter's outpoint,
//! so `replace` swaps the key in place and keeps the position. Meters whose
//! transition failed after signing are tracked in a stale set until the next
//! discovery pass reconciles the whole list.

use std::collections::HashSet;

use indexmap::IndexMap;
use meter_core::{Meter, Outpoint};

#[derive(Debug, Default, Clone)]
pub struct MeterRepository {
    meters: IndexMap<Outpoint, Meter>,
    stale: HashSet<Outpoint>,
}

impl MeterRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the front. An existing entry with the same outpoint is moved.
    pub fn insert(&mut self, meter: Meter) {
        self.meters.shift_insert(0, meter.outpoint(), meter);
    }

    /// Replace the meter at `previous` with `next`, keeping its position.
    ///
    /// Returns the replaced meter, or `None` (and inserts `next` at the
    /// front) if `previous` is not present.
    pub fn replace(&mut self, previous: &Outpoint, next: Meter) -> Option<Meter> {
        self.stale.remove(previous);
        match self.meters.shift_remove_full(previous) {
            Some((position, _, old)) => {
                self.meters.shift_insert(position, next.outpoint(), next);
                Some(old)
            }
            None => {
                self.insert(next);
                None
            }
        }
    }

    pub fn remove(&mut self, outpoint: &Outpoint) -> Option<Meter> {
        self.stale.remove(outpoint);
        self.meters.shift_remove(outpoint)
    }

    pub fn get(&self, outpoint: &Outpoint) -> Option<&Meter> {
        self.meters.get(outpoint)
    }

    /// Position of `outpoint` in display order.
    pub fn position(&self, outpoint: &Outpoint) -> Option<usize> {
        self.meters.get_index_of(outpoint)
    }

    /// Meters in display order (newest first).
    pub fn iter(&self) -> impl Iterator<Item = &Meter> {
        self.meters.values()
    }

    pub fn len(&self) -> usize {
        self.meters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meters.is_empty()
    }

    /// Replace the whole set with the result of a discovery pass.
    ///
    /// Order follows the pass. Clears the stale set.
    pub fn reconcile(&mut self, discovered: impl IntoIterator<Item = Meter>) {
        self.meters = discovered
            .into_iter()
            .map(|meter| (meter.outpoint(), meter))
            .collect();
        self.stale.clear();
    }

    /// Mark a meter whose transition failed after signing.
    pub fn mark_stale(&mut self, outpoint: Outpoint) {
        if self.meters.contains_key(&outpoint) {
            self.stale.insert(outpoint);
        }
    }

    pub fn is_stale(&self, outpoint: &Outpoint) -> bool {
        self.stale.contains(outpoint)
    }

    pub fn stale_count(&self) -> usize {
        self.stale.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_core::{IdentityKey, MeterState, OwnershipSignature, Token, Txid};

    fn meter(tag: u8, value: i64) -> Meter {
        let mut owner = [tag; 33];
        owner[0] = 0x02;
        Meter::new(
            MeterState::new(value, IdentityKey(owner), OwnershipSignature([tag; 64])),
            Token {
                txid: Txid::from_hash([tag; 32]),
                output_index: 0,
                script: vec![tag],
                units: 1,
                envelope: vec![tag],
            },
        )
    }

    #[test]
    fn test_insert_is_newest_first() {
        let mut repo = MeterRepository::new();
        repo.insert(meter(1, 1));
        repo.insert(meter(2, 1));
        let order: Vec<_> = repo.iter().map(|m| m.token.txid).collect();
        assert_eq!(order, vec![Txid::from_hash([2; 32]), Txid::from_hash([1; 32])]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut repo = MeterRepository::new();
        repo.insert(meter(1, 1));
        repo.insert(meter(2, 1));
        repo.insert(meter(3, 1));
        let old = meter(2, 1).outpoint();

        let previous = repo.replace(&old, meter(9, 2));
        assert_eq!(previous.map(|m| m.value()), Some(1));
        assert_eq!(repo.position(&meter(9, 2).outpoint()), Some(1));
        assert!(repo.get(&old).is_none());
        assert_eq!(repo.len(), 3);
    }

    #[test]
    fn test_replace_missing_inserts_front() {
        let mut repo = MeterRepository::new();
        repo.insert(meter(1, 1));
        assert!(repo.replace(&meter(5, 1).outpoint(), meter(6, 1)).is_none());
        assert_eq!(repo.position(&meter(6, 1).outpoint()), Some(0));
    }

    #[test]
    fn test_stale_cleared_by_replace_and_reconcile() {
        let mut repo = MeterRepository::new();
        repo.insert(meter(1, 1));
        repo.insert(meter(2, 1));
        let first = meter(1, 1).outpoint();
        repo.mark_stale(first);
        repo.mark_stale(meter(7, 1).outpoint());
        assert!(repo.is_stale(&first));
        assert_eq!(repo.stale_count(), 1);

        repo.reconcile(vec![meter(3, 4)]);
        assert_eq!(repo.stale_count(), 0);
        assert_eq!(repo.len(), 1);
        assert!(repo.get(&first).is_none());
    }

    #[test]
    fn test_remove() {
        let mut repo = MeterRepository::new();
        repo.insert(meter(1, 1));
        assert!(repo.remove(&meter(1, 1).outpoint()).is_some());
        assert!(repo.is_empty());
    }
}
