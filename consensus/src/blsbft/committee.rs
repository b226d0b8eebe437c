//! Leader election and signing committees.
//!
//! The proposer for timeslot `T` is `committee[T mod N]` over the full committee. In
//! [SigningMode::Subset], the committee is split into `count` interleaved subsets (member `i`
//! belongs to subset `i mod count`) and only the subset containing the proposer signs.

use super::Validator;
use shardbft_cryptography::Digest;
use shardbft_utils::exceeds_two_thirds;
use std::num::NonZeroUsize;

/// How a committee signs blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SigningMode {
    /// Every member of the committee signs.
    Whole,
    /// Only the subset containing the proposer signs.
    Subset(NonZeroUsize),
}

/// Index of the proposer for `timeslot` in a committee of size `n`.
///
/// Returns `None` if the committee is empty.
pub fn proposer_index(timeslot: u64, n: usize) -> Option<usize> {
    if n == 0 {
        return None;
    }
    Some((timeslot % n as u64) as usize)
}

/// Members of `full` that sign when the proposer sits at `proposer`.
pub fn signing_committee(full: &[Validator], mode: SigningMode, proposer: usize) -> Vec<Validator> {
    match mode {
        SigningMode::Whole => full.to_vec(),
        SigningMode::Subset(count) => {
            let subset = proposer % count.get();
            full.iter()
                .enumerate()
                .filter(|(i, _)| i % count.get() == subset)
                .map(|(_, v)| v.clone())
                .collect()
        }
    }
}

/// Committees frozen for a proposal when it is first seen.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub reference: Digest,
    pub mode: SigningMode,
    pub proposer: Validator,
    pub full: Vec<Validator>,
    pub signing: Vec<Validator>,
}

impl Snapshot {
    /// Resolve the proposer and signing committee of `full` at `timeslot`.
    ///
    /// Returns `None` if the committee is empty.
    pub fn new(
        reference: Digest,
        full: Vec<Validator>,
        mode: SigningMode,
        timeslot: u64,
    ) -> Option<Self> {
        let index = proposer_index(timeslot, full.len())?;
        let proposer = full[index].clone();
        let signing = signing_committee(&full, mode, index);
        Some(Self {
            reference,
            mode,
            proposer,
            full,
            signing,
        })
    }

    /// Index of `validator` in the signing committee.
    pub fn index(&self, validator: &Validator) -> Option<usize> {
        self.signing.iter().position(|v| v == validator)
    }

    /// Whether `validator` is part of the signing committee.
    pub fn is_signer(&self, validator: &Validator) -> bool {
        self.index(validator).is_some()
    }

    /// Whether `valid` votes are enough to commit.
    pub fn quorum(&self, valid: usize) -> bool {
        exceeds_two_thirds(valid, self.signing.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blsbft::MiningKeySet;
    use shardbft_cryptography::hash;

    fn committee(n: u64) -> Vec<Validator> {
        (0..n).map(|i| MiningKeySet::from_seed(i).identity()).collect()
    }

    #[test]
    fn test_proposer_rotation() {
        assert_eq!(proposer_index(0, 4), Some(0));
        assert_eq!(proposer_index(5, 4), Some(1));
        assert_eq!(proposer_index(1_000_003, 4), Some(3));
        assert_eq!(proposer_index(7, 0), None);
    }

    #[test]
    fn test_proposer_deterministic() {
        let full = committee(5);
        let a = Snapshot::new(hash(b"ref"), full.clone(), SigningMode::Whole, 42).unwrap();
        let b = Snapshot::new(hash(b"ref"), full.clone(), SigningMode::Whole, 42).unwrap();
        assert_eq!(a.proposer, b.proposer);
        assert_eq!(a.proposer, full[2]);
    }

    #[test]
    fn test_whole_committee() {
        let full = committee(4);
        let snapshot = Snapshot::new(hash(b"ref"), full.clone(), SigningMode::Whole, 1).unwrap();
        assert_eq!(snapshot.signing, full);
        assert!(!snapshot.quorum(2));
        assert!(snapshot.quorum(3));
    }

    #[test]
    fn test_subset_committee() {
        let full = committee(6);
        let mode = SigningMode::Subset(NonZeroUsize::new(2).unwrap());

        // Proposer 3 belongs to the odd subset
        let snapshot = Snapshot::new(hash(b"ref"), full.clone(), mode, 3).unwrap();
        assert_eq!(snapshot.proposer, full[3]);
        assert_eq!(
            snapshot.signing,
            vec![full[1].clone(), full[3].clone(), full[5].clone()]
        );
        assert_eq!(snapshot.index(&full[5]), Some(2));
        assert!(!snapshot.is_signer(&full[0]));

        // Quorum is computed against the subset
        assert!(!snapshot.quorum(2));
        assert!(snapshot.quorum(3));

        // Proposer 4 belongs to the even subset
        let snapshot = Snapshot::new(hash(b"ref"), full.clone(), mode, 4).unwrap();
        assert_eq!(
            snapshot.signing,
            vec![full[0].clone(), full[2].clone(), full[4].clone()]
        );
    }

    #[test]
    fn test_empty_committee() {
        assert!(Snapshot::new(hash(b"ref"), Vec::new(), SigningMode::Whole, 1).is_none());
    }
}
