//! Combine valid votes into [ValidationData].

use super::{Error, Snapshot, Validator, ValidationData, VoteRecord, VoteValidity};
use shardbft_cryptography::{bls12381, secp256r1, Digest};
use std::collections::BTreeMap;

/// Aggregate every valid vote in `votes` (sorted by signing-committee index).
pub fn aggregate(
    snapshot: &Snapshot,
    votes: &BTreeMap<Validator, VoteRecord>,
    producer: secp256r1::Signature,
) -> Result<ValidationData, Error> {
    let mut participants: Vec<(u32, &VoteRecord)> = votes
        .values()
        .filter(|record| record.validity == VoteValidity::Valid)
        .filter_map(|record| {
            let index = snapshot.index(&record.vote.validator)?;
            Some((u32::try_from(index).ok()?, record))
        })
        .collect();
    participants.sort_by_key(|(index, _)| *index);

    let aggregate = bls12381::aggregate_signatures(participants.iter().map(|(_, r)| &r.vote.bls))
        .ok_or(Error::CombineSignature("no valid votes"))?;
    Ok(ValidationData {
        aggregate: Some(aggregate),
        bridge: participants
            .iter()
            .map(|(_, r)| r.vote.bridge.clone())
            .collect(),
        validators: participants.iter().map(|(index, _)| *index).collect(),
        producer,
    })
}

/// Verify the aggregate signature in `data` over `block` against the participating members of
/// the signing committee.
pub fn verify(snapshot: &Snapshot, data: &ValidationData, namespace: &[u8], block: &Digest) -> bool {
    let Some(aggregate) = &data.aggregate else {
        return false;
    };
    let mut publics = Vec::with_capacity(data.validators.len());
    for index in &data.validators {
        let Some(validator) = snapshot.signing.get(*index as usize) else {
            return false;
        };
        publics.push(&validator.bls);
    }
    if !snapshot.quorum(publics.len()) {
        return false;
    }
    bls12381::aggregate_verify(publics, Some(namespace), block, aggregate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blsbft::{MiningKeySet, SigningMode, Vote};
    use shardbft_cryptography::{hash, Signer};

    const NAMESPACE: &[u8] = b"_SHARDBFT_TEST";

    fn setup(n: u64) -> (Vec<MiningKeySet>, Snapshot) {
        let keys: Vec<_> = (0..n).map(MiningKeySet::from_seed).collect();
        let full = keys.iter().map(MiningKeySet::identity).collect();
        let snapshot = Snapshot::new(hash(b"committee"), full, SigningMode::Whole, 0).unwrap();
        (keys, snapshot)
    }

    fn votes(
        keys: &[MiningKeySet],
        block: Digest,
        validity: VoteValidity,
        bridge: bool,
    ) -> BTreeMap<Validator, VoteRecord> {
        keys.iter()
            .map(|key| {
                let mut record =
                    VoteRecord::new(Vote::sign(key, NAMESPACE, block, hash(b"parent"), bridge));
                record.validity = validity;
                (key.identity(), record)
            })
            .collect()
    }

    #[test]
    fn test_aggregate_sorted_by_index() {
        let (keys, snapshot) = setup(4);
        let block = hash(b"block");
        let producer = keys[0].bridge().sign(None, &block);

        // Skip member 1
        let mut votes = votes(&keys, block, VoteValidity::Valid, true);
        votes.remove(&keys[1].identity());
        let data = aggregate(&snapshot, &votes, producer).unwrap();
        assert_eq!(data.validators, vec![0, 2, 3]);
        assert_eq!(data.bridge.len(), 3);
        assert!(data.bridge.iter().all(Option::is_some));
        assert!(verify(&snapshot, &data, NAMESPACE, &block));
        assert!(!verify(&snapshot, &data, NAMESPACE, &hash(b"other")));
    }

    #[test]
    fn test_aggregate_ignores_invalid() {
        let (keys, snapshot) = setup(4);
        let block = hash(b"block");
        let producer = keys[0].bridge().sign(None, &block);

        let mut votes = votes(&keys, block, VoteValidity::Valid, false);
        votes.get_mut(&keys[2].identity()).unwrap().validity = VoteValidity::Invalid;
        votes.get_mut(&keys[3].identity()).unwrap().validity = VoteValidity::Unknown;
        let data = aggregate(&snapshot, &votes, producer).unwrap();
        assert_eq!(data.validators, vec![0, 1]);

        // Two of four is not a quorum
        assert!(!verify(&snapshot, &data, NAMESPACE, &block));
    }

    #[test]
    fn test_aggregate_empty() {
        let (keys, snapshot) = setup(4);
        let block = hash(b"block");
        let producer = keys[0].bridge().sign(None, &block);
        let votes = votes(&keys, block, VoteValidity::Invalid, false);
        assert!(matches!(
            aggregate(&snapshot, &votes, producer),
            Err(Error::CombineSignature(_))
        ));
    }

    #[test]
    fn test_verify_rejects_out_of_range_index() {
        let (keys, snapshot) = setup(4);
        let block = hash(b"block");
        let producer = keys[0].bridge().sign(None, &block);
        let votes = votes(&keys, block, VoteValidity::Valid, false);
        let mut data = aggregate(&snapshot, &votes, producer).unwrap();
        data.validators[3] = 9;
        assert!(!verify(&snapshot, &data, NAMESPACE, &block));
    }
}
