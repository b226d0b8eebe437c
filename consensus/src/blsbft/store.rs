//! In-memory index of proposals that have not been finalized.

use super::{Snapshot, Validator, Vote, VoteRecord, VoteValidity};
use crate::Block;
use shardbft_cryptography::Digest;
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    time::{Duration, SystemTime},
};

/// Everything known about one candidate block.
pub struct Record<B: Block> {
    pub received: SystemTime,
    pub updated: SystemTime,
    pub last_validation: Option<SystemTime>,

    /// Set once a propose message for the hash arrives.
    pub block: Option<B>,
    pub snapshot: Option<Snapshot>,
    pub votes: BTreeMap<Validator, VoteRecord>,

    pub is_validated: bool,
    pub has_unprocessed_vote: bool,
    pub is_voted: bool,
    pub proposer_sent_vote: bool,
    pub is_committed: bool,

    pub valid: usize,
    pub invalid: usize,
}

impl<B: Block> Record<B> {
    fn new(now: SystemTime) -> Self {
        Self {
            received: now,
            updated: now,
            last_validation: None,
            block: None,
            snapshot: None,
            votes: BTreeMap::new(),
            is_validated: false,
            has_unprocessed_vote: false,
            is_voted: false,
            proposer_sent_vote: false,
            is_committed: false,
            valid: 0,
            invalid: 0,
        }
    }

    /// Height of the block (if known).
    pub fn height(&self) -> Option<u64> {
        self.block.as_ref().map(Block::height)
    }

    /// Classify every vote not yet checked against the frozen snapshot.
    ///
    /// Returns the votes classified as invalid by this call. Does nothing (and keeps
    /// `has_unprocessed_vote`) if the snapshot is not yet known.
    pub fn classify(&mut self, namespace: &[u8]) -> Vec<Vote> {
        let Some(snapshot) = &self.snapshot else {
            return Vec::new();
        };
        let mut invalid = Vec::new();
        for record in self.votes.values_mut() {
            if record.validity != VoteValidity::Unknown {
                continue;
            }
            let valid =
                snapshot.is_signer(&record.vote.validator) && record.vote.verify(namespace);
            if valid {
                record.validity = VoteValidity::Valid;
                self.valid += 1;
            } else {
                record.validity = VoteValidity::Invalid;
                self.invalid += 1;
                invalid.push(record.vote.clone());
            }
        }
        self.has_unprocessed_vote = false;
        invalid
    }

    /// Whether enough valid votes were collected to commit.
    pub fn has_quorum(&self) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(|snapshot| snapshot.quorum(self.valid))
    }

    /// Mark the record committed, returning `false` if it already was.
    pub fn commit(&mut self) -> bool {
        if self.is_committed {
            return false;
        }
        self.is_committed = true;
        true
    }
}

/// Outcome of [ProposalStore::insert_vote].
#[derive(Debug, PartialEq, Eq)]
pub enum Inserted {
    /// First vote from this validator for the hash.
    New,
    /// The validator already voted for the hash (the vote is ignored).
    Duplicate,
}

/// Proposals indexed by hash and by height.
pub struct ProposalStore<B: Block> {
    records: HashMap<Digest, Record<B>>,
    heights: BTreeMap<u64, BTreeSet<Digest>>,
}

impl<B: Block> Default for ProposalStore<B> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
            heights: BTreeMap::new(),
        }
    }
}

impl<B: Block> ProposalStore<B> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, hash: &Digest) -> Option<&Record<B>> {
        self.records.get(hash)
    }

    pub fn get_mut(&mut self, hash: &Digest) -> Option<&mut Record<B>> {
        self.records.get_mut(hash)
    }

    /// Attach a block (and the committees resolved for it) to its record.
    ///
    /// Existing votes are kept. Returns `false` if the block was already attached.
    pub fn insert_block(&mut self, block: B, snapshot: Snapshot, now: SystemTime) -> bool {
        let hash = block.hash();
        let height = block.height();
        let record = self
            .records
            .entry(hash)
            .or_insert_with(|| Record::new(now));
        if record.block.is_some() {
            return false;
        }

        // Votes classified against a provisional snapshot must be checked again
        if record
            .snapshot
            .as_ref()
            .is_some_and(|s| s.reference != snapshot.reference || s.signing != snapshot.signing)
        {
            for vote in record.votes.values_mut() {
                vote.validity = VoteValidity::Unknown;
            }
            record.valid = 0;
            record.invalid = 0;
            record.has_unprocessed_vote = !record.votes.is_empty();
        }
        record.block = Some(block);
        record.snapshot = Some(snapshot);
        record.updated = now;
        self.heights.entry(height).or_default().insert(hash);
        true
    }

    /// Store the first vote of a validator for a hash.
    ///
    /// If this is the first evidence of the hash, a record is created with `snapshot` (the
    /// committee it most likely belongs to, replaced once the block arrives).
    pub fn insert_vote(
        &mut self,
        vote: Vote,
        snapshot: impl FnOnce() -> Option<Snapshot>,
        now: SystemTime,
    ) -> Inserted {
        let record = self.records.entry(vote.block).or_insert_with(|| {
            let mut record = Record::new(now);
            record.snapshot = snapshot();
            record
        });
        if record.votes.contains_key(&vote.validator) {
            return Inserted::Duplicate;
        }
        record
            .votes
            .insert(vote.validator.clone(), VoteRecord::new(vote));
        record.has_unprocessed_vote = true;
        record.updated = now;
        Inserted::New
    }

    /// Hashes of records with a block at `height`.
    pub fn at_height(&self, height: u64) -> Vec<Digest> {
        self.heights
            .get(&height)
            .map(|hashes| hashes.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Hashes of records with unprocessed votes.
    pub fn unprocessed(&self) -> Vec<Digest> {
        let mut hashes: Vec<_> = self
            .records
            .iter()
            .filter(|(_, r)| r.has_unprocessed_vote)
            .map(|(hash, _)| *hash)
            .collect();
        hashes.sort();
        hashes
    }

    pub fn remove(&mut self, hash: &Digest) -> Option<Record<B>> {
        let record = self.records.remove(hash)?;
        if let Some(height) = record.height() {
            if let Some(hashes) = self.heights.get_mut(&height) {
                hashes.remove(hash);
                if hashes.is_empty() {
                    self.heights.remove(&height);
                }
            }
        }
        Some(record)
    }

    /// Drop every record with a block below `height`.
    pub fn prune_below(&mut self, height: u64) -> usize {
        let stale: Vec<Digest> = self
            .heights
            .range(..height)
            .flat_map(|(_, hashes)| hashes.iter().copied())
            .collect();
        for hash in &stale {
            self.remove(hash);
        }
        stale.len()
    }

    /// Drop records below `height` and records that never received a block within `idle`.
    pub fn prune(&mut self, height: u64, now: SystemTime, idle: Duration) -> usize {
        let mut removed = self.prune_below(height);
        let idle: Vec<Digest> = self
            .records
            .iter()
            .filter(|(_, r)| {
                r.block.is_none() && now.duration_since(r.updated).unwrap_or_default() > idle
            })
            .map(|(hash, _)| *hash)
            .collect();
        for hash in &idle {
            self.records.remove(hash);
        }
        removed += idle.len();
        removed
    }
}
