//! Leader-rotation BFT with BLS vote aggregation.
//!
//! # Overview
//!
//! Time is split into fixed-length timeslots. The proposer of timeslot `T` is `committee[T mod
//! N]`. Each chain runs one [Actor] that polls on a short tick and, on each tick:
//!
//! 1. Proposes (if one of its keys is the proposer and it has not proposed in this timeslot).
//!    It re-proposes the earliest-produced valid candidate on top of the best block if one
//!    exists, else it asks the [crate::ChainAdapter] to build a new block.
//! 2. Classifies new votes (checking every signature against the validator's keys) and, once
//!    more than two-thirds of the signing committee voted validly for a block, aggregates the
//!    BLS partial signatures and inserts the block.
//! 3. Validates and votes on candidates on top of the best block, earliest produced first.
//!
//! # Voting
//!
//! A validator votes at most once per block hash. At a given height it only votes again for
//! another candidate if that candidate was produced earlier, was re-proposed later by a newer
//! proposer, or is signed by a different committee (see [rules::should_vote]).
//!
//! A proposer does not vote for its own block until it observes a vote from someone else. A
//! disconnected proposer therefore cannot produce a stream of self-signed proposals.
//!
//! # Committees
//!
//! In [SigningMode::Whole] the full committee signs. In [SigningMode::Subset] only the
//! interleaved subset containing the proposer signs and quorum is computed against that subset.
//! The committees of a proposal are frozen when it is first seen.
//!
//! # Lifecycle
//!
//! The control loop runs from [Actor::start] until the runtime is stopped. While stopped (see
//! [Mailbox::stop]) it still serves control messages but drops network messages.

use crate::{ChainAdapter, CommitteeResolver, NodeTransport};
use std::time::Duration;

mod actor;
pub mod aggregator;
mod committee;
mod error;
mod ingress;
mod keys;
mod metrics;
pub mod rules;
mod store;
mod types;
pub mod wire;

pub use actor::Actor;
pub use committee::{proposer_index, signing_committee, SigningMode, Snapshot};
pub use error::Error;
pub use ingress::{Control, Mailbox, Message};
pub use keys::MiningKeySet;
pub use store::{Inserted, ProposalStore, Record};
pub use types::{ValidationData, Validator, Vote, VoteRecord, VoteValidity};

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

/// Configuration for the consensus [Actor].
pub struct Config<C: ChainAdapter, T: NodeTransport, R: CommitteeResolver> {
    /// Chain the actor finalizes.
    pub chain: C,

    /// Transport used to reach peers.
    pub transport: T,

    /// Resolver for committees.
    pub resolver: R,

    /// Keys used to propose and vote.
    pub keys: Vec<MiningKeySet>,

    /// Key of the chain in the network (messages for other chains are dropped).
    pub chain_key: String,

    /// Prefix for all BLS signatures to prevent replay attacks.
    pub namespace: Vec<u8>,

    /// Maximum number of messages to buffer on channels inside the actor before blocking.
    pub mailbox_size: usize,

    /// Length of a timeslot.
    pub timeslot: Duration,

    /// Interval between ticks.
    pub tick: Duration,

    /// Interval between sweeps of stale proposals.
    pub gc_interval: Duration,

    /// Proposals that never receive a block are dropped after this long without activity.
    pub idle_timeout: Duration,

    /// Minimum interval between validation attempts of the same proposal.
    pub revalidate_interval: Duration,

    /// Maximum time to wait for the chain to validate a block.
    pub validation_timeout: Duration,

    /// Number of timeslots to remember we proposed in.
    pub propose_history: usize,

    /// Maximum size of an encoded block.
    pub max_block_size: usize,
}

impl<C: ChainAdapter, T: NodeTransport, R: CommitteeResolver> Config<C, T, R> {
    /// Assert enforces that all configuration values are valid.
    pub fn assert(&self) {
        assert!(
            !self.chain_key.is_empty() && self.chain_key.len() <= 64,
            "chain key must be between 1 and 64 bytes"
        );
        assert!(self.mailbox_size > 0, "mailbox size must be greater than zero");
        assert!(
            self.timeslot >= Duration::from_millis(1),
            "timeslot must be at least 1ms"
        );
        assert!(
            self.tick > Duration::default(),
            "tick must be greater than zero"
        );
        assert!(
            self.tick <= self.timeslot,
            "tick must be less than or equal to timeslot"
        );
        assert!(
            self.gc_interval > Duration::default(),
            "gc interval must be greater than zero"
        );
        assert!(
            self.idle_timeout > Duration::default(),
            "idle timeout must be greater than zero"
        );
        assert!(
            self.validation_timeout > Duration::default(),
            "validation timeout must be greater than zero"
        );
        assert!(
            self.propose_history > 0,
            "propose history must be greater than zero"
        );
        assert!(
            self.max_block_size > 0,
            "max block size must be greater than zero"
        );
    }
}
