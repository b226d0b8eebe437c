//! Finalize a chain of blocks with a BLS-aggregated BFT protocol.
//!
//! Each chain (the beacon chain or a shard) runs its own [blsbft] actor. The actor rotates the
//! proposer every timeslot, collects one vote per validator for each candidate block, and
//! inserts a block once more than two-thirds of the signing committee has voted for it.
//!
//! The actor only interprets a handful of block accessors (see [Block]). Everything else is
//! delegated to external collaborators:
//! - [ChainAdapter]: builds, validates, and inserts blocks.
//! - [NodeTransport]: broadcasts encoded messages and fetches missing ancestors.
//! - [CommitteeResolver]: returns the committee (and signing mode) for a committee reference.
//!
//! # Status
//!
//! `shardbft-consensus` is **ALPHA** software and is not yet recommended for production use.

use bytes::Bytes;
use shardbft_codec::Encode;
use shardbft_cryptography::Digest;
use std::future::Future;

pub mod blsbft;

use blsbft::{Error, SigningMode, Validator};

/// Identifies the chain an actor finalizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChainId {
    /// The beacon chain (coordinates committees for all shards).
    Beacon,
    /// A shard chain.
    Shard(u16),
}

impl ChainId {
    /// Returns whether this is the beacon chain.
    pub fn is_beacon(&self) -> bool {
        matches!(self, ChainId::Beacon)
    }
}

/// A snapshot of some block already connected to the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct View {
    pub hash: Digest,
    pub parent: Digest,
    pub height: u64,
    pub produce_timeslot: u64,
    pub propose_timeslot: u64,
    pub committee: Digest,
}

/// A block as seen by consensus.
///
/// The hash must not cover the validation data (it is filled in after the block is signed).
pub trait Block: Clone + Encode + Send + Sync + 'static {
    /// Hash of the block (excluding validation data).
    fn hash(&self) -> Digest;

    /// Hash of the block's parent.
    fn parent(&self) -> Digest;

    /// Height of the block.
    fn height(&self) -> u64;

    /// Hash of the block body (stable across re-proposals of the same body).
    fn body(&self) -> Digest;

    /// Validator that built the block.
    fn producer(&self) -> &Validator;

    /// Validator that broadcast this version of the block.
    fn proposer(&self) -> &Validator;

    /// Timeslot in which the block was first built.
    fn produce_timeslot(&self) -> u64;

    /// Timeslot in which this version of the block was proposed.
    fn propose_timeslot(&self) -> u64;

    /// Reference of the committee that must sign the block.
    fn committee(&self) -> Digest;

    /// Whether the block carries instructions that require a bridge signature from each voter.
    fn requires_bridge(&self) -> bool;

    /// Encoded validation data.
    fn validation(&self) -> &Bytes;

    /// Replace the encoded validation data.
    fn set_validation(&mut self, validation: Bytes);
}

/// Block-domain operations the actor delegates to the chain.
pub trait ChainAdapter: Clone + Send + Sync + 'static {
    /// Block type of the chain.
    type Block: Block;

    /// Identifier of the chain.
    fn chain(&self) -> ChainId;

    /// Whether the chain is synced enough to participate in consensus.
    fn is_ready(&self) -> bool;

    /// Tip of the chain (if known).
    fn best_view(&self) -> Option<View>;

    /// Highest block that can no longer be reverted (if known).
    fn final_view(&self) -> Option<View>;

    /// Lookup a connected block by hash.
    fn view(&self, hash: &Digest) -> Option<View>;

    /// Decode a block received from a peer.
    fn decode_block(&self, bytes: &[u8]) -> Result<Self::Block, Error>;

    /// Build a new block on top of the best view.
    fn create_block(
        &mut self,
        proposer: &Validator,
        timeslot: u64,
        committee: &[Validator],
        reference: Digest,
    ) -> impl Future<Output = Result<Self::Block, Error>> + Send;

    /// Re-timestamp an existing block so it can be proposed again by a newer proposer.
    fn recreate_block(
        &mut self,
        old: &Self::Block,
        proposer: &Validator,
        timeslot: u64,
        committee: &[Validator],
        reference: Digest,
    ) -> impl Future<Output = Result<Self::Block, Error>> + Send;

    /// Validate a block before signing it.
    fn validate_pre_sign(
        &mut self,
        block: &Self::Block,
        signing: &[Validator],
        full: &[Validator],
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Insert a finalized block and broadcast it to peers.
    fn insert_and_broadcast(
        &mut self,
        block: Self::Block,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Insert a finalized block alongside the finalized validation data of its parent.
    fn insert_and_broadcast_with_prev(
        &mut self,
        block: Self::Block,
        prev: Bytes,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Peer-to-peer operations the actor delegates to the node.
pub trait NodeTransport: Clone + Send + Sync + 'static {
    /// Identifier of this node.
    fn self_peer(&self) -> String;

    /// Broadcast an encoded message to all peers following `chain_key`.
    fn broadcast(
        &mut self,
        chain_key: &str,
        message: Bytes,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Request blocks we have not seen from `peer`.
    fn request_missing(
        &mut self,
        peer: String,
        hashes: Vec<Digest>,
        chain: ChainId,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Resolves committees by reference.
pub trait CommitteeResolver: Clone + Send + Sync + 'static {
    /// Reference of the committee that should sign the next block.
    fn current(&self) -> Option<Digest>;

    /// Ordered full committee for a reference.
    fn committee(&self, reference: &Digest) -> Option<Vec<Validator>>;

    /// How the committee for a reference signs blocks.
    fn mode(&self, reference: &Digest) -> SigningMode;
}
