//! An in-memory chain shared by every validator of a test.

use crate::{
    blsbft::{Error, ValidationData, Validator},
    Block as _, ChainAdapter, ChainId, View,
};
use bytes::{Buf, BufMut, Bytes};
use shardbft_codec::{
    Decode, EncodeSize, Error as CodecError, RangeCfg, Read, ReadExt, Write,
};
use shardbft_cryptography::{hash, Digest, Sha256, Verifier};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

/// Maximum size of the payload of a mock block.
const MAX_PAYLOAD: usize = 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    parent: Digest,
    height: u64,
    producer: Validator,
    proposer: Validator,
    produce_timeslot: u64,
    propose_timeslot: u64,
    committee: Digest,
    payload: Bytes,
    requires_bridge: bool,
    validation: Bytes,
}

impl Block {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        parent: Digest,
        height: u64,
        producer: Validator,
        proposer: Validator,
        produce_timeslot: u64,
        propose_timeslot: u64,
        committee: Digest,
        payload: Bytes,
        requires_bridge: bool,
    ) -> Self {
        Self {
            parent,
            height,
            producer,
            proposer,
            produce_timeslot,
            propose_timeslot,
            committee,
            payload,
            requires_bridge,
            validation: Bytes::new(),
        }
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

impl crate::Block for Block {
    fn hash(&self) -> Digest {
        let mut hasher = Sha256::new();
        hasher
            .update(&self.body())
            .update(self.proposer.bls.as_ref())
            .update(&self.propose_timeslot.to_be_bytes())
            .update(&self.committee);
        hasher.finalize()
    }

    fn parent(&self) -> Digest {
        self.parent
    }

    fn height(&self) -> u64 {
        self.height
    }

    fn body(&self) -> Digest {
        let mut hasher = Sha256::new();
        hasher
            .update(&self.parent)
            .update(&self.height.to_be_bytes())
            .update(self.producer.bls.as_ref())
            .update(&self.produce_timeslot.to_be_bytes())
            .update(&self.payload)
            .update(&[u8::from(self.requires_bridge)]);
        hasher.finalize()
    }

    fn producer(&self) -> &Validator {
        &self.producer
    }

    fn proposer(&self) -> &Validator {
        &self.proposer
    }

    fn produce_timeslot(&self) -> u64 {
        self.produce_timeslot
    }

    fn propose_timeslot(&self) -> u64 {
        self.propose_timeslot
    }

    fn committee(&self) -> Digest {
        self.committee
    }

    fn requires_bridge(&self) -> bool {
        self.requires_bridge
    }

    fn validation(&self) -> &Bytes {
        &self.validation
    }

    fn set_validation(&mut self, validation: Bytes) {
        self.validation = validation;
    }
}

impl Write for Block {
    fn write(&self, buf: &mut impl BufMut) {
        self.parent.write(buf);
        self.height.write(buf);
        self.producer.write(buf);
        self.proposer.write(buf);
        self.produce_timeslot.write(buf);
        self.propose_timeslot.write(buf);
        self.committee.write(buf);
        self.payload.write(buf);
        self.requires_bridge.write(buf);
        self.validation.write(buf);
    }
}

impl Read for Block {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        Ok(Self {
            parent: Digest::read(buf)?,
            height: u64::read(buf)?,
            producer: Validator::read(buf)?,
            proposer: Validator::read(buf)?,
            produce_timeslot: u64::read(buf)?,
            propose_timeslot: u64::read(buf)?,
            committee: Digest::read(buf)?,
            payload: Bytes::read_cfg(buf, &RangeCfg::from(..=MAX_PAYLOAD))?,
            requires_bridge: bool::read(buf)?,
            validation: Bytes::read_cfg(buf, &RangeCfg::from(..))?,
        })
    }
}

impl EncodeSize for Block {
    fn encode_size(&self) -> usize {
        self.parent.encode_size()
            + self.height.encode_size()
            + self.producer.encode_size()
            + self.proposer.encode_size()
            + self.produce_timeslot.encode_size()
            + self.propose_timeslot.encode_size()
            + self.committee.encode_size()
            + self.payload.encode_size()
            + self.requires_bridge.encode_size()
            + self.validation.encode_size()
    }
}

/// A block inserted through one [Chain] handle.
#[derive(Clone, Debug)]
pub struct Insert {
    pub block: Block,
    pub prev: Option<Bytes>,
}

struct Entry {
    view: View,
    block: Option<Block>,
}

struct Ledger {
    chain: ChainId,
    entries: HashMap<Digest, Entry>,
    best: Digest,
    requires_bridge: bool,
}

#[derive(Default)]
struct Local {
    unready: bool,
    fail_create: bool,
    rejected: HashSet<Digest>,
    inserted: Vec<Insert>,
}

/// A handle to a ledger shared between validators.
///
/// Inserts are applied to the shared ledger and logged on the handle that made them.
#[derive(Clone)]
pub struct Chain {
    ledger: Arc<Mutex<Ledger>>,
    local: Arc<Mutex<Local>>,
}

impl Chain {
    /// Create a ledger containing only a genesis block at height 0.
    pub fn new(chain: ChainId) -> Self {
        let genesis = hash(b"genesis");
        let view = View {
            hash: genesis,
            parent: genesis,
            height: 0,
            produce_timeslot: 0,
            propose_timeslot: 0,
            committee: genesis,
        };
        let mut entries = HashMap::new();
        entries.insert(genesis, Entry { view, block: None });
        Self {
            ledger: Arc::new(Mutex::new(Ledger {
                chain,
                entries,
                best: genesis,
                requires_bridge: false,
            })),
            local: Arc::default(),
        }
    }

    /// Another handle to the same ledger (with its own insert log and validation rules).
    pub fn handle(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            local: Arc::default(),
        }
    }

    /// Require a bridge signature on every new block.
    pub fn set_requires_bridge(&self, requires_bridge: bool) {
        self.ledger.lock().unwrap().requires_bridge = requires_bridge;
    }

    pub fn set_ready(&self, ready: bool) {
        self.local.lock().unwrap().unready = !ready;
    }

    /// Fail every call to create a block.
    pub fn set_fail_create(&self, fail: bool) {
        self.local.lock().unwrap().fail_create = fail;
    }

    /// Fail validation of any block with `body`.
    pub fn reject(&self, body: Digest) {
        self.local.lock().unwrap().rejected.insert(body);
    }

    /// Blocks inserted through this handle.
    pub fn inserted(&self) -> Vec<Insert> {
        self.local.lock().unwrap().inserted.clone()
    }

    /// Height of the best block of the ledger.
    pub fn height(&self) -> u64 {
        let ledger = self.ledger.lock().unwrap();
        ledger.entries[&ledger.best].view.height
    }

    /// Finalized block at `hash` (if any).
    pub fn block(&self, hash: &Digest) -> Option<Block> {
        self.ledger
            .lock()
            .unwrap()
            .entries
            .get(hash)
            .and_then(|entry| entry.block.clone())
    }

    fn insert(&self, block: Block, prev: Option<Bytes>) -> Result<(), Error> {
        let hash = block.hash();
        {
            let mut ledger = self.ledger.lock().unwrap();
            let Some(parent) = ledger.entries.get(&block.parent()) else {
                return Err(Error::UnknownView);
            };
            if parent.view.height + 1 != block.height() {
                return Err(Error::InvalidBlock("height does not extend parent".into()));
            }
            if !ledger.entries.contains_key(&hash) {
                let view = View {
                    hash,
                    parent: block.parent(),
                    height: block.height(),
                    produce_timeslot: block.produce_timeslot(),
                    propose_timeslot: block.propose_timeslot(),
                    committee: block.committee(),
                };
                let best = ledger.entries[&ledger.best].view.height;
                if view.height > best {
                    ledger.best = hash;
                }
                ledger.entries.insert(
                    hash,
                    Entry {
                        view,
                        block: Some(block.clone()),
                    },
                );
            }
        }
        self.local
            .lock()
            .unwrap()
            .inserted
            .push(Insert { block, prev });
        Ok(())
    }
}

impl ChainAdapter for Chain {
    type Block = Block;

    fn chain(&self) -> ChainId {
        self.ledger.lock().unwrap().chain
    }

    fn is_ready(&self) -> bool {
        !self.local.lock().unwrap().unready
    }

    fn best_view(&self) -> Option<View> {
        let ledger = self.ledger.lock().unwrap();
        ledger.entries.get(&ledger.best).map(|entry| entry.view.clone())
    }

    fn final_view(&self) -> Option<View> {
        let ledger = self.ledger.lock().unwrap();
        let best = &ledger.entries.get(&ledger.best)?.view;
        ledger
            .entries
            .get(&best.parent)
            .map(|entry| entry.view.clone())
    }

    fn view(&self, hash: &Digest) -> Option<View> {
        self.ledger
            .lock()
            .unwrap()
            .entries
            .get(hash)
            .map(|entry| entry.view.clone())
    }

    fn decode_block(&self, bytes: &[u8]) -> Result<Block, Error> {
        Ok(Block::decode_cfg(bytes, &())?)
    }

    async fn create_block(
        &mut self,
        proposer: &Validator,
        timeslot: u64,
        _committee: &[Validator],
        reference: Digest,
    ) -> Result<Block, Error> {
        if self.local.lock().unwrap().fail_create {
            return Err(Error::BlockCreation("creation disabled".into()));
        }
        let (best, requires_bridge) = {
            let ledger = self.ledger.lock().unwrap();
            (
                ledger.entries[&ledger.best].view.clone(),
                ledger.requires_bridge,
            )
        };
        let payload = Bytes::from(format!("{}:{}", proposer.id(), timeslot));
        Ok(Block::new(
            best.hash,
            best.height + 1,
            proposer.clone(),
            proposer.clone(),
            timeslot,
            timeslot,
            reference,
            payload,
            requires_bridge,
        ))
    }

    async fn recreate_block(
        &mut self,
        old: &Block,
        proposer: &Validator,
        timeslot: u64,
        _committee: &[Validator],
        reference: Digest,
    ) -> Result<Block, Error> {
        let mut block = old.clone();
        block.proposer = proposer.clone();
        block.propose_timeslot = timeslot;
        block.committee = reference;
        block.validation = Bytes::new();
        Ok(block)
    }

    async fn validate_pre_sign(
        &mut self,
        block: &Block,
        signing: &[Validator],
        full: &[Validator],
    ) -> Result<(), Error> {
        if self.local.lock().unwrap().rejected.contains(&block.body()) {
            return Err(Error::InvalidBlock("rejected".into()));
        }
        let parent = self.view(&block.parent()).ok_or(Error::UnknownView)?;
        if parent.height + 1 != block.height() {
            return Err(Error::InvalidBlock("height does not extend parent".into()));
        }
        if !full.contains(&block.producer) {
            return Err(Error::InvalidBlock("producer not in committee".into()));
        }
        let data = ValidationData::decode_cfg(block.validation.clone(), &signing.len())?;
        if !block
            .proposer
            .bridge
            .verify(None, &block.hash(), &data.producer)
        {
            return Err(Error::InvalidBlock("invalid producer signature".into()));
        }
        Ok(())
    }

    async fn insert_and_broadcast(&mut self, block: Block) -> Result<(), Error> {
        self.insert(block, None)
    }

    async fn insert_and_broadcast_with_prev(
        &mut self,
        block: Block,
        prev: Bytes,
    ) -> Result<(), Error> {
        self.insert(block, Some(prev))
    }
}
