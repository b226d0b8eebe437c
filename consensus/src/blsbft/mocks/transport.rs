//! An in-memory network connecting the mailboxes of every validator.

use crate::{
    blsbft::{wire::Envelope, Error, Mailbox},
    ChainId, NodeTransport,
};
use bytes::Bytes;
use shardbft_codec::Decode;
use shardbft_cryptography::Digest;
use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, Mutex},
};

/// A request for missing blocks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub from: String,
    pub to: String,
    pub hashes: Vec<Digest>,
    pub chain: ChainId,
}

struct State {
    max_block_size: usize,
    mailboxes: BTreeMap<String, Mailbox>,
    offline: HashSet<String>,
    sent: usize,
    broadcasts: Vec<(String, Envelope)>,
    requests: Vec<Request>,
}

/// Routes broadcasts to every other registered peer.
#[derive(Clone)]
pub struct Hub {
    state: Arc<Mutex<State>>,
}

impl Hub {
    pub fn new(max_block_size: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                max_block_size,
                mailboxes: BTreeMap::new(),
                offline: HashSet::new(),
                sent: 0,
                broadcasts: Vec::new(),
                requests: Vec::new(),
            })),
        }
    }

    /// Transport for `peer`.
    pub fn transport(&self, peer: &str) -> Transport {
        Transport {
            peer: peer.to_string(),
            hub: self.clone(),
        }
    }

    /// Deliver messages for `peer` to `mailbox`.
    pub fn register(&self, peer: &str, mailbox: Mailbox) {
        self.state
            .lock()
            .unwrap()
            .mailboxes
            .insert(peer.to_string(), mailbox);
    }

    /// Drop all messages sent by or to `peer`.
    pub fn disconnect(&self, peer: &str) {
        self.state.lock().unwrap().offline.insert(peer.to_string());
    }

    pub fn reconnect(&self, peer: &str) {
        self.state.lock().unwrap().offline.remove(peer);
    }

    /// Number of messages delivered.
    pub fn sent(&self) -> usize {
        self.state.lock().unwrap().sent
    }

    /// Messages broadcast by `peer` while it was online.
    pub fn broadcasts(&self, peer: &str) -> Vec<Envelope> {
        self.state
            .lock()
            .unwrap()
            .broadcasts
            .iter()
            .filter(|(from, _)| from == peer)
            .map(|(_, envelope)| envelope.clone())
            .collect()
    }

    /// Requests for missing blocks made so far.
    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().unwrap().requests.clone()
    }
}

#[derive(Clone)]
pub struct Transport {
    peer: String,
    hub: Hub,
}

impl NodeTransport for Transport {
    fn self_peer(&self) -> String {
        self.peer.clone()
    }

    async fn broadcast(&mut self, chain_key: &str, message: Bytes) -> Result<(), Error> {
        let (envelope, recipients) = {
            let mut state = self.hub.state.lock().unwrap();
            let envelope = Envelope::decode_cfg(message, &state.max_block_size)?;
            if envelope.chain_key != chain_key {
                return Err(Error::Unexpected("chain key mismatch".into()));
            }
            if state.offline.contains(&self.peer) {
                return Ok(());
            }
            let recipients: Vec<Mailbox> = state
                .mailboxes
                .iter()
                .filter(|(peer, _)| **peer != self.peer && !state.offline.contains(*peer))
                .map(|(_, mailbox)| mailbox.clone())
                .collect();
            state.sent += recipients.len();
            state.broadcasts.push((self.peer.clone(), envelope.clone()));
            (envelope, recipients)
        };
        for mut mailbox in recipients {
            mailbox.deliver(envelope.clone()).await;
        }
        Ok(())
    }

    async fn request_missing(
        &mut self,
        peer: String,
        hashes: Vec<Digest>,
        chain: ChainId,
    ) -> Result<(), Error> {
        self.hub.state.lock().unwrap().requests.push(Request {
            from: self.peer.clone(),
            to: peer,
            hashes,
            chain,
        });
        Ok(())
    }
}
