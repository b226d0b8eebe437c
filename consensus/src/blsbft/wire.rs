//! Messages exchanged between actors.

use super::Vote;
use bytes::{Buf, BufMut, Bytes};
use shardbft_codec::{EncodeSize, Error, RangeCfg, Read, ReadExt, Write};

/// Maximum length of a chain key.
const MAX_CHAIN_KEY: usize = 64;

/// Maximum length of a peer identifier.
const MAX_PEER: usize = 128;

const PROPOSE: u8 = 0;
const VOTE: u8 = 1;

/// A consensus message for a chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub chain_key: String,
    pub timeslot: u64,
    pub height: u64,
    pub payload: Payload,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Propose(Propose),
    Vote(Vote),
}

/// A block proposed by `peer`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Propose {
    pub peer: String,
    pub block: Bytes,
}

impl Write for Envelope {
    fn write(&self, buf: &mut impl BufMut) {
        self.chain_key.write(buf);
        self.timeslot.write(buf);
        self.height.write(buf);
        match &self.payload {
            Payload::Propose(propose) => {
                PROPOSE.write(buf);
                propose.peer.write(buf);
                propose.block.write(buf);
            }
            Payload::Vote(vote) => {
                VOTE.write(buf);
                vote.write(buf);
            }
        }
    }
}

impl Read for Envelope {
    /// Maximum size of an encoded block.
    type Cfg = usize;

    fn read_cfg(buf: &mut impl Buf, max_block_size: &usize) -> Result<Self, Error> {
        let chain_key = String::read_cfg(buf, &RangeCfg::from(1..=MAX_CHAIN_KEY))?;
        let timeslot = u64::read(buf)?;
        let height = u64::read(buf)?;
        let payload = match u8::read(buf)? {
            PROPOSE => {
                let peer = String::read_cfg(buf, &RangeCfg::from(..=MAX_PEER))?;
                let block = Bytes::read_cfg(buf, &RangeCfg::from(1..=*max_block_size))?;
                Payload::Propose(Propose { peer, block })
            }
            VOTE => Payload::Vote(Vote::read(buf)?),
            tag => return Err(Error::InvalidEnum("Payload", tag)),
        };
        Ok(Self {
            chain_key,
            timeslot,
            height,
            payload,
        })
    }
}

impl EncodeSize for Envelope {
    fn encode_size(&self) -> usize {
        self.chain_key.encode_size()
            + self.timeslot.encode_size()
            + self.height.encode_size()
            + 1
            + match &self.payload {
                Payload::Propose(propose) => {
                    propose.peer.encode_size() + propose.block.encode_size()
                }
                Payload::Vote(vote) => vote.encode_size(),
            }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blsbft::MiningKeySet;
    use shardbft_codec::{Decode, Encode};
    use shardbft_cryptography::hash;

    const MAX_BLOCK: usize = 1024;

    #[test]
    fn test_propose_envelope() {
        let envelope = Envelope {
            chain_key: "shard-0".into(),
            timeslot: 12,
            height: 3,
            payload: Payload::Propose(Propose {
                peer: "peer-1".into(),
                block: Bytes::from_static(b"block"),
            }),
        };
        let encoded = envelope.encode();
        assert_eq!(encoded.len(), envelope.encode_size());
        assert_eq!(Envelope::decode_cfg(encoded, &MAX_BLOCK).unwrap(), envelope);
    }

    #[test]
    fn test_vote_envelope() {
        let keys = MiningKeySet::from_seed(0);
        let vote = Vote::sign(&keys, b"ns", hash(b"block"), hash(b"parent"), true);
        let envelope = Envelope {
            chain_key: "beacon".into(),
            timeslot: 12,
            height: 3,
            payload: Payload::Vote(vote),
        };
        let decoded = Envelope::decode_cfg(envelope.encode(), &MAX_BLOCK).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_oversized_block() {
        let envelope = Envelope {
            chain_key: "shard-0".into(),
            timeslot: 1,
            height: 1,
            payload: Payload::Propose(Propose {
                peer: "peer-1".into(),
                block: Bytes::from(vec![0u8; MAX_BLOCK + 1]),
            }),
        };
        assert!(matches!(
            Envelope::decode_cfg(envelope.encode(), &MAX_BLOCK),
            Err(Error::InvalidLength(_))
        ));
    }

    #[test]
    fn test_unknown_payload() {
        let mut encoded = Envelope {
            chain_key: "shard-0".into(),
            timeslot: 1,
            height: 1,
            payload: Payload::Propose(Propose {
                peer: String::new(),
                block: Bytes::from_static(b"x"),
            }),
        }
        .encode();

        // chain key (1 + 7) + timeslot (8) + height (8) precede the tag
        encoded[24] = 7;
        assert!(matches!(
            Envelope::decode_cfg(encoded, &MAX_BLOCK),
            Err(Error::InvalidEnum("Payload", 7))
        ));
    }
}
