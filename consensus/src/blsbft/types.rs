//! Types used in [crate::blsbft].

use super::keys::MiningKeySet;
use bytes::{Buf, BufMut};
use shardbft_codec::{
    EncodeSize, Error as CodecError, FixedSize, RangeCfg, Read, ReadExt, Write,
};
use shardbft_cryptography::{
    bls12381, secp256r1, sha256::Sha256, Digest, Signer, Verifier,
};
use std::{
    cmp::Ordering,
    fmt::{Debug, Display},
    hash::{Hash, Hasher},
};

/// Public keys of a committee member.
///
/// Ordering, equality, and hashing only consider the BLS key (a validator is identified by the
/// key it votes with).
#[derive(Clone)]
pub struct Validator {
    pub bls: bls12381::PublicKey,
    pub bridge: secp256r1::PublicKey,
}

impl Validator {
    /// Short identifier used in logs.
    pub fn id(&self) -> String {
        let full = self.bls.to_string();
        full[..16.min(full.len())].to_string()
    }
}

impl PartialEq for Validator {
    fn eq(&self, other: &Self) -> bool {
        self.bls == other.bls
    }
}

impl Eq for Validator {}

impl PartialOrd for Validator {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Validator {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bls.cmp(&other.bls)
    }
}

impl Hash for Validator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bls.hash(state);
    }
}

impl Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl Display for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl Write for Validator {
    fn write(&self, buf: &mut impl BufMut) {
        self.bls.write(buf);
        self.bridge.write(buf);
    }
}

impl Read for Validator {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let bls = bls12381::PublicKey::read(buf)?;
        let bridge = secp256r1::PublicKey::read(buf)?;
        Ok(Self { bls, bridge })
    }
}

impl FixedSize for Validator {
    const SIZE: usize = bls12381::PublicKey::SIZE + secp256r1::PublicKey::SIZE;
}

/// Classification of a vote after its signatures are checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteValidity {
    Unknown,
    Valid,
    Invalid,
}

/// A validator's signatures over a block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vote {
    pub validator: Validator,
    pub block: Digest,
    pub parent: Digest,

    /// Partial signature over `block` (aggregated once a quorum is reached).
    pub bls: bls12381::Signature,

    /// Bridge signature over `block`, present only if the block requires one.
    pub bridge: Option<secp256r1::Signature>,

    /// Bridge signature over all of the above.
    pub confirmation: secp256r1::Signature,
}

impl Vote {
    /// Sign `block` with both keys of `keys`.
    pub fn sign(
        keys: &MiningKeySet,
        namespace: &[u8],
        block: Digest,
        parent: Digest,
        requires_bridge: bool,
    ) -> Self {
        let bls = keys.bls().sign(Some(namespace), &block);
        let bridge = requires_bridge.then(|| keys.bridge().sign(None, &block));
        let confirmation = keys
            .bridge()
            .sign(None, &Self::confirmation_payload(&block, &bls, bridge.as_ref()));
        Self {
            validator: keys.identity(),
            block,
            parent,
            bls,
            bridge,
            confirmation,
        }
    }

    /// Digest signed by the confirmation signature.
    fn confirmation_payload(
        block: &Digest,
        bls: &bls12381::Signature,
        bridge: Option<&secp256r1::Signature>,
    ) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(block).update(bls.as_ref());
        if let Some(bridge) = bridge {
            hasher.update(bridge.as_ref());
        }
        hasher.finalize()
    }

    /// Verify every signature in the vote against the claimed validator.
    ///
    /// Checks the confirmation against the bridge key, the partial against the BLS key, and
    /// the bridge signature (if any) against the bridge key.
    pub fn verify(&self, namespace: &[u8]) -> bool {
        let payload = Self::confirmation_payload(&self.block, &self.bls, self.bridge.as_ref());
        if !self
            .validator
            .bridge
            .verify(None, &payload, &self.confirmation)
        {
            return false;
        }
        if let Some(bridge) = &self.bridge {
            if !self.validator.bridge.verify(None, &self.block, bridge) {
                return false;
            }
        }
        self.validator
            .bls
            .verify(Some(namespace), &self.block, &self.bls)
    }
}

impl Write for Vote {
    fn write(&self, buf: &mut impl BufMut) {
        self.validator.write(buf);
        self.block.write(buf);
        self.parent.write(buf);
        self.bls.write(buf);
        self.bridge.write(buf);
        self.confirmation.write(buf);
    }
}

impl Read for Vote {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let validator = Validator::read(buf)?;
        let block = Digest::read(buf)?;
        let parent = Digest::read(buf)?;
        let bls = bls12381::Signature::read(buf)?;
        let bridge = Option::<secp256r1::Signature>::read(buf)?;
        let confirmation = secp256r1::Signature::read(buf)?;
        Ok(Self {
            validator,
            block,
            parent,
            bls,
            bridge,
            confirmation,
        })
    }
}

impl EncodeSize for Vote {
    fn encode_size(&self) -> usize {
        Validator::SIZE
            + Digest::SIZE * 2
            + bls12381::Signature::SIZE
            + self.bridge.encode_size()
            + secp256r1::Signature::SIZE
    }
}

/// A [Vote] as tracked by a proposal record.
#[derive(Clone, Debug)]
pub struct VoteRecord {
    pub vote: Vote,
    pub validity: VoteValidity,
}

impl VoteRecord {
    pub fn new(vote: Vote) -> Self {
        Self {
            vote,
            validity: VoteValidity::Unknown,
        }
    }
}

/// Signatures embedded in a block.
///
/// When a block is proposed only `producer` is set. Once a quorum is reached, the aggregate
/// signature and the participating (sorted) signing-committee indices are filled in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationData {
    pub aggregate: Option<bls12381::Signature>,

    /// Bridge signature of each participant, in the same order as `validators`.
    pub bridge: Vec<Option<secp256r1::Signature>>,
    pub validators: Vec<u32>,

    /// Bridge signature of the producer over the block hash.
    pub producer: secp256r1::Signature,
}

impl ValidationData {
    /// Validation data carrying only the producer's signature.
    pub fn provisional(producer: secp256r1::Signature) -> Self {
        Self {
            aggregate: None,
            bridge: Vec::new(),
            validators: Vec::new(),
            producer,
        }
    }
}

impl Write for ValidationData {
    fn write(&self, buf: &mut impl BufMut) {
        self.aggregate.write(buf);
        self.bridge.write(buf);
        self.validators.write(buf);
        self.producer.write(buf);
    }
}

impl Read for ValidationData {
    /// Maximum number of participants.
    type Cfg = usize;

    fn read_cfg(buf: &mut impl Buf, max: &usize) -> Result<Self, CodecError> {
        let range = RangeCfg::from(..=*max);
        let aggregate = Option::<bls12381::Signature>::read(buf)?;
        let bridge = Vec::<Option<secp256r1::Signature>>::read_cfg(buf, &(range, ()))?;
        let validators = Vec::<u32>::read_cfg(buf, &(range, ()))?;
        if bridge.len() != validators.len() {
            return Err(CodecError::Invalid(
                "ValidationData",
                "bridge signatures do not match validators",
            ));
        }
        if !validators.windows(2).all(|w| w[0] < w[1]) {
            return Err(CodecError::Invalid(
                "ValidationData",
                "validators not sorted",
            ));
        }
        let producer = secp256r1::Signature::read(buf)?;
        Ok(Self {
            aggregate,
            bridge,
            validators,
            producer,
        })
    }
}

impl EncodeSize for ValidationData {
    fn encode_size(&self) -> usize {
        self.aggregate.encode_size()
            + self.bridge.encode_size()
            + self.validators.encode_size()
            + secp256r1::Signature::SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardbft_codec::{Decode, DecodeExt, Encode};
    use shardbft_cryptography::hash;

    const NAMESPACE: &[u8] = b"_SHARDBFT_TEST";

    #[test]
    fn test_vote_sign_verify() {
        let keys = MiningKeySet::from_seed(0);
        let vote = Vote::sign(&keys, NAMESPACE, hash(b"block"), hash(b"parent"), false);
        assert!(vote.bridge.is_none());
        assert!(vote.verify(NAMESPACE));
        assert!(!vote.verify(b"other"));

        let decoded = Vote::decode(vote.encode()).unwrap();
        assert_eq!(decoded, vote);
        assert!(decoded.verify(NAMESPACE));
    }

    #[test]
    fn test_vote_with_bridge() {
        let keys = MiningKeySet::from_seed(1);
        let vote = Vote::sign(&keys, NAMESPACE, hash(b"block"), hash(b"parent"), true);
        assert!(vote.bridge.is_some());
        assert!(vote.verify(NAMESPACE));

        // Dropping the bridge signature invalidates the confirmation
        let mut stripped = vote.clone();
        stripped.bridge = None;
        assert!(!stripped.verify(NAMESPACE));
    }

    #[test]
    fn test_vote_wrong_validator() {
        let keys = MiningKeySet::from_seed(2);
        let other = MiningKeySet::from_seed(3);
        let mut vote = Vote::sign(&keys, NAMESPACE, hash(b"block"), hash(b"parent"), false);
        vote.validator = other.identity();
        assert!(!vote.verify(NAMESPACE));
    }

    #[test]
    fn test_vote_tampered_block() {
        let keys = MiningKeySet::from_seed(4);
        let mut vote = Vote::sign(&keys, NAMESPACE, hash(b"block"), hash(b"parent"), false);
        vote.block = hash(b"other");
        assert!(!vote.verify(NAMESPACE));
    }

    #[test]
    fn test_validation_data_limits() {
        let keys = MiningKeySet::from_seed(5);
        let producer = keys.bridge().sign(None, b"block");
        let data = ValidationData {
            aggregate: None,
            bridge: vec![None, None, None],
            validators: vec![0, 1, 2],
            producer,
        };
        let encoded = data.encode();
        assert_eq!(encoded.len(), data.encode_size());
        assert_eq!(ValidationData::decode_cfg(encoded.clone(), &3).unwrap(), data);
        assert!(matches!(
            ValidationData::decode_cfg(encoded, &2),
            Err(CodecError::InvalidLength(3))
        ));
    }

    #[test]
    fn test_validation_data_unsorted() {
        let keys = MiningKeySet::from_seed(6);
        let producer = keys.bridge().sign(None, b"block");
        let data = ValidationData {
            aggregate: None,
            bridge: vec![None, None],
            validators: vec![1, 0],
            producer,
        };
        assert!(matches!(
            ValidationData::decode_cfg(data.encode(), &4),
            Err(CodecError::Invalid(_, "validators not sorted"))
        ));
    }
}
