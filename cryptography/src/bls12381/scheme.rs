use super::primitives::{
    group::{self, G1_ELEMENT_BYTE_LENGTH, G2_ELEMENT_BYTE_LENGTH, SCALAR_LENGTH},
    ops,
};
use crate::{PrivateKeyExt, Signer, Verifier};
use bytes::{Buf, BufMut};
use rand::{CryptoRng, Rng};
use shardbft_codec::{DecodeExt, Encode, Error as CodecError, FixedSize, Read, ReadExt, Write};
use shardbft_utils::hex;
use std::{
    cmp::Ordering,
    fmt::{Debug, Display},
    hash::{Hash, Hasher},
};
use zeroize::Zeroize;

/// BLS12-381 private key.
#[derive(Clone)]
pub struct PrivateKey {
    raw: [u8; SCALAR_LENGTH],
    key: group::Private,
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.raw.zeroize();
        self.key.zeroize();
    }
}

impl From<group::Private> for PrivateKey {
    fn from(key: group::Private) -> Self {
        let mut raw = [0u8; SCALAR_LENGTH];
        raw.copy_from_slice(&key.encode());
        Self { raw, key }
    }
}

impl Write for PrivateKey {
    fn write(&self, buf: &mut impl BufMut) {
        self.raw.write(buf);
    }
}

impl Read for PrivateKey {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let raw = <[u8; SCALAR_LENGTH]>::read(buf)?;
        let key = group::Private::decode(&raw[..])?;
        Ok(Self { raw, key })
    }
}

impl FixedSize for PrivateKey {
    const SIZE: usize = SCALAR_LENGTH;
}

impl Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bls12381::PrivateKey({})", self.public_key())
    }
}

impl Signer for PrivateKey {
    type Signature = Signature;
    type PublicKey = PublicKey;

    fn public_key(&self) -> PublicKey {
        PublicKey::from(ops::compute_public(&self.key))
    }

    fn sign(&self, namespace: Option<&[u8]>, msg: &[u8]) -> Signature {
        Signature::from(ops::sign_message(&self.key, namespace, msg))
    }
}

impl crate::PrivateKey for PrivateKey {}

impl PrivateKeyExt for PrivateKey {
    fn from_rng<R: Rng + CryptoRng>(rng: &mut R) -> Self {
        let (private, _) = ops::keypair(rng);
        Self::from(private)
    }
}

/// BLS12-381 public key (a compressed G1 point).
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct PublicKey {
    raw: [u8; G1_ELEMENT_BYTE_LENGTH],
    key: group::Public,
}

impl PublicKey {
    /// Returns the underlying group element.
    pub fn point(&self) -> &group::Public {
        &self.key
    }
}

impl From<group::Public> for PublicKey {
    fn from(key: group::Public) -> Self {
        let mut raw = [0u8; G1_ELEMENT_BYTE_LENGTH];
        raw.copy_from_slice(&key.encode());
        Self { raw, key }
    }
}

impl Write for PublicKey {
    fn write(&self, buf: &mut impl BufMut) {
        self.raw.write(buf);
    }
}

impl Read for PublicKey {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let raw = <[u8; G1_ELEMENT_BYTE_LENGTH]>::read(buf)?;
        let key = group::Public::decode(&raw[..])?;
        Ok(Self { raw, key })
    }
}

impl FixedSize for PublicKey {
    const SIZE: usize = G1_ELEMENT_BYTE_LENGTH;
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.raw
    }
}

impl Hash for PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.raw))
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.raw))
    }
}

impl Verifier for PublicKey {
    type Signature = Signature;

    fn verify(&self, namespace: Option<&[u8]>, msg: &[u8], sig: &Signature) -> bool {
        ops::verify_message(&self.key, namespace, msg, &sig.signature).is_ok()
    }
}

impl crate::PublicKey for PublicKey {}

/// BLS12-381 signature (a compressed G2 point).
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Signature {
    raw: [u8; G2_ELEMENT_BYTE_LENGTH],
    signature: group::Signature,
}

impl From<group::Signature> for Signature {
    fn from(signature: group::Signature) -> Self {
        let mut raw = [0u8; G2_ELEMENT_BYTE_LENGTH];
        raw.copy_from_slice(&signature.encode());
        Self { raw, signature }
    }
}

impl Write for Signature {
    fn write(&self, buf: &mut impl BufMut) {
        self.raw.write(buf);
    }
}

impl Read for Signature {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let raw = <[u8; G2_ELEMENT_BYTE_LENGTH]>::read(buf)?;
        let signature = group::Signature::decode(&raw[..])?;
        Ok(Self { raw, signature })
    }
}

impl FixedSize for Signature {
    const SIZE: usize = G2_ELEMENT_BYTE_LENGTH;
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.raw
    }
}

impl Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.raw))
    }
}

impl crate::Signature for Signature {}

/// Sums signatures produced over the same message.
///
/// Returns `None` if `signatures` is empty.
pub fn aggregate_signatures<'a, I>(signatures: I) -> Option<Signature>
where
    I: IntoIterator<Item = &'a Signature>,
{
    ops::aggregate_signatures(signatures.into_iter().map(|s| &s.signature))
        .ok()
        .map(Signature::from)
}

/// Verifies an aggregate signature over `msg` against every signer in `public_keys`.
pub fn aggregate_verify<'a, I>(
    public_keys: I,
    namespace: Option<&[u8]>,
    msg: &[u8],
    signature: &Signature,
) -> bool
where
    I: IntoIterator<Item = &'a PublicKey>,
{
    ops::aggregate_verify_multiple_public_keys(
        public_keys.into_iter().map(|p| &p.key),
        namespace,
        msg,
        &signature.signature,
    )
    .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lengths() {
        let signer = PrivateKey::from_seed(0);
        assert_eq!(signer.encode().len(), SCALAR_LENGTH);
        assert_eq!(signer.public_key().encode().len(), G1_ELEMENT_BYTE_LENGTH);
        assert_eq!(signer.sign(None, b"msg").encode().len(), G2_ELEMENT_BYTE_LENGTH);
    }

    #[test]
    fn test_aggregate_subset() {
        let signers: Vec<_> = (0..4).map(PrivateKey::from_seed).collect();
        let namespace = Some(&b"votes"[..]);
        let msg = b"hash";
        let signatures: Vec<_> = signers.iter().map(|s| s.sign(namespace, msg)).collect();
        let publics: Vec<_> = signers.iter().map(|s| s.public_key()).collect();

        let aggregate = aggregate_signatures(&signatures[1..]).unwrap();
        assert!(aggregate_verify(&publics[1..], namespace, msg, &aggregate));
        assert!(!aggregate_verify(&publics, namespace, msg, &aggregate));
        assert!(!aggregate_verify(&publics[1..], namespace, b"other", &aggregate));
        assert!(aggregate_signatures(std::iter::empty()).is_none());
    }

    #[test]
    fn test_invalid_public_key() {
        let bytes = [0xffu8; G1_ELEMENT_BYTE_LENGTH];
        assert!(PublicKey::decode(&bytes[..]).is_err());
    }
}
