use crate::{PrivateKeyExt, Signer, Verifier};
use bytes::{Buf, BufMut};
use p256::{
    ecdsa::{
        signature::{Signer as _, Verifier as _},
        SigningKey, VerifyingKey,
    },
    elliptic_curve::scalar::IsHigh,
};
use rand::{CryptoRng, Rng};
use shardbft_codec::{Error as CodecError, FixedSize, Read, ReadExt, Write};
use shardbft_utils::{hex, union_unique};
use std::{
    borrow::Cow,
    cmp::Ordering,
    fmt::{Debug, Display},
    hash::{Hash, Hasher},
};
use zeroize::Zeroize;

const PRIVATE_KEY_LENGTH: usize = 32;
const PUBLIC_KEY_LENGTH: usize = 33; // Y-Parity || X
const SIGNATURE_LENGTH: usize = 64; // R || S

/// Secp256r1 private key.
#[derive(Clone)]
pub struct PrivateKey {
    raw: [u8; PRIVATE_KEY_LENGTH],
    key: SigningKey,
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.raw.zeroize();
    }
}

impl From<SigningKey> for PrivateKey {
    fn from(key: SigningKey) -> Self {
        let mut raw = [0u8; PRIVATE_KEY_LENGTH];
        raw.copy_from_slice(&key.to_bytes());
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
        let raw = <[u8; PRIVATE_KEY_LENGTH]>::read(buf)?;
        let key = SigningKey::from_slice(&raw)
            .map_err(|_| CodecError::Invalid("secp256r1::PrivateKey", "invalid scalar"))?;
        Ok(Self { raw, key })
    }
}

impl FixedSize for PrivateKey {
    const SIZE: usize = PRIVATE_KEY_LENGTH;
}

impl Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "secp256r1::PrivateKey({})", self.public_key())
    }
}

impl Signer for PrivateKey {
    type Signature = Signature;
    type PublicKey = PublicKey;

    fn public_key(&self) -> PublicKey {
        PublicKey::from(*self.key.verifying_key())
    }

    fn sign(&self, namespace: Option<&[u8]>, msg: &[u8]) -> Signature {
        let signature: p256::ecdsa::Signature = match namespace {
            Some(namespace) => self.key.sign(&union_unique(namespace, msg)),
            None => self.key.sign(msg),
        };
        let signature = signature.normalize_s().unwrap_or(signature);
        Signature::from(signature)
    }
}

impl crate::PrivateKey for PrivateKey {}

impl PrivateKeyExt for PrivateKey {
    fn from_rng<R: Rng + CryptoRng>(rng: &mut R) -> Self {
        Self::from(SigningKey::random(rng))
    }
}

/// Secp256r1 public key (compressed).
#[derive(Clone, Eq, PartialEq)]
pub struct PublicKey {
    raw: [u8; PUBLIC_KEY_LENGTH],
    key: VerifyingKey,
}

impl From<VerifyingKey> for PublicKey {
    fn from(key: VerifyingKey) -> Self {
        let mut raw = [0u8; PUBLIC_KEY_LENGTH];
        raw.copy_from_slice(key.to_encoded_point(true).as_bytes());
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
        let raw = <[u8; PUBLIC_KEY_LENGTH]>::read(buf)?;
        let key = VerifyingKey::from_sec1_bytes(&raw)
            .map_err(|_| CodecError::Invalid("secp256r1::PublicKey", "invalid point"))?;
        Ok(Self { raw, key })
    }
}

impl FixedSize for PublicKey {
    const SIZE: usize = PUBLIC_KEY_LENGTH;
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
        let payload = match namespace {
            Some(namespace) => Cow::Owned(union_unique(namespace, msg)),
            None => Cow::Borrowed(msg),
        };
        self.key.verify(&payload, &sig.signature).is_ok()
    }
}

impl crate::PublicKey for PublicKey {}

/// Secp256r1 signature (`R || S`, low-s).
#[derive(Clone, Eq, PartialEq)]
pub struct Signature {
    raw: [u8; SIGNATURE_LENGTH],
    signature: p256::ecdsa::Signature,
}

impl From<p256::ecdsa::Signature> for Signature {
    fn from(signature: p256::ecdsa::Signature) -> Self {
        let mut raw = [0u8; SIGNATURE_LENGTH];
        raw.copy_from_slice(&signature.to_bytes());
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
        let raw = <[u8; SIGNATURE_LENGTH]>::read(buf)?;
        let signature = p256::ecdsa::Signature::from_slice(&raw)
            .map_err(|_| CodecError::Invalid("secp256r1::Signature", "invalid signature"))?;
        if signature.s().is_high().into() {
            return Err(CodecError::Invalid("secp256r1::Signature", "high s"));
        }
        Ok(Self { raw, signature })
    }
}

impl FixedSize for Signature {
    const SIZE: usize = SIGNATURE_LENGTH;
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

/// Test vectors sourced from (FIPS 186-4)
/// https://csrc.nist.gov/projects/cryptographic-algorithm-validation-program/digital-signatures.
#[cfg(test)]
mod tests {
    use super::*;
    use shardbft_codec::{DecodeExt, Encode};
    use shardbft_utils::from_hex_formatted;

    fn private_key(hex: &str) -> PrivateKey {
        PrivateKey::decode(from_hex_formatted(hex).unwrap().as_slice()).unwrap()
    }

    #[test]
    fn test_private_key_roundtrip() {
        let private_key_hex = "519b423d715f8b581f4fa8ee59f4771a5b44c8130b4e3eacca54a56dda72b464";
        let signer = private_key(private_key_hex);
        assert_eq!(private_key_hex, hex(&signer.encode()));
    }

    // Ensure RFC6979 compliance (should also be tested by underlying library)
    #[test]
    fn test_rfc6979() {
        let signer = private_key("c9afa9d845ba75166b5c215767b1d6934e50c3db36e89b127b8a622b120f6721");
        let expected = p256::ecdsa::Signature::from_slice(
            &from_hex_formatted(
                "efd48b2aacb6a8fd1140dd9cd45e81d69d2c877b56aaf991c34d0ea84eaf3716
                f7cb1c942d657c41d436c7a1b6e29f65f3e900dbb9aff4064dc4ab2f843acda8",
            )
            .unwrap(),
        )
        .unwrap();
        let signature = signer.sign(None, b"sample");
        assert_eq!(
            signature.as_ref(),
            expected.normalize_s().unwrap().to_bytes().as_slice()
        );
    }

    #[test]
    fn test_reject_high_s() {
        let signer = PrivateKey::from_seed(3);
        let signature = signer.sign(None, b"message");

        // Flip s to n - s, which is a valid but non-normalized signature
        let (r, s) = signature.signature.split_scalars();
        let high = p256::ecdsa::Signature::from_scalars(r, -*s).unwrap();
        let mut raw = [0u8; SIGNATURE_LENGTH];
        raw.copy_from_slice(&high.to_bytes());
        assert!(matches!(
            Signature::decode(&raw[..]),
            Err(CodecError::Invalid("secp256r1::Signature", "high s"))
        ));
    }

    #[test]
    fn test_reject_invalid_public_key() {
        let mut raw = [0u8; PUBLIC_KEY_LENGTH];
        raw[0] = 0x02;
        raw[1..].fill(0xff);
        assert!(PublicKey::decode(&raw[..]).is_err());
    }
}
