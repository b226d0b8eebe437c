//! Generate keys, sign block hashes, and aggregate validator signatures.
//!
//! Validators hold two key pairs:
//! - a [bls12381] key used for votes, whose signatures over the same block hash can be
//!   aggregated into a single signature;
//! - a [secp256r1] "bridge" key used for non-aggregated confirmations.

use rand::{CryptoRng, Rng, SeedableRng};
use shardbft_codec::{Encode, ReadExt};
use std::{fmt::Debug, hash::Hash};

pub mod bls12381;
pub mod secp256r1;
pub mod sha256;
pub use sha256::{hash, Digest, Sha256};

/// Produces [Signature]s over messages that can be verified with a corresponding [PublicKey].
pub trait Signer: Send + Sync + Clone + 'static {
    /// The type of [Signature] produced by this [Signer].
    type Signature: Signature;

    /// The corresponding [PublicKey] type.
    type PublicKey: PublicKey<Signature = Self::Signature>;

    /// Returns the [PublicKey] corresponding to this [Signer].
    fn public_key(&self) -> Self::PublicKey;

    /// Sign a message with the given namespace.
    ///
    /// The namespace is prepended to the message (see [shardbft_utils::union_unique]) so that a
    /// signature produced for one purpose cannot be replayed for another.
    fn sign(&self, namespace: Option<&[u8]>, msg: &[u8]) -> Self::Signature;
}

/// A [Signer] that can be serialized and deserialized.
pub trait PrivateKey: Signer + Sized + ReadExt + Encode + PartialEq {}

/// A [PrivateKey] that can be generated from a seed or RNG.
pub trait PrivateKeyExt: PrivateKey {
    /// Create a [PrivateKey] from a seed.
    ///
    /// # Warning
    ///
    /// This function is insecure and should only be used for examples
    /// and testing.
    fn from_seed(seed: u64) -> Self {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        Self::from_rng(&mut rng)
    }

    /// Create a fresh [PrivateKey] using the supplied RNG.
    fn from_rng<R: Rng + CryptoRng>(rng: &mut R) -> Self;
}

/// Verifies [Signature]s over messages.
pub trait Verifier {
    /// The type of [Signature] that this verifier can verify.
    type Signature: Signature;

    /// Verify that a [Signature] is valid over a given message.
    ///
    /// The namespace provided here must match the namespace provided during signing.
    fn verify(&self, namespace: Option<&[u8]>, msg: &[u8], sig: &Self::Signature) -> bool;
}

/// A [PublicKey], able to verify [Signature]s.
pub trait PublicKey:
    Verifier + Sized + Clone + ReadExt + Encode + Eq + Ord + Hash + Debug + Send + Sync + 'static
{
}

/// A [Signature] over a message.
pub trait Signature: Sized + Clone + ReadExt + Encode + Eq + Debug + Send + Sync + 'static {}

#[cfg(test)]
mod tests {
    use super::*;
    use shardbft_codec::DecodeExt;

    fn test_sign_and_verify<C: PrivateKeyExt>() {
        let private_key = C::from_seed(0);
        let namespace = Some(&b"test_namespace"[..]);
        let message = b"test_message";
        let signature = private_key.sign(namespace, message);
        let public_key = private_key.public_key();
        assert!(public_key.verify(namespace, message, &signature));
    }

    fn test_wrong_namespace<C: PrivateKeyExt>() {
        let private_key = C::from_seed(0);
        let signature = private_key.sign(Some(&b"right"[..]), b"message");
        let public_key = private_key.public_key();
        assert!(!public_key.verify(Some(&b"wrong"[..]), b"message", &signature));
        assert!(!public_key.verify(None, b"message", &signature));
    }

    fn test_wrong_message<C: PrivateKeyExt>() {
        let private_key = C::from_seed(0);
        let namespace = Some(&b"namespace"[..]);
        let signature = private_key.sign(namespace, b"message");
        let public_key = private_key.public_key();
        assert!(!public_key.verify(namespace, b"other message", &signature));
    }

    fn test_wrong_signer<C: PrivateKeyExt>() {
        let signer = C::from_seed(0);
        let other = C::from_seed(1);
        let signature = signer.sign(None, b"message");
        assert!(!other.public_key().verify(None, b"message", &signature));
    }

    fn test_deterministic<C: PrivateKeyExt>() {
        let a = C::from_seed(42);
        let b = C::from_seed(42);
        assert!(a == b);
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.sign(None, b"message"), b.sign(None, b"message"));
    }

    fn test_codec<C: PrivateKeyExt>() {
        let private_key = C::from_seed(7);
        let decoded = C::decode(private_key.encode()).unwrap();
        assert!(decoded == private_key);

        let public_key = private_key.public_key();
        let decoded = C::PublicKey::decode(public_key.encode()).unwrap();
        assert_eq!(decoded, public_key);

        let signature = private_key.sign(None, b"message");
        let decoded = C::Signature::decode(signature.encode()).unwrap();
        assert_eq!(decoded, signature);
    }

    #[test]
    fn test_bls12381() {
        test_sign_and_verify::<bls12381::PrivateKey>();
        test_wrong_namespace::<bls12381::PrivateKey>();
        test_wrong_message::<bls12381::PrivateKey>();
        test_wrong_signer::<bls12381::PrivateKey>();
        test_deterministic::<bls12381::PrivateKey>();
        test_codec::<bls12381::PrivateKey>();
    }

    #[test]
    fn test_secp256r1() {
        test_sign_and_verify::<secp256r1::PrivateKey>();
        test_wrong_namespace::<secp256r1::PrivateKey>();
        test_wrong_message::<secp256r1::PrivateKey>();
        test_wrong_signer::<secp256r1::PrivateKey>();
        test_deterministic::<secp256r1::PrivateKey>();
        test_codec::<secp256r1::PrivateKey>();
    }
}
