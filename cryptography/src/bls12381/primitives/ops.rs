//! Digital signatures over the BLS12-381 curve using G1 as the Public Key (48 bytes)
//! and G2 as the Signature (96 bytes).
//!
//! Signatures from different validators over the same message can be summed into a single
//! aggregate that verifies against the sum of their public keys.

use super::{
    group::{self, Element, Scalar},
    Error,
};
use rand::RngCore;
use shardbft_utils::union_unique;
use std::borrow::Cow;

/// Computes the public key from the private key.
pub fn compute_public(private: &Scalar) -> group::Public {
    let mut public = group::Public::one();
    public.mul(private);
    public
}

/// Returns a new keypair derived from the provided randomness.
pub fn keypair<R: RngCore>(rng: &mut R) -> (group::Private, group::Public) {
    let private = group::Private::rand(rng);
    let public = compute_public(&private);
    (private, public)
}

/// Hashes the provided message (prefixed by `namespace`, if any) to G2.
pub fn hash_message(namespace: Option<&[u8]>, message: &[u8]) -> group::Signature {
    let payload = match namespace {
        Some(namespace) => Cow::Owned(union_unique(namespace, message)),
        None => Cow::Borrowed(message),
    };
    let mut hm = group::Signature::zero();
    hm.map(&payload);
    hm
}

/// Signs the provided message with the private key.
///
/// # Determinism
///
/// Signatures produced by this function are deterministic and are safe
/// to use in a consensus-critical context.
pub fn sign_message(
    private: &group::Private,
    namespace: Option<&[u8]>,
    message: &[u8],
) -> group::Signature {
    let mut hm = hash_message(namespace, message);
    hm.mul(private);
    hm
}

/// Verifies the signature with the provided public key.
///
/// # Warning
///
/// This function assumes a group check was already performed on
/// `public` and `signature`.
pub fn verify_message(
    public: &group::Public,
    namespace: Option<&[u8]>,
    message: &[u8],
    signature: &group::Signature,
) -> Result<(), Error> {
    let hm = hash_message(namespace, message);
    if !group::equal(public, signature, &hm) {
        return Err(Error::InvalidSignature);
    }
    Ok(())
}

/// Aggregates multiple public keys.
///
/// # Warning
///
/// This function assumes a group check was already performed on all `public_keys` and
/// that each `public_key` is unique.
pub fn aggregate_public_keys<'a, I>(public_keys: I) -> group::Public
where
    I: IntoIterator<Item = &'a group::Public>,
{
    let mut p = group::Public::zero();
    for pk in public_keys {
        p.add(pk);
    }
    p
}

/// Aggregates multiple signatures.
///
/// Returns [Error::EmptyAggregate] if no signatures are provided.
pub fn aggregate_signatures<'a, I>(signatures: I) -> Result<group::Signature, Error>
where
    I: IntoIterator<Item = &'a group::Signature>,
{
    let mut s = group::Signature::zero();
    let mut count = 0usize;
    for sig in signatures {
        s.add(sig);
        count += 1;
    }
    if count == 0 {
        return Err(Error::EmptyAggregate);
    }
    Ok(s)
}

/// Verifies the aggregate signature over a single message from multiple public keys.
///
/// # Warning
///
/// It is not safe to provide duplicate public keys. Committee keys are registered ahead
/// of time, so rogue-key attacks are out of reach of an unregistered signer.
pub fn aggregate_verify_multiple_public_keys<'a, I>(
    public: I,
    namespace: Option<&[u8]>,
    message: &[u8],
    signature: &group::Signature,
) -> Result<(), Error>
where
    I: IntoIterator<Item = &'a group::Public>,
{
    // Bilinearity lets us sum the public keys of everyone that signed the same message.
    let agg_public = aggregate_public_keys(public);
    verify_message(&agg_public, namespace, message, signature)
}
