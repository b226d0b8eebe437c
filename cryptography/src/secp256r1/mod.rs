//! Secp256r1 "bridge" keys used for non-aggregated confirmations.
//!
//! Public keys are handled in compressed form (SEC 1, Version 2.0, Section 2.3.3). Signatures are
//! deterministic ([RFC 6979](https://datatracker.ietf.org/doc/html/rfc6979)) and normalized to
//! low-s form ([BIP 62](https://github.com/bitcoin/bips/blob/master/bip-0062.mediawiki#low-s-values-in-signatures)).
//! Signatures with a high `s` value are rejected at decode time.
//!
//! # Example
//!
//! ```rust
//! use shardbft_cryptography::{secp256r1, PrivateKeyExt, Signer, Verifier};
//! use rand::rngs::OsRng;
//!
//! let signer = secp256r1::PrivateKey::from_rng(&mut OsRng);
//! let namespace = Some(&b"demo"[..]);
//! let msg = b"hello, world!";
//!
//! let signature = signer.sign(namespace, msg);
//! assert!(signer.public_key().verify(namespace, msg, &signature));
//! ```

mod scheme;

pub use scheme::{PrivateKey, PublicKey, Signature};
