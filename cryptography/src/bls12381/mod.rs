//! BLS12-381 keys and signatures used for votes.
//!
//! This module uses the `blst` crate for BLS12-381 operations. Points are serialized according to
//! the "ZCash BLS12-381" format and messages are hashed according to RFC 9380.
//!
//! # Example
//!
//! ```rust
//! use shardbft_cryptography::{bls12381, PrivateKeyExt, Signer, Verifier};
//!
//! let signers: Vec<_> = (0..3).map(bls12381::PrivateKey::from_seed).collect();
//! let namespace = Some(&b"demo"[..]);
//! let msg = b"block hash";
//!
//! let signatures: Vec<_> = signers.iter().map(|s| s.sign(namespace, msg)).collect();
//! let publics: Vec<_> = signers.iter().map(|s| s.public_key()).collect();
//!
//! let aggregate = bls12381::aggregate_signatures(&signatures).unwrap();
//! assert!(bls12381::aggregate_verify(&publics, namespace, msg, &aggregate));
//! assert!(publics[0].verify(namespace, msg, &signatures[0]));
//! ```

pub mod primitives;
mod scheme;

pub use scheme::{aggregate_signatures, aggregate_verify, PrivateKey, PublicKey, Signature};
