//! Operations over the BLS12-381 curve.
//!
//! # Acknowledgements
//!
//! _The following crates were used as a reference when implementing this module. If code is very
//! similar to the reference, it is accompanied by a comment and link._
//!
//! * <https://github.com/celo-org/celo-threshold-bls-rs>: Operations over the BLS12-381 scalar field.
//! * <https://github.com/filecoin-project/blstrs> + <https://github.com/MystenLabs/fastcrypto>: Implementing
//!   operations over the BLS12-381 scalar field with <https://github.com/supranational/blst>.

pub mod group;
pub mod ops;

use thiserror::Error;

/// Errors that can occur when working with BLS12-381 primitives.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("no signatures to aggregate")]
    EmptyAggregate,
}
