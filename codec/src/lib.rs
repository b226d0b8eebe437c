//! Serialize consensus messages and validation data.
//!
//! # Overview
//!
//! A binary serialization library designed to:
//! - Serialize structured data into a compact, canonical binary format
//! - Deserialize untrusted binary input (received from peers) into structured data
//!
//! Decoding is always bounded. Variable-length types (`Vec<T>`, `Bytes`, `String`) require a
//! [RangeCfg] (supplied through [Read::Cfg]) that limits how many items may be allocated.
//!
//! # Supported Types
//!
//! - Primitives: `u8`, `u16`, `u32`, `u64`, `i64`, `bool`
//! - Collections: `Vec<T>`, `Option<T>`, `Bytes`, `String`, and fixed-size arrays `[u8; N]`
//!
//! # Example
//!
//! ```
//! use bytes::{Buf, BufMut};
//! use shardbft_codec::{DecodeExt, Encode, EncodeSize, Error, Read, ReadExt, Write};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Item {
//!     height: u64,
//!     parent: Option<[u8; 4]>,
//! }
//!
//! impl Write for Item {
//!     fn write(&self, buf: &mut impl BufMut) {
//!         self.height.write(buf);
//!         self.parent.write(buf);
//!     }
//! }
//!
//! impl Read for Item {
//!     type Cfg = ();
//!
//!     fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
//!         let height = u64::read(buf)?;
//!         let parent = Option::<[u8; 4]>::read(buf)?;
//!         Ok(Self { height, parent })
//!     }
//! }
//!
//! impl EncodeSize for Item {
//!     fn encode_size(&self) -> usize {
//!         self.height.encode_size() + self.parent.encode_size()
//!     }
//! }
//!
//! let item = Item { height: 7, parent: Some([1, 2, 3, 4]) };
//! let encoded = item.encode();
//! assert_eq!(Item::decode(encoded).unwrap(), item);
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod types;
mod util;
pub mod varint;

pub use codec::{Decode, DecodeExt, Encode, EncodeSize, FixedSize, Read, ReadExt, Write};
pub use config::RangeCfg;
pub use error::Error;
