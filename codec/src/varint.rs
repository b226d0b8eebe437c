//! Variable-length integer encoding (LEB128).
//!
//! Each byte carries 7 bits of the value and a continuation bit that indicates
//! whether more bytes follow. Only unsigned fixed-width integers are supported so
//! the encoding never depends on the target architecture.

use crate::Error;
use bytes::{Buf, BufMut};

const DATA_BITS_PER_BYTE: u32 = 7;
const DATA_BITS_MASK: u8 = 0x7F;
const CONTINUATION_BIT_MASK: u8 = 0x80;

/// An unsigned integer that can be varint encoded.
pub trait UInt: Copy + Into<u64> + TryFrom<u64> {
    /// Number of bits in the integer.
    const BITS: u32;
}

impl UInt for u16 {
    const BITS: u32 = u16::BITS;
}

impl UInt for u32 {
    const BITS: u32 = u32::BITS;
}

impl UInt for u64 {
    const BITS: u32 = u64::BITS;
}

/// Encodes an unsigned integer as a varint.
pub fn write<T: UInt>(value: T, buf: &mut impl BufMut) {
    let mut value: u64 = value.into();
    while value >= CONTINUATION_BIT_MASK as u64 {
        buf.put_u8((value as u8 & DATA_BITS_MASK) | CONTINUATION_BIT_MASK);
        value >>= DATA_BITS_PER_BYTE;
    }
    buf.put_u8(value as u8);
}

/// Decodes an unsigned integer from a varint.
///
/// Rejects encodings that overflow `T` or that contain redundant trailing zero bytes
/// (so that every value has exactly one valid encoding).
pub fn read<T: UInt>(buf: &mut impl Buf) -> Result<T, Error> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    loop {
        if !buf.has_remaining() {
            return Err(Error::EndOfBuffer);
        }
        let byte = buf.get_u8();
        let data = (byte & DATA_BITS_MASK) as u64;

        // Ensure the decoded bits fit in the target type
        if shift >= T::BITS || (shift > 0 && data.leading_zeros() < 64 - (T::BITS - shift)) {
            return Err(Error::InvalidVarint);
        }
        result |= data << shift;

        if byte & CONTINUATION_BIT_MASK == 0 {
            // A zero byte after the first is non-canonical
            if byte == 0 && shift > 0 {
                return Err(Error::InvalidVarint);
            }
            return T::try_from(result).map_err(|_| Error::InvalidVarint);
        }
        shift += DATA_BITS_PER_BYTE;
    }
}

/// Returns the number of bytes needed to encode the value.
pub fn size<T: UInt>(value: T) -> usize {
    let value: u64 = value.into();
    let bits = 64 - value.leading_zeros().min(63);
    bits.div_ceil(DATA_BITS_PER_BYTE) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_varint_sizes() {
        let cases: [(u64, usize); 7] = [
            (0, 1),
            (1, 1),
            (127, 1),
            (128, 2),
            (16_383, 2),
            (16_384, 3),
            (u64::MAX, 10),
        ];
        for (value, expected) in cases {
            let mut buf = BytesMut::new();
            write(value, &mut buf);
            assert_eq!(buf.len(), expected, "value {value}");
            assert_eq!(size(value), expected, "value {value}");
            assert_eq!(read::<u64>(&mut buf.freeze()).unwrap(), value);
        }
    }

    #[test]
    fn test_varint_overflow() {
        // 2^32 does not fit in a u32
        let mut buf = BytesMut::new();
        write(1u64 << 32, &mut buf);
        assert!(matches!(
            read::<u32>(&mut buf.freeze()),
            Err(Error::InvalidVarint)
        ));
    }

    #[test]
    fn test_varint_non_canonical() {
        let mut buf: &[u8] = &[0x80, 0x00];
        assert!(matches!(read::<u32>(&mut buf), Err(Error::InvalidVarint)));
    }

    #[test]
    fn test_varint_truncated() {
        let mut buf: &[u8] = &[0x80];
        assert!(matches!(read::<u32>(&mut buf), Err(Error::EndOfBuffer)));
    }
}
