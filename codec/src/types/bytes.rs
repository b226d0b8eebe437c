//! Codec implementations for byte buffers and strings.
//!
//! Lengths are varint-prefixed and must fit within a [u32].

use crate::{util::at_least, varint, EncodeSize, Error, RangeCfg, Read, Write};
use bytes::{Buf, BufMut, Bytes};

fn read_len(buf: &mut impl Buf, range: &RangeCfg) -> Result<usize, Error> {
    let len = varint::read::<u32>(buf)? as usize;
    if !range.contains(len) {
        return Err(Error::InvalidLength(len));
    }
    at_least(buf, len)?;
    Ok(len)
}

fn write_len(len: usize, buf: &mut impl BufMut) {
    let len = u32::try_from(len).expect("length exceeds u32");
    varint::write(len, buf);
}

fn len_size(len: usize) -> usize {
    varint::size(u32::try_from(len).expect("length exceeds u32"))
}

impl Write for Bytes {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        write_len(self.len(), buf);
        buf.put_slice(self);
    }
}

impl EncodeSize for Bytes {
    #[inline]
    fn encode_size(&self) -> usize {
        len_size(self.len()) + self.len()
    }
}

impl Read for Bytes {
    type Cfg = RangeCfg;

    #[inline]
    fn read_cfg(buf: &mut impl Buf, range: &RangeCfg) -> Result<Self, Error> {
        let len = read_len(buf, range)?;
        Ok(buf.copy_to_bytes(len))
    }
}

impl Write for String {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        write_len(self.len(), buf);
        buf.put_slice(self.as_bytes());
    }
}

impl EncodeSize for String {
    #[inline]
    fn encode_size(&self) -> usize {
        len_size(self.len()) + self.len()
    }
}

impl Read for String {
    type Cfg = RangeCfg;

    #[inline]
    fn read_cfg(buf: &mut impl Buf, range: &RangeCfg) -> Result<Self, Error> {
        let len = read_len(buf, range)?;
        let mut raw = vec![0; len];
        buf.copy_to_slice(&mut raw);
        String::from_utf8(raw).map_err(|_| Error::Invalid("String", "invalid utf-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Decode, Encode};

    #[test]
    fn test_bytes() {
        let values = [
            Bytes::new(),
            Bytes::from_static(&[1, 2, 3]),
            Bytes::from(vec![0; 300]),
        ];
        for value in values {
            let len = value.len();
            let encoded = value.encode();
            assert_eq!(encoded.len(), varint::size(len as u32) + len);
            assert_eq!(Bytes::decode_cfg(encoded, &RangeCfg::exact(len)), Ok(value.clone()));

            // Too long for the configured range
            if len > 0 {
                assert_eq!(
                    Bytes::decode_cfg(value.encode(), &RangeCfg::from(0..len)),
                    Err(Error::InvalidLength(len))
                );
            }
        }
    }

    #[test]
    fn test_string() {
        let value = String::from("beacon");
        assert_eq!(String::decode_cfg(value.encode(), &RangeCfg::from(..=64)), Ok(value));

        let invalid = Bytes::from_static(&[2, 0xff, 0xfe]);
        assert!(matches!(
            String::decode_cfg(invalid, &RangeCfg::from(..)),
            Err(Error::Invalid("String", _))
        ));
    }
}
