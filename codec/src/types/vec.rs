//! Codec implementation for [Vec].

use crate::{varint, EncodeSize, Error, RangeCfg, Read, Write};
use bytes::{Buf, BufMut};

impl<T: Write> Write for Vec<T> {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        let len = u32::try_from(self.len()).expect("Vec length exceeds u32");
        varint::write(len, buf);
        for item in self {
            item.write(buf);
        }
    }
}

impl<T: EncodeSize> EncodeSize for Vec<T> {
    #[inline]
    fn encode_size(&self) -> usize {
        let len = u32::try_from(self.len()).expect("Vec length exceeds u32");
        varint::size(len) + self.iter().map(EncodeSize::encode_size).sum::<usize>()
    }
}

impl<T: Read> Read for Vec<T> {
    type Cfg = (RangeCfg, T::Cfg);

    #[inline]
    fn read_cfg(buf: &mut impl Buf, (range, cfg): &Self::Cfg) -> Result<Self, Error> {
        let len = varint::read::<u32>(buf)? as usize;
        if !range.contains(len) {
            return Err(Error::InvalidLength(len));
        }
        let mut vec = Vec::with_capacity(len);
        for _ in 0..len {
            vec.push(T::read_cfg(buf, cfg)?);
        }
        Ok(vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Decode, Encode};

    #[test]
    fn test_vec() {
        let values = [vec![], vec![1u16], vec![1u16, 2, 3]];
        for value in values {
            let len = value.len();
            let encoded = value.encode();
            assert_eq!(encoded.len(), 1 + len * 2);
            assert_eq!(
                Vec::<u16>::decode_cfg(encoded, &(RangeCfg::exact(len), ())),
                Ok(value.clone())
            );
        }
    }

    #[test]
    fn test_vec_too_long() {
        let value = vec![1u8, 2, 3];
        assert_eq!(
            Vec::<u8>::decode_cfg(value.encode(), &(RangeCfg::from(..3), ())),
            Err(Error::InvalidLength(3))
        );
    }
}
