//! Codec implementation for [Option].
//!
//! A single `bool` tag precedes the value.

use crate::{EncodeSize, Error, Read, ReadExt, Write};
use bytes::{Buf, BufMut};

impl<T: Write> Write for Option<T> {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        self.is_some().write(buf);
        if let Some(inner) = self {
            inner.write(buf);
        }
    }
}

impl<T: EncodeSize> EncodeSize for Option<T> {
    #[inline]
    fn encode_size(&self) -> usize {
        1 + self.as_ref().map_or(0, EncodeSize::encode_size)
    }
}

impl<T: Read> Read for Option<T> {
    type Cfg = T::Cfg;

    #[inline]
    fn read_cfg(buf: &mut impl Buf, cfg: &Self::Cfg) -> Result<Self, Error> {
        if bool::read(buf)? {
            Ok(Some(T::read_cfg(buf, cfg)?))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{DecodeExt, Encode};

    #[test]
    fn test_option() {
        let some = Some(42u32);
        assert_eq!(some.encode().len(), 5);
        assert_eq!(Option::<u32>::decode(some.encode()), Ok(some));

        let none: Option<u32> = None;
        assert_eq!(none.encode().len(), 1);
        assert_eq!(Option::<u32>::decode(none.encode()), Ok(None));
    }
}
