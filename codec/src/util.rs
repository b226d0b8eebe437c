use crate::Error;
use bytes::Buf;

/// Checks that the buffer holds at least `len` more bytes.
#[inline]
pub(crate) fn at_least(buf: &impl Buf, len: usize) -> Result<(), Error> {
    if buf.remaining() < len {
        return Err(Error::EndOfBuffer);
    }
    Ok(())
}
