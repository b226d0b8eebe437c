//! Group operations over BLS12-381.
//!
//! Public keys live in G1 (48 bytes compressed) and signatures in G2 (96 bytes compressed).
//!
//! # Warning
//!
//! Points decoded from untrusted input must be checked to belong to the correct subgroup
//! to prevent small subgroup attacks. The [Read] implementations in this module perform
//! that check (and reject the point at infinity).

use blst::{
    blst_bendian_from_scalar, blst_final_exp, blst_fp12, blst_fp12_is_equal, blst_fr,
    blst_fr_add, blst_fr_from_scalar, blst_fr_mul, blst_hash_to_g2, blst_keygen_v3,
    blst_miller_loop, blst_p1, blst_p1_add_or_double, blst_p1_affine, blst_p1_compress,
    blst_p1_from_affine, blst_p1_in_g1, blst_p1_is_equal, blst_p1_is_inf, blst_p1_mult,
    blst_p1_to_affine, blst_p1_uncompress, blst_p2, blst_p2_add_or_double, blst_p2_affine,
    blst_p2_compress, blst_p2_from_affine, blst_p2_in_g2, blst_p2_is_equal, blst_p2_is_inf,
    blst_p2_mult, blst_p2_to_affine, blst_p2_uncompress, blst_scalar, blst_scalar_fr_check,
    blst_scalar_from_bendian, blst_scalar_from_fr, BLS12_381_G1, BLS12_381_G2, BLST_ERROR,
};
use bytes::{Buf, BufMut};
use rand::RngCore;
use shardbft_codec::{Error as CodecError, FixedSize, Read, ReadExt, Write};
use std::ptr;
use zeroize::Zeroize;

/// An element of a group.
pub trait Element: Clone + Eq + PartialEq + Send + Sync {
    /// Returns the additive identity.
    fn zero() -> Self;

    /// Returns the multiplicative identity (the generator for curve points).
    fn one() -> Self;

    /// Adds to self in-place.
    fn add(&mut self, rhs: &Self);

    /// Multiplies self in-place.
    fn mul(&mut self, rhs: &Scalar);
}

/// A scalar in the BLS12-381 field.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(transparent)]
pub struct Scalar(blst_fr);

pub const SCALAR_LENGTH: usize = 32;

/// `R = 2^256 mod q` in little-endian Montgomery form, which is 1 in non-Montgomery form.
// Reference: https://github.com/filecoin-project/blstrs/blob/ffbb41d1495d84e40a712583346439924603b49a/src/scalar.rs#L77-L89
const BLST_FR_ONE: Scalar = Scalar(blst_fr {
    l: [
        0x0000_0001_ffff_fffe,
        0x5884_b7fa_0003_4802,
        0x998c_4fef_ecbc_4ff5,
        0x1824_b159_acc5_056f,
    ],
});

/// A point in G1 (used for public keys).
#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
pub struct G1(blst_p1);

pub const G1_ELEMENT_BYTE_LENGTH: usize = 48;

/// A point in G2 (used for signatures).
#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
pub struct G2(blst_p2);

pub const G2_ELEMENT_BYTE_LENGTH: usize = 96;

/// Domain separation tag for hashing a message to G2.
pub const DST_G2: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_NUL_";

/// An element of the target group.
#[derive(Debug, Clone, Copy)]
pub struct GT(blst_fp12);

// Points are stored in projective coordinates, so equality must not compare raw fields.
impl PartialEq for G1 {
    fn eq(&self, other: &Self) -> bool {
        unsafe { blst_p1_is_equal(&self.0, &other.0) }
    }
}

impl Eq for G1 {}

impl PartialEq for G2 {
    fn eq(&self, other: &Self) -> bool {
        unsafe { blst_p2_is_equal(&self.0, &other.0) }
    }
}

impl Eq for G2 {}

impl PartialEq for GT {
    fn eq(&self, other: &Self) -> bool {
        unsafe { blst_fp12_is_equal(&self.0, &other.0) }
    }
}

impl Eq for GT {}

pub type Private = Scalar;
pub type Public = G1;
pub type Signature = G2;

/// Returns the size in bits of a given blst_scalar (represented in little-endian).
fn bits(scalar: &blst_scalar) -> usize {
    let mut bits: usize = SCALAR_LENGTH * 8;
    for i in scalar.b.iter().rev() {
        let leading = i.leading_zeros();
        bits -= leading as usize;
        if leading < 8 {
            break;
        }
    }
    bits
}

impl Scalar {
    /// Generates a random, non-zero scalar using the provided RNG.
    pub fn rand<R: RngCore>(rng: &mut R) -> Self {
        let mut ikm = [0u8; 64];
        rng.fill_bytes(&mut ikm);

        let mut ret = blst_fr::default();
        unsafe {
            let mut sc = blst_scalar::default();
            blst_keygen_v3(&mut sc, ikm.as_ptr(), ikm.len(), ptr::null(), 0);
            blst_fr_from_scalar(&mut ret, &sc);
        }
        ikm.zeroize();
        Self(ret)
    }

    fn as_blst_scalar(&self) -> blst_scalar {
        let mut scalar = blst_scalar::default();
        unsafe { blst_scalar_from_fr(&mut scalar, &self.0) };
        scalar
    }
}

impl Zeroize for Scalar {
    fn zeroize(&mut self) {
        self.0.l.zeroize();
    }
}

impl Element for Scalar {
    fn zero() -> Self {
        Self(blst_fr::default())
    }

    fn one() -> Self {
        BLST_FR_ONE
    }

    fn add(&mut self, rhs: &Self) {
        unsafe { blst_fr_add(&mut self.0, &self.0, &rhs.0) };
    }

    fn mul(&mut self, rhs: &Self) {
        unsafe { blst_fr_mul(&mut self.0, &self.0, &rhs.0) };
    }
}

impl Write for Scalar {
    fn write(&self, buf: &mut impl BufMut) {
        let mut bytes = [0u8; SCALAR_LENGTH];
        let mut scalar = self.as_blst_scalar();
        unsafe { blst_bendian_from_scalar(bytes.as_mut_ptr(), &scalar) };
        buf.put_slice(&bytes);
        scalar.b.zeroize();
        bytes.zeroize();
    }
}

impl Read for Scalar {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let mut bytes = <[u8; SCALAR_LENGTH]>::read(buf)?;
        let mut ret = blst_fr::default();
        let valid = unsafe {
            let mut scalar = blst_scalar::default();
            blst_scalar_from_bendian(&mut scalar, bytes.as_ptr());
            let valid = blst_scalar_fr_check(&scalar);
            if valid {
                blst_fr_from_scalar(&mut ret, &scalar);
            }
            scalar.b.zeroize();
            valid
        };
        bytes.zeroize();
        if !valid {
            return Err(CodecError::Invalid("Scalar", "not in field"));
        }
        let ret = Self(ret);
        if ret == Self::zero() {
            return Err(CodecError::Invalid("Scalar", "zero"));
        }
        Ok(ret)
    }
}

impl FixedSize for Scalar {
    const SIZE: usize = SCALAR_LENGTH;
}

impl Element for G1 {
    fn zero() -> Self {
        Self(blst_p1::default())
    }

    fn one() -> Self {
        let mut ret = blst_p1::default();
        unsafe { blst_p1_from_affine(&mut ret, &BLS12_381_G1) };
        Self(ret)
    }

    fn add(&mut self, rhs: &Self) {
        unsafe { blst_p1_add_or_double(&mut self.0, &self.0, &rhs.0) };
    }

    fn mul(&mut self, rhs: &Scalar) {
        let scalar = rhs.as_blst_scalar();
        unsafe { blst_p1_mult(&mut self.0, &self.0, scalar.b.as_ptr(), bits(&scalar)) };
    }
}

impl Write for G1 {
    fn write(&self, buf: &mut impl BufMut) {
        let mut bytes = [0u8; G1_ELEMENT_BYTE_LENGTH];
        unsafe { blst_p1_compress(bytes.as_mut_ptr(), &self.0) };
        buf.put_slice(&bytes);
    }
}

impl Read for G1 {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let bytes = <[u8; G1_ELEMENT_BYTE_LENGTH]>::read(buf)?;
        let mut ret = blst_p1::default();
        unsafe {
            let mut affine = blst_p1_affine::default();
            if blst_p1_uncompress(&mut affine, bytes.as_ptr()) != BLST_ERROR::BLST_SUCCESS {
                return Err(CodecError::Invalid("G1", "invalid encoding"));
            }
            blst_p1_from_affine(&mut ret, &affine);
            if blst_p1_is_inf(&ret) {
                return Err(CodecError::Invalid("G1", "point at infinity"));
            }
            if !blst_p1_in_g1(&ret) {
                return Err(CodecError::Invalid("G1", "not in subgroup"));
            }
        }
        Ok(Self(ret))
    }
}

impl FixedSize for G1 {
    const SIZE: usize = G1_ELEMENT_BYTE_LENGTH;
}

impl G2 {
    /// Maps the provided data to a point in G2.
    pub fn map(&mut self, data: &[u8]) {
        unsafe {
            blst_hash_to_g2(
                &mut self.0,
                data.as_ptr(),
                data.len(),
                DST_G2.as_ptr(),
                DST_G2.len(),
                ptr::null(),
                0,
            );
        }
    }
}

impl Element for G2 {
    fn zero() -> Self {
        Self(blst_p2::default())
    }

    fn one() -> Self {
        let mut ret = blst_p2::default();
        unsafe { blst_p2_from_affine(&mut ret, &BLS12_381_G2) };
        Self(ret)
    }

    fn add(&mut self, rhs: &Self) {
        unsafe { blst_p2_add_or_double(&mut self.0, &self.0, &rhs.0) };
    }

    fn mul(&mut self, rhs: &Scalar) {
        let scalar = rhs.as_blst_scalar();
        unsafe { blst_p2_mult(&mut self.0, &self.0, scalar.b.as_ptr(), bits(&scalar)) };
    }
}

impl Write for G2 {
    fn write(&self, buf: &mut impl BufMut) {
        let mut bytes = [0u8; G2_ELEMENT_BYTE_LENGTH];
        unsafe { blst_p2_compress(bytes.as_mut_ptr(), &self.0) };
        buf.put_slice(&bytes);
    }
}

impl Read for G2 {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let bytes = <[u8; G2_ELEMENT_BYTE_LENGTH]>::read(buf)?;
        let mut ret = blst_p2::default();
        unsafe {
            let mut affine = blst_p2_affine::default();
            if blst_p2_uncompress(&mut affine, bytes.as_ptr()) != BLST_ERROR::BLST_SUCCESS {
                return Err(CodecError::Invalid("G2", "invalid encoding"));
            }
            blst_p2_from_affine(&mut ret, &affine);
            if blst_p2_is_inf(&ret) {
                return Err(CodecError::Invalid("G2", "point at infinity"));
            }
            if !blst_p2_in_g2(&ret) {
                return Err(CodecError::Invalid("G2", "not in subgroup"));
            }
        }
        Ok(Self(ret))
    }
}

impl FixedSize for G2 {
    const SIZE: usize = G2_ELEMENT_BYTE_LENGTH;
}

fn pairing(p: &G1, q: &G2) -> GT {
    // Reference: https://github.com/MystenLabs/fastcrypto/blob/bd4999bd3e901eab34ae3dd96dbe38b86ac646a7/fastcrypto/src/groups/bls12381.rs#L223-L234
    let mut pa = blst_p1_affine::default();
    let mut qa = blst_p2_affine::default();
    let mut res = blst_fp12::default();
    unsafe {
        blst_p1_to_affine(&mut pa, &p.0);
        blst_p2_to_affine(&mut qa, &q.0);
        blst_miller_loop(&mut res, &qa, &pa);
        blst_final_exp(&mut res, &res);
    }
    GT(res)
}

/// Checks `e(G1::one(), sig) == e(public, hm)`.
pub(super) fn equal(public: &G1, sig: &G2, hm: &G2) -> bool {
    pairing(&G1::one(), sig) == pairing(public, hm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use shardbft_codec::{DecodeExt, Encode};

    #[test]
    fn test_scalar_arithmetic() {
        let mut rng = StdRng::seed_from_u64(0);
        let s = Scalar::rand(&mut rng);

        // (s + s) * G == s*G + s*G
        let mut s2 = s;
        s2.add(&s);
        let mut p1 = G1::one();
        p1.mul(&s2);

        let mut p2 = G1::one();
        p2.mul(&s);
        p2.add(&p2.clone());
        assert_eq!(p1, p2);

        // 1 * G == G
        let mut p3 = G2::one();
        p3.mul(&Scalar::one());
        assert_eq!(p3, G2::one());
    }

    #[test]
    fn test_codec() {
        let mut rng = StdRng::seed_from_u64(1);
        let s = Scalar::rand(&mut rng);
        assert_eq!(Scalar::decode(s.encode()).unwrap(), s);

        let mut p = G1::one();
        p.mul(&s);
        assert_eq!(p.encode().len(), G1_ELEMENT_BYTE_LENGTH);
        assert_eq!(G1::decode(p.encode()).unwrap(), p);

        let mut q = G2::one();
        q.mul(&s);
        assert_eq!(q.encode().len(), G2_ELEMENT_BYTE_LENGTH);
        assert_eq!(G2::decode(q.encode()).unwrap(), q);
    }

    #[test]
    fn test_reject_infinity() {
        assert!(matches!(
            G1::decode(G1::zero().encode()),
            Err(CodecError::Invalid("G1", _))
        ));
        assert!(matches!(
            G2::decode(G2::zero().encode()),
            Err(CodecError::Invalid("G2", _))
        ));
    }

    #[test]
    fn test_reject_zero_scalar() {
        assert!(matches!(
            Scalar::decode(&[0u8; SCALAR_LENGTH][..]),
            Err(CodecError::Invalid("Scalar", "zero"))
        ));
    }
}
