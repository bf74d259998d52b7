//! Base-128 varint and zigzag primitives.
//!
//! Unsigned integers are written 7 bits at a time, least significant group first. Every byte
//! except the last has its high bit set. A `u64` needs at most [`MAX_VARINT_LEN`] bytes.
//!
//! Signed integers are first mapped to unsigned ones with the zigzag transform, so values close
//! to zero stay short regardless of sign:
//!
//! ```
//! use binpack::varint::zigzag;
//!
//! assert_eq!(zigzag(0), 0);
//! assert_eq!(zigzag(-1), 1);
//! assert_eq!(zigzag(1), 2);
//! assert_eq!(zigzag(-2), 3);
//! assert_eq!(zigzag(2), 4);
//! // etc
//! assert_eq!(zigzag(i64::MIN), u64::MAX);
//! ```
use crate::{
    error::{Result, varint_overflow},
    io::Source,
};

/// Maximum number of bytes an encoded `u64` occupies.
pub const MAX_VARINT_LEN: usize = 10;

/// Map a signed integer onto the unsigned integers, interleaving negatives and positives.
#[inline]
pub const fn zigzag(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

/// Inverse of [`zigzag`].
#[inline]
pub const fn unzigzag(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

/// Encode `v` into `buf`, returning the number of bytes used.
#[inline]
pub fn encode_uvarint(buf: &mut [u8; MAX_VARINT_LEN], mut v: u64) -> usize {
    let mut i = 0;
    while v >= 0x80 {
        buf[i] = (v as u8) | 0x80;
        v >>= 7;
        i += 1;
    }
    buf[i] = v as u8;
    i + 1
}

/// Number of bytes [`encode_uvarint`] produces for `v`.
#[inline]
pub const fn uvarint_len(v: u64) -> usize {
    let bits = 64 - (v | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Read an unsigned varint from `source`.
///
/// Fails with [`Error::VarintOverflow`](crate::Error::VarintOverflow) when the encoding runs past
/// [`MAX_VARINT_LEN`] bytes or its last group does not fit in 64 bits.
pub fn read_uvarint<S: Source + ?Sized>(source: &mut S) -> Result<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    for i in 0..MAX_VARINT_LEN {
        let byte = source.read_byte()?;
        if byte < 0x80 {
            if i == MAX_VARINT_LEN - 1 && byte > 1 {
                return Err(varint_overflow());
            }
            return Ok(value | (u64::from(byte) << shift));
        }
        value |= u64::from(byte & 0x7f) << shift;
        shift += 7;
    }
    Err(varint_overflow())
}
