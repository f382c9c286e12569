use crate::{Error, Result};

/// Add two sizes, failing on overflow.
#[inline]
pub fn add(a: usize, b: usize) -> Result<usize> {
    a.checked_add(b).ok_or(Error::Overflow)
}

/// Multiply two sizes, failing on overflow.
#[inline]
pub fn mul(a: usize, b: usize) -> Result<usize> {
    a.checked_mul(b).ok_or(Error::Overflow)
}

/// Convert a size to a 16-bit field, failing if it does not fit.
#[inline]
pub fn to_u16(v: usize) -> Result<u16> {
    u16::try_from(v).map_err(|_| Error::Overflow)
}

/// Convert a size to a 32-bit field, failing if it does not fit.
#[inline]
pub fn to_u32(v: usize) -> Result<u32> {
    u32::try_from(v).map_err(|_| Error::Overflow)
}

/// Get a subslice, failing if it is out of bounds.
#[inline]
pub fn slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    data.get(offset..add(offset, len)?).ok_or(Error::OutOfBounds)
}
