//! NUL-terminated strings stored in fixed-width byte fields.
//!
//! A field of `N` bytes holds at most `N - 1` string bytes followed by a NUL
//! terminator; every byte after the terminator is zero.

use memchr::memchr;

use crate::{Error, Result};

/// Significant bytes of a fixed-width field: everything before the first NUL.
///
/// A field without any NUL is returned whole.
#[inline]
pub fn read(field: &[u8]) -> &[u8] {
    match memchr(0, field) {
        Some(end) => &field[..end],
        None => field,
    }
}

/// Encode `value` into a zero-filled `N`-byte field.
///
/// Fails if the value plus its terminator does not fit, or if the value
/// contains a NUL byte that would cut it short on read.
pub fn write<const N: usize>(value: &[u8]) -> Result<[u8; N]> {
    if value.len() + 1 > N {
        return Err(Error::StringTooLong {
            len: value.len(),
            capacity: N,
        });
    }
    if let Some(position) = memchr(0, value) {
        return Err(Error::InteriorNul { position });
    }

    let mut field = [0u8; N];
    field[..value.len()].copy_from_slice(value);
    Ok(field)
}
