//! Binary reader for zero-copy parsing of byte slices.
//!
//! This module provides [`BinaryReader`], a cursor over a byte slice that
//! reads fixed-layout records without copying the underlying bytes.

use zerocopy::FromBytes;

use crate::{Error, Result};

/// A binary reader that provides zero-copy reading from a byte slice.
///
/// # Example
///
/// ```
/// use qda_common::BinaryReader;
///
/// let data = [0x00, 0x00, 0x00, 0x00, b'Q', b'D', b'A', b'0'];
/// let mut reader = BinaryReader::new(&data);
///
/// assert_eq!(reader.read_bytes(4).unwrap(), &[0u8; 4]);
/// assert_eq!(reader.read_bytes(4).unwrap(), b"QDA0");
/// assert!(reader.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BinaryReader<'a> {
    /// Create a new reader from a byte slice.
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Create a new reader starting at a specific position.
    #[inline]
    pub const fn new_at(data: &'a [u8], position: usize) -> Self {
        Self { data, position }
    }

    /// Get the current position in the buffer.
    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Get the number of bytes remaining to read.
    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Check if there are no more bytes to read.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Peek at bytes without advancing the position.
    #[inline]
    pub fn peek_bytes(&self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(Error::UnexpectedEof {
                needed: count,
                available: self.remaining(),
            });
        }
        Ok(&self.data[self.position..self.position + count])
    }

    /// Read bytes and advance the position.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let bytes = self.peek_bytes(count)?;
        self.position += count;
        Ok(bytes)
    }

    /// Read a fixed-layout record using zerocopy.
    ///
    /// The record must implement `FromBytes`; its byte order is whatever its
    /// field types encode, so on-disk structs should use zerocopy's
    /// little-endian wrappers rather than native integers.
    #[inline]
    pub fn read_struct<T: FromBytes>(&mut self) -> Result<T> {
        let size = std::mem::size_of::<T>();
        let bytes = self.read_bytes(size)?;
        T::read_from_bytes(bytes).map_err(|_| Error::UnexpectedEof {
            needed: size,
            available: bytes.len(),
        })
    }

    /// Read `count` consecutive fixed-layout records.
    pub fn read_array<T: FromBytes>(&mut self, count: usize) -> Result<Vec<T>> {
        let needed = count.saturating_mul(std::mem::size_of::<T>());
        if self.remaining() < needed {
            return Err(Error::UnexpectedEof {
                needed,
                available: self.remaining(),
            });
        }

        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(self.read_struct()?);
        }
        Ok(items)
    }
}
