//! Archive header structure.

use qda_common::BinaryReader;
use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{Error, Result};

/// Size of the archive header in bytes.
pub const HEADER_SIZE: usize = 256;

/// Signature bytes identifying a QDA archive.
pub const SIGNATURE: [u8; 4] = *b"QDA0";

/// Byte offset of the signature within the file.
pub const SIGNATURE_OFFSET: usize = 4;

/// Compression flag stored in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Payloads are stored as-is.
    None,
    /// Flag value 1. Reserved for compressed payloads; no codec is defined.
    Reserved,
    /// Any other flag value.
    Unknown(u32),
}

impl Compression {
    /// Raw flag value as stored on disk.
    pub fn as_raw(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Reserved => 1,
            Self::Unknown(value) => value,
        }
    }
}

impl From<u32> for Compression {
    fn from(value: u32) -> Self {
        match value {
            0 => Self::None,
            1 => Self::Reserved,
            other => Self::Unknown(other),
        }
    }
}

/// File-level header at offset 0.
///
/// Every field is byte-aligned, so the struct has no padding and its memory
/// layout is exactly the 256-byte wire layout.
#[derive(Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct ArchiveHeader {
    compression: U32,
    signature: [u8; 4],
    entry_count: U32,
    reserved: [u8; 244],
}

const _: () = assert!(std::mem::size_of::<ArchiveHeader>() == HEADER_SIZE);

impl ArchiveHeader {
    /// Create an uncompressed header for `entry_count` entries.
    pub fn new(entry_count: u32) -> Self {
        Self {
            compression: U32::new(0),
            signature: SIGNATURE,
            entry_count: U32::new(entry_count),
            reserved: [0; 244],
        }
    }

    /// Decode a header from the first 256 bytes of `bytes`.
    ///
    /// The signature is extracted but not checked.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::TruncatedFile {
                offset: 0,
                needed: HEADER_SIZE as u64,
                available: bytes.len() as u64,
            });
        }

        Ok(BinaryReader::new(bytes).read_struct()?)
    }

    /// Encode the header, zero-filling the reserved region.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let clean = Self {
            reserved: [0; 244],
            ..*self
        };

        let mut out = [0u8; HEADER_SIZE];
        out.copy_from_slice(clean.as_bytes());
        out
    }

    /// Compression flag.
    #[inline]
    pub fn compression(&self) -> Compression {
        Compression::from(self.compression.get())
    }

    /// Raw signature bytes.
    #[inline]
    pub fn signature(&self) -> [u8; 4] {
        self.signature
    }

    /// Whether the signature reads `QDA0`.
    #[inline]
    pub fn has_valid_signature(&self) -> bool {
        self.signature == SIGNATURE
    }

    /// Number of entry descriptors following the header.
    #[inline]
    pub fn entry_count(&self) -> u32 {
        self.entry_count.get()
    }
}

impl std::fmt::Debug for ArchiveHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveHeader")
            .field("compression", &self.compression())
            .field("signature", &self.signature.escape_ascii().to_string())
            .field("entry_count", &self.entry_count())
            .finish()
    }
}
