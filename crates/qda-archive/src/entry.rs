//! Entry descriptor structure.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use qda_common::{fixed_str, BinaryReader};
use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::header::HEADER_SIZE;
use crate::{Error, Result};

/// Size of one entry descriptor in bytes.
pub const DESCRIPTOR_SIZE: usize = 268;

/// Width of the NUL-terminated id field.
pub const ID_SIZE: usize = 256;

/// Longest name that fits in the id field alongside its terminator.
pub const MAX_NAME_LEN: usize = ID_SIZE - 1;

/// Offset of the first payload byte in an archive with `entry_count` entries.
#[inline]
pub const fn data_start(entry_count: u64) -> u64 {
    HEADER_SIZE as u64 + DESCRIPTOR_SIZE as u64 * entry_count
}

/// Per-entry descriptor in the table following the header.
///
/// Describes where a payload lives; the payload itself is read through
/// [`QdaArchive::read`](crate::QdaArchive::read).
#[derive(Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct EntryDescriptor {
    offset: U32,
    stored_length: U32,
    restored_length: U32,
    id: [u8; ID_SIZE],
}

const _: () = assert!(std::mem::size_of::<EntryDescriptor>() == DESCRIPTOR_SIZE);

impl EntryDescriptor {
    /// Create an uncompressed descriptor.
    ///
    /// The name is stored byte for byte and need not be UTF-8. Fails with
    /// [`Error::NameTooLong`] if it is longer than [`MAX_NAME_LEN`] bytes and
    /// [`Error::InvalidName`] if it contains a NUL byte. A descriptor that
    /// exists always encodes without loss.
    pub fn new(name: impl AsRef<[u8]>, offset: u32, length: u32) -> Result<Self> {
        Ok(Self {
            offset: U32::new(offset),
            stored_length: U32::new(length),
            restored_length: U32::new(length),
            id: encode_id(name.as_ref())?,
        })
    }

    /// Decode a descriptor from the first 268 bytes of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < DESCRIPTOR_SIZE {
            return Err(Error::TruncatedFile {
                offset: 0,
                needed: DESCRIPTOR_SIZE as u64,
                available: bytes.len() as u64,
            });
        }

        Ok(BinaryReader::new(bytes).read_struct()?)
    }

    /// Encode the descriptor.
    pub fn encode(&self) -> [u8; DESCRIPTOR_SIZE] {
        let mut out = [0u8; DESCRIPTOR_SIZE];
        out.copy_from_slice(self.as_bytes());
        out
    }

    /// Absolute offset of the payload from the start of the file.
    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset.get()
    }

    /// Payload length as stored.
    #[inline]
    pub fn stored_length(&self) -> u32 {
        self.stored_length.get()
    }

    /// Payload length after decompression.
    #[inline]
    pub fn restored_length(&self) -> u32 {
        self.restored_length.get()
    }

    /// One past the last payload byte.
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset() as u64 + self.stored_length() as u64
    }

    /// Name bytes before the first NUL.
    #[inline]
    pub fn name_bytes(&self) -> &[u8] {
        fixed_str::read(&self.id)
    }

    /// Name as text for display, with invalid UTF-8 replaced.
    ///
    /// Use [`name_bytes`](Self::name_bytes) wherever the exact id matters.
    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name_bytes())
    }

    /// Exact byte comparison against the NUL-terminated id.
    #[inline]
    pub fn is_named(&self, name: impl AsRef<[u8]>) -> bool {
        self.name_bytes() == name.as_ref()
    }

    /// Destination of this entry when extracted under `root`.
    ///
    /// The raw id bytes are used verbatim, so `/` separators select
    /// subdirectories of `root` and non-UTF-8 names keep their exact bytes.
    /// Empty and absolute names and `..` components are refused with
    /// [`Error::UnsafeEntryName`]. On platforms whose paths are not byte
    /// strings, a name that is not UTF-8 fails with
    /// [`Error::UnrepresentableName`].
    pub fn output_path(&self, root: &Path) -> Result<PathBuf> {
        let relative = bytes_to_path(self.name_bytes())
            .ok_or_else(|| Error::UnrepresentableName(self.name().into_owned()))?;

        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });

        if escapes || relative.as_os_str().is_empty() {
            return Err(Error::UnsafeEntryName(self.name().into_owned()));
        }

        Ok(root.join(relative))
    }
}

impl std::fmt::Debug for EntryDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryDescriptor")
            .field("name", &self.name())
            .field("offset", &self.offset())
            .field("stored_length", &self.stored_length())
            .field("restored_length", &self.restored_length())
            .finish()
    }
}

#[cfg(unix)]
fn bytes_to_path(bytes: &[u8]) -> Option<&Path> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    Some(Path::new(OsStr::from_bytes(bytes)))
}

#[cfg(not(unix))]
fn bytes_to_path(bytes: &[u8]) -> Option<&Path> {
    std::str::from_utf8(bytes).ok().map(Path::new)
}

/// Check that `name` can be stored as an id, returning the encoded field.
pub(crate) fn encode_id(name: &[u8]) -> Result<[u8; ID_SIZE]> {
    fixed_str::write::<ID_SIZE>(name).map_err(|e| match e {
        qda_common::Error::StringTooLong { len, .. } => Error::NameTooLong {
            name: String::from_utf8_lossy(name).into_owned(),
            len,
        },
        qda_common::Error::InteriorNul { .. } => {
            Error::InvalidName(String::from_utf8_lossy(name).into_owned())
        }
        other => Error::Common(other),
    })
}
