//! QDA archive reader.

use std::fs::File;
use std::io;
use std::path::Path;

use memmap2::Mmap;
use qda_common::BinaryReader;
use tracing::{debug, warn};

use crate::entry::{data_start, EntryDescriptor};
use crate::header::{ArchiveHeader, Compression, HEADER_SIZE, SIGNATURE, SIGNATURE_OFFSET};
use crate::{Error, Result};

/// A QDA archive opened for reading.
///
/// The descriptor table is decoded once on open; payloads are borrowed
/// straight from the backing storage, which is a memory map for archives
/// opened from disk.
pub struct QdaArchive<D = Mmap> {
    /// Backing archive bytes
    data: D,
    /// Archive file name
    name: String,
    /// Decoded file header
    header: ArchiveHeader,
    /// Descriptor table in file order
    entries: Vec<EntryDescriptor>,
}

impl QdaArchive<Mmap> {
    /// Open and validate an archive on disk.
    ///
    /// Fails with [`Error::PathNotFound`] if the file cannot be found and
    /// [`Error::NotAnArchive`] if it does not carry the `QDA0` signature.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::PathNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;

        // Mapping an empty file fails on some platforms; it cannot hold a
        // signature anyway.
        if file.metadata()?.len() == 0 {
            return Err(Error::NotAnArchive {
                found: String::new(),
            });
        }

        // SAFETY: the map is read-only and lives no longer than the archive.
        // Concurrent truncation of the file by another process is not guarded.
        let mmap = unsafe { Mmap::map(&file)? };

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Self::from_data(mmap, name)
    }
}

impl<D: AsRef<[u8]>> QdaArchive<D> {
    /// Validate an archive held in memory.
    pub fn parse(data: D) -> Result<Self> {
        Self::from_data(data, String::from("memory"))
    }

    /// Get the archive name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the decoded header.
    #[inline]
    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    /// Get the number of entries.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptor table in file order.
    #[inline]
    pub fn entries(&self) -> &[EntryDescriptor] {
        &self.entries
    }

    /// Iterate over descriptors in file order.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, EntryDescriptor> {
        self.entries.iter()
    }

    /// Get entry by index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&EntryDescriptor> {
        self.entries.get(index)
    }

    /// Find the first entry whose id equals `name` byte for byte.
    pub fn find(&self, name: impl AsRef<[u8]>) -> Option<&EntryDescriptor> {
        let name = name.as_ref();
        self.entries.iter().find(|e| e.is_named(name))
    }

    /// Like [`find`](Self::find), but a miss is an [`Error::EntryNotFound`].
    pub fn find_required(&self, name: impl AsRef<[u8]>) -> Result<&EntryDescriptor> {
        let name = name.as_ref();
        self.find(name)
            .ok_or_else(|| Error::EntryNotFound(String::from_utf8_lossy(name).into_owned()))
    }

    /// Read an entry's payload exactly as stored.
    ///
    /// Fails with [`Error::TruncatedFile`] if the archive ends before
    /// `offset + stored_length`.
    pub fn read(&self, entry: &EntryDescriptor) -> Result<&[u8]> {
        let data = self.data.as_ref();
        let available = data.len() as u64;

        if entry.end() > available {
            return Err(Error::TruncatedFile {
                offset: entry.offset() as u64,
                needed: entry.stored_length() as u64,
                available: available.saturating_sub(entry.offset() as u64),
            });
        }

        Ok(&data[entry.offset() as usize..entry.end() as usize])
    }

    /// Read entry by index.
    pub fn read_index(&self, index: usize) -> Result<&[u8]> {
        let entry = self.entries.get(index).ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "entry index out of bounds",
            ))
        })?;

        self.read(entry)
    }

    // Internal methods

    fn from_data(data: D, name: String) -> Result<Self> {
        let bytes = data.as_ref();
        let header = Self::read_header(bytes)?;
        let entries = Self::read_table(bytes, &header)?;

        debug!(archive = %name, entries = entries.len(), "loaded descriptor table");

        Ok(Self {
            data,
            name,
            header,
            entries,
        })
    }

    fn read_header(bytes: &[u8]) -> Result<ArchiveHeader> {
        let end = bytes.len().min(SIGNATURE_OFFSET + SIGNATURE.len());
        let found = bytes.get(SIGNATURE_OFFSET..end).unwrap_or(&[]);

        if found != SIGNATURE {
            return Err(Error::NotAnArchive {
                found: found.escape_ascii().to_string(),
            });
        }

        let header = ArchiveHeader::decode(bytes)?;

        if header.compression() != Compression::None {
            warn!(
                flag = header.compression().as_raw(),
                "compression flag set; payloads are returned as stored"
            );
        }

        Ok(header)
    }

    fn read_table(bytes: &[u8], header: &ArchiveHeader) -> Result<Vec<EntryDescriptor>> {
        let count = header.entry_count() as u64;
        let table_end = data_start(count);
        let available = bytes.len() as u64;

        if table_end > available {
            return Err(Error::TruncatedFile {
                offset: HEADER_SIZE as u64,
                needed: table_end - HEADER_SIZE as u64,
                available: available.saturating_sub(HEADER_SIZE as u64),
            });
        }

        let mut reader = BinaryReader::new_at(bytes, HEADER_SIZE);
        Ok(reader.read_array(count as usize)?)
    }
}

impl<D> std::fmt::Debug for QdaArchive<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdaArchive")
            .field("name", &self.name)
            .field("header", &self.header)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<'a, D: AsRef<[u8]>> IntoIterator for &'a QdaArchive<D> {
    type Item = &'a EntryDescriptor;
    type IntoIter = std::slice::Iter<'a, EntryDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
