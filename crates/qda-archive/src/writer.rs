//! QDA archive writer.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::entry::{data_start, encode_id, EntryDescriptor};
use crate::header::ArchiveHeader;
use crate::{Error, Result};

/// A named payload waiting to be written.
#[derive(Debug)]
struct PendingEntry {
    name: Vec<u8>,
    data: Vec<u8>,
}

impl PendingEntry {
    fn display_name(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }
}

/// Builds a QDA archive from named byte buffers.
///
/// Entries are written in the order they were added; the writer neither sorts
/// nor deduplicates. Payloads are held in memory until the archive is written.
///
/// # Example
///
/// ```
/// use qda_archive::QdaWriter;
///
/// let mut writer = QdaWriter::new();
/// writer.add("a.txt", b"hi".to_vec())?;
/// writer.add("b.bin", vec![1u8, 2, 3])?;
///
/// let bytes = writer.to_bytes()?;
/// assert_eq!(bytes.len(), 256 + 2 * 268 + 2 + 3);
/// # Ok::<(), qda_archive::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct QdaWriter {
    entries: Vec<PendingEntry>,
}

impl QdaWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an entry.
    ///
    /// The name is stored as raw bytes and need not be UTF-8. Fails with
    /// [`Error::NameTooLong`] or [`Error::InvalidName`] if the name cannot be
    /// stored; the entry is not queued in that case.
    pub fn add(&mut self, name: impl AsRef<[u8]>, data: impl Into<Vec<u8>>) -> Result<()> {
        let name = name.as_ref();
        encode_id(name)?;

        let entry = PendingEntry {
            name: name.to_vec(),
            data: data.into(),
        };
        debug!(name = %entry.display_name(), size = entry.data.len(), "queued entry");

        self.entries.push(entry);
        Ok(())
    }

    /// Number of queued entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compute the descriptor table.
    ///
    /// Entry `i` starts at `256 + 268 * N + sum(len[0..i])`.
    pub fn layout(&self) -> Result<Vec<EntryDescriptor>> {
        let count = u32::try_from(self.entries.len())
            .map_err(|_| Error::ArchiveTooLarge(format!("{} entries", self.entries.len())))?;

        let mut offset = data_start(count as u64);
        let mut descriptors = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            let length = u32::try_from(entry.data.len()).map_err(|_| {
                Error::ArchiveTooLarge(format!(
                    "entry '{}' is {} bytes",
                    entry.display_name(),
                    entry.data.len()
                ))
            })?;
            let start = u32::try_from(offset).map_err(|_| {
                Error::ArchiveTooLarge(format!(
                    "entry '{}' starts at offset {}",
                    entry.display_name(),
                    offset
                ))
            })?;

            descriptors.push(EntryDescriptor::new(&entry.name, start, length)?);
            offset += length as u64;
        }

        Ok(descriptors)
    }

    /// Total size of the archive in bytes.
    pub fn archive_size(&self) -> u64 {
        data_start(self.entries.len() as u64)
            + self.entries.iter().map(|e| e.data.len() as u64).sum::<u64>()
    }

    /// Serialize header, descriptor table and payloads to `writer`.
    ///
    /// Returns the number of bytes written.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<u64> {
        let descriptors = self.layout()?;
        let header = ArchiveHeader::new(descriptors.len() as u32);

        writer.write_all(&header.encode())?;
        for descriptor in &descriptors {
            writer.write_all(&descriptor.encode())?;
        }
        for entry in &self.entries {
            writer.write_all(&entry.data)?;
        }
        writer.flush()?;

        Ok(self.archive_size())
    }

    /// Serialize the archive into memory.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.archive_size() as usize);
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Write the archive to `path`, replacing any existing file.
    ///
    /// Data goes to a temporary file in the destination directory which is
    /// renamed over `path` only once fully written, so a failed build never
    /// leaves a partial archive behind. A replaced archive keeps its
    /// permissions; a new one gets those of a freshly created file.
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<u64> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        #[cfg_attr(not(unix), allow(unused_mut))]
        let mut builder = tempfile::Builder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // Subject to the umask, like a plain create.
            builder.permissions(fs::Permissions::from_mode(0o666));
        }

        let mut temp = builder.tempfile_in(dir)?;
        let written = self.write_to(BufWriter::new(temp.as_file_mut()))?;
        temp.as_file().sync_all()?;

        if let Ok(existing) = fs::metadata(path) {
            temp.as_file().set_permissions(existing.permissions())?;
        }
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        debug!(path = %path.display(), bytes = written, "archive written");
        Ok(written)
    }
}
