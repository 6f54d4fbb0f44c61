//! Error types for the QDA archive crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when reading or writing QDA archives.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] qda_common::Error),

    /// Path could not be found.
    #[error("could not access '{}'", .0.display())]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory.
    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// Signature at offset 4 is not `QDA0`.
    #[error("not a valid QDA file: expected signature \"QDA0\", found \"{found}\"")]
    NotAnArchive { found: String },

    /// File ends before a region the header or a descriptor points at.
    #[error("truncated file: {needed} bytes needed at offset {offset}, only {available} available")]
    TruncatedFile {
        offset: u64,
        needed: u64,
        available: u64,
    },

    /// Entry name does not fit in the 256-byte id field.
    #[error("entry name is {len} bytes, at most 255 fit: {name}")]
    NameTooLong { name: String, len: usize },

    /// Entry name cannot be stored as a NUL-terminated id.
    #[error("invalid entry name: {0:?}")]
    InvalidName(String),

    /// No entry with this name exists.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// Entry name would resolve outside the destination directory.
    #[error("refusing to write entry outside the output folder: {0}")]
    UnsafeEntryName(String),

    /// Entry name has no path representation on this platform.
    #[error("entry name cannot be used as a file name here: {0}")]
    UnrepresentableName(String),

    /// Archive exceeds what 32-bit offsets and lengths can describe.
    #[error("archive too large: {0}")]
    ArchiveTooLarge(String),
}

/// Result type for QDA archive operations.
pub type Result<T> = std::result::Result<T, Error>;
