//! Reader and writer for QDA archives.
//!
//! A QDA archive is a flat container: a fixed 256-byte header, a table of
//! fixed 268-byte entry descriptors, then every payload packed back to back in
//! descriptor order.
//!
//! ```text
//! [ArchiveHeader][EntryDescriptor x N][payload 0][payload 1]...[payload N-1]
//! ```
//!
//! All integers are little-endian. The header carries a compression flag, but
//! no codec is defined for it; archives are always written uncompressed.
//!
//! # Example
//!
//! ```no_run
//! use qda_archive::{QdaArchive, QdaWriter};
//!
//! let mut writer = QdaWriter::new();
//! writer.add("a.txt", b"hi".to_vec())?;
//! writer.add("b.bin", vec![1u8, 2, 3])?;
//! writer.write_file("out.qda")?;
//!
//! let archive = QdaArchive::open("out.qda")?;
//! for entry in archive.iter() {
//!     println!("{}: {} bytes", entry.name(), entry.stored_length());
//! }
//!
//! if let Some(entry) = archive.find("b.bin") {
//!     let data = archive.read(entry)?;
//!     assert_eq!(data, &[1, 2, 3]);
//! }
//! # Ok::<(), qda_archive::Error>(())
//! ```

mod archive;
mod entry;
mod error;
mod header;
mod writer;

pub use archive::QdaArchive;
pub use entry::{data_start, EntryDescriptor, DESCRIPTOR_SIZE, ID_SIZE, MAX_NAME_LEN};
pub use error::{Error, Result};
pub use header::{ArchiveHeader, Compression, HEADER_SIZE, SIGNATURE, SIGNATURE_OFFSET};
pub use writer::QdaWriter;
