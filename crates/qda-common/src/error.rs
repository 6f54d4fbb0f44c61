//! Error types for qda-common.

use thiserror::Error;

/// Common error type for QDA operations.
#[derive(Debug, Error)]
pub enum Error {
    /// End of buffer reached while reading.
    #[error("unexpected end of buffer: needed {needed} bytes but only {available} available")]
    UnexpectedEof { needed: usize, available: usize },

    /// String does not fit in a fixed-width field, terminator included.
    #[error("string of {len} bytes does not fit in a {capacity}-byte field")]
    StringTooLong { len: usize, capacity: usize },

    /// String contains a NUL byte before its end.
    #[error("string contains a NUL byte at position {position}")]
    InteriorNul { position: usize },
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
