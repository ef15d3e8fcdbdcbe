//! Error types for archive reading and extraction.

use std::io;

use thiserror::Error;

/// Errors that can occur while reading or extracting a ZIP archive.
#[derive(Debug, Error)]
pub enum ZipError {
    /// A read ran past the end of the byte source.
    #[error("unexpected end of archive data")]
    Truncated,

    /// The local file header magic did not match at the resolved offset.
    #[error("signature mismatch at offset {offset}: expected {expected:#010x}, got {actual:#010x}")]
    SignatureMismatch {
        offset: u64,
        expected: u32,
        actual: u32,
    },

    /// No entry with the requested name.
    #[error("entry not found: {0}")]
    NotFound(String),

    /// The DEFLATE stream of an entry is corrupt.
    #[error("corrupt deflate stream")]
    DecodeFailure(#[source] io::Error),

    /// Computed CRC32 differs from the stored one.
    #[error("CRC32 mismatch for {name}: stored {expected:08x}, computed {actual:08x}")]
    CrcMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },

    /// Any other I/O failure of the source or the output sink.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ZipError {
    /// Classify an I/O error coming from the archive source.
    ///
    /// End-of-file becomes [`ZipError::Truncated`]; everything else stays
    /// an I/O error.
    pub(crate) fn from_source(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            ZipError::Truncated
        } else {
            ZipError::Io(err)
        }
    }
}

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, ZipError>;
