//! ZIP archive parsing and extraction.
//!
//! ## Architecture
//!
//! - [`structures`]: signatures, fixed sizes and the [`Entry`] record
//! - [`parser`]: EOCD scan, central directory walk, local header resolution
//! - `extractor`: streaming extraction, batch extraction, CRC checks
//! - `archive`: the [`Archive`] handle tying a source to its entries
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! This implementation reads the EOCD first (from the end of the file),
//! then the Central Directory, and finally each entry's local header to
//! find where its data starts.
//!
//! ## Supported Features
//!
//! - STORED (no compression) method
//! - DEFLATE compression method
//! - UTF-8 and code page 437 entry names
//!
//! ## Limitations
//!
//! - No ZIP64 extensions
//! - No encryption support
//! - No multi-disk archive support
//! - Other compression methods are copied verbatim, as if stored

mod archive;
mod cp437;
mod extractor;
pub mod parser;
pub mod structures;

#[cfg(test)]
pub(crate) mod test_util;

pub use archive::Archive;
pub use extractor::{BUFFER_SIZE, ExtractProgress, ExtractSummary, extract_entry, output_path};
pub use structures::*;
