//! # tinyunzip
//!
//! A small ZIP reader that finds its way through an archive from the raw
//! bytes: it scans backwards for the end of central directory record,
//! walks the central directory, resolves each entry's data offset from
//! its local header and streams the data out, inflating DEFLATE entries.
//!
//! ## Features
//!
//! - Read archives from any `Read + Seek` source, a file path or an HTTP
//!   URL served with Range request support
//! - STORED and DEFLATE entries
//! - Lookup by name, sorted file listings, batch extraction with progress
//! - Opt-in CRC32 verification
//!
//! ## Example
//!
//! ```no_run
//! use tinyunzip::Archive;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut archive = Archive::open("archive.zip")?;
//!
//!     for name in archive.file_names(true)? {
//!         println!("{name}");
//!     }
//!
//!     let mut readme = Vec::new();
//!     archive.extract_by_name("docs/README.md", &mut readme)?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use error::{Result, ZipError};
pub use io::{ByteCursor, HttpRangeReader};
pub use crate::zip::{Archive, Entry, ExtractProgress, ExtractSummary};
