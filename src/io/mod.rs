//! Byte sources for archives.
//!
//! Any `Read + Seek` value can back an archive. [`ByteCursor`] adds the
//! little-endian field decoders the parser needs, and [`HttpRangeReader`]
//! makes a remote file look like a seekable local one.

mod cursor;
mod http;

pub use cursor::ByteCursor;
pub use http::HttpRangeReader;
