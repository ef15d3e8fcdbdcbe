//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any seekable source through a [`ByteCursor`].
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) by scanning backwards
//!    from the file's end (a variable-length comment may follow it)
//! 2. Walk the Central Directory, one record per entry
//! 3. For every record, re-read the entry's Local File Header to learn
//!    where its data really starts
//!
//! Parsing is lenient: a directory slot with a wrong signature is skipped
//! and counted rather than aborting the listing. Extraction re-checks the
//! local header signature and is strict.

use std::io::{Read, Seek, SeekFrom};

use crate::error::Result;
use crate::io::ByteCursor;

use super::cp437;
use super::structures::*;

/// Bytes read per step of the backward EOCD scan.
const SCAN_CHUNK: u64 = 4096;

/// Find and parse the End of Central Directory record.
///
/// Returns `None` when the source is shorter than the record or holds no
/// EOCD signature; such an archive simply has no entries.
///
/// When several candidates exist the one nearest to the end of the file
/// wins, as the record is the last structure of an archive.
pub fn find_eocd<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
) -> Result<Option<EndOfCentralDirectory>> {
    if cursor.len() < EOCD_SIZE {
        return Ok(None);
    }

    let Some(offset) = scan_for_signature(cursor)? else {
        log::debug!("no end of central directory signature found");
        return Ok(None);
    };

    // Skip the signature and the disk-number fields, irrelevant for
    // single-disk archives.
    cursor.seek(SeekFrom::Start(offset + 4))?;
    cursor.skip(6)?;
    let total_entries = cursor.read_u16()?;
    let cd_size = cursor.read_i32()? as u32;
    let cd_offset = cursor.read_u32()?;

    log::debug!(
        "end of central directory at {offset}: {total_entries} entries, \
         directory at {cd_offset} ({cd_size} bytes)"
    );

    Ok(Some(EndOfCentralDirectory {
        offset,
        total_entries,
        cd_size,
        cd_offset,
    }))
}

/// Scan backwards from `len - 22` for the EOCD signature.
///
/// Candidates run down to offset 1; offset 0 is only examined when it is
/// also the first candidate (a bare 22-byte empty archive).
fn scan_for_signature<R: Read + Seek>(cursor: &mut ByteCursor<R>) -> Result<Option<u64>> {
    let start = cursor.len() - EOCD_SIZE;
    let lowest = start.min(1);
    let signature = EOCD_SIGNATURE.to_le_bytes();

    let mut hi = start;
    let mut window = Vec::new();
    loop {
        let lo = hi.saturating_sub(SCAN_CHUNK - 1).max(lowest);
        // Candidates lo..=hi, each needing four bytes.
        window.resize((hi - lo + 4) as usize, 0);
        cursor.seek(SeekFrom::Start(lo))?;
        cursor.read_exact(&mut window)?;

        if let Some(i) = window.windows(4).rposition(|w| w == signature.as_slice()) {
            return Ok(Some(lo + i as u64));
        }
        if lo == lowest {
            return Ok(None);
        }
        hi = lo - 1;
    }
}

/// Compute where an entry's data begins from its local file header.
///
/// The local name and extra field lengths may differ from the central
/// directory's copies, so they have to be read here. The cursor position
/// is restored before returning, on success and on failure.
pub fn resolve_data_offset<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    header_offset: u64,
) -> Result<u64> {
    let saved = cursor.position()?;
    let resolved = read_data_offset(cursor, header_offset);
    cursor.seek(SeekFrom::Start(saved))?;
    resolved
}

fn read_data_offset<R: Read + Seek>(cursor: &mut ByteCursor<R>, header_offset: u64) -> Result<u64> {
    cursor.seek(SeekFrom::Start(header_offset + LFH_NAME_LENGTH_OFFSET))?;
    let file_name_length = cursor.read_u16()? as u64;
    let extra_field_length = cursor.read_u16()? as u64;
    Ok(cursor.position()? + file_name_length + extra_field_length)
}

/// Lazy walk over the central directory records.
///
/// Yields at most `total_entries` items. A read failure is yielded once and
/// ends the walk. Not restartable; the archive handle caches the result.
pub struct CentralDirectory<'a, R> {
    cursor: &'a mut ByteCursor<R>,
    remaining: u16,
    skipped: usize,
    failed: bool,
}

impl<'a, R: Read + Seek> CentralDirectory<'a, R> {
    /// Position the cursor at the directory described by `eocd`.
    pub fn new(cursor: &'a mut ByteCursor<R>, eocd: &EndOfCentralDirectory) -> Result<Self> {
        cursor.seek(SeekFrom::Start(eocd.cd_offset as u64))?;
        Ok(Self {
            cursor,
            remaining: eocd.total_entries,
            skipped: 0,
            failed: false,
        })
    }

    /// Number of slots skipped so far because of a bad signature.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Parse one Central Directory File Header.
    ///
    /// Returns `None` if the slot does not start with the CDFH signature.
    /// The four signature bytes stay consumed; there is no attempt to
    /// resynchronize on the next record.
    fn parse_cdfh(&mut self) -> Result<Option<Entry>> {
        let cursor = &mut *self.cursor;

        if cursor.read_u32()? != CDFH_SIGNATURE {
            return Ok(None);
        }

        // version made by, version needed
        cursor.skip(4)?;
        let flags = cursor.read_u16()?;
        let compression_method = cursor.read_u16()?;
        let timestamp = cursor.read_u32()?;
        let crc32 = cursor.read_u32()?;
        let compressed_size = cursor.read_u32()?;
        let original_size = cursor.read_u32()?;
        let file_name_length = cursor.read_u16()?;
        let extra_field_length = cursor.read_u16()?;
        let file_comment_length = cursor.read_u16()?;
        // disk number start, internal attributes
        cursor.skip(4)?;
        // external attributes
        cursor.skip(4)?;
        let header_offset = cursor.read_u32()? as u64;

        let name_bytes = cursor.read_bytes(file_name_length as usize)?;
        cursor.skip(extra_field_length as u64)?;
        let comment_bytes = cursor.read_bytes(file_comment_length as usize)?;

        let data_offset = resolve_data_offset(cursor, header_offset)?;

        let utf8 = flags & FLAG_UTF8 != 0;
        let entry = Entry {
            name: decode_text(&name_bytes, utf8),
            comment: decode_text(&comment_bytes, utf8),
            crc32,
            compressed_size,
            original_size,
            method: CompressionMethod::from_u16(compression_method),
            timestamp: DosDateTime::from_packed(timestamp),
            header_offset,
            data_offset,
        };

        log::trace!(
            "entry {:?}: {:?}, {} -> {} bytes, header at {}, data at {}",
            entry.name,
            entry.method,
            entry.compressed_size,
            entry.original_size,
            entry.header_offset,
            entry.data_offset
        );

        Ok(Some(entry))
    }
}

impl<R: Read + Seek> Iterator for CentralDirectory<'_, R> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.failed && self.remaining > 0 {
            self.remaining -= 1;
            match self.parse_cdfh() {
                Ok(Some(entry)) => return Some(Ok(entry)),
                Ok(None) => self.skipped += 1,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

fn decode_text(bytes: &[u8], utf8: bool) -> String {
    if utf8 {
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        cp437::decode(bytes)
    }
}

/// Fully parsed central directory.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    pub entries: Vec<Entry>,
    /// Directory slots skipped because their signature did not match.
    pub skipped: usize,
}

/// Locate and walk the whole central directory.
pub fn read_directory<R: Read + Seek>(cursor: &mut ByteCursor<R>) -> Result<Directory> {
    let Some(eocd) = find_eocd(cursor)? else {
        return Ok(Directory::default());
    };

    let mut records = CentralDirectory::new(cursor, &eocd)?;
    let entries = records.by_ref().collect::<Result<Vec<_>>>()?;
    let skipped = records.skipped();

    if skipped > 0 {
        log::warn!(
            "skipped {skipped} of {} central directory records with a bad signature",
            eocd.total_entries
        );
    }

    Ok(Directory { entries, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ZipError;
    use crate::zip::test_util::{RawEntry, build_archive};
    use assert_matches::assert_matches;
    use std::io::Cursor;

    fn cursor(bytes: Vec<u8>) -> ByteCursor<Cursor<Vec<u8>>> {
        ByteCursor::new(Cursor::new(bytes)).unwrap()
    }

    fn eocd_record(total_entries: u16, cd_offset: u32, comment: &[u8]) -> Vec<u8> {
        let mut out = EOCD_SIGNATURE.to_le_bytes().to_vec();
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&total_entries.to_le_bytes());
        out.extend_from_slice(&total_entries.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&(comment.len() as u16).to_le_bytes());
        out.extend_from_slice(comment);
        out
    }

    #[test]
    fn short_source_has_no_directory() {
        for len in [0, 1, 21] {
            let mut c = cursor(vec![0x50; len]);
            assert_eq!(find_eocd(&mut c).unwrap(), None);
            assert!(read_directory(&mut c).unwrap().entries.is_empty());
        }
    }

    #[test]
    fn empty_archive_at_offset_zero() {
        let mut c = cursor(eocd_record(0, 0, b""));
        let eocd = find_eocd(&mut c).unwrap().unwrap();
        assert_eq!(eocd.offset, 0);
        assert_eq!(eocd.total_entries, 0);
    }

    #[test]
    fn missing_signature_yields_no_directory() {
        let mut c = cursor(vec![0xAB; 300]);
        assert_eq!(find_eocd(&mut c).unwrap(), None);
    }

    #[test]
    fn scan_ignores_look_alike_runs() {
        // Near misses of the magic, before and after the real record.
        let mut bytes = b"PK\x05\x05PK\x06\x05xxPK\x05".to_vec();
        let true_offset = bytes.len() as u64;
        bytes.extend(eocd_record(3, 7, b"PK\x05\x07 PK\x04\x06 trailing comment"));

        let mut c = cursor(bytes);
        let eocd = find_eocd(&mut c).unwrap().unwrap();
        assert_eq!(eocd.offset, true_offset);
        assert_eq!(eocd.total_entries, 3);
        assert_eq!(eocd.cd_offset, 7);
    }

    #[test]
    fn scan_prefers_occurrence_nearest_the_end() {
        let mut bytes = eocd_record(1, 0, b"");
        let later = bytes.len() as u64;
        bytes.extend(eocd_record(2, 0, b"0123456789"));

        let mut c = cursor(bytes);
        assert_eq!(find_eocd(&mut c).unwrap().unwrap().offset, later);
    }

    #[test]
    fn scan_crosses_chunk_boundaries() {
        let comment = vec![b'c'; 3 * SCAN_CHUNK as usize + 17];
        let mut bytes = vec![0u8; 5];
        bytes.extend(eocd_record(0, 0, &comment));

        let mut c = cursor(bytes);
        assert_eq!(find_eocd(&mut c).unwrap().unwrap().offset, 5);
    }

    #[test]
    fn data_offset_uses_local_lengths_and_restores_position() {
        let mut entry = RawEntry::stored("a.txt", b"hello");
        entry.local_extra = vec![0xEE; 9];
        let bytes = build_archive(&[entry], b"");

        let mut c = cursor(bytes);
        c.seek(SeekFrom::Start(40)).unwrap();
        let offset = resolve_data_offset(&mut c, 0).unwrap();
        assert_eq!(offset, LFH_SIZE + 5 + 9);
        assert_eq!(c.position().unwrap(), 40);
    }

    #[test]
    fn resolver_restores_position_on_truncation() {
        let mut c = cursor(vec![0; 40]);
        c.seek(SeekFrom::Start(3)).unwrap();
        assert_matches!(resolve_data_offset(&mut c, 100), Err(ZipError::Truncated));
        assert_eq!(c.position().unwrap(), 3);
    }

    #[test]
    fn parses_all_records_in_order() {
        let mut first = RawEntry::stored("docs/", b"");
        first.comment = b"a folder".to_vec();
        let mut second = RawEntry::deflated("docs/readme.txt", b"read me please");
        second.timestamp = 0x4A6A6000;
        second.central_extra = vec![1, 2, 3, 4];
        let bytes = build_archive(&[first, second], b"archive comment");

        let mut c = cursor(bytes);
        let dir = read_directory(&mut c).unwrap();
        assert_eq!(dir.skipped, 0);
        assert_eq!(dir.entries.len(), 2);

        let folder = &dir.entries[0];
        assert_eq!(folder.name, "docs/");
        assert_eq!(folder.comment, "a folder");
        assert!(folder.is_directory());

        let readme = &dir.entries[1];
        assert_eq!(readme.name, "docs/readme.txt");
        assert!(readme.is_deflated());
        assert_eq!(readme.original_size, 14);
        assert_eq!(readme.crc32, crc32fast::hash(b"read me please"));
        assert_eq!(readme.timestamp, DosDateTime::from_packed(0x4A6A6000));
        assert!(readme.data_offset > readme.header_offset);
        assert_eq!(
            readme.data_offset,
            readme.header_offset + LFH_SIZE + readme.name.len() as u64
        );
    }

    #[test]
    fn bad_signature_slot_is_skipped_and_counted() {
        let good = RawEntry::stored("good.txt", b"ok");
        let mut bad = RawEntry::stored("bad.txt", b"nope");
        bad.central_signature = 0xDEADBEEF;
        let bytes = build_archive(&[good, bad], b"");

        let mut c = cursor(bytes);
        let dir = read_directory(&mut c).unwrap();
        assert_eq!(dir.entries.len(), 1);
        assert_eq!(dir.entries[0].name, "good.txt");
        assert_eq!(dir.skipped, 1);
    }

    #[test]
    fn name_encoding_follows_utf8_flag() {
        let mut legacy = RawEntry::stored("x", b"");
        legacy.name = b"m\x84rchen.txt".to_vec();
        let mut unicode = RawEntry::stored("x", b"");
        unicode.name = "märchen.txt".as_bytes().to_vec();
        unicode.flags = FLAG_UTF8;
        let bytes = build_archive(&[legacy, unicode], b"");

        let mut c = cursor(bytes);
        let dir = read_directory(&mut c).unwrap();
        assert_eq!(dir.entries[0].name, "märchen.txt");
        assert_eq!(dir.entries[1].name, "märchen.txt");
    }

    #[test]
    fn truncated_directory_is_an_error() {
        let bytes = build_archive(&[RawEntry::stored("a.txt", b"abc")], b"");
        // Claim the directory starts near the end so the record runs off it.
        let len = bytes.len();
        let mut bytes = bytes;
        let cd_offset_field = len - 6;
        bytes[cd_offset_field..cd_offset_field + 4]
            .copy_from_slice(&((len - 10) as u32).to_le_bytes());
        // The moved directory points into the EOCD itself; make its first
        // four bytes a CDFH signature so the parser keeps reading.
        bytes[len - 10..len - 6].copy_from_slice(&CDFH_SIGNATURE.to_le_bytes());

        let mut c = cursor(bytes);
        assert_matches!(read_directory(&mut c), Err(ZipError::Truncated));
    }
}
