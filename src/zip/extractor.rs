use chrono::{Local, TimeZone};
use flate2::read::DeflateDecoder;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};

use crate::error::{Result, ZipError};
use crate::io::ByteCursor;

use super::archive::Archive;
use super::structures::{Entry, LFH_SIGNATURE};

/// Largest chunk moved from the source to the sink in one step.
pub const BUFFER_SIZE: usize = 16 * 1024;

/// Notification sent after each entry of a batch extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractProgress<'a> {
    /// Zero-based position of the entry among the files being extracted.
    pub index: usize,
    pub total: usize,
    pub name: &'a str,
}

/// Outcome of [`Archive::extract_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub extracted: usize,
    /// Entries left out because their name would escape the destination.
    pub skipped: usize,
    pub bytes: u64,
}

/// Stream one entry into `sink`.
///
/// Copies up to `original_size` bytes and returns how many were written.
/// A source that ends early stops the copy without an error, so callers
/// needing an exact size compare the result with `original_size`.
pub fn extract_entry<R, W>(cursor: &mut ByteCursor<R>, entry: &Entry, sink: &mut W) -> Result<u64>
where
    R: Read + Seek,
    W: Write + ?Sized,
{
    cursor.seek(SeekFrom::Start(entry.header_offset))?;
    let signature = cursor.read_u32()?;
    if signature != LFH_SIGNATURE {
        return Err(ZipError::SignatureMismatch {
            offset: entry.header_offset,
            expected: LFH_SIGNATURE,
            actual: signature,
        });
    }

    cursor.seek(SeekFrom::Start(entry.data_offset))?;
    let raw = cursor.get_mut().take(entry.compressed_size as u64);
    let limit = entry.original_size as u64;

    let written = if entry.is_deflated() {
        copy_bounded(&mut DeflateDecoder::new(raw), sink, limit, inflate_error)?
    } else {
        let mut raw = raw;
        copy_bounded(&mut raw, sink, limit, ZipError::from_source)?
    };

    if written < limit {
        log::debug!(
            "{}: short read, {written} of {limit} bytes available",
            entry.name
        );
    }
    Ok(written)
}

/// Like [`extract_entry`], then compare the CRC32 of what was written with
/// the stored one.
pub fn extract_entry_verified<R, W>(
    cursor: &mut ByteCursor<R>,
    entry: &Entry,
    sink: &mut W,
) -> Result<u64>
where
    R: Read + Seek,
    W: Write + ?Sized,
{
    let mut writer = CrcWriter::new(sink);
    let written = extract_entry(cursor, entry, &mut writer)?;
    let actual = writer.finalize();
    if actual != entry.crc32 {
        return Err(ZipError::CrcMismatch {
            name: entry.name.clone(),
            expected: entry.crc32,
            actual,
        });
    }
    Ok(written)
}

fn copy_bounded<S, W>(
    source: &mut S,
    sink: &mut W,
    limit: u64,
    classify: fn(io::Error) -> ZipError,
) -> Result<u64>
where
    S: Read,
    W: Write + ?Sized,
{
    let mut buf = vec![0u8; limit.min(BUFFER_SIZE as u64) as usize];
    let mut written = 0u64;

    while written < limit {
        let want = (limit - written).min(buf.len() as u64) as usize;
        let read = match source.read(&mut buf[..want]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(classify(e)),
        };
        sink.write_all(&buf[..read])?;
        written += read as u64;
    }

    Ok(written)
}

fn inflate_error(err: io::Error) -> ZipError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof => ZipError::Truncated,
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => ZipError::DecodeFailure(err),
        _ => ZipError::Io(err),
    }
}

/// Sink wrapper hashing everything written through it.
struct CrcWriter<'a, W: ?Sized> {
    inner: &'a mut W,
    hasher: crc32fast::Hasher,
}

impl<'a, W: Write + ?Sized> CrcWriter<'a, W> {
    fn new(inner: &'a mut W) -> Self {
        Self {
            inner,
            hasher: crc32fast::Hasher::new(),
        }
    }

    fn finalize(self) -> u32 {
        self.hasher.finalize()
    }
}

impl<W: Write + ?Sized> Write for CrcWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Map an archive name onto `dest`, keeping only normal components.
///
/// Returns `None` for names with `..`, a root or a drive prefix, and for
/// names that reduce to nothing.
pub fn output_path(dest: &Path, name: &str) -> Option<PathBuf> {
    let mut path = dest.to_path_buf();
    let mut pushed = false;
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => {
                path.push(part);
                pushed = true;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    pushed.then_some(path)
}

/// Set the file's modification time to the entry's timestamp, read as
/// local time.
fn apply_timestamp(file: &File, entry: &Entry, path: &Path) {
    let Some(modified) = entry
        .timestamp
        .to_naive()
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
    else {
        log::warn!(
            "{}: timestamp {} is not a valid local time, leaving mtime unchanged",
            path.display(),
            entry.timestamp
        );
        return;
    };

    if let Err(e) = file.set_modified(modified.into()) {
        log::warn!("{}: cannot set modification time: {e}", path.display());
    }
}

impl<R: Read + Seek> Archive<R> {
    /// Stream `entry` into `sink`, returning the number of bytes written.
    ///
    /// Fails with [`ZipError::SignatureMismatch`] if no local file header
    /// sits at the entry's header offset.
    pub fn extract<W: Write + ?Sized>(&mut self, entry: &Entry, sink: &mut W) -> Result<u64> {
        extract_entry(self.cursor_mut(), entry, sink)
    }

    /// Extract and check the CRC32 of the produced bytes.
    pub fn extract_verified<W: Write + ?Sized>(
        &mut self,
        entry: &Entry,
        sink: &mut W,
    ) -> Result<u64> {
        extract_entry_verified(self.cursor_mut(), entry, sink)
    }

    /// Decode `entry` and discard the bytes, checking only the CRC32.
    pub fn verify(&mut self, entry: &Entry) -> Result<()> {
        self.extract_verified(entry, &mut io::sink()).map(|_| ())
    }

    /// Look an entry up by name and extract it.
    pub fn extract_by_name<W: Write + ?Sized>(&mut self, name: &str, sink: &mut W) -> Result<u64> {
        let entry = self.entry(name)?;
        self.extract(&entry, sink)
    }

    /// Extract file to disk
    ///
    /// Parent directories are created as needed and the file gets the
    /// entry's modification time. If extraction fails the partly written
    /// file is removed.
    pub fn extract_to_file(&mut self, entry: &Entry, output_path: &Path) -> Result<u64> {
        self.write_file(entry, output_path, false)
    }

    /// [`extract_to_file`](Self::extract_to_file) with a CRC32 check in the
    /// same pass. A mismatching file is removed.
    pub fn extract_to_file_verified(&mut self, entry: &Entry, output_path: &Path) -> Result<u64> {
        self.write_file(entry, output_path, true)
    }

    fn write_file(&mut self, entry: &Entry, output_path: &Path, verify: bool) -> Result<u64> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = File::create(output_path)?;
        let extracted = if verify {
            self.extract_verified(entry, &mut file)
        } else {
            self.extract(entry, &mut file)
        };

        let written = match extracted {
            Ok(written) => written,
            Err(e) => {
                drop(file);
                if let Err(rm) = fs::remove_file(output_path) {
                    log::warn!("{}: cannot remove partial file: {rm}", output_path.display());
                }
                return Err(e);
            }
        };
        apply_timestamp(&file, entry, output_path);

        Ok(written)
    }

    /// Extract every file entry below `dest`, preserving relative paths.
    ///
    /// Directory entries are not extracted; the directories a file needs
    /// are created on the way. Names that would escape `dest` are left out
    /// before the batch starts and do not count towards the progress total.
    /// `progress` runs after each file. The first failure aborts the batch.
    pub fn extract_all<F>(&mut self, dest: &Path, progress: F) -> Result<ExtractSummary>
    where
        F: FnMut(&ExtractProgress<'_>),
    {
        self.extract_batch(dest, false, progress)
    }

    /// [`extract_all`](Self::extract_all), checking each file's CRC32 while
    /// it is written.
    pub fn extract_all_verified<F>(&mut self, dest: &Path, progress: F) -> Result<ExtractSummary>
    where
        F: FnMut(&ExtractProgress<'_>),
    {
        self.extract_batch(dest, true, progress)
    }

    fn extract_batch<F>(&mut self, dest: &Path, verify: bool, mut progress: F) -> Result<ExtractSummary>
    where
        F: FnMut(&ExtractProgress<'_>),
    {
        let entries = self.entries()?;
        let mut summary = ExtractSummary::default();

        let mut files = Vec::new();
        for entry in entries.iter().filter(|e| e.is_file()) {
            match output_path(dest, &entry.name) {
                Some(path) => files.push((entry, path)),
                None => {
                    log::warn!("skipping {:?}: path escapes the destination", entry.name);
                    summary.skipped += 1;
                }
            }
        }
        let total = files.len();

        for (index, (entry, path)) in files.into_iter().enumerate() {
            summary.bytes += self.write_file(entry, &path, verify)?;
            summary.extracted += 1;
            progress(&ExtractProgress {
                index,
                total,
                name: &entry.name,
            });
        }

        log::debug!(
            "extracted {} files ({} bytes) to {}",
            summary.extracted,
            summary.bytes,
            dest.display()
        );
        Ok(summary)
    }
}
