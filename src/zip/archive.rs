use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Result, ZipError};
use crate::io::{ByteCursor, HttpRangeReader};

use super::parser::read_directory;
use super::structures::Entry;

struct Cached {
    entries: Arc<[Entry]>,
    skipped: usize,
}

/// An open ZIP archive.
///
/// Owns its byte source; entries hold offsets into it and are only
/// meaningful while the handle lives. The directory is parsed on first use
/// and cached for the lifetime of the handle.
///
/// A handle serves one operation at a time. To read in parallel, open one
/// handle per thread.
pub struct Archive<R> {
    cursor: ByteCursor<R>,
    cache: Option<Cached>,
}

impl Archive<BufReader<File>> {
    /// Open an archive from a file path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::new(file))
    }
}

impl Archive<HttpRangeReader> {
    /// Open a remote archive served by a server that honors Range requests.
    pub fn open_url(url: &str) -> Result<Self> {
        Self::new(HttpRangeReader::new(url)?)
    }
}

impl<R: Read + Seek> Archive<R> {
    /// Build a handle on an already-open source. The handle takes
    /// ownership; pass `&mut source` to keep using it afterwards.
    pub fn new(source: R) -> Result<Self> {
        Ok(Self {
            cursor: ByteCursor::new(source)?,
            cache: None,
        })
    }

    fn cached(&mut self) -> Result<&Cached> {
        let cached = match self.cache.take() {
            Some(cached) => cached,
            None => {
                let directory = read_directory(&mut self.cursor)?;
                Cached {
                    entries: directory.entries.into(),
                    skipped: directory.skipped,
                }
            }
        };
        Ok(self.cache.insert(cached))
    }

    /// All entries, files and directories, in central directory order.
    pub fn entries(&mut self) -> Result<Arc<[Entry]>> {
        Ok(self.cached()?.entries.clone())
    }

    /// Number of central directory slots skipped because of a bad
    /// signature. Non-zero means the listing may be incomplete.
    pub fn skipped_records(&mut self) -> Result<usize> {
        Ok(self.cached()?.skipped)
    }

    /// Names of file entries; directories are left out.
    pub fn file_names(&mut self, sorted: bool) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .cached()?
            .entries
            .iter()
            .filter(|e| e.is_file())
            .map(|e| e.name.clone())
            .collect();
        if sorted {
            names.sort();
        }
        Ok(names)
    }

    /// Whether any entry is a directory record.
    pub fn has_directories(&mut self) -> Result<bool> {
        Ok(self.cached()?.entries.iter().any(Entry::is_directory))
    }

    /// Find an entry by exact, case-sensitive name.
    ///
    /// Backslashes in `name` are read as `/`, and surrounding whitespace and
    /// leading slashes are ignored.
    pub fn entry(&mut self, name: &str) -> Result<Entry> {
        let wanted = normalize_name(name);
        self.cached()?
            .entries
            .iter()
            .find(|e| e.name == wanted)
            .cloned()
            .ok_or(ZipError::NotFound(wanted))
    }

    pub(super) fn cursor_mut(&mut self) -> &mut ByteCursor<R> {
        &mut self.cursor
    }

    /// Total size of the archive in bytes.
    pub fn size(&self) -> u64 {
        self.cursor.len()
    }

    pub fn get_mut(&mut self) -> &mut R {
        self.cursor.get_mut()
    }

    /// Give the source back, dropping the cached entries.
    pub fn into_inner(self) -> R {
        self.cursor.into_inner()
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().replace('\\', "/").trim_start_matches('/').to_string()
}
