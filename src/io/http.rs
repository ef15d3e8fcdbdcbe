use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::io::{self, Read, Seek, SeekFrom};
use std::thread;
use std::time::Duration;

/// Bytes fetched per Range request when serving small reads.
const BLOCK_SIZE: u64 = 64 * 1024;

/// Seekable reader over a remote file, backed by HTTP Range requests.
///
/// The most recently fetched block is kept in memory, so the many small
/// field reads done while walking the directory cost one request per block.
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    position: u64,
    block: Option<(u64, Vec<u8>)>,
    transferred_bytes: u64,
    max_retry: u32,
}

impl HttpRangeReader {
    /// Create a new HTTP Range reader
    ///
    /// This will send a HEAD request to verify Range support and get file size
    pub fn new(url: impl Into<String>) -> io::Result<Self> {
        let url = url.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(io::Error::other)?;

        let resp = client.head(&url).send().map_err(io::Error::other)?;

        if !resp.status().is_success() {
            return Err(io::Error::other(format!(
                "HTTP request failed with status: {}",
                resp.status()
            )));
        }

        let accept_ranges = resp
            .headers()
            .get("accept-ranges")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none");

        if !accept_ranges.contains("bytes") {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "remote server does not support Range requests",
            ));
        }

        let size = resp
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| io::Error::other("remote server did not return Content-Length"))?;

        log::debug!("{url}: {size} bytes, range requests supported");

        Ok(Self {
            client,
            url,
            size,
            position: 0,
            block: None,
            transferred_bytes: 0,
            max_retry: 10,
        })
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes
    }

    /// Fetch `len` bytes starting at `offset`, retrying on transient errors.
    fn fetch(&mut self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        if len == 0 {
            return Ok(buf);
        }

        let end = offset + len as u64 - 1;
        let mut received = 0;
        let mut retry_count = 0;

        while received < len {
            let current_start = offset + received as u64;
            let range = format!("bytes={}-{}", current_start, end);

            let result = self
                .client
                .get(&self.url)
                .header("Range", &range)
                .send();

            match result {
                Ok(resp) => {
                    if resp.status() != StatusCode::PARTIAL_CONTENT {
                        return Err(io::Error::other(format!(
                            "HTTP request failed with status: {}",
                            resp.status()
                        )));
                    }

                    let bytes = resp.bytes().map_err(io::Error::other)?;
                    if bytes.is_empty() {
                        return Err(io::ErrorKind::UnexpectedEof.into());
                    }
                    let chunk_len = bytes.len().min(len - received);
                    buf[received..received + chunk_len].copy_from_slice(&bytes[..chunk_len]);
                    received += chunk_len;
                    self.transferred_bytes += chunk_len as u64;
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retry_count += 1;
                    if retry_count >= self.max_retry {
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "max retries exceeded",
                        ));
                    }
                    log::warn!(
                        "connection error, retry {}/{}: {}",
                        retry_count,
                        self.max_retry,
                        e
                    );
                    thread::sleep(Duration::from_millis(500 * retry_count as u64));
                }
                Err(e) => return Err(io::Error::other(e)),
            }
        }

        Ok(buf)
    }

    fn load_block(&mut self, offset: u64) -> io::Result<()> {
        let (start, len) = block_range(offset, self.size);
        if matches!(&self.block, Some((cached, _)) if *cached == start) {
            return Ok(());
        }
        let data = self.fetch(start, len)?;
        self.block = Some((start, data));
        Ok(())
    }
}

/// Start and length of the cache block holding `offset`.
fn block_range(offset: u64, size: u64) -> (u64, usize) {
    let start = offset - offset % BLOCK_SIZE;
    let end = (start + BLOCK_SIZE).min(size);
    (start, (end - start) as usize)
}

impl Read for HttpRangeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.position >= self.size {
            return Ok(0);
        }

        let remaining = self.size - self.position;
        if buf.len() as u64 >= BLOCK_SIZE {
            let len = (buf.len() as u64).min(remaining) as usize;
            let data = self.fetch(self.position, len)?;
            buf[..len].copy_from_slice(&data);
            self.position += len as u64;
            return Ok(len);
        }

        self.load_block(self.position)?;
        let Some((start, data)) = &self.block else {
            return Ok(0);
        };
        let from = (self.position - start) as usize;
        let n = buf.len().min(data.len() - from);
        buf[..n].copy_from_slice(&data[from..from + n]);
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for HttpRangeReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.size.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        match target {
            Some(position) => {
                self.position = position;
                Ok(position)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}
