//! Bounded I/O utilities for safe file reading.
//!
//! The whole file is streamed through SHA-256, but only a bounded prefix is
//! kept in memory for detection and metadata extraction.

use crate::core::{InstallerFile, InstallerImage};
use crate::engine::config::IoConfig;
use crate::error::{Result, UnattendError};
use crate::formats::msi::{is_compound_document, read_package_from, MsiInfo};
use crate::hashing::sha256_reader;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

/// Smallest header any signature rule needs ("MZ").
pub const MIN_HEADER_LEN: usize = 2;

/// Resource limits for I/O operations.
#[derive(Debug, Clone)]
pub struct IoLimits {
    pub max_read_bytes: u64,
    pub max_file_size: u64,
    pub buffer_size: usize,
}

impl From<&IoConfig> for IoLimits {
    fn from(cfg: &IoConfig) -> Self {
        Self {
            max_read_bytes: cfg.max_read_bytes as u64,
            max_file_size: cfg.max_file_size,
            buffer_size: cfg.buffer_size.max(1),
        }
    }
}

/// A bounded reader that limits the amount of data read.
pub struct BoundedReader<R> {
    inner: R,
    bytes_read: u64,
    limit: u64,
}

impl<R: Read> BoundedReader<R> {
    pub fn new(reader: R, limit: u64) -> Self {
        Self {
            inner: reader,
            bytes_read: 0,
            limit,
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl<R: Read> Read for BoundedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.bytes_read >= self.limit {
            return Ok(0);
        }
        let remaining = self.limit - self.bytes_read;
        let max_to_read = std::cmp::min(buf.len() as u64, remaining) as usize;
        let n = self.inner.read(&mut buf[..max_to_read])?;
        self.bytes_read += n as u64;
        if self.bytes_read >= self.limit {
            debug!("BoundedReader limit reached after {} bytes", self.bytes_read);
        }
        Ok(n)
    }
}

/// Safe file reader with resource limits.
pub struct SafeFileReader {
    file: File,
    size: u64,
    limits: IoLimits,
}

impl SafeFileReader {
    /// Open a file with safety limits.
    pub fn open<P: AsRef<Path>>(path: P, limits: IoLimits) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            ));
        }
        let size = metadata.len();
        if size > limits.max_file_size {
            warn!(
                "File too large: {} bytes (limit: {})",
                size, limits.max_file_size
            );
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "File too large: {} bytes (limit: {})",
                    size, limits.max_file_size
                ),
            ));
        }
        debug!(?path, size, "opened file for analysis");
        Ok(Self { file, size, limits })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read the file prefix up to `max_read_bytes`.
    pub fn read_bounded(&mut self) -> io::Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(0))?;
        let cap = self.size.min(self.limits.max_read_bytes) as usize;
        let mut reader = BoundedReader::new(&mut self.file, self.limits.max_read_bytes);
        let mut data = Vec::with_capacity(cap);
        reader.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Open the file as an installer package, independent of the read bound.
    pub fn read_package(&mut self) -> io::Result<MsiInfo> {
        self.file.seek(SeekFrom::Start(0))?;
        read_package_from(BufReader::with_capacity(self.limits.buffer_size, &mut self.file))
    }

    /// Hash the entire file, independent of the read bound.
    pub fn sha256(&mut self) -> io::Result<String> {
        self.file.seek(SeekFrom::Start(0))?;
        let reader = BufReader::with_capacity(self.limits.buffer_size, &mut self.file);
        let (digest, _) = sha256_reader(reader)?;
        Ok(digest)
    }
}

/// Keep the first `limit` bytes of a child's pipe and discard the rest.
///
/// The pipe is drained to EOF so a chatty child never blocks on a full pipe
/// while memory stays bounded by `limit`.
pub async fn read_capped<R>(pipe: Option<R>, limit: usize) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let Some(mut pipe) = pipe else {
        return Ok(Vec::new());
    };
    let mut kept = Vec::new();
    (&mut pipe).take(limit as u64).read_to_end(&mut kept).await?;
    let dropped = tokio::io::copy(&mut pipe, &mut tokio::io::sink()).await?;
    if dropped > 0 {
        debug!(kept = kept.len(), dropped, "child output truncated");
    }
    Ok(kept)
}

/// Hash and read a file into an `InstallerImage`.
///
/// Files shorter than `MIN_HEADER_LEN` are rejected as unexpected EOF since
/// no rule could classify them.
pub fn load_installer(path: &Path, cfg: &IoConfig) -> Result<InstallerImage> {
    let mut reader = SafeFileReader::open(path, IoLimits::from(cfg))?;
    if reader.size() < MIN_HEADER_LEN as u64 {
        return Err(UnattendError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "{} is {} bytes, shorter than the {}-byte minimum header",
                path.display(),
                reader.size(),
                MIN_HEADER_LEN
            ),
        )));
    }
    let sha256 = reader.sha256()?;
    let data = reader.read_bounded()?;
    let file = InstallerFile::new(path, reader.size(), sha256);

    // A package cut off at the read bound cannot be opened from `data`
    if (data.len() as u64) < reader.size() && is_compound_document(&data) {
        debug!(size = reader.size(), kept = data.len(), "reading package from file");
        let package = reader.read_package().map_err(|e| e.to_string());
        return Ok(InstallerImage::with_package(file, data, package));
    }
    Ok(InstallerImage::new(file, data))
}
