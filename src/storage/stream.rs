//! Backing streams
//!
//! A stream is a named, growable byte range addressed by offset. Everything
//! above this module talks to streams only through [`StorageStream`], so the
//! same engine runs against files on disk or against memory in tests.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;

/// Shared handle to an open stream
pub type SharedStream = Arc<dyn StorageStream>;

/// Raw offset + length I/O against one backing stream
///
/// Implementations use interior mutability so one handle can be shared by
/// every layer that touches the same stream.
pub trait StorageStream: Send + Sync {
    /// Read exactly `length` bytes starting at `address`
    fn read_at(&self, address: u64, length: usize) -> Result<Vec<u8>>;

    /// Write `bytes` at `address`, growing the stream if needed
    fn write_at(&self, address: u64, bytes: &[u8]) -> Result<()>;

    /// Current length in bytes
    fn len(&self) -> Result<u64>;

    /// Shrink or grow the stream to `len` bytes
    fn set_len(&self, len: u64) -> Result<()>;

    /// Flush written bytes to durable storage
    fn sync(&self) -> Result<()>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Hands out streams by name
pub trait StreamProvider: Send + Sync {
    /// Open (or create) the stream called `name`
    ///
    /// Repeated calls with the same name return the same handle.
    fn stream(&self, name: &str) -> Result<SharedStream>;
}

// =============================================================================
// File-backed streams
// =============================================================================

/// A stream backed by a single file
pub struct FileStream {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileStream {
    /// Open or create the file at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageStream for FileStream {
    fn read_at(&self, address: u64, length: usize) -> Result<Vec<u8>> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(address))?;
        let mut buffer = vec![0u8; length];
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn write_at(&self, address: u64, bytes: &[u8]) -> Result<()> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(address))?;
        file.write_all(bytes)?;
        Ok(())
    }

    fn len(&self) -> Result<u64> {
        Ok(self.file.lock().metadata()?.len())
    }

    fn set_len(&self, len: u64) -> Result<()> {
        self.file.lock().set_len(len)?;
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.file.lock().sync_data()?;
        Ok(())
    }
}

/// Provides one file per stream name inside a directory
///
/// Stream `name` lives at `{dir}/{name}.vdb`.
pub struct FileStreamProvider {
    dir: PathBuf,
    streams: Mutex<HashMap<String, SharedStream>>,
}

impl FileStreamProvider {
    /// File extension of every stream file
    pub const EXTENSION: &'static str = "vdb";

    /// Create a provider rooted at `dir`, creating the directory if needed
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            streams: Mutex::new(HashMap::new()),
        })
    }

    /// Path of the file backing stream `name`
    pub fn stream_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, Self::EXTENSION))
    }

    /// Directory holding the stream files
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl StreamProvider for FileStreamProvider {
    fn stream(&self, name: &str) -> Result<SharedStream> {
        let mut streams = self.streams.lock();
        if let Some(stream) = streams.get(name) {
            return Ok(Arc::clone(stream));
        }

        let stream: SharedStream = Arc::new(FileStream::open(&self.stream_path(name))?);
        streams.insert(name.to_string(), Arc::clone(&stream));
        Ok(stream)
    }
}

// =============================================================================
// In-memory streams
// =============================================================================

/// A stream held entirely in memory
#[derive(Default)]
pub struct InMemoryStream {
    data: Mutex<Vec<u8>>,
}

impl InMemoryStream {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageStream for InMemoryStream {
    fn read_at(&self, address: u64, length: usize) -> Result<Vec<u8>> {
        let data = self.data.lock();
        let start = address as usize;
        let end = start.checked_add(length).filter(|end| *end <= data.len());

        match end {
            Some(end) => Ok(data[start..end].to_vec()),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "read of {} bytes at {} past end of stream ({} bytes)",
                    length,
                    address,
                    data.len()
                ),
            )
            .into()),
        }
    }

    fn write_at(&self, address: u64, bytes: &[u8]) -> Result<()> {
        let mut data = self.data.lock();
        let start = address as usize;
        let end = start + bytes.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(bytes);
        Ok(())
    }

    fn len(&self) -> Result<u64> {
        Ok(self.data.lock().len() as u64)
    }

    fn set_len(&self, len: u64) -> Result<()> {
        self.data.lock().resize(len as usize, 0);
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }
}

/// Provides in-memory streams; contents live as long as the provider
#[derive(Default)]
pub struct InMemoryStreamProvider {
    streams: Mutex<HashMap<String, Arc<InMemoryStream>>>,
}

impl InMemoryStreamProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Length of stream `name`, or 0 if it was never opened
    pub fn stream_len(&self, name: &str) -> u64 {
        self.streams
            .lock()
            .get(name)
            .map(|stream| stream.data.lock().len() as u64)
            .unwrap_or(0)
    }
}

impl StreamProvider for InMemoryStreamProvider {
    fn stream(&self, name: &str) -> Result<SharedStream> {
        let mut streams = self.streams.lock();
        let stream = streams
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(InMemoryStream::new()));
        Ok(Arc::clone(stream) as SharedStream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_stream_write_extends() {
        let stream = InMemoryStream::new();
        stream.write_at(4, b"abc").unwrap();

        assert_eq!(stream.len().unwrap(), 7);
        assert_eq!(stream.read_at(0, 7).unwrap(), b"\0\0\0\0abc".to_vec());
    }

    #[test]
    fn test_memory_stream_read_past_end_fails() {
        let stream = InMemoryStream::new();
        stream.write_at(0, b"abc").unwrap();

        assert!(stream.read_at(2, 5).is_err());
    }

    #[test]
    fn test_provider_returns_same_stream() {
        let provider = InMemoryStreamProvider::new();
        provider.stream("data").unwrap().write_at(0, b"xy").unwrap();

        let again = provider.stream("data").unwrap();
        assert_eq!(again.read_at(0, 2).unwrap(), b"xy".to_vec());
        assert_eq!(provider.stream_len("data"), 2);
    }
}
