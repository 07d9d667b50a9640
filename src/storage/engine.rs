//! Storage Engine
//!
//! Byte-range reads and writes against one named stream. Writes are routed
//! through the session journal; reads go straight to the primary stream.

use std::sync::Arc;

use crate::error::Result;
use crate::journal::Journal;

use super::{SharedStream, StreamProvider};

/// Raw offset + length access to a named stream
#[derive(Clone)]
pub struct StorageEngine {
    stream_name: String,
    stream: SharedStream,
    journal: Arc<Journal>,
}

impl StorageEngine {
    /// Open the engine over stream `stream_name`
    pub fn new(
        stream_name: &str,
        provider: &dyn StreamProvider,
        journal: Arc<Journal>,
    ) -> Result<Self> {
        Ok(Self {
            stream_name: stream_name.to_string(),
            stream: provider.stream(stream_name)?,
            journal,
        })
    }

    /// Read `length` bytes at `address`
    pub fn read(&self, address: u64, length: usize) -> Result<Vec<u8>> {
        self.stream.read_at(address, length)
    }

    /// Journal, then write `bytes` at `address`
    pub fn write(&self, address: u64, bytes: &[u8]) -> Result<()> {
        self.journal
            .write(&self.stream_name, &self.stream, address, bytes)
    }

    /// Current stream length
    pub fn len(&self) -> Result<u64> {
        self.stream.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    /// Journal shared with every engine of the session
    pub fn journal(&self) -> &Arc<Journal> {
        &self.journal
    }
}
