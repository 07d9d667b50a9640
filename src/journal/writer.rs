//! Journal Writer
//!
//! Handles appending entries to the journal stream.

use crate::config::JournalSyncStrategy;
use crate::error::Result;
use crate::storage::SharedStream;

use super::{JournalEntry, JournalReader, Operation};

/// Writes entries to the journal stream
pub struct JournalWriter {
    stream: SharedStream,
    /// Offset where the next frame goes
    position: u64,
    /// LSN handed to the next appended entry
    next_lsn: u64,
    sync_strategy: JournalSyncStrategy,
}

impl JournalWriter {
    /// Open the journal, positioning after its last complete entry
    pub fn open(stream: SharedStream, sync_strategy: JournalSyncStrategy) -> Result<Self> {
        let mut reader = JournalReader::open(&stream)?;
        let mut last_lsn = 0;
        while let Some(entry) = reader.next_entry()? {
            last_lsn = entry.lsn;
        }

        Ok(Self {
            position: reader.valid_len(),
            next_lsn: last_lsn + 1,
            stream,
            sync_strategy,
        })
    }

    /// Append an operation to the journal, returning its LSN
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        let lsn = self.next_lsn;
        let entry = JournalEntry::new(lsn, operation);
        let bytes = entry.serialize()?;

        self.stream.write_at(self.position, &bytes)?;
        self.position += bytes.len() as u64;
        self.next_lsn += 1;

        if self.sync_strategy == JournalSyncStrategy::EveryWrite {
            self.stream.sync()?;
        }

        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.stream.sync()
    }

    /// Drop every entry; LSNs keep counting up
    pub fn truncate(&mut self) -> Result<()> {
        self.stream.set_len(0)?;
        self.stream.sync()?;
        self.position = 0;
        Ok(())
    }

    /// Get the LSN the next entry will receive
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Bytes of journal currently written
    pub fn position(&self) -> u64 {
        self.position
    }

    /// The underlying journal stream
    pub fn stream(&self) -> &SharedStream {
        &self.stream
    }
}
