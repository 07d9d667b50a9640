//! Journal Reader
//!
//! Reads framed entries back from the journal stream.

use crate::error::Result;
use crate::storage::SharedStream;

use super::JournalEntry;

/// Reads entries from the journal stream
///
/// The journal is truncated after every commit, so it is read into memory
/// in one piece.
pub struct JournalReader {
    data: Vec<u8>,
    position: usize,
    torn: bool,
}

impl JournalReader {
    /// Load the journal contents
    pub fn open(stream: &SharedStream) -> Result<Self> {
        let len = stream.len()? as usize;
        let data = if len == 0 {
            Vec::new()
        } else {
            stream.read_at(0, len)?
        };

        Ok(Self {
            data,
            position: 0,
            torn: false,
        })
    }

    /// Read the next entry from the journal
    ///
    /// A partial frame at the tail ends the journal and sets [`is_torn`](Self::is_torn).
    pub fn next_entry(&mut self) -> Result<Option<JournalEntry>> {
        if self.torn || self.position >= self.data.len() {
            return Ok(None);
        }

        match JournalEntry::deserialize(&self.data[self.position..])? {
            Some((entry, consumed)) => {
                self.position += consumed;
                Ok(Some(entry))
            }
            None => {
                self.torn = true;
                Ok(None)
            }
        }
    }

    /// Read every remaining entry
    pub fn read_all(&mut self) -> Result<Vec<JournalEntry>> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next_entry()? {
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Whether the journal ended in a partially written frame
    pub fn is_torn(&self) -> bool {
        self.torn
    }

    /// Offset just past the last complete frame read so far
    pub fn valid_len(&self) -> u64 {
        self.position as u64
    }
}
