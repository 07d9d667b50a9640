//! Journal Entry definitions
//!
//! Defines the structure of individual journal entries and their on-disk frame.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VellumError};

/// Frame header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Largest payload accepted when decoding (guards against garbage lengths)
pub const MAX_PAYLOAD_SIZE: usize = 256 * 1024 * 1024;

/// A single entry in the journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operation that was journalled
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be journalled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// A byte-range write against a primary stream, with its undo image
    Write {
        stream: String,
        address: u64,
        /// Stream length before the write
        previous_len: u64,
        /// Bytes that were overwritten (shorter than `after` if the write grew the stream)
        before: Vec<u8>,
        /// Bytes written
        after: Vec<u8>,
    },

    /// Every entry before this marker belongs to a committed transaction
    Commit,
}

impl JournalEntry {
    /// Create an entry stamped with the current time
    pub fn new(lsn: u64, operation: Operation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            operation,
            timestamp,
        }
    }

    pub fn is_commit(&self) -> bool {
        matches!(self.operation, Operation::Commit)
    }

    /// Encode as a frame: `[lsn u64][crc u32][len u32][payload]`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(&(&self.operation, self.timestamp))?;
        let crc = Self::compute_crc(self.lsn, &payload);

        let mut frame = BytesMut::with_capacity(HEADER_SIZE + payload.len());
        frame.put_u64_le(self.lsn);
        frame.put_u32_le(crc);
        frame.put_u32_le(payload.len() as u32);
        frame.put_slice(&payload);

        Ok(frame.to_vec())
    }

    /// Decode one frame from the front of `bytes`
    ///
    /// Returns `Ok(None)` when `bytes` holds only part of a frame (a torn
    /// tail), the entry and the number of bytes consumed otherwise. A
    /// complete frame that fails its checksum or cannot be decoded is
    /// `JournalCorruption`.
    pub fn deserialize(bytes: &[u8]) -> Result<Option<(Self, usize)>> {
        if bytes.len() < HEADER_SIZE {
            return Ok(None);
        }

        let mut header = &bytes[..HEADER_SIZE];
        let lsn = header.get_u64_le();
        let crc = header.get_u32_le();
        let len = header.get_u32_le() as usize;

        if len > MAX_PAYLOAD_SIZE {
            return Err(VellumError::JournalCorruption(format!(
                "entry {} claims a {} byte payload",
                lsn, len
            )));
        }

        let total = HEADER_SIZE + len;
        if bytes.len() < total {
            return Ok(None);
        }

        let payload = &bytes[HEADER_SIZE..total];
        let actual = Self::compute_crc(lsn, payload);
        if actual != crc {
            return Err(VellumError::JournalCorruption(format!(
                "checksum mismatch in entry {}: stored {:#010x}, computed {:#010x}",
                lsn, crc, actual
            )));
        }

        let (operation, timestamp): (Operation, u64) = bincode::deserialize(payload)
            .map_err(|e| {
                VellumError::JournalCorruption(format!("undecodable entry {}: {}", lsn, e))
            })?;

        Ok(Some((
            Self {
                lsn,
                operation,
                timestamp,
            },
            total,
        )))
    }

    /// CRC32 over the LSN and payload
    pub fn compute_crc(lsn: u64, payload: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&lsn.to_le_bytes());
        hasher.update(payload);
        hasher.finalize()
    }
}
