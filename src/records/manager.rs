//! Record Manager
//!
//! Allocates, updates, recycles and looks up variable-length records inside
//! one stream.
//!
//! ## Responsibilities
//! - Append records, reusing recycled slots before growing the stream
//! - Update in place when the reserved space suffices, relocate otherwise
//! - Track recycled slots and the named record directory
//! - Persist that state so a reopened file sees the same free space and names

use std::collections::BTreeMap;

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VellumError};
use crate::storage::StorageEngine;

use super::record::{Record, RecordHeader, RECORD_HEADER_SIZE};
use super::{AllocationStrategy, DoubleSizeAllocationStrategy};

/// Magic bytes identifying a VellumDB collection file
pub(crate) const MAGIC: &[u8; 4] = b"VLDB";

/// Current file format version
pub(crate) const VERSION: u16 = 1;

/// File header: Magic (4) + Version (2) + Reserved (2) + StateAddress (8) + Reserved (16)
pub const FILE_HEADER_SIZE: u64 = 32;

/// A recycled slot available for reuse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyRecord {
    pub address: u64,
    pub allocated_size: u32,
}

/// Bookkeeping persisted in the state record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RecordManagerState {
    named_records: BTreeMap<String, u64>,
    empty_records: Vec<EmptyRecord>,
}

/// Manages the records of one collection file
pub struct RecordManager {
    engine: StorageEngine,
    state: RecordManagerState,
    /// Address of the record holding `state` (0 = never saved)
    state_address: u64,
    /// `state` differs from what is on disk
    dirty: bool,
}

impl RecordManager {
    /// Open the record manager, initializing an empty stream
    pub fn open(engine: StorageEngine) -> Result<Self> {
        let mut manager = Self {
            engine,
            state: RecordManagerState::default(),
            state_address: 0,
            dirty: false,
        };
        manager.reload()?;
        Ok(manager)
    }

    /// Discard in-memory state and read it back from the stream
    pub fn reload(&mut self) -> Result<()> {
        self.state = RecordManagerState::default();
        self.state_address = 0;
        self.dirty = false;

        if self.engine.len()? < FILE_HEADER_SIZE {
            return self.write_file_header();
        }

        let header = self.engine.read(0, FILE_HEADER_SIZE as usize)?;
        if &header[0..4] != MAGIC {
            return Err(VellumError::Storage(format!(
                "Invalid file magic in '{}': expected VLDB, got {:?}",
                self.engine.stream_name(),
                &header[0..4]
            )));
        }

        let mut fields = &header[4..16];
        let version = fields.get_u16_le();
        if version != VERSION {
            return Err(VellumError::Storage(format!(
                "Unsupported file version: {}",
                version
            )));
        }
        let _reserved = fields.get_u16_le();
        let state_address = fields.get_u64_le();

        if state_address != 0 {
            let record = self.get_record(state_address)?;
            self.state = bincode::deserialize(&record.data)?;
            self.state_address = state_address;
        }

        Ok(())
    }

    // =========================================================================
    // Records
    // =========================================================================

    /// Store `data` in a recycled slot if one fits, otherwise at the end of the stream
    pub fn append_record(
        &mut self,
        data: &[u8],
        strategy: &dyn AllocationStrategy,
    ) -> Result<Record> {
        let required = Self::required_size(data, strategy)?;

        if let Some(slot) = self.take_empty_record(required) {
            return self.write_record(slot.address, data, slot.allocated_size, false);
        }

        let address = self.end_of_storage()?;
        self.write_record(address, data, required, true)
    }

    /// Read the record at `address`
    ///
    /// Fails with `RecordNotFound` if no live record starts there.
    pub fn get_record(&self, address: u64) -> Result<Record> {
        let header = self
            .read_header(address)?
            .filter(|header| header.is_live)
            .ok_or(VellumError::RecordNotFound { address })?;

        let data = self
            .engine
            .read(header.data_address(), header.data_size as usize)?;

        Ok(Record { header, data })
    }

    /// Replace a record's data
    ///
    /// Rewrites in place when the record's allocated size covers what the
    /// strategy asks for; otherwise the old slot is recycled and the data is
    /// appended elsewhere, so the returned address may differ.
    pub fn update_record(
        &mut self,
        record: &Record,
        data: &[u8],
        strategy: &dyn AllocationStrategy,
    ) -> Result<Record> {
        let required = Self::required_size(data, strategy)?;
        let header = record.header;

        if header.allocated_size >= required {
            return self.write_record(header.address, data, header.allocated_size, false);
        }

        self.recycle(header.address)?;
        let relocated = self.append_record(data, strategy)?;

        debug!(
            from = header.address,
            to = relocated.address(),
            size = data.len(),
            "record relocated"
        );
        Ok(relocated)
    }

    /// Mark a record free and pool its slot for reuse
    ///
    /// Recycling an address that is already free is ignored.
    pub fn recycle(&mut self, address: u64) -> Result<()> {
        if self.state.empty_records.iter().any(|e| e.address == address) {
            debug!(address, "record already recycled");
            return Ok(());
        }

        let mut header = match self.read_header(address)? {
            Some(header) if header.is_live => header,
            _ => {
                debug!(address, "recycle of non-live address ignored");
                return Ok(());
            }
        };

        header.is_live = false;
        self.engine.write(address, &header.encode())?;

        self.state.empty_records.push(EmptyRecord {
            address,
            allocated_size: header.allocated_size,
        });
        self.dirty = true;
        Ok(())
    }

    // =========================================================================
    // Named Record Directory
    // =========================================================================

    /// Bind `name` to `address`
    pub fn register_named_record_address(&mut self, name: &str, address: u64) {
        if self.state.named_records.get(name) == Some(&address) {
            return;
        }
        self.state.named_records.insert(name.to_string(), address);
        self.dirty = true;
    }

    /// Address bound to `name`, or 0 when unregistered
    pub fn named_record_address(&self, name: &str) -> u64 {
        self.state.named_records.get(name).copied().unwrap_or(0)
    }

    /// Remove the binding for `name`
    pub fn unregister_named_record_address(&mut self, name: &str) {
        if self.state.named_records.remove(name).is_some() {
            self.dirty = true;
        }
    }

    /// All directory entries in name order
    pub fn named_records(&self) -> impl Iterator<Item = (&str, u64)> {
        self.state
            .named_records
            .iter()
            .map(|(name, address)| (name.as_str(), *address))
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Persist the recycle pool and named directory
    pub fn save_state(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        if self.state_address != 0 {
            let data = bincode::serialize(&self.state)?;
            let header = self.read_header(self.state_address)?.ok_or_else(|| {
                VellumError::Storage(format!(
                    "State record at {} is damaged",
                    self.state_address
                ))
            })?;

            if header.allocated_size as usize >= data.len() {
                self.write_record(self.state_address, &data, header.allocated_size, false)?;
                self.dirty = false;
                return Ok(());
            }

            // Outgrown: pool the old slot, then write the state (now including it) elsewhere
            let mut freed = header;
            freed.is_live = false;
            self.engine.write(freed.address, &freed.encode())?;
            self.state.empty_records.push(EmptyRecord {
                address: freed.address,
                allocated_size: freed.allocated_size,
            });
        }

        let data = bincode::serialize(&self.state)?;
        let allocated = Self::required_size(&data, &DoubleSizeAllocationStrategy)?;
        let address = self.end_of_storage()?;
        self.write_record(address, &data, allocated, true)?;

        self.state_address = address;
        self.write_file_header()?;
        self.dirty = false;

        debug!(
            address,
            named = self.state.named_records.len(),
            empty = self.state.empty_records.len(),
            "record manager state relocated"
        );
        Ok(())
    }

    /// Whether unsaved state changes exist
    pub fn has_unsaved_state(&self) -> bool {
        self.dirty
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Recycled slots waiting for reuse
    pub fn empty_records(&self) -> &[EmptyRecord] {
        &self.state.empty_records
    }

    /// Current length of the backing stream
    pub fn storage_len(&self) -> Result<u64> {
        self.engine.len()
    }

    pub fn engine(&self) -> &StorageEngine {
        &self.engine
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn required_size(data: &[u8], strategy: &dyn AllocationStrategy) -> Result<u32> {
        let required = strategy.allocated_size(data.len()).max(data.len());
        u32::try_from(required).map_err(|_| {
            VellumError::Storage(format!("Record of {} bytes is too large", required))
        })
    }

    /// Take the first pooled slot that can hold `required` bytes
    fn take_empty_record(&mut self, required: u32) -> Option<EmptyRecord> {
        let index = self
            .state
            .empty_records
            .iter()
            .position(|slot| slot.allocated_size >= required)?;

        self.dirty = true;
        Some(self.state.empty_records.remove(index))
    }

    fn end_of_storage(&self) -> Result<u64> {
        Ok(self.engine.len()?.max(FILE_HEADER_SIZE))
    }

    /// Header at `address`, or `None` if none can start there
    fn read_header(&self, address: u64) -> Result<Option<RecordHeader>> {
        let len = self.engine.len()?;
        let past_end = address
            .checked_add(RECORD_HEADER_SIZE as u64)
            .map_or(true, |end| end > len);
        if address < FILE_HEADER_SIZE || past_end {
            return Ok(None);
        }

        let bytes = self.engine.read(address, RECORD_HEADER_SIZE)?;
        Ok(RecordHeader::decode(&bytes)
            .filter(|header| header.address == address)
            .filter(|header| header.data_address() + header.data_size as u64 <= len))
    }

    /// Write header + data; `reserve` pads with zeros up to the allocated size
    fn write_record(
        &mut self,
        address: u64,
        data: &[u8],
        allocated_size: u32,
        reserve: bool,
    ) -> Result<Record> {
        let header = RecordHeader {
            address,
            data_size: data.len() as u32,
            allocated_size,
            is_live: true,
        };

        let capacity = if reserve {
            RECORD_HEADER_SIZE + allocated_size as usize
        } else {
            RECORD_HEADER_SIZE + data.len()
        };
        let mut buf = Vec::with_capacity(capacity);
        buf.extend_from_slice(&header.encode());
        buf.extend_from_slice(data);
        buf.resize(capacity, 0);

        self.engine.write(address, &buf)?;

        Ok(Record {
            header,
            data: data.to_vec(),
        })
    }

    fn write_file_header(&self) -> Result<()> {
        let mut buf = BytesMut::with_capacity(FILE_HEADER_SIZE as usize);
        buf.put_slice(MAGIC);
        buf.put_u16_le(VERSION);
        buf.put_u16_le(0);
        buf.put_u64_le(self.state_address);
        buf.put_bytes(0, 16);
        self.engine.write(0, &buf)
    }
}
