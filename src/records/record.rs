//! Record and record header
//!
//! ## Header Layout (24 bytes, little endian)
//! ```text
//! ┌─────────────┬──────────────┬───────────────┬───────────┬──────────┐
//! │ Address (8) │ DataSize (4) │ Allocated (4) │ Flags (4) │ CRC (4)  │
//! └─────────────┴──────────────┴───────────────┴───────────┴──────────┘
//! ```
//! The header stores its own address so a read at a wrong offset is caught,
//! and its CRC covers the first 20 bytes.

use bytes::{Buf, BufMut, BytesMut};

/// Size of an encoded record header
pub const RECORD_HEADER_SIZE: usize = 24;

/// Flag bit set while the record is in use
const FLAG_LIVE: u32 = 0x1;

/// Header preceding every record's data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Byte offset of this header in the stream
    pub address: u64,
    /// Bytes of data currently stored
    pub data_size: u32,
    /// Bytes reserved for data (>= data_size)
    pub allocated_size: u32,
    /// False once the record has been recycled
    pub is_live: bool,
}

impl RecordHeader {
    /// Encode the header
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(RECORD_HEADER_SIZE);
        buf.put_u64_le(self.address);
        buf.put_u32_le(self.data_size);
        buf.put_u32_le(self.allocated_size);
        buf.put_u32_le(if self.is_live { FLAG_LIVE } else { 0 });

        let crc = crc32fast::hash(&buf);
        buf.put_u32_le(crc);
        buf.to_vec()
    }

    /// Decode a header; `None` if the bytes are not a valid header
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < RECORD_HEADER_SIZE {
            return None;
        }

        let stored_crc = (&bytes[20..24]).get_u32_le();
        if crc32fast::hash(&bytes[..20]) != stored_crc {
            return None;
        }

        let mut buf = &bytes[..20];
        let address = buf.get_u64_le();
        let data_size = buf.get_u32_le();
        let allocated_size = buf.get_u32_le();
        let flags = buf.get_u32_le();

        if data_size > allocated_size {
            return None;
        }

        Some(Self {
            address,
            data_size,
            allocated_size,
            is_live: flags & FLAG_LIVE != 0,
        })
    }

    /// Offset of the first data byte
    pub fn data_address(&self) -> u64 {
        self.address + RECORD_HEADER_SIZE as u64
    }

    /// Header plus reserved data
    pub fn total_size(&self) -> u64 {
        RECORD_HEADER_SIZE as u64 + self.allocated_size as u64
    }
}

/// A record: header plus its data bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub header: RecordHeader,
    pub data: Vec<u8>,
}

impl Record {
    pub fn address(&self) -> u64 {
        self.header.address
    }
}
