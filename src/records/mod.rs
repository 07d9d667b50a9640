//! Records Module
//!
//! Variable-length records inside a single append-with-reuse stream.
//!
//! ## File Layout
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │ File Header (32 bytes)                         │
//! │   Magic "VLDB" | Version | StateAddress        │
//! ├────────────────────────────────────────────────┤
//! │ Record                                         │
//! │   [Header (24)][Data][Padding to allocated]    │
//! ├────────────────────────────────────────────────┤
//! │ ... records, live or recycled ...              │
//! ├────────────────────────────────────────────────┤
//! │ State record (recycle pool + named directory)  │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! Records are addressed by the byte offset of their header.

mod allocation;
mod manager;
mod record;

pub use allocation::{
    AllocationStrategy, BTreeNodeAllocationStrategy, DoubleSizeAllocationStrategy,
    ExactSizeAllocationStrategy,
};
pub use manager::{EmptyRecord, RecordManager, FILE_HEADER_SIZE};
pub use record::{Record, RecordHeader, RECORD_HEADER_SIZE};
