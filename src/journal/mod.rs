//! Journal Module
//!
//! Write-ahead journal giving atomic, crash-consistent updates to primary streams.
//!
//! ## Responsibilities
//! - Journal every primary write (with its undo image) before applying it
//! - Commit markers closing each transaction
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering
//! - Replay on open: redo committed writes, undo uncommitted ones
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Entry 1                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ ...                                     │
//! ├─────────────────────────────────────────┤
//! │ Commit marker                           │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The journal is truncated once a commit has been synced to the primary
//! streams, so on a healthy shutdown it is empty.

mod coordinator;
mod entry;
mod reader;
mod recovery;
mod writer;

pub use coordinator::Journal;
pub use entry::{JournalEntry, Operation, HEADER_SIZE};
pub use reader::JournalReader;
pub use recovery::{JournalRecovery, RecoveryResult};
pub use writer::JournalWriter;
