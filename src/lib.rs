//! # VellumDB
//!
//! An embedded, transactional, indexed object store with:
//! - Disk-resident B-tree indexes (single, compound, range and unique)
//! - Variable-length records with free-space reuse
//! - A write-ahead journal for atomic, crash-consistent updates
//! - Crash recovery that redoes committed and undoes uncommitted writes
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Session / Collection<T>                     │
//! │          (persist, destroy, find, index scans)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Index Layer                              │
//! │     (CompoundValue keys, ranges, uniqueness, predicates)     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       B-Tree                                 │
//! │          (nodes addressed through a data provider)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Record Manager                             │
//! │   (append / update / recycle, named record directory)        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Journal   │          │   Storage   │
//!   │ (undo/redo) │─────────►│  (streams)  │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod storage;
pub mod journal;
pub mod records;
pub mod btree;
pub mod index;
pub mod serialization;
pub mod collection;
pub mod session;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, VellumError};
pub use config::{AllocationPolicy, Config, JournalSyncStrategy};
pub use collection::{Collection, CollectionFile};
pub use index::{CompoundValue, IndexDefinition, IndexValue};
pub use session::Session;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of VellumDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
