//! Storage Module
//!
//! Raw byte-range storage underneath the record manager.
//!
//! ## Responsibilities
//! - Named backing streams (files on disk, or memory for tests)
//! - Offset + length reads and journalled writes
//!
//! ## Layering
//! ```text
//! ┌────────────────────────────────────────┐
//! │ StorageEngine (one per stream name)    │
//! │   read ─────────────┐   write          │
//! │                     │     │            │
//! │                     │     ▼            │
//! │                     │  Journal         │
//! │                     │     │            │
//! │                     ▼     ▼            │
//! │            StorageStream               │
//! │   (FileStream / InMemoryStream)        │
//! └────────────────────────────────────────┘
//! ```

mod engine;
mod stream;

pub use engine::StorageEngine;
pub use stream::{
    FileStream, FileStreamProvider, InMemoryStream, InMemoryStreamProvider, SharedStream,
    StorageStream, StreamProvider,
};
