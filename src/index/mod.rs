//! Index Module
//!
//! Secondary access paths over collection records.
//!
//! ```text
//!   object ──projection──► CompoundValue ──► IndexKey (value, address)
//!                                               │
//!                                               ▼
//!                                  RecordIndex (B-tree: key → address)
//!                                               │
//!                                               ▼
//!                          RecordDataProvider (one record per node)
//!                                               │
//!                                               ▼
//!                                  RecordManager ──► journal ──► file
//! ```
//!
//! Scans ([`Scope`]) walk the same trees read-only through a
//! [`RecordNodeReader`] and resolve each address back to an object.

mod definition;
mod key;
mod provider;
mod record_index;
mod scope;
mod value;

pub use definition::{IndexDefinition, IndexSpec};
pub use key::{Bound, IndexKey, KeyRange};
pub use provider::{RecordDataProvider, RecordNodeReader};
pub use record_index::{root_record_name, RecordIndex};
pub use scope::{Between, Index, KeyIter, Scope, ScopeIter};
pub use value::{CompoundValue, IndexValue};
