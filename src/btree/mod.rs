//! B-tree Module
//!
//! An ordered map of keys to pointers whose nodes are stored through a
//! pluggable data provider.
//!
//! ```text
//!                 ┌───────────────┐
//!                 │   [20 | 40]   │  root
//!                 └──┬─────┬────┬─┘
//!          ┌─────────┘     │    └─────────┐
//!     ┌────▼────┐    ┌─────▼────┐    ┌────▼────┐
//!     │ [5|10]  │    │ [25|30]  │    │ [45|50] │  leaves
//!     └─────────┘    └──────────┘    └─────────┘
//! ```
//!
//! Children are referenced by address; the provider maps addresses to
//! nodes, in memory ([`MemoryDataProvider`]) or in a record file.

mod memory;
mod node;
mod provider;
mod tree;
mod walker;

pub use memory::MemoryDataProvider;
pub use node::{Entry, Node};
pub use provider::{BTreeDataProvider, NodeReader};
pub use tree::BTree;
pub use walker::{Direction, Walker};
