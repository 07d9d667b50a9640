//! Data provider capability
//!
//! The tree never holds nodes across operations. It asks a provider for
//! them by address and hands every change back, so the provider decides
//! where nodes live and when they become durable.

use crate::error::Result;

use super::Node;

/// Read-only node access, enough to search and walk a tree
pub trait NodeReader<K, P> {
    /// The current root, or `None` if the tree was never created
    fn peek_root_node(&self) -> Result<Option<Node<K, P>>>;

    /// The node stored at `address`
    fn node(&self, address: u64) -> Result<Node<K, P>>;
}

/// Full node persistence used by tree mutations
pub trait BTreeDataProvider<K, P>: NodeReader<K, P> {
    /// The root, creating an empty one of `degree` on first use
    fn root_node(&mut self, degree: usize) -> Result<Node<K, P>>;

    /// A new empty node with a fresh unique address
    fn create_node(&mut self, degree: usize) -> Result<Node<K, P>>;

    /// Record the new contents of a node
    fn update_node(&mut self, node: &Node<K, P>) -> Result<()>;

    /// Make the node at `address` the root
    fn set_root_node(&mut self, address: u64) -> Result<()>;

    /// Drop a node that is no longer part of the tree
    fn recycle_node(&mut self, address: u64) -> Result<()>;

    /// Durably persist every node touched since the last flush
    fn flush(&mut self) -> Result<()>;
}
