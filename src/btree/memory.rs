//! In-memory data provider
//!
//! Keeps every node in a map. Useful for transient trees and for testing
//! tree algorithms without a backing file.

use std::collections::HashMap;

use crate::error::{Result, VellumError};

use super::{BTreeDataProvider, Node, NodeReader};

/// Data provider holding nodes in memory
#[derive(Debug, Clone)]
pub struct MemoryDataProvider<K, P> {
    nodes: HashMap<u64, Node<K, P>>,
    root: Option<u64>,
    next_address: u64,
    flush_count: usize,
}

impl<K, P> MemoryDataProvider<K, P> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            root: None,
            next_address: 1,
            flush_count: 0,
        }
    }

    /// Number of nodes currently part of the tree
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of times `flush` was called
    pub fn flush_count(&self) -> usize {
        self.flush_count
    }

    fn allocate(&mut self, degree: usize) -> Node<K, P>
    where
        K: Clone,
        P: Clone,
    {
        let mut node = Node::new(degree);
        node.address = self.next_address;
        self.next_address += 1;
        self.nodes.insert(node.address, node.clone());
        node
    }
}

impl<K, P> Default for MemoryDataProvider<K, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, P: Clone> NodeReader<K, P> for MemoryDataProvider<K, P> {
    fn peek_root_node(&self) -> Result<Option<Node<K, P>>> {
        match self.root {
            Some(address) => self.node(address).map(Some),
            None => Ok(None),
        }
    }

    fn node(&self, address: u64) -> Result<Node<K, P>> {
        self.nodes
            .get(&address)
            .cloned()
            .ok_or(VellumError::NodeNotFound { address })
    }
}

impl<K: Clone, P: Clone> BTreeDataProvider<K, P> for MemoryDataProvider<K, P> {
    fn root_node(&mut self, degree: usize) -> Result<Node<K, P>> {
        if let Some(root) = self.peek_root_node()? {
            return Ok(root);
        }

        let root = self.allocate(degree);
        self.root = Some(root.address);
        Ok(root)
    }

    fn create_node(&mut self, degree: usize) -> Result<Node<K, P>> {
        Ok(self.allocate(degree))
    }

    fn update_node(&mut self, node: &Node<K, P>) -> Result<()> {
        match self.nodes.get_mut(&node.address) {
            Some(stored) => {
                *stored = node.clone();
                Ok(())
            }
            None => Err(VellumError::NodeNotFound {
                address: node.address,
            }),
        }
    }

    fn set_root_node(&mut self, address: u64) -> Result<()> {
        if !self.nodes.contains_key(&address) {
            return Err(VellumError::NodeNotFound { address });
        }
        self.root = Some(address);
        Ok(())
    }

    fn recycle_node(&mut self, address: u64) -> Result<()> {
        self.nodes.remove(&address);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flush_count += 1;
        Ok(())
    }
}
