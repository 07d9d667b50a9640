//! B-tree nodes and entries

use std::borrow::Borrow;

use serde::{Deserialize, Serialize};

/// A key and the pointer stored with it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry<K, P> {
    pub key: K,
    pub pointer: P,
}

impl<K, P> Entry<K, P> {
    pub fn new(key: K, pointer: P) -> Self {
        Self { key, pointer }
    }
}

/// A B-tree node
///
/// Nodes refer to their children by address only. `address` is assigned by
/// the data provider and is not part of the serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node<K, P> {
    #[serde(skip)]
    pub address: u64,

    /// Degree `t` the node was created with
    pub degree: usize,

    /// Entries in strictly increasing key order
    pub entries: Vec<Entry<K, P>>,

    /// Child addresses; empty for leaves, `entries.len() + 1` otherwise
    pub children: Vec<u64>,
}

impl<K, P> Node<K, P> {
    /// Create an empty leaf
    pub fn new(degree: usize) -> Self {
        Self {
            address: 0,
            degree,
            entries: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Most entries a node may hold (`2t - 1`)
    pub fn max_entries(&self) -> usize {
        2 * self.degree - 1
    }

    /// Fewest entries a non-root node may hold (`t - 1`)
    pub fn min_entries(&self) -> usize {
        self.degree - 1
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_entries()
    }
}

impl<K: Ord, P> Node<K, P> {
    /// Binary search for `key`: `Ok(index)` if present, `Err(insert position)` otherwise
    pub fn find<Q>(&self, key: &Q) -> Result<usize, usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries.binary_search_by(|entry| entry.key.borrow().cmp(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_with(keys: &[i32]) -> Node<i32, u64> {
        let mut node = Node::new(2);
        node.entries = keys.iter().map(|k| Entry::new(*k, *k as u64)).collect();
        node
    }

    #[test]
    fn test_find() {
        let node = node_with(&[10, 20, 30]);

        assert_eq!(node.find(&20), Ok(1));
        assert_eq!(node.find(&5), Err(0));
        assert_eq!(node.find(&25), Err(2));
        assert_eq!(node.find(&99), Err(3));
    }

    #[test]
    fn test_capacity() {
        let node = node_with(&[1, 2, 3]);

        assert_eq!(node.max_entries(), 3);
        assert_eq!(node.min_entries(), 1);
        assert!(node.is_full());
        assert!(node.is_leaf());
    }

    #[test]
    fn test_address_not_serialized() {
        let mut node = node_with(&[1]);
        node.address = 77;

        let bytes = bincode::serialize(&node).unwrap();
        let decoded: Node<i32, u64> = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded.address, 0);
        assert_eq!(decoded.entries, node.entries);
    }
}
