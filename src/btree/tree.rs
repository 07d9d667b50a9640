//! B-tree operations
//!
//! Classic single-pass B-tree of minimum degree `t`:
//! - every node holds at most `2t - 1` entries
//! - every node but the root holds at least `t - 1` entries
//! - all leaves sit at the same depth
//!
//! Insertion splits full nodes on the way down; deletion tops children up
//! (borrowing from a sibling or merging) on the way down, so neither ever
//! has to walk back up the tree.

use std::cmp::Ordering;
use std::marker::PhantomData;

use tracing::trace;

use crate::error::{Result, VellumError};

use super::{BTreeDataProvider, Direction, Entry, Node, NodeReader, Walker};

/// A B-tree whose nodes live behind a data provider
pub struct BTree<K, P, D> {
    provider: D,
    degree: usize,
    _marker: PhantomData<(K, P)>,
}

impl<K, P, D> BTree<K, P, D>
where
    K: Ord + Clone,
    P: Clone,
    D: BTreeDataProvider<K, P>,
{
    /// Create a tree over `provider`; degrees below 2 are raised to 2.
    /// An existing tree keeps the degree stored in its root.
    pub fn new(provider: D, degree: usize) -> Self {
        Self {
            provider,
            degree: degree.max(2),
            _marker: PhantomData,
        }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// The root node, creating an empty one if needed
    pub fn root(&mut self) -> Result<Node<K, P>> {
        let root = self.provider.root_node(self.degree)?;
        self.degree = root.degree.max(2);
        Ok(root)
    }

    /// Number of levels; 0 for a tree that has never been created
    pub fn height(&self) -> Result<usize> {
        let Some(mut node) = self.provider.peek_root_node()? else {
            return Ok(0);
        };

        let mut height = 1;
        while let Some(&child) = node.children.first() {
            node = self.provider.node(child)?;
            height += 1;
        }
        Ok(height)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Entry whose key equals `key`
    pub fn search(&self, key: &K) -> Result<Option<Entry<K, P>>> {
        Ok(self
            .find_node(key)?
            .map(|(node, index)| node.entries[index].clone()))
    }

    /// Lazily walk entries in `direction`, starting after every key for which
    /// `skip` holds. `skip` must hold for a prefix of the walk order.
    pub fn walk<F>(&self, direction: Direction, skip: F) -> Result<Walker<'_, K, P, D>>
    where
        F: Fn(&K) -> bool,
    {
        Walker::new(&self.provider, direction, skip)
    }

    fn find_node(&self, key: &K) -> Result<Option<(Node<K, P>, usize)>> {
        let Some(mut node) = self.provider.peek_root_node()? else {
            return Ok(None);
        };

        loop {
            match node.find(key) {
                Ok(index) => return Ok(Some((node, index))),
                Err(_) if node.is_leaf() => return Ok(None),
                Err(index) => node = self.provider.node(node.children[index])?,
            }
        }
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Insert `key`, or overwrite the pointer if the key is already present
    pub fn insert(&mut self, key: K, pointer: P) -> Result<()> {
        let mut root = self.root()?;
        if root.is_full() && root.find(&key).is_err() {
            let mut new_root = self.provider.create_node(self.degree)?;
            new_root.children.push(root.address);
            self.split_child(&mut new_root, 0, &mut root)?;
            self.provider.set_root_node(new_root.address)?;

            trace!(root = new_root.address, "b-tree grew");
            root = new_root;
        }

        self.insert_non_full(root, key, pointer)
    }

    fn insert_non_full(&mut self, mut node: Node<K, P>, key: K, pointer: P) -> Result<()> {
        loop {
            match node.find(&key) {
                Ok(index) => {
                    node.entries[index].pointer = pointer;
                    return self.provider.update_node(&node);
                }
                Err(index) if node.is_leaf() => {
                    node.entries.insert(index, Entry::new(key, pointer));
                    return self.provider.update_node(&node);
                }
                Err(index) => {
                    let mut child = self.provider.node(node.children[index])?;
                    if child.is_full() {
                        let sibling = self.split_child(&mut node, index, &mut child)?;
                        match key.cmp(&node.entries[index].key) {
                            // the lifted median is the key itself
                            Ordering::Equal => continue,
                            Ordering::Greater => child = sibling,
                            Ordering::Less => {}
                        }
                    }
                    node = child;
                }
            }
        }
    }

    /// Split the full `child` at `parent.children[index]`, lifting its median
    /// into `parent`. Returns the new right sibling.
    fn split_child(
        &mut self,
        parent: &mut Node<K, P>,
        index: usize,
        child: &mut Node<K, P>,
    ) -> Result<Node<K, P>> {
        let t = self.degree;
        let mut sibling = self.provider.create_node(t)?;

        sibling.entries = child.entries.split_off(t);
        let median = child.entries.remove(t - 1);
        if !child.is_leaf() {
            sibling.children = child.children.split_off(t);
        }

        parent.entries.insert(index, median);
        parent.children.insert(index + 1, sibling.address);

        self.provider.update_node(child)?;
        self.provider.update_node(&sibling)?;
        self.provider.update_node(parent)?;
        Ok(sibling)
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Remove `key`; absent keys leave the tree untouched
    pub fn delete(&mut self, key: &K) -> Result<()> {
        if self.find_node(key)?.is_none() {
            return Ok(());
        }

        let mut node = self.root()?;
        let t = self.degree;
        let mut key = key.clone();

        loop {
            match node.find(&key) {
                Ok(index) if node.is_leaf() => {
                    node.entries.remove(index);
                    return self.provider.update_node(&node);
                }
                Ok(index) => {
                    let left = self.provider.node(node.children[index])?;
                    if left.entries.len() >= t {
                        let predecessor = self.max_entry(&left)?;
                        key = predecessor.key.clone();
                        node.entries[index] = predecessor;
                        self.provider.update_node(&node)?;
                        node = left;
                        continue;
                    }

                    let right = self.provider.node(node.children[index + 1])?;
                    if right.entries.len() >= t {
                        let successor = self.min_entry(&right)?;
                        key = successor.key.clone();
                        node.entries[index] = successor;
                        self.provider.update_node(&node)?;
                        node = right;
                        continue;
                    }

                    node = self.merge_children(node, index, left, right)?;
                }
                Err(_) if node.is_leaf() => return Ok(()),
                Err(index) => node = self.fill_child(node, index)?,
            }
        }
    }

    /// Ensure `parent.children[index]` holds at least `t` entries and return it
    fn fill_child(&mut self, mut parent: Node<K, P>, index: usize) -> Result<Node<K, P>> {
        let t = self.degree;
        let mut child = self.provider.node(parent.children[index])?;
        if child.entries.len() >= t {
            return Ok(child);
        }

        let left = match index {
            0 => None,
            _ => Some(self.provider.node(parent.children[index - 1])?),
        };

        if let Some(mut left) = left.clone().filter(|n| n.entries.len() >= t) {
            if let Some(borrowed) = left.entries.pop() {
                let separator = std::mem::replace(&mut parent.entries[index - 1], borrowed);
                child.entries.insert(0, separator);
                if let Some(grandchild) = left.children.pop() {
                    child.children.insert(0, grandchild);
                }

                self.provider.update_node(&left)?;
                self.provider.update_node(&child)?;
                self.provider.update_node(&parent)?;
                return Ok(child);
            }
        }

        if index + 1 < parent.children.len() {
            let mut right = self.provider.node(parent.children[index + 1])?;
            if right.entries.len() >= t {
                let borrowed = right.entries.remove(0);
                let separator = std::mem::replace(&mut parent.entries[index], borrowed);
                child.entries.push(separator);
                if !right.is_leaf() {
                    child.children.push(right.children.remove(0));
                }

                self.provider.update_node(&right)?;
                self.provider.update_node(&child)?;
                self.provider.update_node(&parent)?;
                return Ok(child);
            }
            return self.merge_children(parent, index, child, right);
        }

        match left {
            Some(left) => self.merge_children(parent, index - 1, left, child),
            None => Err(VellumError::Storage(format!(
                "B-tree node {} has a single child",
                parent.address
            ))),
        }
    }

    /// Merge `parent.children[index + 1]` and the separator into
    /// `parent.children[index]`. Collapses the root when it empties.
    fn merge_children(
        &mut self,
        mut parent: Node<K, P>,
        index: usize,
        mut left: Node<K, P>,
        right: Node<K, P>,
    ) -> Result<Node<K, P>> {
        let separator = parent.entries.remove(index);
        parent.children.remove(index + 1);

        left.entries.push(separator);
        left.entries.extend(right.entries);
        left.children.extend(right.children);

        self.provider.update_node(&left)?;
        self.provider.recycle_node(right.address)?;

        if parent.entries.is_empty() {
            self.provider.set_root_node(left.address)?;
            self.provider.recycle_node(parent.address)?;
            trace!(root = left.address, "b-tree shrank");
        } else {
            self.provider.update_node(&parent)?;
        }

        Ok(left)
    }

    fn max_entry(&self, node: &Node<K, P>) -> Result<Entry<K, P>> {
        let mut node = node.clone();
        while let Some(&child) = node.children.last() {
            node = self.provider.node(child)?;
        }
        node.entries
            .last()
            .cloned()
            .ok_or(VellumError::NodeNotFound {
                address: node.address,
            })
    }

    fn min_entry(&self, node: &Node<K, P>) -> Result<Entry<K, P>> {
        let mut node = node.clone();
        while let Some(&child) = node.children.first() {
            node = self.provider.node(child)?;
        }
        node.entries
            .first()
            .cloned()
            .ok_or(VellumError::NodeNotFound {
                address: node.address,
            })
    }

    // =========================================================================
    // Provider
    // =========================================================================

    /// Persist pending node changes
    pub fn flush(&mut self) -> Result<()> {
        self.provider.flush()
    }

    pub fn provider(&self) -> &D {
        &self.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btree::MemoryDataProvider;

    fn tree(degree: usize) -> BTree<i64, u64, MemoryDataProvider<i64, u64>> {
        BTree::new(MemoryDataProvider::new(), degree)
    }

    #[test]
    fn test_empty_tree() {
        let mut tree = tree(2);
        assert_eq!(tree.height().unwrap(), 0);
        assert!(tree.search(&1).unwrap().is_none());

        let root = tree.root().unwrap();
        assert!(root.entries.is_empty());
        assert_eq!(tree.height().unwrap(), 1);
    }

    #[test]
    fn test_insert_overwrites_pointer() {
        let mut tree = tree(2);
        tree.insert(5, 1).unwrap();
        tree.insert(5, 2).unwrap();

        assert_eq!(tree.search(&5).unwrap(), Some(Entry::new(5, 2)));
        assert_eq!(tree.root().unwrap().entries.len(), 1);
    }

    #[test]
    fn test_split_and_collapse() {
        let mut tree = tree(2);
        for key in [10, 20, 30, 50] {
            tree.insert(key, key as u64).unwrap();
        }
        assert_eq!(tree.height().unwrap(), 2);

        for key in [10, 20, 30, 50] {
            tree.delete(&key).unwrap();
        }
        assert_eq!(tree.height().unwrap(), 1);
        assert!(tree.root().unwrap().entries.is_empty());
    }

    #[test]
    fn test_delete_missing_key_is_noop() {
        let mut tree = tree(2);
        for key in 0..10 {
            tree.insert(key, 0).unwrap();
        }
        let nodes = tree.provider().node_count();

        tree.delete(&100).unwrap();
        assert_eq!(tree.provider().node_count(), nodes);
    }

    #[test]
    fn test_existing_root_keeps_its_degree() {
        let mut tree = tree(3);
        for key in 0..20 {
            tree.insert(key, 0).unwrap();
        }

        let mut reopened = BTree::new(tree.provider, 2);
        assert_eq!(reopened.root().unwrap().degree, 3);
        assert_eq!(reopened.degree(), 3);
    }
}
