//! Lazy in-order traversal
//!
//! The walker keeps the path from the root to the current position on a
//! stack and loads nodes only as the iteration reaches them, so stopping
//! early never touches the rest of the tree.

use super::{Entry, Node, NodeReader};
use crate::error::Result;

/// Walk order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

struct Frame<K, P> {
    node: Node<K, P>,
    /// Ascending: next entry to yield. Descending: one past it.
    index: usize,
}

/// Iterator over tree entries in key order
pub struct Walker<'a, K, P, R: ?Sized> {
    reader: &'a R,
    direction: Direction,
    stack: Vec<Frame<K, P>>,
    failed: bool,
}

impl<'a, K, P, R> Walker<'a, K, P, R>
where
    K: Clone,
    P: Clone,
    R: NodeReader<K, P> + ?Sized,
{
    /// Position the walker on the first entry for which `skip` does not hold
    pub fn new<F>(reader: &'a R, direction: Direction, skip: F) -> Result<Self>
    where
        F: Fn(&K) -> bool,
    {
        let mut walker = Self {
            reader,
            direction,
            stack: Vec::new(),
            failed: false,
        };

        let mut next = reader.peek_root_node()?;
        while let Some(node) = next {
            let index = match direction {
                Direction::Ascending => node.entries.partition_point(|e| skip(&e.key)),
                Direction::Descending => node.entries.partition_point(|e| !skip(&e.key)),
            };
            next = match node.children.get(index) {
                Some(&child) => Some(reader.node(child)?),
                None => None,
            };
            walker.stack.push(Frame { node, index });
        }

        Ok(walker)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Push the outermost path of the subtree at `address`
    fn descend(&mut self, address: u64) -> Result<()> {
        let mut address = Some(address);
        while let Some(current) = address {
            let node = self.reader.node(current)?;
            let index = match self.direction {
                Direction::Ascending => 0,
                Direction::Descending => node.entries.len(),
            };
            address = node.children.get(index).copied();
            self.stack.push(Frame { node, index });
        }
        Ok(())
    }
}

impl<K, P, R> Iterator for Walker<'_, K, P, R>
where
    K: Clone,
    P: Clone,
    R: NodeReader<K, P> + ?Sized,
{
    type Item = Result<Entry<K, P>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let frame = self.stack.last_mut()?;

            let step = match self.direction {
                Direction::Ascending if frame.index < frame.node.entries.len() => {
                    let entry = frame.node.entries[frame.index].clone();
                    frame.index += 1;
                    Some((entry, frame.node.children.get(frame.index).copied()))
                }
                Direction::Descending if frame.index > 0 => {
                    frame.index -= 1;
                    let entry = frame.node.entries[frame.index].clone();
                    Some((entry, frame.node.children.get(frame.index).copied()))
                }
                _ => None,
            };

            match step {
                Some((entry, child)) => {
                    if let Some(address) = child {
                        if let Err(e) = self.descend(address) {
                            self.failed = true;
                            return Some(Err(e));
                        }
                    }
                    return Some(Ok(entry));
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::btree::{BTree, Direction, MemoryDataProvider};

    type MemoryTree = BTree<i64, u64, MemoryDataProvider<i64, u64>>;

    fn filled(count: i64) -> MemoryTree {
        let mut tree = BTree::new(MemoryDataProvider::new(), 2);
        for key in 0..count {
            tree.insert(key * 2, key as u64).unwrap();
        }
        tree
    }

    fn keys(tree: &MemoryTree, direction: Direction, skip: impl Fn(&i64) -> bool) -> Vec<i64> {
        tree.walk(direction, skip)
            .unwrap()
            .map(|entry| entry.unwrap().key)
            .collect()
    }

    #[test]
    fn test_walk_all() {
        let tree = filled(50);

        let ascending = keys(&tree, Direction::Ascending, |_| false);
        assert_eq!(ascending, (0..50).map(|k| k * 2).collect::<Vec<_>>());

        let descending = keys(&tree, Direction::Descending, |_| false);
        assert_eq!(descending, (0..50).rev().map(|k| k * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_walk_from_seek_point() {
        let tree = filled(50);

        let from_41 = keys(&tree, Direction::Ascending, |k| *k < 41);
        assert_eq!(from_41[..3], [42, 44, 46]);

        let below_41 = keys(&tree, Direction::Descending, |k| *k > 41);
        assert_eq!(below_41[..3], [40, 38, 36]);
    }

    #[test]
    fn test_walk_empty_tree() {
        let tree = filled(0);
        assert!(keys(&tree, Direction::Ascending, |_| false).is_empty());
    }
}
