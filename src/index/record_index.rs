//! Record Index
//!
//! A B-tree from keys to record addresses, stored in a collection file.
//! Every mutation flushes the tree before returning, so the index is
//! durable as soon as `register`/`unregister` succeed.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::btree::{BTree, Direction, Entry, Walker};
use crate::error::{Result, VellumError};
use crate::records::RecordManager;

use super::RecordDataProvider;

/// Named record holding the root node address of index `name`
pub fn root_record_name(name: &str) -> String {
    format!("index/{}/root", name)
}

/// Index from `K` to record addresses
pub struct RecordIndex<'a, K> {
    name: String,
    unique: bool,
    tree: BTree<K, u64, RecordDataProvider<'a, K, u64>>,
}

impl<'a, K> RecordIndex<'a, K>
where
    K: Ord + Clone + Debug + Serialize + DeserializeOwned,
{
    /// Open index `name`, creating it on first registration
    pub fn new(records: &'a mut RecordManager, name: &str, degree: usize) -> Self {
        Self::open(records, name, degree, false)
    }

    /// Open a unique index: a key may be bound to one address only
    pub fn unique(records: &'a mut RecordManager, name: &str, degree: usize) -> Self {
        Self::open(records, name, degree, true)
    }

    fn open(records: &'a mut RecordManager, name: &str, degree: usize, unique: bool) -> Self {
        let provider = RecordDataProvider::new(records, root_record_name(name));
        Self {
            name: name.to_string(),
            unique,
            tree: BTree::new(provider, degree),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Address bound to `key`, or 0
    pub fn search(&self, key: &K) -> Result<u64> {
        Ok(self.tree.search(key)?.map_or(0, |entry| entry.pointer))
    }

    /// Bind `key` to `address`
    ///
    /// A unique index refuses a key already bound to another address and
    /// leaves itself untouched.
    pub fn register(&mut self, key: K, address: u64) -> Result<()> {
        if self.unique {
            self.check_unique(&key, address)?;
        }

        self.tree.insert(key, address)?;
        self.tree.flush()
    }

    /// Remove `key`; absent keys are ignored
    pub fn unregister(&mut self, key: &K) -> Result<()> {
        self.tree.delete(key)?;
        self.tree.flush()
    }

    /// Fail with `DuplicateKey` if `key` is bound to an address other than `address`
    pub fn check_unique(&self, key: &K, address: u64) -> Result<()> {
        match self.search(key)? {
            0 => Ok(()),
            existing if existing == address => Ok(()),
            _ => Err(VellumError::DuplicateKey {
                index: self.name.clone(),
                key: format!("{:?}", key),
            }),
        }
    }

    /// Walk entries in `direction`, starting after the keys `skip` holds for
    pub fn walk<F>(
        &self,
        direction: Direction,
        skip: F,
    ) -> Result<Walker<'_, K, u64, RecordDataProvider<'a, K, u64>>>
    where
        F: Fn(&K) -> bool,
    {
        self.tree.walk(direction, skip)
    }

    /// All entries in key order
    pub fn entries(&self) -> Result<Vec<Entry<K, u64>>> {
        self.walk(Direction::Ascending, |_| false)?.collect()
    }

    pub fn height(&self) -> Result<usize> {
        self.tree.height()
    }
}
