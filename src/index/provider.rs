//! Record-backed B-tree storage
//!
//! Each node is one record; the root's address is kept in the record
//! manager's named directory. Node changes are buffered until `flush`,
//! which writes them back with room to grow. A node that still outgrows
//! its slot is relocated and its parent (or the root binding) repointed.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use crate::btree::{BTreeDataProvider, Node, NodeReader};
use crate::error::{Result, VellumError};
use crate::records::{BTreeNodeAllocationStrategy, RecordManager};

/// Data provider storing nodes as records
pub struct RecordDataProvider<'a, K, P> {
    records: &'a mut RecordManager,
    root_name: String,
    dirty: BTreeMap<u64, Node<K, P>>,
}

impl<'a, K, P> RecordDataProvider<'a, K, P>
where
    K: Ord + Clone + Serialize + DeserializeOwned,
    P: Clone + Serialize + DeserializeOwned,
{
    /// Provider for the tree whose root is registered as `root_name`
    pub fn new(records: &'a mut RecordManager, root_name: impl Into<String>) -> Self {
        Self {
            records,
            root_name: root_name.into(),
            dirty: BTreeMap::new(),
        }
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    pub fn records(&self) -> &RecordManager {
        &*self.records
    }

    /// Nodes changed since the last flush
    pub fn pending(&self) -> usize {
        self.dirty.len()
    }

    /// Point whatever referenced `from` at `to`
    fn repoint(&mut self, node: &Node<K, P>, from: u64, to: u64) -> Result<()> {
        if self.records.named_record_address(&self.root_name) == from {
            self.records.register_named_record_address(&self.root_name, to);
            return Ok(());
        }

        let Some(first) = node.entries.first() else {
            return Err(VellumError::Storage(format!(
                "Relocated node {} of '{}' has no entries",
                from, self.root_name
            )));
        };

        let mut current = self.peek_root_node()?;
        while let Some(mut parent) = current {
            if let Some(slot) = parent.children.iter().position(|&child| child == from) {
                parent.children[slot] = to;
                self.dirty.insert(parent.address, parent);
                return Ok(());
            }

            current = match (parent.find(&first.key), parent.is_leaf()) {
                (Err(index), false) => Some(self.node(parent.children[index])?),
                _ => None,
            };
        }

        Err(VellumError::Storage(format!(
            "No parent references node {} of '{}'",
            from, self.root_name
        )))
    }
}

impl<K, P> NodeReader<K, P> for RecordDataProvider<'_, K, P>
where
    K: Ord + Clone + Serialize + DeserializeOwned,
    P: Clone + Serialize + DeserializeOwned,
{
    fn peek_root_node(&self) -> Result<Option<Node<K, P>>> {
        match self.records.named_record_address(&self.root_name) {
            0 => Ok(None),
            address => self.node(address).map(Some),
        }
    }

    fn node(&self, address: u64) -> Result<Node<K, P>> {
        match self.dirty.get(&address) {
            Some(node) => Ok(node.clone()),
            None => load_node(&*self.records, address),
        }
    }
}

impl<K, P> BTreeDataProvider<K, P> for RecordDataProvider<'_, K, P>
where
    K: Ord + Clone + Serialize + DeserializeOwned,
    P: Clone + Serialize + DeserializeOwned,
{
    fn root_node(&mut self, degree: usize) -> Result<Node<K, P>> {
        if let Some(root) = self.peek_root_node()? {
            return Ok(root);
        }

        let root = self.create_node(degree)?;
        self.records
            .register_named_record_address(&self.root_name, root.address);
        Ok(root)
    }

    fn create_node(&mut self, degree: usize) -> Result<Node<K, P>> {
        let mut node = Node::new(degree);
        let data = bincode::serialize(&node)?;
        let record = self
            .records
            .append_record(&data, &BTreeNodeAllocationStrategy::new(degree))?;

        node.address = record.address();
        Ok(node)
    }

    fn update_node(&mut self, node: &Node<K, P>) -> Result<()> {
        self.dirty.insert(node.address, node.clone());
        Ok(())
    }

    fn set_root_node(&mut self, address: u64) -> Result<()> {
        self.records
            .register_named_record_address(&self.root_name, address);
        Ok(())
    }

    fn recycle_node(&mut self, address: u64) -> Result<()> {
        self.dirty.remove(&address);
        self.records.recycle(address)
    }

    fn flush(&mut self) -> Result<()> {
        while let Some((address, mut node)) = self.dirty.pop_first() {
            let data = bincode::serialize(&node)?;
            let record = self.records.get_record(address)?;
            let strategy = BTreeNodeAllocationStrategy::new(node.degree);
            let written = self.records.update_record(&record, &data, &strategy)?;

            if written.address() != address {
                trace!(
                    tree = %self.root_name,
                    from = address,
                    to = written.address(),
                    "b-tree node relocated"
                );
                node.address = written.address();
                self.repoint(&node, address, written.address())?;
            }
        }

        self.records.save_state()
    }
}

/// Read-only node access through a locked record manager
///
/// The lock is taken per node load, so a walk over this reader never holds
/// it between steps.
pub struct RecordNodeReader<'a, K, P> {
    records: &'a Mutex<RecordManager>,
    root_name: String,
    _marker: PhantomData<(K, P)>,
}

impl<'a, K, P> RecordNodeReader<'a, K, P> {
    pub fn new(records: &'a Mutex<RecordManager>, root_name: impl Into<String>) -> Self {
        Self {
            records,
            root_name: root_name.into(),
            _marker: PhantomData,
        }
    }
}

impl<K, P> NodeReader<K, P> for RecordNodeReader<'_, K, P>
where
    K: DeserializeOwned,
    P: DeserializeOwned,
{
    fn peek_root_node(&self) -> Result<Option<Node<K, P>>> {
        let records = self.records.lock();
        match records.named_record_address(&self.root_name) {
            0 => Ok(None),
            address => load_node(&records, address).map(Some),
        }
    }

    fn node(&self, address: u64) -> Result<Node<K, P>> {
        load_node(&self.records.lock(), address)
    }
}

fn load_node<K, P>(records: &RecordManager, address: u64) -> Result<Node<K, P>>
where
    K: DeserializeOwned,
    P: DeserializeOwned,
{
    let record = records
        .get_record(address)
        .map_err(|e| match e {
            VellumError::RecordNotFound { address } => VellumError::NodeNotFound { address },
            other => other,
        })?;

    let mut node: Node<K, P> = bincode::deserialize(&record.data)?;
    node.address = address;
    Ok(node)
}
