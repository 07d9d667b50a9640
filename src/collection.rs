//! Collections
//!
//! A [`CollectionFile`] is one record stream holding any number of
//! collections. A [`Collection`] stores objects of one type, keyed by a
//! primary key and kept reachable through the indexes of its
//! [`IndexDefinition`].
//!
//! ## Index Trees
//! ```text
//!   {collection}/_id       primary key      → record address (unique)
//!   {collection}/{index}   index value(s)   → record address
//! ```
//!
//! Every mutation runs in a transaction: a failure anywhere (including a
//! unique-key violation) leaves records and indexes as they were.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::AllocationPolicy;
use crate::error::{Result, VellumError};
use crate::index::{
    CompoundValue, Index, IndexDefinition, IndexKey, IndexSpec, RecordIndex, Scope,
};
use crate::journal::Journal;
use crate::records::RecordManager;
use crate::serialization::{BincodeSerializer, ObjectSerializer};
use crate::storage::StorageEngine;

/// Name of the primary key index of every collection
pub const PRIMARY_INDEX: &str = "_id";

/// One record stream and its record manager
pub struct CollectionFile {
    name: String,
    records: Mutex<RecordManager>,
    journal: Arc<Journal>,
    degree: usize,
    allocation: AllocationPolicy,
}

impl CollectionFile {
    pub(crate) fn open(
        name: &str,
        engine: StorageEngine,
        degree: usize,
        allocation: AllocationPolicy,
    ) -> Result<Self> {
        let journal = Arc::clone(engine.journal());
        let records = RecordManager::open(engine)?;

        Ok(Self {
            name: name.to_string(),
            records: Mutex::new(records),
            journal,
            degree,
            allocation,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Degree of the index trees in this file
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Run `f` atomically against this file's records
    ///
    /// Record manager state is saved before the commit. On error every write
    /// made since the outermost transaction began is undone and the state is
    /// reloaded from disk.
    pub fn transaction<R>(&self, f: impl FnOnce(&mut RecordManager) -> Result<R>) -> Result<R> {
        let mut records = self.records.lock();
        self.journal.begin();

        let result = f(&mut records).and_then(|value| {
            records.save_state()?;
            Ok(value)
        });

        match result {
            Ok(value) => {
                self.journal.commit()?;
                Ok(value)
            }
            Err(e) => {
                debug!(file = %self.name, error = %e, "transaction aborted");
                self.journal.rollback()?;
                records.reload()?;
                Err(e)
            }
        }
    }

    /// Re-read record manager state from disk
    pub fn reload(&self) -> Result<()> {
        self.records.lock().reload()
    }

    pub fn records(&self) -> &Mutex<RecordManager> {
        &self.records
    }

    /// Current length of the backing stream
    pub fn storage_len(&self) -> Result<u64> {
        self.records.lock().storage_len()
    }

    /// Collection `name` stored with bincode
    pub fn collection<T>(
        self: &Arc<Self>,
        name: &str,
        definition: IndexDefinition<T>,
    ) -> Result<Collection<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        self.collection_with(name, definition, BincodeSerializer::new())
    }

    /// Collection `name` stored with a custom serializer
    pub fn collection_with<T, S>(
        self: &Arc<Self>,
        name: &str,
        definition: IndexDefinition<T>,
        serializer: S,
    ) -> Result<Collection<T, S>>
    where
        S: ObjectSerializer<T>,
    {
        if name.is_empty() || name.contains('/') {
            return Err(VellumError::Config(format!(
                "'{}' is not a valid collection name",
                name
            )));
        }

        let specs = definition.indexes();
        for (i, spec) in specs.iter().enumerate() {
            let duplicate = specs[..i].iter().any(|other| other.name() == spec.name());
            if spec.name() == PRIMARY_INDEX || spec.name().is_empty() || duplicate {
                return Err(VellumError::Config(format!(
                    "Index name '{}' of collection '{}' is reserved, empty or repeated",
                    spec.name(),
                    name
                )));
            }
        }

        Ok(Collection {
            file: Arc::clone(self),
            name: name.to_string(),
            definition,
            serializer,
        })
    }
}

/// Typed, indexed objects inside a collection file
pub struct Collection<T, S = BincodeSerializer<T>> {
    file: Arc<CollectionFile>,
    name: String,
    definition: IndexDefinition<T>,
    serializer: S,
}

impl<T, S: ObjectSerializer<T>> Collection<T, S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file(&self) -> &CollectionFile {
        &self.file
    }

    pub fn definition(&self) -> &IndexDefinition<T> {
        &self.definition
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert `object`, or update the stored object with the same primary key
    ///
    /// Fails with `DuplicateKey` before writing anything if a unique index
    /// already maps one of its values to another object.
    pub fn persist(&self, object: &T) -> Result<()> {
        let id = IndexKey::unique(self.definition.id_of(object));
        let data = self.serializer.serialize(object)?;
        let strategy = self.file.allocation.strategy();
        let degree = self.file.degree;
        let primary = self.tree_name(PRIMARY_INDEX);

        self.file.transaction(|records| {
            let existing = RecordIndex::unique(records, &primary, degree).search(&id)?;
            let previous = match existing {
                0 => None,
                address => Some(self.serializer.deserialize(&records.get_record(address)?.data)?),
            };

            for spec in self.definition.indexes().iter().filter(|s| s.is_unique()) {
                if let Some(value) = spec.value_of(object) {
                    RecordIndex::unique(records, &self.tree_name(spec.name()), degree)
                        .check_unique(&spec.key(value, existing), existing)?;
                }
            }

            let record = match existing {
                0 => records.append_record(&data, strategy)?,
                address => {
                    let current = records.get_record(address)?;
                    records.update_record(&current, &data, strategy)?
                }
            };
            let address = record.address();

            if address != existing {
                RecordIndex::unique(records, &primary, degree).register(id.clone(), address)?;
            }

            for spec in self.definition.indexes() {
                let old_key = previous
                    .as_ref()
                    .and_then(|p| spec.value_of(p))
                    .map(|value| spec.key(value, existing));
                let new_key = spec.value_of(object).map(|value| spec.key(value, address));

                if old_key == new_key && address == existing {
                    continue;
                }

                let mut index = self.open_index(records, spec);
                if let Some(key) = &old_key {
                    index.unregister(key)?;
                }
                if let Some(key) = new_key {
                    index.register(key, address)?;
                }
            }

            Ok(())
        })
    }

    /// Remove the stored object with `object`'s primary key
    ///
    /// Returns false when there was none.
    pub fn destroy(&self, object: &T) -> Result<bool> {
        let id = IndexKey::unique(self.definition.id_of(object));
        let degree = self.file.degree;
        let primary = self.tree_name(PRIMARY_INDEX);

        self.file.transaction(|records| {
            let address = {
                let mut index = RecordIndex::unique(records, &primary, degree);
                let address = index.search(&id)?;
                if address != 0 {
                    index.unregister(&id)?;
                }
                address
            };
            if address == 0 {
                return Ok(false);
            }

            let stored = self.serializer.deserialize(&records.get_record(address)?.data)?;
            for spec in self.definition.indexes() {
                if let Some(value) = spec.value_of(&stored) {
                    self.open_index(records, spec)
                        .unregister(&spec.key(value, address))?;
                }
            }

            records.recycle(address)?;
            Ok(true)
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Object with primary key `id`
    pub fn find(&self, id: impl Into<CompoundValue>) -> Result<Option<T>> {
        let key = IndexKey::unique(id.into());
        let address = {
            let mut records = self.file.records.lock();
            RecordIndex::unique(&mut records, &self.tree_name(PRIMARY_INDEX), self.file.degree)
                .search(&key)?
        };

        match address {
            0 => Ok(None),
            address => self.load(address).map(Some),
        }
    }

    /// Every object, ascending by primary key
    pub fn all(&self) -> Scope<'_, T, S> {
        Scope::over(self, &self.tree_name(PRIMARY_INDEX))
    }

    /// Scans over index `name`
    pub fn index(&self, name: &str) -> Result<Index<'_, T, S>> {
        match self.definition.get(name) {
            Some(spec) => Ok(Index::new(self, self.tree_name(spec.name()))),
            None => Err(VellumError::UnknownIndex(format!("{}/{}", self.name, name))),
        }
    }

    pub fn len(&self) -> Result<usize> {
        self.all().count()
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub(crate) fn load(&self, address: u64) -> Result<T> {
        let record = self.file.records.lock().get_record(address)?;
        self.serializer.deserialize(&record.data)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn tree_name(&self, index: &str) -> String {
        format!("{}/{}", self.name, index)
    }

    fn open_index<'r>(
        &self,
        records: &'r mut RecordManager,
        spec: &IndexSpec<T>,
    ) -> RecordIndex<'r, IndexKey> {
        let tree = self.tree_name(spec.name());
        if spec.is_unique() {
            RecordIndex::unique(records, &tree, self.file.degree)
        } else {
            RecordIndex::new(records, &tree, self.file.degree)
        }
    }
}
