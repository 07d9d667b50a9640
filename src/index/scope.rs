//! Index scans
//!
//! Operators on an [`Index`] build a [`Scope`]: a key range plus a walk
//! direction. A scope is lazy and restartable: every call to
//! [`Scope::iter`] starts a fresh walk, loading tree nodes and objects only
//! as the iterator advances.
//!
//! Bounds may supply fewer components than the index key. Only the supplied
//! prefix is compared, so on an index over `(a, b, c)`, `greater_than((2, 2))`
//! skips every key starting with `(2, 2, _)`.

use crate::btree::{Direction, Entry, Walker};
use crate::collection::Collection;
use crate::error::Result;
use crate::serialization::ObjectSerializer;

use super::{root_record_name, Bound, CompoundValue, IndexKey, KeyRange, RecordNodeReader};

/// Scan entry point for one index of a collection
pub struct Index<'c, T, S> {
    collection: &'c Collection<T, S>,
    tree: String,
}

impl<'c, T, S: ObjectSerializer<T>> Index<'c, T, S> {
    pub(crate) fn new(collection: &'c Collection<T, S>, tree: String) -> Self {
        Self { collection, tree }
    }

    fn scope(&self, range: KeyRange) -> Scope<'c, T, S> {
        let records = self.collection.file().records();
        Scope {
            collection: self.collection,
            reader: RecordNodeReader::new(records, root_record_name(&self.tree)),
            range,
            direction: Direction::Ascending,
        }
    }

    /// Every indexed object, ascending
    pub fn all(&self) -> Scope<'c, T, S> {
        self.scope(KeyRange::all())
    }

    /// Objects whose key starts with `value`
    pub fn equals(&self, value: impl Into<CompoundValue>) -> Scope<'c, T, S> {
        self.scope(KeyRange::equals(value))
    }

    pub fn greater_than(&self, value: impl Into<CompoundValue>) -> Scope<'c, T, S> {
        self.scope(KeyRange::new(Some(Bound::exclusive(value)), None))
    }

    pub fn greater_than_or_equal(&self, value: impl Into<CompoundValue>) -> Scope<'c, T, S> {
        self.scope(KeyRange::new(Some(Bound::inclusive(value)), None))
    }

    pub fn smaller_than(&self, value: impl Into<CompoundValue>) -> Scope<'c, T, S> {
        self.scope(KeyRange::new(None, Some(Bound::exclusive(value))))
    }

    pub fn smaller_than_or_equal(&self, value: impl Into<CompoundValue>) -> Scope<'c, T, S> {
        self.scope(KeyRange::new(None, Some(Bound::inclusive(value))))
    }

    /// Range with an exclusive lower bound; finish with `and` or `and_including`
    pub fn between(&self, value: impl Into<CompoundValue>) -> Between<'_, 'c, T, S> {
        Between {
            index: self,
            lower: Bound::exclusive(value),
        }
    }

    /// Range with an inclusive lower bound; finish with `and` or `and_including`
    pub fn between_including(&self, value: impl Into<CompoundValue>) -> Between<'_, 'c, T, S> {
        Between {
            index: self,
            lower: Bound::inclusive(value),
        }
    }

    /// First object whose key starts with `value`
    pub fn find(&self, value: impl Into<CompoundValue>) -> Result<Option<T>> {
        self.equals(value).iter()?.next().transpose()
    }
}

/// Half-built range waiting for its upper bound
pub struct Between<'i, 'c, T, S> {
    index: &'i Index<'c, T, S>,
    lower: Bound,
}

impl<'c, T, S: ObjectSerializer<T>> Between<'_, 'c, T, S> {
    /// Close the range with an exclusive upper bound
    pub fn and(self, value: impl Into<CompoundValue>) -> Scope<'c, T, S> {
        self.index
            .scope(KeyRange::new(Some(self.lower), Some(Bound::exclusive(value))))
    }

    /// Close the range with an inclusive upper bound
    pub fn and_including(self, value: impl Into<CompoundValue>) -> Scope<'c, T, S> {
        self.index
            .scope(KeyRange::new(Some(self.lower), Some(Bound::inclusive(value))))
    }
}

/// A range of one index in a given order
pub struct Scope<'c, T, S> {
    collection: &'c Collection<T, S>,
    reader: RecordNodeReader<'c, IndexKey, u64>,
    range: KeyRange,
    direction: Direction,
}

impl<'c, T, S: ObjectSerializer<T>> Scope<'c, T, S> {
    pub(crate) fn over(collection: &'c Collection<T, S>, tree: &str) -> Self {
        Index::new(collection, tree.to_string()).all()
    }

    /// Same range, largest keys first
    pub fn descending(mut self) -> Self {
        self.direction = Direction::Descending;
        self
    }

    /// Same range, smallest keys first
    pub fn ascending(mut self) -> Self {
        self.direction = Direction::Ascending;
        self
    }

    pub fn range(&self) -> &KeyRange {
        &self.range
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Matching objects
    pub fn iter(&self) -> Result<ScopeIter<'_, 'c, T, S>> {
        Ok(ScopeIter {
            cursor: self.cursor()?,
            collection: self.collection,
        })
    }

    /// Matching index values, without loading objects
    pub fn keys(&self) -> Result<KeyIter<'_, 'c>> {
        Ok(KeyIter {
            cursor: self.cursor()?,
        })
    }

    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.iter()?.collect()
    }

    pub fn count(&self) -> Result<usize> {
        self.cursor()?.try_fold(0, |count, entry| entry.map(|_| count + 1))
    }

    fn cursor(&self) -> Result<RangeCursor<'_, 'c>> {
        let range = &self.range;
        let walker = match self.direction {
            Direction::Ascending => {
                Walker::new(&self.reader, self.direction, |k: &IndexKey| range.is_below(&k.value))?
            }
            Direction::Descending => {
                Walker::new(&self.reader, self.direction, |k: &IndexKey| range.is_above(&k.value))?
            }
        };

        Ok(RangeCursor {
            walker,
            range,
            done: false,
        })
    }
}

/// Walks tree entries until the first one past the range
struct RangeCursor<'s, 'c> {
    walker: Walker<'s, IndexKey, u64, RecordNodeReader<'c, IndexKey, u64>>,
    range: &'s KeyRange,
    done: bool,
}

impl Iterator for RangeCursor<'_, '_> {
    type Item = Result<Entry<IndexKey, u64>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let entry = match self.walker.next()? {
            Ok(entry) => entry,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        let past_end = match self.walker.direction() {
            Direction::Ascending => self.range.is_above(&entry.key.value),
            Direction::Descending => self.range.is_below(&entry.key.value),
        };
        if past_end {
            self.done = true;
            return None;
        }

        Some(Ok(entry))
    }
}

/// Objects of a [`Scope`]
pub struct ScopeIter<'s, 'c, T, S> {
    cursor: RangeCursor<'s, 'c>,
    collection: &'c Collection<T, S>,
}

impl<T, S: ObjectSerializer<T>> Iterator for ScopeIter<'_, '_, T, S> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.cursor.next()?;
        Some(entry.and_then(|entry| self.collection.load(entry.pointer)))
    }
}

/// Index values of a [`Scope`]
pub struct KeyIter<'s, 'c> {
    cursor: RangeCursor<'s, 'c>,
}

impl Iterator for KeyIter<'_, '_> {
    type Item = Result<CompoundValue>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.cursor.next()?;
        Some(entry.map(|entry| entry.key.value))
    }
}
