//! Index definitions
//!
//! Declares how objects of a collection are keyed: a primary key projection
//! plus any number of named secondary indexes, each optionally unique and
//! optionally guarded by a predicate.
//!
//! ```
//! use vellumdb::index::IndexDefinition;
//!
//! struct Article { id: u64, author: String, year: i32, draft: bool }
//!
//! let definition = IndexDefinition::new(|a: &Article| (a.id,))
//!     .index("by_author_year", |a: &Article| (a.author.clone(), a.year))
//!     .index_where("published", |a: &Article| (a.year,), |a: &Article| !a.draft);
//! assert_eq!(definition.indexes().len(), 2);
//! ```

use super::{CompoundValue, IndexKey};

type Projection<T> = Box<dyn Fn(&T) -> CompoundValue + Send + Sync>;
type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// One named secondary index
pub struct IndexSpec<T> {
    name: String,
    unique: bool,
    projection: Projection<T>,
    predicate: Option<Predicate<T>>,
}

impl<T> IndexSpec<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Indexed value of `object`, or `None` when the predicate rejects it
    pub fn value_of(&self, object: &T) -> Option<CompoundValue> {
        match &self.predicate {
            Some(predicate) if !predicate(object) => None,
            _ => Some((self.projection)(object)),
        }
    }

    /// Tree key for `value` owned by the record at `address`
    pub fn key(&self, value: CompoundValue, address: u64) -> IndexKey {
        if self.unique {
            IndexKey::unique(value)
        } else {
            IndexKey::new(value, address)
        }
    }
}

/// Keying scheme of a collection
pub struct IndexDefinition<T> {
    id: Projection<T>,
    indexes: Vec<IndexSpec<T>>,
}

impl<T> IndexDefinition<T> {
    /// Definition with the primary key projection `id`
    pub fn new<F, V>(id: F) -> Self
    where
        F: Fn(&T) -> V + Send + Sync + 'static,
        V: Into<CompoundValue>,
    {
        Self {
            id: Box::new(move |object| id(object).into()),
            indexes: Vec::new(),
        }
    }

    /// Add a non-unique index
    pub fn index<F, V>(self, name: &str, projection: F) -> Self
    where
        F: Fn(&T) -> V + Send + Sync + 'static,
        V: Into<CompoundValue>,
    {
        self.push(name, false, projection, None)
    }

    /// Add a unique index
    pub fn unique_index<F, V>(self, name: &str, projection: F) -> Self
    where
        F: Fn(&T) -> V + Send + Sync + 'static,
        V: Into<CompoundValue>,
    {
        self.push(name, true, projection, None)
    }

    /// Add a non-unique index covering only objects matching `predicate`
    pub fn index_where<F, V, W>(self, name: &str, projection: F, predicate: W) -> Self
    where
        F: Fn(&T) -> V + Send + Sync + 'static,
        V: Into<CompoundValue>,
        W: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.push(name, false, projection, Some(Box::new(predicate)))
    }

    /// Add a unique index covering only objects matching `predicate`
    pub fn unique_index_where<F, V, W>(self, name: &str, projection: F, predicate: W) -> Self
    where
        F: Fn(&T) -> V + Send + Sync + 'static,
        V: Into<CompoundValue>,
        W: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.push(name, true, projection, Some(Box::new(predicate)))
    }

    fn push<F, V>(
        mut self,
        name: &str,
        unique: bool,
        projection: F,
        predicate: Option<Predicate<T>>,
    ) -> Self
    where
        F: Fn(&T) -> V + Send + Sync + 'static,
        V: Into<CompoundValue>,
    {
        self.indexes.push(IndexSpec {
            name: name.to_string(),
            unique,
            projection: Box::new(move |object| projection(object).into()),
            predicate,
        });
        self
    }

    /// Primary key of `object`
    pub fn id_of(&self, object: &T) -> CompoundValue {
        (self.id)(object)
    }

    pub fn indexes(&self) -> &[IndexSpec<T>] {
        &self.indexes
    }

    pub fn get(&self, name: &str) -> Option<&IndexSpec<T>> {
        self.indexes.iter().find(|spec| spec.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compound;

    struct Item {
        id: i64,
        group: i64,
        active: bool,
    }

    #[test]
    fn test_predicate_filters_objects() {
        let definition = IndexDefinition::new(|i: &Item| (i.id,))
            .index_where("active", |i: &Item| (i.group,), |i: &Item| i.active);

        let spec = definition.get("active").unwrap();
        let active = Item { id: 1, group: 4, active: true };
        let inactive = Item { id: 2, group: 4, active: false };

        assert_eq!(spec.value_of(&active), Some(compound!(4)));
        assert_eq!(spec.value_of(&inactive), None);
        assert_eq!(definition.id_of(&inactive), compound!(2));
    }

    #[test]
    fn test_unique_keys_drop_the_address() {
        let definition = IndexDefinition::new(|i: &Item| (i.id,))
            .unique_index("group", |i: &Item| (i.group,))
            .index("group_multi", |i: &Item| (i.group,));

        let unique = definition.get("group").unwrap();
        let multi = definition.get("group_multi").unwrap();

        assert_eq!(unique.key(compound!(1), 500).address, 0);
        assert_eq!(multi.key(compound!(1), 500).address, 500);
    }
}
