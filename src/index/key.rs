//! Index keys and key ranges

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::CompoundValue;

/// Key stored in an index tree
///
/// Non-unique indexes pair the value with the record address so equal values
/// of different records stay distinct entries. Unique indexes store address 0
/// and keep the owning address in the entry pointer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexKey {
    pub value: CompoundValue,
    pub address: u64,
}

impl IndexKey {
    pub fn new(value: CompoundValue, address: u64) -> Self {
        Self { value, address }
    }

    /// Key of a unique index entry
    pub fn unique(value: CompoundValue) -> Self {
        Self { value, address: 0 }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// One end of a [`KeyRange`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub value: CompoundValue,
    pub inclusive: bool,
}

impl Bound {
    pub fn inclusive(value: impl Into<CompoundValue>) -> Self {
        Self {
            value: value.into(),
            inclusive: true,
        }
    }

    pub fn exclusive(value: impl Into<CompoundValue>) -> Self {
        Self {
            value: value.into(),
            inclusive: false,
        }
    }
}

/// Range of index values, each bound compared on the components it supplies
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRange {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

impl KeyRange {
    /// Unbounded range
    pub fn all() -> Self {
        Self::default()
    }

    pub fn equals(value: impl Into<CompoundValue>) -> Self {
        let value = value.into();
        Self {
            lower: Some(Bound::inclusive(value.clone())),
            upper: Some(Bound::inclusive(value)),
        }
    }

    pub fn new(lower: Option<Bound>, upper: Option<Bound>) -> Self {
        Self { lower, upper }
    }

    /// `value` sorts before the lower bound
    pub fn is_below(&self, value: &CompoundValue) -> bool {
        match &self.lower {
            Some(bound) => match value.cmp_prefix(&bound.value) {
                Ordering::Less => true,
                Ordering::Equal => !bound.inclusive,
                Ordering::Greater => false,
            },
            None => false,
        }
    }

    /// `value` sorts after the upper bound
    pub fn is_above(&self, value: &CompoundValue) -> bool {
        match &self.upper {
            Some(bound) => match value.cmp_prefix(&bound.value) {
                Ordering::Greater => true,
                Ordering::Equal => !bound.inclusive,
                Ordering::Less => false,
            },
            None => false,
        }
    }

    pub fn contains(&self, value: &CompoundValue) -> bool {
        !self.is_below(value) && !self.is_above(value)
    }
}
