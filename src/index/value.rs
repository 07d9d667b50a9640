//! Index values
//!
//! A [`CompoundValue`] is the ordered tuple of components an index is keyed
//! on. Components compare by their natural order; tuples compare left to
//! right and the first unequal component decides.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One component of an index key
///
/// Values of different kinds order by kind (`Null` first, `Bytes` last).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IndexValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl IndexValue {
    fn rank(&self) -> u8 {
        match self {
            IndexValue::Null => 0,
            IndexValue::Bool(_) => 1,
            IndexValue::Int(_) => 2,
            IndexValue::UInt(_) => 3,
            IndexValue::Float(_) => 4,
            IndexValue::Text(_) => 5,
            IndexValue::Bytes(_) => 6,
        }
    }
}

impl Ord for IndexValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use IndexValue::*;

        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (UInt(a), UInt(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (Bytes(a), Bytes(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for IndexValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for IndexValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IndexValue {}

impl fmt::Display for IndexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexValue::Null => write!(f, "null"),
            IndexValue::Bool(v) => write!(f, "{}", v),
            IndexValue::Int(v) => write!(f, "{}", v),
            IndexValue::UInt(v) => write!(f, "{}", v),
            IndexValue::Float(v) => write!(f, "{}", v),
            IndexValue::Text(v) => write!(f, "{:?}", v),
            IndexValue::Bytes(v) => write!(f, "{} bytes", v.len()),
        }
    }
}

macro_rules! index_value_from {
    ($variant:ident: $($source:ty => $target:ty),*) => {
        $(
            impl From<$source> for IndexValue {
                fn from(value: $source) -> Self {
                    IndexValue::$variant(<$target>::from(value))
                }
            }
        )*
    };
}

index_value_from!(Bool: bool => bool);
index_value_from!(Int: i8 => i64, i16 => i64, i32 => i64, i64 => i64);
index_value_from!(UInt: u8 => u64, u16 => u64, u32 => u64, u64 => u64);
index_value_from!(Float: f32 => f64, f64 => f64);
index_value_from!(Text: String => String, &str => String);
index_value_from!(Bytes: Vec<u8> => Vec<u8>, &[u8] => Vec<u8>);

impl<T: Into<IndexValue>> From<Option<T>> for IndexValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(IndexValue::Null, Into::into)
    }
}

impl From<&String> for IndexValue {
    fn from(value: &String) -> Self {
        IndexValue::Text(value.clone())
    }
}

// =============================================================================
// Compound Values
// =============================================================================

/// An ordered tuple of index values
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompoundValue(Vec<IndexValue>);

impl CompoundValue {
    pub fn new(components: Vec<IndexValue>) -> Self {
        Self(components)
    }

    pub fn components(&self) -> &[IndexValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compare against `prefix` on the components `prefix` supplies only
    ///
    /// `(2, 3, 1)` is `Equal` to the prefix `(2, 3)` and `Greater` than `(2, 2)`.
    pub fn cmp_prefix(&self, prefix: &CompoundValue) -> Ordering {
        self.0
            .iter()
            .zip(prefix.0.iter())
            .map(|(a, b)| a.cmp(b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for CompoundValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, component) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", component)?;
        }
        write!(f, ")")
    }
}

impl From<IndexValue> for CompoundValue {
    fn from(value: IndexValue) -> Self {
        Self(vec![value])
    }
}

impl From<Vec<IndexValue>> for CompoundValue {
    fn from(components: Vec<IndexValue>) -> Self {
        Self(components)
    }
}

macro_rules! compound_from_tuple {
    ($($name:ident),+) => {
        impl<$($name: Into<IndexValue>),+> From<($($name,)+)> for CompoundValue {
            #[allow(non_snake_case)]
            fn from(($($name,)+): ($($name,)+)) -> Self {
                Self(vec![$($name.into()),+])
            }
        }
    };
}

compound_from_tuple!(A);
compound_from_tuple!(A, B);
compound_from_tuple!(A, B, C);
compound_from_tuple!(A, B, C, D);

/// Build a [`CompoundValue`] from any number of components
///
/// ```
/// use vellumdb::compound;
///
/// let key = compound!(1, "north", 2.5);
/// assert_eq!(key.len(), 3);
/// ```
#[macro_export]
macro_rules! compound {
    ($($value:expr),* $(,)?) => {
        $crate::index::CompoundValue::new(vec![$($crate::index::IndexValue::from($value)),*])
    };
}
