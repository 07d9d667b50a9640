//! Object serialization
//!
//! Collections turn objects into record bytes through an
//! [`ObjectSerializer`]. The default is bincode, the same codec used for
//! nodes, journal entries and record manager state.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Converts objects to and from record bytes
pub trait ObjectSerializer<T> {
    fn serialize(&self, object: &T) -> Result<Vec<u8>>;
    fn deserialize(&self, bytes: &[u8]) -> Result<T>;
}

/// bincode-backed serializer for any serde type
pub struct BincodeSerializer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> BincodeSerializer<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for BincodeSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for BincodeSerializer<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> ObjectSerializer<T> for BincodeSerializer<T> {
    fn serialize(&self, object: &T) -> Result<Vec<u8>> {
        Ok(bincode::serialize(object)?)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<T> {
        Ok(bincode::deserialize(bytes)?)
    }
}
