//! Key-value store trait definition.

use crate::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};

/// A value held by a [`KeyValueStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoredValue {
    /// An opaque byte blob.
    Blob(Vec<u8>),
    /// A boolean flag.
    Bool(bool),
}

impl StoredValue {
    /// Returns a short name for the kind of value, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            StoredValue::Blob(_) => "blob",
            StoredValue::Bool(_) => "bool",
        }
    }

    pub(crate) fn into_blob(self, key: &str) -> StorageResult<Vec<u8>> {
        match self {
            StoredValue::Blob(bytes) => Ok(bytes),
            other => Err(StorageError::TypeMismatch {
                key: key.to_string(),
                expected: "blob",
                found: other.kind(),
            }),
        }
    }

    pub(crate) fn into_bool(self, key: &str) -> StorageResult<bool> {
        match self {
            StoredValue::Bool(flag) => Ok(flag),
            other => Err(StorageError::TypeMismatch {
                key: key.to_string(),
                expected: "bool",
                found: other.kind(),
            }),
        }
    }
}

/// Durable, process-local key-value storage.
///
/// Stores hold **opaque values**. The engine owns the meaning of every key
/// and every blob; stores only keep them.
///
/// # Invariants
///
/// - `get_*` returns exactly what the last successful `set_*` wrote
/// - A `set_*` that returns `Ok` has reached durable storage
/// - A `set_*` that returns `Err` leaves the previous value in place
/// - A missing boolean reads as `false`
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent state
pub trait KeyValueStore: Send + Sync {
    /// Reads the blob stored under `key`, or `None` if it was never set.
    ///
    /// # Errors
    ///
    /// Returns an error if the key holds a boolean or the store cannot be read.
    fn get_blob(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replaces the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be made durable.
    fn set_blob(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Reads the boolean stored under `key`, `false` if it was never set.
    ///
    /// # Errors
    ///
    /// Returns an error if the key holds a blob or the store cannot be read.
    fn get_bool(&self, key: &str) -> StorageResult<bool>;

    /// Replaces the boolean stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be made durable.
    fn set_bool(&self, key: &str, value: bool) -> StorageResult<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn get_blob(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).get_blob(key)
    }

    fn set_blob(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        (**self).set_blob(key, value)
    }

    fn get_bool(&self, key: &str) -> StorageResult<bool> {
        (**self).get_bool(key)
    }

    fn set_bool(&self, key: &str, value: bool) -> StorageResult<()> {
        (**self).set_bool(key, value)
    }
}
