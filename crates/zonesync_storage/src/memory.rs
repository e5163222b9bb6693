//! In-memory key-value store for testing.

use crate::backend::{KeyValueStore, StoredValue};
use crate::error::StorageResult;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory key-value store.
///
/// This store keeps all values in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral sync sessions that don't need to survive a restart
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use zonesync_storage::{InMemoryStore, KeyValueStore};
///
/// let store = InMemoryStore::new();
/// store.set_bool("bootstrap.zone_created", true).unwrap();
/// assert!(store.get_bool("bootstrap.zone_created").unwrap());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    values: RwLock<BTreeMap<String, StoredValue>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every stored entry.
    ///
    /// Useful for comparing durable state before and after a failed call.
    #[must_use]
    pub fn entries(&self) -> BTreeMap<String, StoredValue> {
        self.values.read().clone()
    }

    /// Returns the number of keys held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Returns true if no key was ever written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get_blob(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.values
            .read()
            .get(key)
            .cloned()
            .map(|value| value.into_blob(key))
            .transpose()
    }

    fn set_blob(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.values
            .write()
            .insert(key.to_string(), StoredValue::Blob(value.to_vec()));
        Ok(())
    }

    fn get_bool(&self, key: &str) -> StorageResult<bool> {
        match self.values.read().get(key).cloned() {
            Some(value) => value.into_bool(key),
            None => Ok(false),
        }
    }

    fn set_bool(&self, key: &str, value: bool) -> StorageResult<()> {
        self.values
            .write()
            .insert(key.to_string(), StoredValue::Bool(value));
        Ok(())
    }
}
