//! Failure injection for durable storage.
//!
//! Wraps any [`KeyValueStore`] and refuses chosen writes, so tests can stop
//! the engine between two persistence steps (for example after the cache
//! write landed but before the cursor write) and then check what a restart
//! sees.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use zonesync_testkit::crash::FailpointStore;
//!
//! let store = Arc::new(FailpointStore::new(Arc::clone(&inner)));
//! store.refuse_key("sync.cursor");
//! // ... run a pull, expect a persistence error
//! store.reset();
//! ```

use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use zonesync_storage::{KeyValueStore, StorageError, StorageResult};

/// A store wrapper that refuses writes on demand.
///
/// Reads always pass through. A refused write never reaches the inner store,
/// so the previous value stays in place exactly as with a real failed write.
pub struct FailpointStore<S> {
    inner: S,
    refused: RwLock<HashSet<String>>,
    fail_after_writes: AtomicUsize,
    writes: AtomicUsize,
    tripped: AtomicBool,
}

impl<S: KeyValueStore> FailpointStore<S> {
    /// Wraps `inner` with no failpoints armed.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            refused: RwLock::new(HashSet::new()),
            fail_after_writes: AtomicUsize::new(usize::MAX),
            writes: AtomicUsize::new(0),
            tripped: AtomicBool::new(false),
        }
    }

    /// Refuses every write to `key` until [`allow_key`](Self::allow_key) or [`reset`](Self::reset).
    pub fn refuse_key(&self, key: &str) {
        self.refused.write().insert(key.to_string());
    }

    /// Lifts a refusal set by [`refuse_key`](Self::refuse_key).
    pub fn allow_key(&self, key: &str) {
        self.refused.write().remove(key);
    }

    /// Lets `count` more writes through, then refuses every write.
    pub fn fail_after(&self, count: usize) {
        let done = self.writes.load(Ordering::SeqCst);
        self.fail_after_writes
            .store(done.saturating_add(count), Ordering::SeqCst);
    }

    /// Disarms every failpoint.
    pub fn reset(&self) {
        self.refused.write().clear();
        self.fail_after_writes.store(usize::MAX, Ordering::SeqCst);
        self.tripped.store(false, Ordering::SeqCst);
    }

    /// Returns the number of writes that reached the inner store.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Returns whether any write has been refused since the last reset.
    pub fn tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check_write(&self, key: &str) -> StorageResult<()> {
        let over_budget =
            self.writes.load(Ordering::SeqCst) >= self.fail_after_writes.load(Ordering::SeqCst);
        if over_budget || self.refused.read().contains(key) {
            self.tripped.store(true, Ordering::SeqCst);
            return Err(StorageError::WriteRefused(key.to_string()));
        }
        Ok(())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl<S: KeyValueStore> KeyValueStore for FailpointStore<S> {
    fn get_blob(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get_blob(key)
    }

    fn set_blob(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.check_write(key)?;
        self.inner.set_blob(key, value)?;
        self.record_write();
        Ok(())
    }

    fn get_bool(&self, key: &str) -> StorageResult<bool> {
        self.inner.get_bool(key)
    }

    fn set_bool(&self, key: &str, value: bool) -> StorageResult<()> {
        self.check_write(key)?;
        self.inner.set_bool(key, value)?;
        self.record_write();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonesync_storage::InMemoryStore;

    #[test]
    fn refused_key_keeps_previous_value() {
        let store = FailpointStore::new(InMemoryStore::new());
        store.set_blob("a", b"one").unwrap();
        store.refuse_key("a");

        assert!(matches!(
            store.set_blob("a", b"two"),
            Err(StorageError::WriteRefused(ref key)) if key == "a"
        ));
        assert_eq!(store.get_blob("a").unwrap(), Some(b"one".to_vec()));
        assert!(store.tripped());

        store.set_bool("b", true).unwrap();
        store.allow_key("a");
        store.set_blob("a", b"two").unwrap();
        assert_eq!(store.get_blob("a").unwrap(), Some(b"two".to_vec()));
    }

    #[test]
    fn fail_after_counts_successful_writes() {
        let store = FailpointStore::new(InMemoryStore::new());
        store.set_blob("warmup", b"x").unwrap();
        store.fail_after(2);

        store.set_blob("a", b"1").unwrap();
        store.set_bool("b", true).unwrap();
        assert!(store.set_blob("c", b"3").is_err());
        assert_eq!(store.writes(), 3);

        store.reset();
        store.set_blob("c", b"3").unwrap();
        assert!(!store.tripped());
    }
}
