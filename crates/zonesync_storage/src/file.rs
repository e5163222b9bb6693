//! File-backed key-value store for persistent state.
//!
//! Layout of a state directory:
//!
//! ```text
//! <state_dir>/
//! ├─ LOCK              # Advisory lock for single-owner access
//! └─ state.cbor        # Every key, CBOR-encoded
//! ```
//!
//! Each write re-encodes the full key space into `state.cbor.tmp`, fsyncs it
//! and renames it over `state.cbor`, so a crash leaves either the old or the
//! new state on disk and never a mix of both.

use crate::backend::{KeyValueStore, StoredValue};
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const STATE_FILE: &str = "state.cbor";
const STATE_TEMP: &str = "state.cbor.tmp";

/// A file-backed key-value store.
///
/// Values survive process restarts. The store keeps a full copy of the key
/// space in memory and writes it through on every `set_*`.
///
/// # Durability
///
/// - Every `set_*` writes a temp file, calls `sync_all`, renames it into
///   place and syncs the directory before returning
/// - A failed write leaves both the file and the in-memory view unchanged
///
/// # Thread Safety
///
/// The store holds an exclusive advisory lock on `LOCK` for as long as it is
/// open, so only one process can own a state directory. Within the process
/// it is `Send + Sync`; writes are serialized internally.
///
/// # Example
///
/// ```no_run
/// use zonesync_storage::{FileStore, KeyValueStore};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("state")).unwrap();
/// store.set_blob("sync.cursor", b"C1").unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, StoredValue>>,
    _lock_file: File,
}

impl FileStore {
    /// Opens or creates a store in the given directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - Another process holds the lock (returns `Locked`)
    /// - An existing state file cannot be decoded (returns `Corrupted`)
    pub fn open(path: &Path) -> StorageResult<Self> {
        fs::create_dir_all(path)?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked);
        }

        // A leftover temp file is an interrupted write; the rename never
        // happened, so the state file is still the committed version.
        let temp_path = path.join(STATE_TEMP);
        if temp_path.exists() {
            fs::remove_file(&temp_path)?;
        }

        let values = Self::load(&path.join(STATE_FILE))?;

        Ok(Self {
            path: path.to_path_buf(),
            values: RwLock::new(values),
            _lock_file: lock_file,
        })
    }

    /// Returns the state directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(state_path: &Path) -> StorageResult<BTreeMap<String, StoredValue>> {
        if !state_path.exists() {
            return Ok(BTreeMap::new());
        }

        let bytes = fs::read(state_path)?;
        ciborium::from_reader(bytes.as_slice())
            .map_err(|e| StorageError::Corrupted(format!("{}: {}", state_path.display(), e)))
    }

    fn write_through(&self, key: &str, value: StoredValue) -> StorageResult<()> {
        let mut values = self.values.write();
        let mut next = values.clone();
        next.insert(key.to_string(), value);

        self.persist(&next)?;
        *values = next;
        Ok(())
    }

    fn persist(&self, values: &BTreeMap<String, StoredValue>) -> StorageResult<()> {
        let mut encoded = Vec::new();
        ciborium::into_writer(values, &mut encoded)
            .map_err(|e| StorageError::Io(io::Error::other(e.to_string())))?;

        let temp_path = self.path.join(STATE_TEMP);
        let mut file = File::create(&temp_path)?;
        file.write_all(&encoded)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, self.path.join(STATE_FILE))?;
        self.sync_directory()
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StorageResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StorageResult<()> {
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_blob(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.values
            .read()
            .get(key)
            .cloned()
            .map(|value| value.into_blob(key))
            .transpose()
    }

    fn set_blob(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.write_through(key, StoredValue::Blob(value.to_vec()))
    }

    fn get_bool(&self, key: &str) -> StorageResult<bool> {
        match self.values.read().get(key).cloned() {
            Some(value) => value.into_bool(key),
            None => Ok(false),
        }
    }

    fn set_bool(&self, key: &str, value: bool) -> StorageResult<()> {
        self.write_through(key, StoredValue::Bool(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_open_creates_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state");

        let store = FileStore::open(&path).unwrap();
        assert!(path.is_dir());
        assert_eq!(store.path(), path.as_path());
        assert_eq!(store.get_blob("sync.cursor").unwrap(), None);
    }

    #[test]
    fn file_values_survive_reopen() {
        let dir = tempdir().unwrap();

        {
            let store = FileStore::open(dir.path()).unwrap();
            store.set_blob("sync.cursor", b"C7").unwrap();
            store.set_bool("bootstrap.zone_created", true).unwrap();
        }

        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.get_blob("sync.cursor").unwrap(), Some(b"C7".to_vec()));
        assert!(store.get_bool("bootstrap.zone_created").unwrap());
        assert!(!store.get_bool("bootstrap.subscription_created").unwrap());
    }

    #[test]
    fn file_second_open_is_locked() {
        let dir = tempdir().unwrap();
        let _first = FileStore::open(dir.path()).unwrap();

        let second = FileStore::open(dir.path());
        assert!(matches!(second, Err(StorageError::Locked)));
    }

    #[test]
    fn file_corrupted_state_is_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(STATE_FILE), b"\xff\xff not cbor").unwrap();

        let result = FileStore::open(dir.path());
        assert!(matches!(result, Err(StorageError::Corrupted(_))));
    }

    #[test]
    fn file_leftover_temp_is_discarded() {
        let dir = tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            store.set_blob("sync.cursor", b"committed").unwrap();
        }
        fs::write(dir.path().join(STATE_TEMP), b"half a write").unwrap();

        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(
            store.get_blob("sync.cursor").unwrap(),
            Some(b"committed".to_vec())
        );
        assert!(!dir.path().join(STATE_TEMP).exists());
    }

    #[test]
    fn file_overwrite_keeps_single_value() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        store.set_blob("cache.records", b"one").unwrap();
        store.set_blob("cache.records", b"two").unwrap();

        assert_eq!(
            store.get_blob("cache.records").unwrap(),
            Some(b"two".to_vec())
        );
    }
}
