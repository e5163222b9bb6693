//! Record and changeset fixtures.

use std::path::Path;
use tempfile::TempDir;
use zonesync_protocol::{Changeset, Cursor, Record, RecordFields, RecordId};
use zonesync_storage::{FileStore, StorageResult};

/// Builds a record with a `name` field.
pub fn named_record(id: &str, name: &str) -> Record {
    Record::new(id, RecordFields::with_name(name))
}

/// Builds a changeset page from `(id, name)` pairs and deleted IDs.
///
/// # Example
///
/// ```
/// use zonesync_testkit::page;
///
/// let changes = page(&[("r1", "Alice")], &["r0"], "C1", false);
/// assert_eq!(changes.changed.len(), 1);
/// assert_eq!(changes.deleted.len(), 1);
/// ```
pub fn page(records: &[(&str, &str)], deleted: &[&str], cursor: &str, more_pending: bool) -> Changeset {
    Changeset::new(
        records
            .iter()
            .map(|(id, name)| named_record(id, name))
            .collect(),
        deleted.iter().map(|id| RecordId::from(*id)).collect(),
        Cursor::from(cursor),
        more_pending,
    )
}

/// A temporary state directory removed on drop.
pub struct TempStateDir {
    dir: TempDir,
}

impl TempStateDir {
    /// Creates a fresh directory.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be created.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Returns the directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Opens a `FileStore` in a named subdirectory.
    ///
    /// Only one store per subdirectory may be open at a time; drop the
    /// previous one to simulate a restart.
    pub fn open_store(&self, name: &str) -> StorageResult<FileStore> {
        FileStore::open(&self.dir.path().join(name))
    }
}

impl Default for TempStateDir {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonesync_storage::KeyValueStore;

    #[test]
    fn reopened_store_sees_previous_writes() {
        let dir = TempStateDir::new();
        {
            let store = dir.open_store("local").unwrap();
            store.set_bool("flag", true).unwrap();
        }
        let store = dir.open_store("local").unwrap();
        assert!(store.get_bool("flag").unwrap());
    }
}
