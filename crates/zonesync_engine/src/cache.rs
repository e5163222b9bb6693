//! Local record cache mirrored to durable storage.
//!
//! The cache is a projection of what the remote store has acknowledged. Every
//! mutation is staged on a copy, written through to storage, and only then
//! swapped in, so a failed write leaves both memory and disk at the previous
//! state.

use crate::error::SyncResult;
use std::collections::BTreeMap;
use std::sync::Arc;
use zonesync_protocol::{from_cbor, to_cbor, Record, RecordFields, RecordId};
use zonesync_storage::KeyValueStore;

/// Key of the persisted cache contents.
pub const CACHE_KEY: &str = "cache.records";

/// Number of entries touched by one cache mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyCounts {
    /// Records inserted or overwritten.
    pub upserted: usize,
    /// Records removed (absent IDs are not counted).
    pub removed: usize,
}

/// In-memory map of record ID to fields, written through on every change.
///
/// Entries are kept in record ID order, which makes name lookups
/// deterministic when several records share a name.
pub struct LocalCache<S> {
    records: BTreeMap<RecordId, RecordFields>,
    store: Arc<S>,
    revision: u64,
}

impl<S: KeyValueStore> LocalCache<S> {
    /// Creates an empty cache over a key-value store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            records: BTreeMap::new(),
            store,
            revision: 0,
        }
    }

    /// Replaces the in-memory contents with what durable storage holds.
    pub fn load_from_storage(&mut self) -> SyncResult<()> {
        let records = match self.store.get_blob(CACHE_KEY)? {
            Some(bytes) => {
                let list: Vec<Record> = from_cbor(&bytes)?;
                list.into_iter().map(|r| (r.id, r.fields)).collect()
            }
            None => BTreeMap::new(),
        };

        if records != self.records {
            self.records = records;
            self.revision += 1;
        }
        Ok(())
    }

    /// Writes the current contents to durable storage.
    pub fn persist_to_storage(&self) -> SyncResult<()> {
        Self::write(&self.store, &self.records)
    }

    /// Inserts or overwrites a record and persists the cache.
    pub fn upsert(&mut self, record: Record) -> SyncResult<()> {
        self.apply(vec![record], &[]).map(|_| ())
    }

    /// Removes a record and persists the cache. Returns false if it was absent.
    pub fn remove(&mut self, id: &RecordId) -> SyncResult<bool> {
        self.apply(Vec::new(), std::slice::from_ref(id))
            .map(|counts| counts.removed == 1)
    }

    /// Applies upserts, then removals, and persists the result as one write.
    ///
    /// Re-applying the same batch leaves the cache unchanged.
    pub fn apply(&mut self, upserts: Vec<Record>, removals: &[RecordId]) -> SyncResult<ApplyCounts> {
        let mut next = self.records.clone();
        let mut counts = ApplyCounts::default();

        for record in upserts {
            next.insert(record.id, record.fields);
            counts.upserted += 1;
        }
        for id in removals {
            if next.remove(id).is_some() {
                counts.removed += 1;
            }
        }

        Self::write(&self.store, &next)?;

        if next != self.records {
            self.records = next;
            self.revision += 1;
        }
        Ok(counts)
    }

    /// Returns every display name, sorted lexicographically.
    pub fn snapshot(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .records
            .values()
            .map(|fields| fields.name().unwrap_or_default().to_string())
            .collect();
        names.sort();
        names
    }

    /// Resolves a display name to a record ID.
    ///
    /// When several records share the name, the smallest record ID wins.
    pub fn find_by_name(&self, name: &str) -> Option<RecordId> {
        self.records
            .iter()
            .find(|(_, fields)| fields.name() == Some(name))
            .map(|(id, _)| id.clone())
    }

    /// Returns the fields of a record.
    pub fn get(&self, id: &RecordId) -> Option<&RecordFields> {
        self.records.get(id)
    }

    /// Returns all records in ID order.
    pub fn records(&self) -> Vec<Record> {
        self.records
            .iter()
            .map(|(id, fields)| Record::new(id.clone(), fields.clone()))
            .collect()
    }

    /// Returns the number of cached records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the cache holds no record.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Counter bumped every time the contents change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn write(store: &S, records: &BTreeMap<RecordId, RecordFields>) -> SyncResult<()> {
        let list: Vec<Record> = records
            .iter()
            .map(|(id, fields)| Record::new(id.clone(), fields.clone()))
            .collect();
        store.set_blob(CACHE_KEY, &to_cbor(&list)?)?;
        Ok(())
    }
}
