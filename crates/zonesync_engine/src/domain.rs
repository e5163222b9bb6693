//! The single mutual-exclusion domain over the cache and the cursor store.
//!
//! Every write to the Local Cache or the Cursor Store, whether it comes from a
//! pull, a mutation or bootstrap, runs inside [`SyncDomain::commit`]. Remote
//! calls happen outside of it.

use crate::cache::{ApplyCounts, LocalCache};
use crate::cursor_store::CursorStore;
use crate::error::SyncResult;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::warn;
use zonesync_protocol::{Changeset, Cursor, Record, RecordFetch};
use zonesync_storage::KeyValueStore;

/// Callback receiving the sorted name list after every committed change.
pub type ChangeListener = Arc<dyn Fn(&[String]) + Send + Sync>;

/// Result of applying one changeset page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageCounts {
    /// Records upserted into the cache.
    pub upserted: usize,
    /// Records removed from the cache.
    pub removed: usize,
    /// Records skipped because the remote could not fetch them.
    pub skipped: usize,
}

/// Local state guarded by the domain lock.
pub(crate) struct LocalState<S> {
    pub(crate) cache: LocalCache<S>,
    pub(crate) cursors: CursorStore<S>,
}

impl<S: KeyValueStore> LocalState<S> {
    /// Applies a page: cache first, cursor second.
    ///
    /// If the cursor write fails after the cache write landed, the next pull
    /// re-fetches the same page from the old cursor and re-applies it, which
    /// is a no-op for the cache.
    pub(crate) fn apply_page(&mut self, page: &Changeset) -> SyncResult<PageCounts> {
        let mut skipped = 0;
        let upserts: Vec<Record> = page
            .changed
            .iter()
            .filter_map(|fetch| match fetch {
                RecordFetch::Fetched(record) => Some(record.clone()),
                RecordFetch::Failed { id, reason } => {
                    warn!(record = %id, %reason, "skipping record the remote could not fetch");
                    skipped += 1;
                    None
                }
            })
            .collect();

        let ApplyCounts { upserted, removed } = self.cache.apply(upserts, &page.deleted)?;
        self.cursors.save(&page.cursor)?;

        Ok(PageCounts {
            upserted,
            removed,
            skipped,
        })
    }
}

/// Owner of the Local Cache and Cursor Store.
///
/// Share it between the bootstrap coordinator, the delta sync engine and the
/// mutation gateway with an `Arc`; all of them serialize their local writes
/// through it.
pub struct SyncDomain<S> {
    state: Mutex<LocalState<S>>,
    listeners: RwLock<Vec<ChangeListener>>,
}

impl<S: KeyValueStore> SyncDomain<S> {
    /// Opens the domain, loading the cache from durable storage.
    pub fn open(store: Arc<S>) -> SyncResult<Self> {
        let mut cache = LocalCache::new(Arc::clone(&store));
        cache.load_from_storage()?;

        Ok(Self {
            state: Mutex::new(LocalState {
                cache,
                cursors: CursorStore::new(store),
            }),
            listeners: RwLock::new(Vec::new()),
        })
    }

    /// Registers a callback run after every committed cache change.
    pub fn on_change(&self, listener: ChangeListener) {
        self.listeners.write().push(listener);
    }

    /// Returns the sorted display names currently cached.
    pub fn current_names(&self) -> Vec<String> {
        self.read(|state| state.cache.snapshot())
    }

    /// Returns all cached records in ID order.
    pub fn records(&self) -> Vec<Record> {
        self.read(|state| state.cache.records())
    }

    /// Returns the last persisted cursor.
    pub fn last_cursor(&self) -> SyncResult<Option<Cursor>> {
        Ok(self.read(|state| state.cursors.load())?)
    }

    /// Runs a read-only closure under the lock.
    pub(crate) fn read<T>(&self, f: impl FnOnce(&LocalState<S>) -> T) -> T {
        f(&self.state.lock())
    }

    /// Runs a mutating closure under the lock, then notifies listeners if
    /// the cache changed. Listeners run after the lock is released.
    pub(crate) fn commit<T>(
        &self,
        f: impl FnOnce(&mut LocalState<S>) -> SyncResult<T>,
    ) -> SyncResult<T> {
        let (result, snapshot) = {
            let mut state = self.state.lock();
            let before = state.cache.revision();
            let result = f(&mut state);
            let snapshot = (state.cache.revision() != before).then(|| state.cache.snapshot());
            (result, snapshot)
        };

        if let Some(names) = snapshot {
            let listeners = self.listeners.read().clone();
            for listener in listeners {
                listener(&names);
            }
        }

        result
    }
}
