//! Durable sync position and bootstrap flags.

use std::sync::Arc;
use zonesync_protocol::Cursor;
use zonesync_storage::{KeyValueStore, StorageResult};

/// Key of the last committed change cursor.
pub const CURSOR_KEY: &str = "sync.cursor";

/// One-time provisioning steps tracked durably.
///
/// A flag only ever moves from `false` to `true`; a `false` flag means the
/// step still has to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapFlag {
    /// The remote zone has been created.
    ZoneCreated,
    /// The change subscription has been created.
    SubscriptionCreated,
}

impl BootstrapFlag {
    /// Returns the storage key of the flag.
    pub fn key(self) -> &'static str {
        match self {
            BootstrapFlag::ZoneCreated => "bootstrap.zone_created",
            BootstrapFlag::SubscriptionCreated => "bootstrap.subscription_created",
        }
    }
}

/// Persists the change cursor and the bootstrap flags.
pub struct CursorStore<S> {
    store: Arc<S>,
}

impl<S: KeyValueStore> CursorStore<S> {
    /// Creates a cursor store over a key-value store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Returns the persisted cursor, or `None` if no pull ever committed.
    pub fn load(&self) -> StorageResult<Option<Cursor>> {
        Ok(self.store.get_blob(CURSOR_KEY)?.map(Cursor::from_bytes))
    }

    /// Persists a cursor, replacing the previous one.
    pub fn save(&self, cursor: &Cursor) -> StorageResult<()> {
        self.store.set_blob(CURSOR_KEY, cursor.as_bytes())
    }

    /// Returns whether a bootstrap step is recorded as done.
    pub fn load_flag(&self, flag: BootstrapFlag) -> StorageResult<bool> {
        self.store.get_bool(flag.key())
    }

    /// Records a bootstrap step as done.
    pub fn set_flag(&self, flag: BootstrapFlag) -> StorageResult<()> {
        self.store.set_bool(flag.key(), true)
    }
}
