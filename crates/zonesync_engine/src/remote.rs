//! Remote store abstraction.

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use zonesync_protocol::{
    Changeset, Cursor, Record, RecordFields, RecordId, Subscription, SubscriptionId, ZoneId,
};

/// The authoritative record store the engine syncs against.
///
/// This trait abstracts the backend's wire protocol and transport, allowing
/// different implementations (a real cloud backend, the in-process reference
/// server, a mock for testing). Calls block the caller until the remote
/// answers; the engine never holds its local lock while one is in flight.
pub trait RemoteStore: Send + Sync {
    /// Creates a zone. Creating an existing zone succeeds.
    fn create_zone(&self, zone: &ZoneId) -> SyncResult<()>;

    /// Looks up a subscription by identity.
    fn fetch_subscription(&self, id: &SubscriptionId) -> SyncResult<Option<Subscription>>;

    /// Registers a subscription on a zone.
    fn create_subscription(&self, subscription: &Subscription) -> SyncResult<()>;

    /// Fetches one page of changes in `zone` after `since` (full history when `None`).
    fn fetch_changes(&self, zone: &ZoneId, since: Option<&Cursor>) -> SyncResult<Changeset>;

    /// Saves a new record and returns it with its remote-assigned identity.
    fn save_record(&self, zone: &ZoneId, fields: &RecordFields) -> SyncResult<Record>;

    /// Deletes a record by identity.
    fn delete_record(&self, zone: &ZoneId, id: &RecordId) -> SyncResult<()>;
}

/// Calls a [`MockRemote`] can count and fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockCall {
    /// `create_zone`
    CreateZone,
    /// `fetch_subscription`
    FetchSubscription,
    /// `create_subscription`
    CreateSubscription,
    /// `fetch_changes`
    FetchChanges,
    /// `save_record`
    SaveRecord,
    /// `delete_record`
    DeleteRecord,
}

/// A scripted remote store for testing.
///
/// Change pages are served from a queue in the order they were pushed; once
/// the queue is empty, `fetch_changes` answers with an empty final page that
/// echoes the caller's cursor. Any call can be switched to fail with a
/// retryable transport error.
#[derive(Debug, Default)]
pub struct MockRemote {
    pages: Mutex<VecDeque<Changeset>>,
    failing: Mutex<HashSet<MockCall>>,
    calls: Mutex<HashMap<MockCall, usize>>,
    fetch_cursors: Mutex<Vec<Option<Cursor>>>,
    subscription: Mutex<Option<Subscription>>,
    deleted: Mutex<Vec<RecordId>>,
    next_id: Mutex<u64>,
}

impl MockRemote {
    /// Creates a new mock remote.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a page for a later `fetch_changes`.
    pub fn push_page(&self, page: Changeset) {
        self.pages.lock().push_back(page);
    }

    /// Makes every subsequent call of this kind fail.
    pub fn fail(&self, call: MockCall) {
        self.failing.lock().insert(call);
    }

    /// Lets calls of this kind succeed again.
    pub fn recover(&self, call: MockCall) {
        self.failing.lock().remove(&call);
    }

    /// Returns how many times a call was made, failed attempts included.
    pub fn calls(&self, call: MockCall) -> usize {
        self.calls.lock().get(&call).copied().unwrap_or(0)
    }

    /// Returns the cursor passed to each `fetch_changes`, in order.
    pub fn fetch_cursors(&self) -> Vec<Option<Cursor>> {
        self.fetch_cursors.lock().clone()
    }

    /// Pretends a subscription already exists remotely.
    pub fn set_existing_subscription(&self, subscription: Subscription) {
        *self.subscription.lock() = Some(subscription);
    }

    /// Returns the IDs passed to successful `delete_record` calls.
    pub fn deleted_ids(&self) -> Vec<RecordId> {
        self.deleted.lock().clone()
    }

    fn enter(&self, call: MockCall) -> SyncResult<()> {
        *self.calls.lock().entry(call).or_insert(0) += 1;
        if self.failing.lock().contains(&call) {
            return Err(SyncError::transport_retryable(format!(
                "mock {:?} failure",
                call
            )));
        }
        Ok(())
    }
}

impl RemoteStore for MockRemote {
    fn create_zone(&self, _zone: &ZoneId) -> SyncResult<()> {
        self.enter(MockCall::CreateZone)
    }

    fn fetch_subscription(&self, id: &SubscriptionId) -> SyncResult<Option<Subscription>> {
        self.enter(MockCall::FetchSubscription)?;
        Ok(self
            .subscription
            .lock()
            .clone()
            .filter(|subscription| &subscription.id == id))
    }

    fn create_subscription(&self, subscription: &Subscription) -> SyncResult<()> {
        self.enter(MockCall::CreateSubscription)?;
        *self.subscription.lock() = Some(subscription.clone());
        Ok(())
    }

    fn fetch_changes(&self, _zone: &ZoneId, since: Option<&Cursor>) -> SyncResult<Changeset> {
        self.fetch_cursors.lock().push(since.cloned());
        self.enter(MockCall::FetchChanges)?;

        let next = self.pages.lock().pop_front();
        Ok(next.unwrap_or_else(|| {
            Changeset::empty(since.cloned().unwrap_or_else(|| Cursor::from_bytes(Vec::new())))
        }))
    }

    fn save_record(&self, _zone: &ZoneId, fields: &RecordFields) -> SyncResult<Record> {
        self.enter(MockCall::SaveRecord)?;
        let mut next_id = self.next_id.lock();
        *next_id += 1;
        Ok(Record::new(format!("rec-{}", *next_id), fields.clone()))
    }

    fn delete_record(&self, _zone: &ZoneId, id: &RecordId) -> SyncResult<()> {
        self.enter(MockCall::DeleteRecord)?;
        self.deleted.lock().push(id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone() -> ZoneId {
        ZoneId::new("records-zone")
    }

    #[test]
    fn mock_serves_pages_in_order_then_echoes_cursor() {
        let remote = MockRemote::new();
        remote.push_page(Changeset::empty(Cursor::from("C1")));

        let first = remote.fetch_changes(&zone(), None).unwrap();
        assert_eq!(first.cursor, Cursor::from("C1"));

        let second = remote.fetch_changes(&zone(), Some(&first.cursor)).unwrap();
        assert_eq!(second.cursor, Cursor::from("C1"));
        assert!(second.is_empty());

        assert_eq!(
            remote.fetch_cursors(),
            vec![None, Some(Cursor::from("C1"))]
        );
    }

    #[test]
    fn mock_failure_is_retryable_and_counted() {
        let remote = MockRemote::new();
        remote.fail(MockCall::CreateZone);

        let result = remote.create_zone(&zone());
        assert!(matches!(result, Err(ref e) if e.is_retryable()));
        assert_eq!(remote.calls(MockCall::CreateZone), 1);

        remote.recover(MockCall::CreateZone);
        remote.create_zone(&zone()).unwrap();
        assert_eq!(remote.calls(MockCall::CreateZone), 2);
    }

    #[test]
    fn mock_assigns_fresh_ids() {
        let remote = MockRemote::new();
        let a = remote
            .save_record(&zone(), &RecordFields::with_name("Alice"))
            .unwrap();
        let b = remote
            .save_record(&zone(), &RecordFields::with_name("Alice"))
            .unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.name(), "Alice");
    }
}
