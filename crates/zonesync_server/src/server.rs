//! The reference remote store.

use crate::change_log::ZoneLog;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;
use zonesync_protocol::{
    from_cbor, to_cbor, Changeset, Cursor, Record, RecordFields, RecordId, Subscription,
    SubscriptionId, ZoneChanged, ZoneId,
};

/// Everything a snapshot carries.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RemoteState {
    zones: BTreeMap<ZoneId, ZoneLog>,
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
}

/// An in-process authoritative record store.
///
/// Holds zones, subscriptions and a per-zone change log, issues opaque
/// cursors, pages change fetches and publishes a [`ZoneChanged`] signal for
/// every subscription of a zone that changes.
///
/// # Example
///
/// ```
/// use zonesync_protocol::{RecordFields, ZoneId};
/// use zonesync_server::{ServerConfig, ZoneServer};
///
/// let server = ZoneServer::new(ServerConfig::default());
/// let zone = ZoneId::new("records-zone");
/// server.create_zone(&zone).unwrap();
///
/// let record = server.save_record(&zone, &RecordFields::with_name("Alice")).unwrap();
/// let page = server.fetch_changes(&zone, None).unwrap();
/// assert_eq!(page.changed.len(), 1);
/// assert_eq!(page.changed[0].id(), &record.id);
/// ```
pub struct ZoneServer {
    config: ServerConfig,
    state: RwLock<RemoteState>,
    failing_fetches: RwLock<HashSet<RecordId>>,
    available: AtomicBool,
    notify: broadcast::Sender<ZoneChanged>,
}

impl ZoneServer {
    /// Creates an empty server.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_state(config, RemoteState::default())
    }

    /// Recreates a server from a [`snapshot`](Self::snapshot).
    pub fn restore(config: ServerConfig, snapshot: &[u8]) -> ServerResult<Self> {
        let state: RemoteState = from_cbor(snapshot)?;
        Ok(Self::with_state(config, state))
    }

    fn with_state(config: ServerConfig, state: RemoteState) -> Self {
        let (notify, _) = broadcast::channel(config.notify_capacity);
        Self {
            config,
            state: RwLock::new(state),
            failing_fetches: RwLock::new(HashSet::new()),
            available: AtomicBool::new(true),
            notify,
        }
    }

    /// Serializes zones, records, change logs and subscriptions.
    ///
    /// Fault injection settings are not part of a snapshot.
    pub fn snapshot(&self) -> ServerResult<Vec<u8>> {
        Ok(to_cbor(&*self.state.read())?)
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Subscribes to push signals.
    pub fn subscribe(&self) -> broadcast::Receiver<ZoneChanged> {
        self.notify.subscribe()
    }

    /// Simulates an outage: while unavailable every call fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Makes `id` appear as a per-record fetch failure in change pages.
    pub fn fail_record_fetch(&self, id: &RecordId) {
        self.failing_fetches.write().insert(id.clone());
    }

    /// Lifts a fetch failure set by [`fail_record_fetch`](Self::fail_record_fetch).
    pub fn heal_record_fetch(&self, id: &RecordId) {
        self.failing_fetches.write().remove(id);
    }

    /// Creates a zone. Creating an existing zone is a no-op.
    pub fn create_zone(&self, zone: &ZoneId) -> ServerResult<()> {
        self.check_available()?;
        let mut state = self.state.write();
        if !state.zones.contains_key(zone) {
            state.zones.insert(zone.clone(), ZoneLog::new());
            info!(%zone, "zone created");
        }
        Ok(())
    }

    /// Lists existing zones.
    pub fn fetch_zones(&self) -> ServerResult<Vec<ZoneId>> {
        self.check_available()?;
        Ok(self.state.read().zones.keys().cloned().collect())
    }

    /// Looks up a subscription.
    pub fn fetch_subscription(&self, id: &SubscriptionId) -> ServerResult<Option<Subscription>> {
        self.check_available()?;
        Ok(self.state.read().subscriptions.get(id).cloned())
    }

    /// Registers a subscription, replacing one with the same identity.
    pub fn create_subscription(&self, subscription: &Subscription) -> ServerResult<()> {
        self.check_available()?;
        let mut state = self.state.write();
        if !state.zones.contains_key(&subscription.zone_id) {
            return Err(ServerError::ZoneNotFound(subscription.zone_id.clone()));
        }
        state
            .subscriptions
            .insert(subscription.id.clone(), subscription.clone());
        info!(subscription = %subscription.id, zone = %subscription.zone_id, "subscription created");
        Ok(())
    }

    /// Fetches one page of changes after `since`.
    pub fn fetch_changes(&self, zone: &ZoneId, since: Option<&Cursor>) -> ServerResult<Changeset> {
        self.check_available()?;
        let state = self.state.read();
        let log = state
            .zones
            .get(zone)
            .ok_or_else(|| ServerError::ZoneNotFound(zone.clone()))?;

        let failing = self.failing_fetches.read();
        let page = log.changes_since(since, self.config.page_size, &failing)?;
        debug!(
            %zone,
            changed = page.changed.len(),
            deleted = page.deleted.len(),
            more_pending = page.more_pending,
            "served change page"
        );
        Ok(page)
    }

    /// Saves a new record under a fresh identity.
    pub fn save_record(&self, zone: &ZoneId, fields: &RecordFields) -> ServerResult<Record> {
        let id = RecordId::from(Uuid::new_v4().to_string());
        self.put_record(zone, &id, fields)?;
        Ok(Record::new(id, fields.clone()))
    }

    /// Writes a record with a known identity, as another device would.
    pub fn put_record(&self, zone: &ZoneId, id: &RecordId, fields: &RecordFields) -> ServerResult<()> {
        self.check_available()?;
        let sequence = self.with_zone(zone, |log| Ok(log.put(id.clone(), fields.clone())))?;
        debug!(%zone, record = %id, sequence, "record written");
        self.publish(zone);
        Ok(())
    }

    /// Deletes a record.
    pub fn delete_record(&self, zone: &ZoneId, id: &RecordId) -> ServerResult<()> {
        self.check_available()?;
        let sequence = self.with_zone(zone, |log| log.delete(id))?;
        debug!(%zone, record = %id, sequence, "record deleted");
        self.publish(zone);
        Ok(())
    }

    /// Returns the live records of a zone in ID order.
    pub fn records(&self, zone: &ZoneId) -> ServerResult<Vec<Record>> {
        let state = self.state.read();
        let log = state
            .zones
            .get(zone)
            .ok_or_else(|| ServerError::ZoneNotFound(zone.clone()))?;
        Ok(log.records())
    }

    fn with_zone<T>(
        &self,
        zone: &ZoneId,
        f: impl FnOnce(&mut ZoneLog) -> ServerResult<T>,
    ) -> ServerResult<T> {
        let mut state = self.state.write();
        let log = state
            .zones
            .get_mut(zone)
            .ok_or_else(|| ServerError::ZoneNotFound(zone.clone()))?;
        f(log)
    }

    fn publish(&self, zone: &ZoneId) {
        let subscribers: Vec<SubscriptionId> = self
            .state
            .read()
            .subscriptions
            .values()
            .filter(|subscription| &subscription.zone_id == zone)
            .map(|subscription| subscription.id.clone())
            .collect();

        for subscription_id in subscribers {
            // No receivers is fine: nobody is listening right now.
            let _ = self.notify.send(ZoneChanged {
                zone_id: zone.clone(),
                subscription_id,
            });
        }
    }

    fn check_available(&self) -> ServerResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ServerError::Unavailable)
        }
    }
}

impl Default for ZoneServer {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;
    use zonesync_protocol::RecordFetch;

    fn zone() -> ZoneId {
        ZoneId::new("records-zone")
    }

    fn subscription() -> Subscription {
        Subscription::new(SubscriptionId::new("records-zone-changes"), zone(), true)
    }

    fn server_with_zone() -> ZoneServer {
        let server = ZoneServer::new(ServerConfig::default());
        server.create_zone(&zone()).unwrap();
        server
    }

    #[test]
    fn create_zone_is_idempotent() {
        let server = server_with_zone();
        server
            .save_record(&zone(), &RecordFields::with_name("Alice"))
            .unwrap();
        server.create_zone(&zone()).unwrap();

        assert_eq!(server.fetch_zones().unwrap(), vec![zone()]);
        assert_eq!(server.records(&zone()).unwrap().len(), 1);
    }

    #[test]
    fn subscription_requires_zone() {
        let server = ZoneServer::default();
        assert!(matches!(
            server.create_subscription(&subscription()),
            Err(ServerError::ZoneNotFound(_))
        ));

        server.create_zone(&zone()).unwrap();
        server.create_subscription(&subscription()).unwrap();
        assert_eq!(
            server.fetch_subscription(&subscription().id).unwrap(),
            Some(subscription())
        );
    }

    #[test]
    fn save_assigns_fresh_ids() {
        let server = server_with_zone();
        let a = server
            .save_record(&zone(), &RecordFields::with_name("Alice"))
            .unwrap();
        let b = server
            .save_record(&zone(), &RecordFields::with_name("Alice"))
            .unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn delete_unknown_record_fails() {
        let server = server_with_zone();
        assert!(matches!(
            server.delete_record(&zone(), &RecordId::from("ghost")),
            Err(ServerError::RecordNotFound(_))
        ));
    }

    #[test]
    fn changes_page_through_the_log() {
        let server = ZoneServer::new(ServerConfig::new(2));
        server.create_zone(&zone()).unwrap();
        for name in ["A", "B", "C"] {
            server
                .save_record(&zone(), &RecordFields::with_name(name))
                .unwrap();
        }

        let first = server.fetch_changes(&zone(), None).unwrap();
        assert_eq!(first.changed.len(), 2);
        assert!(first.more_pending);

        let second = server.fetch_changes(&zone(), Some(&first.cursor)).unwrap();
        assert_eq!(second.changed.len(), 1);
        assert!(!second.more_pending);
    }

    #[test]
    fn outage_fails_every_call() {
        let server = server_with_zone();
        server.set_available(false);

        assert!(matches!(
            server.fetch_changes(&zone(), None),
            Err(ServerError::Unavailable)
        ));
        assert!(server.create_zone(&zone()).is_err());

        server.set_available(true);
        server.fetch_changes(&zone(), None).unwrap();
    }

    #[test]
    fn failing_fetch_is_reported_per_record() {
        let server = server_with_zone();
        let record = server
            .save_record(&zone(), &RecordFields::with_name("Alice"))
            .unwrap();
        server.fail_record_fetch(&record.id);

        let page = server.fetch_changes(&zone(), None).unwrap();
        assert!(matches!(page.changed[0], RecordFetch::Failed { .. }));

        server.heal_record_fetch(&record.id);
        let page = server.fetch_changes(&zone(), None).unwrap();
        assert!(matches!(page.changed[0], RecordFetch::Fetched(_)));
    }

    #[test]
    fn changes_publish_signals_to_subscribers() {
        let server = server_with_zone();
        let mut signals = server.subscribe();

        server
            .save_record(&zone(), &RecordFields::with_name("Unheard"))
            .unwrap();
        assert!(matches!(signals.try_recv(), Err(TryRecvError::Empty)));

        server.create_subscription(&subscription()).unwrap();
        server
            .save_record(&zone(), &RecordFields::with_name("Alice"))
            .unwrap();

        let signal = signals.try_recv().unwrap();
        assert_eq!(signal.zone_id, zone());
        assert_eq!(signal.subscription_id, subscription().id);
    }

    #[test]
    fn snapshot_restores_state_and_cursors() {
        let server = server_with_zone();
        server.create_subscription(&subscription()).unwrap();
        server
            .save_record(&zone(), &RecordFields::with_name("Alice"))
            .unwrap();
        let cursor = server.fetch_changes(&zone(), None).unwrap().cursor;

        let restored = ZoneServer::restore(ServerConfig::default(), &server.snapshot().unwrap()).unwrap();
        assert_eq!(restored.records(&zone()).unwrap(), server.records(&zone()).unwrap());
        assert!(restored.fetch_subscription(&subscription().id).unwrap().is_some());

        let idle = restored.fetch_changes(&zone(), Some(&cursor)).unwrap();
        assert!(idle.is_empty());
    }
}
