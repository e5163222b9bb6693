//! The exposed sync surface.

use crate::bootstrap::{BootstrapReport, Bootstrapper};
use crate::config::SyncConfig;
use crate::cursor_store::BootstrapFlag;
use crate::domain::{ChangeListener, SyncDomain};
use crate::error::SyncResult;
use crate::gateway::MutationGateway;
use crate::remote::RemoteStore;
use crate::state::{DeltaSync, PullReport, SyncState, SyncStats};
use crate::trigger::{NotificationTrigger, SignalOutcome};
use std::sync::Arc;
use tracing::{info, warn};
use zonesync_protocol::{Cursor, Record, RecordId};
use zonesync_storage::{KeyValueStore, StorageResult};

/// Durable bootstrap progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapFlags {
    /// Whether the zone is recorded as created.
    pub zone_created: bool,
    /// Whether the subscription is recorded as created.
    pub subscription_created: bool,
}

/// A local record cache kept in sync with one remote zone.
///
/// Wires the bootstrap coordinator, delta sync engine, mutation gateway and
/// notification trigger around one shared [`SyncDomain`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use zonesync_engine::{MockRemote, SyncClient, SyncConfig};
/// use zonesync_storage::InMemoryStore;
///
/// let client = SyncClient::open(
///     SyncConfig::default(),
///     Arc::new(MockRemote::new()),
///     Arc::new(InMemoryStore::new()),
/// )
/// .unwrap();
///
/// client.initialize().unwrap();
/// client.add_record("Alice").unwrap();
/// assert_eq!(client.current_names(), vec!["Alice"]);
/// ```
pub struct SyncClient<R, S> {
    domain: Arc<SyncDomain<S>>,
    bootstrap: Bootstrapper<R, S>,
    engine: Arc<DeltaSync<R, S>>,
    gateway: MutationGateway<R, S>,
    trigger: Arc<NotificationTrigger<R, S>>,
}

impl<R: RemoteStore, S: KeyValueStore> SyncClient<R, S> {
    /// Opens a client, loading the cache from durable storage.
    ///
    /// No remote call is made until [`initialize`](Self::initialize).
    pub fn open(config: SyncConfig, remote: Arc<R>, store: Arc<S>) -> SyncResult<Self> {
        let domain = Arc::new(SyncDomain::open(store)?);
        let bootstrap =
            Bootstrapper::new(config.clone(), Arc::clone(&remote), Arc::clone(&domain));
        let engine = Arc::new(DeltaSync::new(
            config.clone(),
            Arc::clone(&remote),
            Arc::clone(&domain),
        ));
        let gateway = MutationGateway::new(config, remote, Arc::clone(&domain));
        let trigger = Arc::new(NotificationTrigger::new(Arc::clone(&engine)));

        Ok(Self {
            domain,
            bootstrap,
            engine,
            gateway,
            trigger,
        })
    }

    /// Provisions the zone and subscription if needed, then pulls.
    ///
    /// Call at every process start. A bootstrap failure is returned before
    /// any pull is attempted; the next call retries the missing step.
    pub fn initialize(&self) -> SyncResult<PullReport> {
        let BootstrapReport { zone, subscription } = self.bootstrap.ensure_all()?;
        info!(?zone, ?subscription, "bootstrap complete");
        self.engine.pull_changes()
    }

    /// Pulls every pending change into the cache.
    pub fn pull_changes(&self) -> SyncResult<PullReport> {
        self.engine.pull_changes()
    }

    /// Pulls, retrying retryable failures per the configured [`RetryConfig`](crate::RetryConfig).
    pub fn pull_changes_with_retry(&self) -> SyncResult<PullReport> {
        self.engine.pull_changes_with_retry()
    }

    /// Adds a record remotely, mirrors it locally, then pulls.
    ///
    /// A failure of the follow-up pull is logged and kept in the stats; the
    /// add itself already succeeded.
    pub fn add_record(&self, name: &str) -> SyncResult<Record> {
        let record = self.gateway.add_record(name)?;
        self.follow_up_pull();
        Ok(record)
    }

    /// Deletes a record by name remotely, mirrors it locally, then pulls.
    pub fn delete_record(&self, name: &str) -> SyncResult<RecordId> {
        let id = self.gateway.delete_record(name)?;
        self.follow_up_pull();
        Ok(id)
    }

    /// Handles one push signal.
    pub fn on_signal(&self) -> SignalOutcome {
        self.trigger.on_signal()
    }

    /// Returns the notification trigger, e.g. to run its async listener.
    pub fn trigger(&self) -> Arc<NotificationTrigger<R, S>> {
        Arc::clone(&self.trigger)
    }

    /// Registers a callback receiving the sorted names after every change.
    pub fn on_change(&self, listener: impl Fn(&[String]) + Send + Sync + 'static) {
        let listener: ChangeListener = Arc::new(listener);
        self.domain.on_change(listener);
    }

    /// Returns the cached display names, sorted.
    pub fn current_names(&self) -> Vec<String> {
        self.domain.current_names()
    }

    /// Returns the cached records in ID order.
    pub fn records(&self) -> Vec<Record> {
        self.domain.records()
    }

    /// Returns the last persisted cursor.
    pub fn last_cursor(&self) -> SyncResult<Option<Cursor>> {
        self.domain.last_cursor()
    }

    /// Returns the durable bootstrap flags.
    pub fn bootstrap_flags(&self) -> SyncResult<BootstrapFlags> {
        let flags = self.domain.read(|state| -> StorageResult<BootstrapFlags> {
            Ok(BootstrapFlags {
                zone_created: state.cursors.load_flag(BootstrapFlag::ZoneCreated)?,
                subscription_created: state
                    .cursors
                    .load_flag(BootstrapFlag::SubscriptionCreated)?,
            })
        })?;
        Ok(flags)
    }

    /// Gets the engine state.
    pub fn state(&self) -> SyncState {
        self.engine.state()
    }

    /// Gets the engine stats.
    pub fn stats(&self) -> SyncStats {
        self.engine.stats()
    }

    fn follow_up_pull(&self) {
        if let Err(e) = self.engine.pull_changes() {
            warn!(error = %e, "pull after mutation failed, cache catches up on next pull");
        }
    }
}
