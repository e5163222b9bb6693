//! Idempotent provisioning of the remote zone and change subscription.

use crate::config::SyncConfig;
use crate::cursor_store::BootstrapFlag;
use crate::domain::SyncDomain;
use crate::error::SyncResult;
use crate::remote::RemoteStore;
use std::sync::Arc;
use tracing::{debug, info};
use zonesync_protocol::Subscription;
use zonesync_storage::KeyValueStore;

/// What a bootstrap step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStep {
    /// The durable flag was already set; no remote call was made.
    AlreadyDone,
    /// The remote entity was created and the flag set.
    Created,
    /// The remote entity already existed (an earlier run created it but
    /// never recorded the flag); the flag is now set.
    Recovered,
}

/// Outcome of provisioning both remote entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Zone step.
    pub zone: BootstrapStep,
    /// Subscription step.
    pub subscription: BootstrapStep,
}

/// Ensures the zone and the subscription exist, exactly once.
///
/// Safe to run at every process start. A failed step leaves its flag unset
/// and propagates the error, so the next run retries it.
pub struct Bootstrapper<R, S> {
    config: SyncConfig,
    remote: Arc<R>,
    domain: Arc<SyncDomain<S>>,
}

impl<R: RemoteStore, S: KeyValueStore> Bootstrapper<R, S> {
    /// Creates a bootstrapper.
    pub fn new(config: SyncConfig, remote: Arc<R>, domain: Arc<SyncDomain<S>>) -> Self {
        Self {
            config,
            remote,
            domain,
        }
    }

    /// Runs the zone step, then the subscription step.
    ///
    /// The subscription is never attempted when the zone step fails.
    pub fn ensure_all(&self) -> SyncResult<BootstrapReport> {
        let zone = self.ensure_zone()?;
        let subscription = self.ensure_subscription()?;
        Ok(BootstrapReport { zone, subscription })
    }

    /// Creates the zone unless it is already recorded as created.
    pub fn ensure_zone(&self) -> SyncResult<BootstrapStep> {
        if self.flag(BootstrapFlag::ZoneCreated)? {
            debug!(zone = %self.config.zone_id, "zone already provisioned");
            return Ok(BootstrapStep::AlreadyDone);
        }

        self.remote.create_zone(&self.config.zone_id)?;
        self.set_flag(BootstrapFlag::ZoneCreated)?;
        info!(zone = %self.config.zone_id, "created zone");
        Ok(BootstrapStep::Created)
    }

    /// Creates the change subscription unless it is already recorded.
    ///
    /// A subscription found on the remote without a local flag is adopted
    /// instead of being created again.
    pub fn ensure_subscription(&self) -> SyncResult<BootstrapStep> {
        if self.flag(BootstrapFlag::SubscriptionCreated)? {
            debug!(subscription = %self.config.subscription_id, "subscription already provisioned");
            return Ok(BootstrapStep::AlreadyDone);
        }

        if self
            .remote
            .fetch_subscription(&self.config.subscription_id)?
            .is_some()
        {
            self.set_flag(BootstrapFlag::SubscriptionCreated)?;
            info!(subscription = %self.config.subscription_id, "adopted existing subscription");
            return Ok(BootstrapStep::Recovered);
        }

        let subscription = Subscription::new(
            self.config.subscription_id.clone(),
            self.config.zone_id.clone(),
            self.config.wants_content_wake,
        );
        self.remote.create_subscription(&subscription)?;
        self.set_flag(BootstrapFlag::SubscriptionCreated)?;
        info!(
            subscription = %self.config.subscription_id,
            zone = %self.config.zone_id,
            "created subscription"
        );
        Ok(BootstrapStep::Created)
    }

    fn flag(&self, flag: BootstrapFlag) -> SyncResult<bool> {
        Ok(self.domain.read(|state| state.cursors.load_flag(flag))?)
    }

    fn set_flag(&self, flag: BootstrapFlag) -> SyncResult<()> {
        self.domain
            .commit(|state| Ok(state.cursors.set_flag(flag)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MockCall, MockRemote};
    use zonesync_protocol::{SubscriptionId, ZoneId};
    use zonesync_storage::InMemoryStore;

    fn setup() -> (Arc<MockRemote>, Arc<InMemoryStore>, Bootstrapper<MockRemote, InMemoryStore>) {
        let remote = Arc::new(MockRemote::new());
        let store = Arc::new(InMemoryStore::new());
        let domain = Arc::new(SyncDomain::open(Arc::clone(&store)).unwrap());
        let bootstrapper = Bootstrapper::new(SyncConfig::default(), Arc::clone(&remote), domain);
        (remote, store, bootstrapper)
    }

    #[test]
    fn zone_is_created_once() {
        let (remote, store, bootstrapper) = setup();

        assert_eq!(bootstrapper.ensure_zone().unwrap(), BootstrapStep::Created);
        assert_eq!(bootstrapper.ensure_zone().unwrap(), BootstrapStep::AlreadyDone);

        assert_eq!(remote.calls(MockCall::CreateZone), 1);
        assert!(store.get_bool(BootstrapFlag::ZoneCreated.key()).unwrap());
    }

    #[test]
    fn failed_zone_creation_leaves_flag_unset() {
        let (remote, store, bootstrapper) = setup();
        remote.fail(MockCall::CreateZone);

        assert!(bootstrapper.ensure_zone().is_err());
        assert!(!store.get_bool(BootstrapFlag::ZoneCreated.key()).unwrap());

        remote.recover(MockCall::CreateZone);
        assert_eq!(bootstrapper.ensure_zone().unwrap(), BootstrapStep::Created);
        assert_eq!(remote.calls(MockCall::CreateZone), 2);
    }

    #[test]
    fn subscription_is_created_once() {
        let (remote, _store, bootstrapper) = setup();

        assert_eq!(
            bootstrapper.ensure_subscription().unwrap(),
            BootstrapStep::Created
        );
        assert_eq!(
            bootstrapper.ensure_subscription().unwrap(),
            BootstrapStep::AlreadyDone
        );

        assert_eq!(remote.calls(MockCall::CreateSubscription), 1);
        assert_eq!(remote.calls(MockCall::FetchSubscription), 1);
    }

    #[test]
    fn existing_remote_subscription_is_adopted() {
        let (remote, store, bootstrapper) = setup();
        remote.set_existing_subscription(Subscription::new(
            SubscriptionId::new(crate::config::DEFAULT_SUBSCRIPTION),
            ZoneId::new(crate::config::DEFAULT_ZONE),
            true,
        ));

        assert_eq!(
            bootstrapper.ensure_subscription().unwrap(),
            BootstrapStep::Recovered
        );
        assert_eq!(remote.calls(MockCall::CreateSubscription), 0);
        assert!(store
            .get_bool(BootstrapFlag::SubscriptionCreated.key())
            .unwrap());
    }

    #[test]
    fn failed_subscription_creation_leaves_flag_unset() {
        let (remote, store, bootstrapper) = setup();
        remote.fail(MockCall::CreateSubscription);

        assert!(bootstrapper.ensure_subscription().is_err());
        assert!(!store
            .get_bool(BootstrapFlag::SubscriptionCreated.key())
            .unwrap());
    }

    #[test]
    fn subscription_waits_for_zone() {
        let (remote, _store, bootstrapper) = setup();
        remote.fail(MockCall::CreateZone);

        assert!(bootstrapper.ensure_all().is_err());
        assert_eq!(remote.calls(MockCall::FetchSubscription), 0);
        assert_eq!(remote.calls(MockCall::CreateSubscription), 0);
    }

    #[test]
    fn ensure_all_reports_both_steps() {
        let (_remote, _store, bootstrapper) = setup();

        let first = bootstrapper.ensure_all().unwrap();
        assert_eq!(first.zone, BootstrapStep::Created);
        assert_eq!(first.subscription, BootstrapStep::Created);

        let second = bootstrapper.ensure_all().unwrap();
        assert_eq!(second.zone, BootstrapStep::AlreadyDone);
        assert_eq!(second.subscription, BootstrapStep::AlreadyDone);
    }
}
