//! Push-signal driven pulls.
//!
//! A signal only means "something may have changed". Its payload is never
//! read; every signal re-runs the cursor-driven pull, which makes duplicate,
//! late and reordered signals harmless.

use crate::error::SyncError;
use crate::remote::RemoteStore;
use crate::state::{DeltaSync, PullReport};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};
use zonesync_protocol::ZoneChanged;
use zonesync_storage::KeyValueStore;

/// What handling one signal led to.
#[derive(Debug)]
pub enum SignalOutcome {
    /// The pull brought changes into the cache.
    NewData(PullReport),
    /// The pull completed without changing the cache.
    NoData,
    /// A pull was already running; it will run once more before finishing,
    /// unless that run fails. A failed run drops the pending rerun and the
    /// next signal or manual refresh picks the changes up.
    Coalesced,
    /// The pull failed. Nothing was lost; the next signal or manual refresh
    /// resumes from the last committed cursor.
    Failed(SyncError),
}

#[derive(Debug, Default)]
struct TriggerRun {
    running: bool,
    rerun: bool,
}

/// Turns wake-up signals into pulls.
///
/// Signals that arrive while a triggered pull is running are folded into a
/// single extra run after the current one.
pub struct NotificationTrigger<R, S> {
    engine: Arc<DeltaSync<R, S>>,
    run: Mutex<TriggerRun>,
    signals: AtomicU64,
}

impl<R: RemoteStore, S: KeyValueStore> NotificationTrigger<R, S> {
    /// Creates a trigger driving the given engine.
    pub fn new(engine: Arc<DeltaSync<R, S>>) -> Self {
        Self {
            engine,
            run: Mutex::new(TriggerRun::default()),
            signals: AtomicU64::new(0),
        }
    }

    /// Returns how many signals were received.
    pub fn signals_received(&self) -> u64 {
        self.signals.load(Ordering::SeqCst)
    }

    /// Handles one wake-up signal.
    ///
    /// Never panics on pull failure; the error is handed back as
    /// [`SignalOutcome::Failed`].
    pub fn on_signal(&self) -> SignalOutcome {
        self.signals.fetch_add(1, Ordering::SeqCst);

        {
            let mut run = self.run.lock();
            if run.running {
                run.rerun = true;
                debug!("pull in flight, coalescing signal");
                return SignalOutcome::Coalesced;
            }
            run.running = true;
        }

        let mut merged = PullReport::default();
        loop {
            let result = self.engine.pull_changes();
            let mut run = self.run.lock();

            match result {
                Ok(report) => {
                    merged.merge(report);
                    if run.rerun {
                        run.rerun = false;
                        continue;
                    }
                    run.running = false;
                    return if merged.has_changes() {
                        SignalOutcome::NewData(merged)
                    } else {
                        SignalOutcome::NoData
                    };
                }
                Err(e) => {
                    run.running = false;
                    run.rerun = false;
                    drop(run);
                    warn!(error = %e, "signal-triggered pull failed, will fetch later");
                    return SignalOutcome::Failed(e);
                }
            }
        }
    }
}

impl<R, S> NotificationTrigger<R, S>
where
    R: RemoteStore + 'static,
    S: KeyValueStore + 'static,
{
    /// Consumes push signals until the channel closes.
    ///
    /// Each pull runs on the blocking pool. Signals queued up while a pull
    /// runs are drained and answered with one more pull, repeated until a
    /// pull finishes with nothing queued; a lagged receiver counts as one
    /// signal.
    pub async fn listen(self: Arc<Self>, mut signals: broadcast::Receiver<ZoneChanged>) {
        loop {
            match signals.recv().await {
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "signal receiver lagged");
                }
                Err(RecvError::Closed) => {
                    debug!("signal channel closed");
                    return;
                }
            }

            loop {
                Arc::clone(&self).pull_on_blocking_pool().await;
                if !drain_pending(&mut signals) {
                    break;
                }
                debug!("signals arrived during the pull, pulling again");
            }
        }
    }

    async fn pull_on_blocking_pool(self: Arc<Self>) {
        match tokio::task::spawn_blocking(move || self.on_signal()).await {
            Ok(SignalOutcome::Failed(_)) | Ok(SignalOutcome::Coalesced) => {}
            Ok(outcome) => debug!(?outcome, "signal handled"),
            Err(e) => warn!(error = %e, "signal handler task failed"),
        }
    }
}

/// Consumes every queued signal. Returns true if at least one was queued.
fn drain_pending(signals: &mut broadcast::Receiver<ZoneChanged>) -> bool {
    let mut pending = false;
    loop {
        match signals.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => pending = true,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::domain::SyncDomain;
    use crate::error::SyncResult;
    use crate::remote::{MockCall, MockRemote};
    use std::sync::mpsc;
    use zonesync_protocol::{
        Changeset, Cursor, Record, RecordFields, RecordId, Subscription, SubscriptionId, ZoneId,
    };
    use zonesync_storage::InMemoryStore;

    fn page(id: &str, name: &str, cursor: &str) -> Changeset {
        Changeset::new(
            vec![Record::new(id, RecordFields::with_name(name))],
            vec![],
            Cursor::from(cursor),
            false,
        )
    }

    fn trigger_over<R: RemoteStore>(remote: Arc<R>) -> NotificationTrigger<R, InMemoryStore> {
        let domain = Arc::new(SyncDomain::open(Arc::new(InMemoryStore::new())).unwrap());
        let engine = Arc::new(DeltaSync::new(SyncConfig::default(), remote, domain));
        NotificationTrigger::new(engine)
    }

    /// Remote whose first change fetch blocks until released.
    struct GatedRemote {
        inner: MockRemote,
        entered: Mutex<Option<mpsc::Sender<()>>>,
        release: Mutex<Option<mpsc::Receiver<()>>>,
    }

    impl RemoteStore for GatedRemote {
        fn create_zone(&self, zone: &ZoneId) -> SyncResult<()> {
            self.inner.create_zone(zone)
        }
        fn fetch_subscription(&self, id: &SubscriptionId) -> SyncResult<Option<Subscription>> {
            self.inner.fetch_subscription(id)
        }
        fn create_subscription(&self, subscription: &Subscription) -> SyncResult<()> {
            self.inner.create_subscription(subscription)
        }
        fn fetch_changes(&self, zone: &ZoneId, since: Option<&Cursor>) -> SyncResult<Changeset> {
            if let Some(entered) = self.entered.lock().take() {
                entered.send(()).unwrap();
                let release = self.release.lock().take().unwrap();
                release.recv().unwrap();
            }
            self.inner.fetch_changes(zone, since)
        }
        fn save_record(&self, zone: &ZoneId, fields: &RecordFields) -> SyncResult<Record> {
            self.inner.save_record(zone, fields)
        }
        fn delete_record(&self, zone: &ZoneId, id: &RecordId) -> SyncResult<()> {
            self.inner.delete_record(zone, id)
        }
    }

    #[test]
    fn signal_pulls_new_data() {
        let remote = Arc::new(MockRemote::new());
        remote.push_page(page("r1", "Alice", "C1"));
        let trigger = trigger_over(Arc::clone(&remote));

        match trigger.on_signal() {
            SignalOutcome::NewData(report) => assert_eq!(report.upserted, 1),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(matches!(trigger.on_signal(), SignalOutcome::NoData));
        assert_eq!(trigger.signals_received(), 2);
    }

    #[test]
    fn duplicate_signals_are_harmless() {
        let remote = Arc::new(MockRemote::new());
        remote.push_page(page("r1", "Alice", "C1"));
        let trigger = trigger_over(Arc::clone(&remote));

        for _ in 0..3 {
            trigger.on_signal();
        }
        assert_eq!(trigger.engine.stats().records_upserted, 1);
        assert_eq!(
            remote.fetch_cursors(),
            vec![None, Some(Cursor::from("C1")), Some(Cursor::from("C1"))]
        );
    }

    #[test]
    fn failed_pull_is_reported_not_raised() {
        let remote = Arc::new(MockRemote::new());
        remote.fail(MockCall::FetchChanges);
        let trigger = trigger_over(Arc::clone(&remote));

        assert!(matches!(
            trigger.on_signal(),
            SignalOutcome::Failed(SyncError::Transport { .. })
        ));

        remote.recover(MockCall::FetchChanges);
        assert!(matches!(trigger.on_signal(), SignalOutcome::NoData));
    }

    #[test]
    fn signals_during_a_pull_coalesce_into_one_rerun() {
        let inner = MockRemote::new();
        inner.push_page(page("r1", "Alice", "C1"));
        inner.push_page(page("r2", "Bob", "C2"));
        let (remote, entered_rx, release_tx) = gated(inner);
        let trigger = Arc::new(trigger_over(Arc::clone(&remote)));

        let running = Arc::clone(&trigger);
        let handle = std::thread::spawn(move || running.on_signal());

        entered_rx.recv().unwrap();
        assert!(matches!(trigger.on_signal(), SignalOutcome::Coalesced));
        assert!(matches!(trigger.on_signal(), SignalOutcome::Coalesced));
        release_tx.send(()).unwrap();

        match handle.join().unwrap() {
            SignalOutcome::NewData(report) => assert_eq!(report.upserted, 2),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(remote.inner.calls(MockCall::FetchChanges), 2);
        assert_eq!(trigger.signals_received(), 3);
    }

    fn gated(remote: MockRemote) -> (Arc<GatedRemote>, mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let remote = Arc::new(GatedRemote {
            inner: remote,
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(Some(release_rx)),
        });
        (remote, entered_rx, release_tx)
    }

    fn signal() -> ZoneChanged {
        ZoneChanged {
            zone_id: ZoneId::new("records-zone"),
            subscription_id: SubscriptionId::new("records-zone-changes"),
        }
    }

    #[test]
    fn failed_run_drops_the_coalesced_rerun() {
        let inner = MockRemote::new();
        inner.fail(MockCall::FetchChanges);
        let (remote, entered_rx, release_tx) = gated(inner);
        let trigger = Arc::new(trigger_over(Arc::clone(&remote)));

        let running = Arc::clone(&trigger);
        let handle = std::thread::spawn(move || running.on_signal());

        entered_rx.recv().unwrap();
        assert!(matches!(trigger.on_signal(), SignalOutcome::Coalesced));
        release_tx.send(()).unwrap();

        assert!(matches!(handle.join().unwrap(), SignalOutcome::Failed(_)));
        assert_eq!(remote.inner.calls(MockCall::FetchChanges), 1);

        remote.inner.recover(MockCall::FetchChanges);
        remote.inner.push_page(page("r1", "Alice", "C1"));
        assert!(matches!(trigger.on_signal(), SignalOutcome::NewData(_)));
    }

    #[tokio::test]
    async fn listener_reruns_for_signals_received_during_a_pull() {
        let inner = MockRemote::new();
        inner.push_page(page("r1", "Alice", "C1"));
        let (remote, entered_rx, release_tx) = gated(inner);
        let trigger = Arc::new(trigger_over(Arc::clone(&remote)));

        let (tx, rx) = broadcast::channel(4);
        let listener = tokio::spawn(Arc::clone(&trigger).listen(rx));

        tx.send(signal()).unwrap();
        tokio::task::spawn_blocking(move || entered_rx.recv())
            .await
            .unwrap()
            .unwrap();

        // A second device writes while the first pull is still in flight.
        remote.inner.push_page(page("r2", "Bob", "C2"));
        tx.send(signal()).unwrap();
        release_tx.send(()).unwrap();
        drop(tx);

        listener.await.unwrap();

        assert_eq!(remote.inner.calls(MockCall::FetchChanges), 2);
        assert_eq!(trigger.engine.stats().records_upserted, 2);
    }

    #[tokio::test]
    async fn listener_pulls_until_channel_closes() {
        let remote = Arc::new(MockRemote::new());
        remote.push_page(page("r1", "Alice", "C1"));
        let trigger = Arc::new(trigger_over(Arc::clone(&remote)));

        let (tx, rx) = broadcast::channel(4);
        tx.send(signal()).unwrap();
        tx.send(signal()).unwrap();
        drop(tx);

        Arc::clone(&trigger).listen(rx).await;

        assert_eq!(trigger.engine.stats().records_upserted, 1);
        assert!(trigger.signals_received() >= 1);
    }
}
