//! Delta sync engine: the cursor-driven pull loop.

use crate::config::SyncConfig;
use crate::domain::{PageCounts, SyncDomain};
use crate::error::SyncResult;
use crate::remote::RemoteStore;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use zonesync_protocol::Cursor;
use zonesync_storage::KeyValueStore;

/// The current state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No pull has run yet.
    Idle,
    /// A pull is fetching or applying pages.
    Pulling,
    /// The last pull completed.
    Synced,
    /// The last pull failed.
    Error,
}

impl SyncState {
    /// Returns true while a pull is running.
    pub fn is_active(&self) -> bool {
        matches!(self, SyncState::Pulling)
    }
}

/// Statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Pulls that ran to the last page.
    pub pulls_completed: u64,
    /// Pulls that stopped on an error.
    pub pulls_failed: u64,
    /// Pages applied and committed.
    pub pages_applied: u64,
    /// Records upserted by pulls.
    pub records_upserted: u64,
    /// Records removed by pulls.
    pub records_removed: u64,
    /// Records skipped because the remote could not fetch them.
    pub records_skipped: u64,
    /// Retries made by `pull_changes_with_retry`.
    pub retries: u64,
    /// Time the last pull completed.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Result of one `pull_changes` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullReport {
    /// Pages fetched and committed.
    pub pages: u64,
    /// Records upserted.
    pub upserted: u64,
    /// Records removed.
    pub removed: u64,
    /// Records skipped.
    pub skipped: u64,
    /// Cursor persisted at the end of the run.
    pub cursor: Option<Cursor>,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl PullReport {
    /// Returns true if the run changed the cache.
    pub fn has_changes(&self) -> bool {
        self.upserted > 0 || self.removed > 0
    }

    /// Folds a later run into this one.
    pub(crate) fn merge(&mut self, later: PullReport) {
        self.pages += later.pages;
        self.upserted += later.upserted;
        self.removed += later.removed;
        self.skipped += later.skipped;
        self.duration += later.duration;
        if later.cursor.is_some() {
            self.cursor = later.cursor;
        }
    }

    fn absorb(&mut self, counts: PageCounts) {
        self.pages += 1;
        self.upserted += counts.upserted as u64;
        self.removed += counts.removed as u64;
        self.skipped += counts.skipped as u64;
    }
}

/// Pulls remote changes into the local cache.
///
/// One run fetches pages from the persisted cursor until the remote reports
/// no more pending data. Each page is committed (cache, then cursor) before
/// the next fetch. Runs are serialized: a second caller waits for the first
/// run to finish.
pub struct DeltaSync<R, S> {
    config: SyncConfig,
    remote: Arc<R>,
    domain: Arc<SyncDomain<S>>,
    pull_gate: Mutex<()>,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
}

impl<R: RemoteStore, S: KeyValueStore> DeltaSync<R, S> {
    /// Creates a delta sync engine.
    pub fn new(config: SyncConfig, remote: Arc<R>, domain: Arc<SyncDomain<S>>) -> Self {
        Self {
            config,
            remote,
            domain,
            pull_gate: Mutex::new(()),
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Fetches and applies every pending page.
    ///
    /// On error the loop stops at once. Pages committed before the failure
    /// stay committed; the failed page is fetched again on the next run.
    pub fn pull_changes(&self) -> SyncResult<PullReport> {
        let _gate = self.pull_gate.lock();
        let start = Instant::now();
        self.set_state(SyncState::Pulling);

        let mut report = PullReport::default();
        let result = self.pull_pages(&mut report);
        report.duration = start.elapsed();

        let mut stats = self.stats.write();
        stats.pages_applied += report.pages;
        stats.records_upserted += report.upserted;
        stats.records_removed += report.removed;
        stats.records_skipped += report.skipped;

        match result {
            Ok(()) => {
                stats.pulls_completed += 1;
                stats.last_sync_time = Some(Instant::now());
                stats.last_error = None;
                drop(stats);
                self.set_state(SyncState::Synced);
                info!(
                    pages = report.pages,
                    upserted = report.upserted,
                    removed = report.removed,
                    skipped = report.skipped,
                    "pull complete"
                );
                Ok(report)
            }
            Err(e) => {
                stats.pulls_failed += 1;
                stats.last_error = Some(e.to_string());
                drop(stats);
                self.set_state(SyncState::Error);
                Err(e)
            }
        }
    }

    /// Retries `pull_changes` on retryable errors per the configured policy.
    pub fn pull_changes_with_retry(&self) -> SyncResult<PullReport> {
        let retry = &self.config.retry;
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                std::thread::sleep(retry.delay_for_attempt(attempt));
                self.stats.write().retries += 1;
            }

            match self.pull_changes() {
                Ok(report) => return Ok(report),
                Err(e) if e.is_retryable() && attempt + 1 < retry.max_attempts => {
                    debug!(attempt, error = %e, "pull failed, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn pull_pages(&self, report: &mut PullReport) -> SyncResult<()> {
        loop {
            let since = self.domain.read(|state| state.cursors.load())?;
            debug!(zone = %self.config.zone_id, cursor = ?since, "fetching changes");

            let page = self
                .remote
                .fetch_changes(&self.config.zone_id, since.as_ref())?;

            let counts = self.domain.commit(|state| state.apply_page(&page))?;
            debug!(
                changed = page.changed.len(),
                deleted = page.deleted.len(),
                more_pending = page.more_pending,
                "applied page"
            );
            report.absorb(counts);
            report.cursor = Some(page.cursor);

            if !page.more_pending {
                return Ok(());
            }
        }
    }

    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }
}
