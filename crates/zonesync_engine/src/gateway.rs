//! Remote-first record mutations.

use crate::config::SyncConfig;
use crate::domain::SyncDomain;
use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteStore;
use std::sync::Arc;
use tracing::{debug, info};
use zonesync_protocol::{Record, RecordFields, RecordId};
use zonesync_storage::KeyValueStore;

/// Creates and deletes records on the remote store, then mirrors the
/// confirmed result into the local cache.
///
/// Nothing is written locally before the remote confirms, so a failed
/// mutation leaves the cache and the remote in agreement.
pub struct MutationGateway<R, S> {
    config: SyncConfig,
    remote: Arc<R>,
    domain: Arc<SyncDomain<S>>,
}

impl<R: RemoteStore, S: KeyValueStore> MutationGateway<R, S> {
    /// Creates a mutation gateway.
    pub fn new(config: SyncConfig, remote: Arc<R>, domain: Arc<SyncDomain<S>>) -> Self {
        Self {
            config,
            remote,
            domain,
        }
    }

    /// Saves a new record with the given display name.
    ///
    /// Returns the record as confirmed by the remote, with its new identity.
    pub fn add_record(&self, name: &str) -> SyncResult<Record> {
        let fields = RecordFields::with_name(name);
        let saved = self.remote.save_record(&self.config.zone_id, &fields)?;
        debug!(record = %saved.id, "remote confirmed save");

        self.domain
            .commit(|state| state.cache.upsert(saved.clone()))?;
        info!(record = %saved.id, record_name = name, "added record");
        Ok(saved)
    }

    /// Deletes the record with the given display name.
    ///
    /// The name is resolved against the local cache; with duplicate names the
    /// smallest record ID is deleted. Fails with `RecordNotFound`, without any
    /// remote call, when no cached record has that name.
    pub fn delete_record(&self, name: &str) -> SyncResult<RecordId> {
        let id = self
            .domain
            .read(|state| state.cache.find_by_name(name))
            .ok_or_else(|| SyncError::RecordNotFound {
                name: name.to_string(),
            })?;

        self.remote.delete_record(&self.config.zone_id, &id)?;
        debug!(record = %id, "remote confirmed delete");

        self.domain.commit(|state| state.cache.remove(&id))?;
        info!(record = %id, record_name = name, "deleted record");
        Ok(id)
    }
}
