//! The server behind the engine's remote seam.

use crate::error::ServerError;
use crate::server::ZoneServer;
use zonesync_engine::{RemoteStore, SyncError, SyncResult};
use zonesync_protocol::{
    Changeset, Cursor, Record, RecordFields, RecordId, Subscription, SubscriptionId, ZoneId,
};

/// Outages are transient; everything else is the remote rejecting the call.
impl From<ServerError> for SyncError {
    fn from(e: ServerError) -> Self {
        if e.is_retryable() {
            SyncError::transport_retryable(e.to_string())
        } else {
            SyncError::Remote(e.to_string())
        }
    }
}

impl RemoteStore for ZoneServer {
    fn create_zone(&self, zone: &ZoneId) -> SyncResult<()> {
        Ok(ZoneServer::create_zone(self, zone)?)
    }

    fn fetch_subscription(&self, id: &SubscriptionId) -> SyncResult<Option<Subscription>> {
        Ok(ZoneServer::fetch_subscription(self, id)?)
    }

    fn create_subscription(&self, subscription: &Subscription) -> SyncResult<()> {
        Ok(ZoneServer::create_subscription(self, subscription)?)
    }

    fn fetch_changes(&self, zone: &ZoneId, since: Option<&Cursor>) -> SyncResult<Changeset> {
        Ok(ZoneServer::fetch_changes(self, zone, since)?)
    }

    fn save_record(&self, zone: &ZoneId, fields: &RecordFields) -> SyncResult<Record> {
        Ok(ZoneServer::save_record(self, zone, fields)?)
    }

    fn delete_record(&self, zone: &ZoneId, id: &RecordId) -> SyncResult<()> {
        Ok(ZoneServer::delete_record(self, zone, id)?)
    }
}
