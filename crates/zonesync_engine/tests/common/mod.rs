//! Shared harness: a client over the reference server.

#![allow(dead_code)]

use std::sync::Arc;
use zonesync_engine::{SyncClient, SyncConfig};
use zonesync_protocol::{RecordFields, RecordId, ZoneId};
use zonesync_server::{ServerConfig, ZoneServer};
use zonesync_storage::KeyValueStore;

pub fn server(page_size: usize) -> Arc<ZoneServer> {
    Arc::new(ZoneServer::new(ServerConfig::new(page_size)))
}

pub fn zone() -> ZoneId {
    SyncConfig::default().zone_id
}

pub fn client<S: KeyValueStore>(server: &Arc<ZoneServer>, store: Arc<S>) -> SyncClient<ZoneServer, S> {
    SyncClient::open(SyncConfig::default(), Arc::clone(server), store).unwrap()
}

/// Another device writing straight to the remote.
pub fn remote_put(server: &ZoneServer, id: &str, name: &str) {
    server
        .put_record(&zone(), &RecordId::from(id), &RecordFields::with_name(name))
        .unwrap();
}
