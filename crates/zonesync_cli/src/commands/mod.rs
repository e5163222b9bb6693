//! CLI command implementations.

pub mod records;
pub mod remote_put;
pub mod status;
pub mod sync;

use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use zonesync_engine::{SyncClient, SyncConfig};
use zonesync_server::{ServerConfig, ZoneServer};
use zonesync_storage::{FileStore, KeyValueStore};

/// Key holding the simulated remote's snapshot in `<dir>/remote`.
const SNAPSHOT_KEY: &str = "remote.snapshot";

/// Result type shared by command implementations.
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Everything a command works on: the client and the simulated remote.
pub struct Workspace {
    /// Client over the local state directory.
    pub client: SyncClient<ZoneServer, FileStore>,
    /// The simulated remote.
    pub server: Arc<ZoneServer>,
    /// Sync configuration in use.
    pub config: SyncConfig,
    remote_store: FileStore,
}

impl Workspace {
    /// Opens the local state and restores the simulated remote.
    pub fn open(
        dir: &Path,
        config: SyncConfig,
        page_size: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let server_config = ServerConfig::new(page_size);
        let remote_store = FileStore::open(&dir.join("remote"))?;
        let server = match remote_store.get_blob(SNAPSHOT_KEY)? {
            Some(bytes) => ZoneServer::restore(server_config, &bytes)?,
            None => ZoneServer::new(server_config),
        };
        let server = Arc::new(server);

        let local = Arc::new(FileStore::open(&dir.join("local"))?);
        let client = SyncClient::open(config.clone(), Arc::clone(&server), local)?;
        debug!(path = %dir.display(), "workspace opened");

        Ok(Self {
            client,
            server,
            config,
            remote_store,
        })
    }

    /// Persists the simulated remote.
    pub fn save_remote(&self) -> CommandResult {
        let snapshot = self.server.snapshot()?;
        self.remote_store.set_blob(SNAPSHOT_KEY, &snapshot)?;
        Ok(())
    }
}
