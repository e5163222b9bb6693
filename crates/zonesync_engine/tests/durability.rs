//! Restart and partial-persistence behavior.

mod common;

use common::{client, remote_put, server};
use std::sync::Arc;
use zonesync_engine::{SyncError, CURSOR_KEY};
use zonesync_storage::{InMemoryStore, StorageError};
use zonesync_testkit::{FailpointStore, TempStateDir};

#[test]
fn restart_keeps_cache_cursor_and_flags() {
    let server = server(100);
    let dir = TempStateDir::new();

    let cursor = {
        let client = client(&server, Arc::new(dir.open_store("local").unwrap()));
        client.initialize().unwrap();
        client.add_record("Alice").unwrap();
        client.last_cursor().unwrap()
    };

    let client = client(&server, Arc::new(dir.open_store("local").unwrap()));
    assert_eq!(client.current_names(), vec!["Alice"]);
    assert_eq!(client.last_cursor().unwrap(), cursor);

    let flags = client.bootstrap_flags().unwrap();
    assert!(flags.zone_created && flags.subscription_created);

    let report = client.initialize().unwrap();
    assert!(!report.has_changes());
}

#[test]
fn state_directory_has_a_single_owner() {
    let dir = TempStateDir::new();
    let _first = dir.open_store("local").unwrap();

    assert!(matches!(dir.open_store("local"), Err(StorageError::Locked)));
}

#[test]
fn failed_cursor_write_is_healed_by_the_next_pull() {
    let server = server(100);
    let inner = Arc::new(InMemoryStore::new());

    {
        let store = Arc::new(FailpointStore::new(Arc::clone(&inner)));
        let client = client(&server, Arc::clone(&store));
        client.initialize().unwrap();
        let cursor = client.last_cursor().unwrap();

        remote_put(&server, "other-1", "Alice");
        store.refuse_key(CURSOR_KEY);

        let err = client.pull_changes().unwrap_err();
        assert!(matches!(
            err,
            SyncError::Persistence(StorageError::WriteRefused(_))
        ));
        assert_eq!(client.current_names(), vec!["Alice"]);
        assert_eq!(client.last_cursor().unwrap(), cursor);
    }

    // The process restarts: the cache landed, the cursor did not.
    let client = client(&server, Arc::clone(&inner));
    assert_eq!(client.current_names(), vec!["Alice"]);

    let report = client.pull_changes().unwrap();
    assert_eq!(report.upserted, 1);
    assert_eq!(client.current_names(), vec!["Alice"]);
    assert_eq!(client.records().len(), 1);
}

#[test]
fn failed_cache_write_changes_nothing() {
    let server = server(100);
    let inner = Arc::new(InMemoryStore::new());
    let store = Arc::new(FailpointStore::new(Arc::clone(&inner)));
    let client = client(&server, Arc::clone(&store));
    client.initialize().unwrap();
    let cursor = client.last_cursor().unwrap();

    remote_put(&server, "other-1", "Alice");
    store.fail_after(0);

    assert!(client.pull_changes().is_err());
    assert!(client.current_names().is_empty());
    assert_eq!(client.last_cursor().unwrap(), cursor);

    store.reset();
    client.pull_changes().unwrap();
    assert_eq!(client.current_names(), vec!["Alice"]);
}
