//! # zonesync storage
//!
//! Durable key-value storage for the zonesync engine.
//!
//! The engine persists three kinds of state: the local record cache, the
//! last-seen change cursor, and the one-time bootstrap flags. All of it goes
//! through the [`KeyValueStore`] trait, which only knows about opaque byte
//! blobs and booleans addressed by string keys.
//!
//! ## Design Principles
//!
//! - Stores are simple, synchronous and process-local
//! - Every `set_*` call is durable and atomic when it returns
//! - Stores never interpret the blobs they hold
//! - Must be `Send + Sync` so the engine can share them across threads
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral state
//! - [`FileStore`] - For persistent state in a directory on disk
//!
//! ## Example
//!
//! ```rust
//! use zonesync_storage::{InMemoryStore, KeyValueStore};
//!
//! let store = InMemoryStore::new();
//! store.set_blob("sync.cursor", b"C1").unwrap();
//! assert_eq!(store.get_blob("sync.cursor").unwrap(), Some(b"C1".to_vec()));
//! assert!(!store.get_bool("bootstrap.zone_created").unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::{KeyValueStore, StoredValue};
pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::InMemoryStore;
