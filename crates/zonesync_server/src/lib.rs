//! # zonesync server
//!
//! Reference remote record store for zonesync.
//!
//! This crate provides:
//! - Zones holding records, each with an ordered change log
//! - Subscriptions and a push signal channel
//! - Paged change fetches behind opaque cursors
//! - Outage and per-record fetch-failure injection
//! - CBOR snapshots for a file-backed remote
//! - A `RemoteStore` implementation, so a `SyncClient` can run against it
//!
//! # Architecture
//!
//! The server runs in-process and stands in for a real cloud backend. It
//! maintains:
//! - A change log per zone (gap-free sequences from 1)
//! - The current value of every live record
//! - Registered subscriptions
//!
//! # Protocol
//!
//! A client pulls with the cursor of its last applied page:
//! 1. The server decodes the cursor into a log position
//! 2. It returns at most `page_size` log entries as a changeset
//! 3. The page cursor points after the last returned entry
//! 4. `more_pending` is set while entries remain

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod change_log;
mod config;
mod error;
mod remote;
mod server;

pub use change_log::{ChangeKind, LogEntry, ZoneLog};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::ZoneServer;
