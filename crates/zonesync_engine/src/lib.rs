//! # zonesync engine
//!
//! Incremental state synchronization between a local record cache and an
//! authoritative remote zone.
//!
//! This crate provides:
//! - Cursor store (last committed change cursor, bootstrap flags)
//! - Local cache mirrored to durable storage on every mutation
//! - Bootstrap coordinator (zone + subscription, exactly once)
//! - Delta sync engine (multi-page, cursor-driven pull loop)
//! - Mutation gateway (remote-first create/delete)
//! - Notification trigger (push signals coalesced into pulls)
//!
//! ## Architecture
//!
//! ```text
//! start ─► Bootstrapper ─► DeltaSync::pull_changes ◄─ NotificationTrigger ◄─ push
//!                               │
//!   MutationGateway ─► remote ─►│ SyncDomain (cache + cursor, one lock)
//! ```
//!
//! ## Key Invariants
//!
//! - The remote store is authoritative; the cache only holds acknowledged records
//! - A page's cache changes are persisted before its cursor
//! - A failed remote call leaves every durable value as it was
//! - Re-applying a page is a no-op, so redelivery is safe
//! - Remote calls never run while the cache/cursor lock is held

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bootstrap;
mod cache;
mod client;
mod config;
mod cursor_store;
mod domain;
mod error;
mod gateway;
mod remote;
mod state;
mod trigger;

pub use bootstrap::{BootstrapReport, BootstrapStep, Bootstrapper};
pub use cache::{ApplyCounts, LocalCache, CACHE_KEY};
pub use client::{BootstrapFlags, SyncClient};
pub use config::{RetryConfig, SyncConfig, DEFAULT_SUBSCRIPTION, DEFAULT_ZONE};
pub use cursor_store::{BootstrapFlag, CursorStore, CURSOR_KEY};
pub use domain::{ChangeListener, PageCounts, SyncDomain};
pub use error::{SyncError, SyncResult};
pub use gateway::MutationGateway;
pub use remote::{MockCall, MockRemote, RemoteStore};
pub use state::{DeltaSync, PullReport, SyncState, SyncStats};
pub use trigger::{NotificationTrigger, SignalOutcome};
