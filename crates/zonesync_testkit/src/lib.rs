//! # zonesync testkit
//!
//! Test utilities for zonesync.
//!
//! This crate provides:
//! - Record and changeset fixtures
//! - Temporary state directories backed by a `FileStore`
//! - A fault-injecting store for crash and resumability tests
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use zonesync_testkit::prelude::*;
//!
//! let store = FailpointStore::new(InMemoryStore::new());
//! store.refuse_key("sync.cursor");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use crash::*;
pub use fixtures::*;
pub use generators::*;
