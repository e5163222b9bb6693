//! # zonesync protocol
//!
//! Types exchanged between the sync engine and a remote record store.
//!
//! This crate provides:
//! - [`Record`], [`RecordId`] and [`RecordFields`] for the synchronized data
//! - [`Cursor`], the opaque change token issued by the remote store
//! - [`Changeset`], one page of changes returned by a delta fetch
//! - [`ZoneId`], [`SubscriptionId`] and [`Subscription`] for remote provisioning
//! - [`ZoneChanged`], the push signal a subscription delivers
//! - CBOR encoding/decoding helpers
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod changeset;
mod codec;
mod cursor;
mod record;
mod zone;

pub use changeset::{Changeset, RecordFetch};
pub use codec::{from_cbor, to_cbor, CodecError, CodecResult};
pub use cursor::Cursor;
pub use record::{Record, RecordFields, RecordId, NAME_FIELD};
pub use zone::{Subscription, SubscriptionId, ZoneChanged, ZoneId};
