//! Property-based test generators using proptest.

use proptest::prelude::*;
use zonesync_protocol::{Changeset, Cursor, Record, RecordFields, RecordId};

/// Strategy for generating display names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{0,11}").expect("Invalid regex")
}

/// Strategy for generating record IDs from a small pool, so pages collide.
pub fn record_id_strategy() -> impl Strategy<Value = RecordId> {
    (0u8..16).prop_map(|n| RecordId::from(format!("r{n}")))
}

/// Strategy for generating named records.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    (record_id_strategy(), name_strategy())
        .prop_map(|(id, name)| Record::new(id, RecordFields::with_name(name)))
}

/// Strategy for generating a single final page.
pub fn changeset_strategy() -> impl Strategy<Value = Changeset> {
    (
        prop::collection::vec(record_strategy(), 0..8),
        prop::collection::vec(record_id_strategy(), 0..4),
        prop::collection::vec(any::<u8>(), 1..16),
    )
        .prop_map(|(records, deleted, cursor)| {
            Changeset::new(records, deleted, Cursor::from_bytes(cursor), false)
        })
}
