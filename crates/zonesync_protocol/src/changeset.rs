//! Delta pages returned by a change fetch.

use crate::cursor::Cursor;
use crate::record::{Record, RecordId};

/// The outcome of fetching one changed record within a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFetch {
    /// The record's current value.
    Fetched(Record),
    /// The record changed but its value could not be fetched.
    ///
    /// The page is still usable; the record is skipped.
    Failed {
        /// Record that could not be fetched.
        id: RecordId,
        /// Reason reported by the remote store.
        reason: String,
    },
}

impl RecordFetch {
    /// Returns the ID of the record this outcome is about.
    pub fn id(&self) -> &RecordId {
        match self {
            RecordFetch::Fetched(record) => &record.id,
            RecordFetch::Failed { id, .. } => id,
        }
    }
}

/// One page of changes since a cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changeset {
    /// Records created or updated since the base cursor.
    pub changed: Vec<RecordFetch>,
    /// Records deleted since the base cursor.
    pub deleted: Vec<RecordId>,
    /// Cursor to resume from after this page.
    pub cursor: Cursor,
    /// Whether more pages are waiting after this one.
    pub more_pending: bool,
}

impl Changeset {
    /// Creates an empty final page ending at `cursor`.
    pub fn empty(cursor: Cursor) -> Self {
        Self {
            changed: Vec::new(),
            deleted: Vec::new(),
            cursor,
            more_pending: false,
        }
    }

    /// Creates a page from fetched records and deletions.
    pub fn new(
        records: Vec<Record>,
        deleted: Vec<RecordId>,
        cursor: Cursor,
        more_pending: bool,
    ) -> Self {
        Self {
            changed: records.into_iter().map(RecordFetch::Fetched).collect(),
            deleted,
            cursor,
            more_pending,
        }
    }

    /// Adds a per-record fetch failure to the page.
    pub fn with_failed_record(mut self, id: impl Into<RecordId>, reason: impl Into<String>) -> Self {
        self.changed.push(RecordFetch::Failed {
            id: id.into(),
            reason: reason.into(),
        });
        self
    }

    /// Returns true if the page carries no changes at all.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.deleted.is_empty()
    }
}
