//! Per-zone change log.

use crate::error::{ServerError, ServerResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use zonesync_protocol::{Changeset, Cursor, Record, RecordFetch, RecordFields, RecordId};

/// One committed change to a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// The record was created or modified.
    Upsert,
    /// The record was deleted.
    Delete,
}

/// An entry in the change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Position of this entry, starting at 1.
    pub sequence: u64,
    /// The affected record.
    pub record_id: RecordId,
    /// What happened to it.
    pub kind: ChangeKind,
}

/// A zone's records and the ordered log of changes to them.
///
/// The log maintains:
/// - All changes in commit order, with gap-free sequences from 1
/// - The current value of every live record
///
/// A cursor is the sequence of the last entry a client has seen, encoded as
/// 8 little-endian bytes. The empty cursor means "from the start".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZoneLog {
    entries: Vec<LogEntry>,
    records: BTreeMap<RecordId, RecordFields>,
}

impl ZoneLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sequence of the newest entry, 0 if empty.
    pub fn head(&self) -> u64 {
        self.entries.len() as u64
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was ever written.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the current value of a record.
    pub fn record(&self, id: &RecordId) -> Option<&RecordFields> {
        self.records.get(id)
    }

    /// Returns all live records in ID order.
    pub fn records(&self) -> Vec<Record> {
        self.records
            .iter()
            .map(|(id, fields)| Record::new(id.clone(), fields.clone()))
            .collect()
    }

    /// Writes a record and logs the upsert.
    pub fn put(&mut self, id: RecordId, fields: RecordFields) -> u64 {
        self.records.insert(id.clone(), fields);
        self.append(id, ChangeKind::Upsert)
    }

    /// Deletes a live record and logs the deletion.
    pub fn delete(&mut self, id: &RecordId) -> ServerResult<u64> {
        if self.records.remove(id).is_none() {
            return Err(ServerError::RecordNotFound(id.clone()));
        }
        Ok(self.append(id.clone(), ChangeKind::Delete))
    }

    /// Returns up to `page_size` log entries after `since` as a changeset.
    ///
    /// Changed records carry their current value. A record changed in this
    /// page but deleted later in the log is left to that later deletion
    /// entry. IDs appear at most once per page, as either changed or
    /// deleted, according to their last entry in the page. IDs in
    /// `failing` are reported as per-record fetch failures.
    pub fn changes_since(
        &self,
        since: Option<&Cursor>,
        page_size: usize,
        failing: &HashSet<RecordId>,
    ) -> ServerResult<Changeset> {
        let start = match since {
            Some(cursor) => self.decode_cursor(cursor)?,
            None => 0,
        };

        let end = self.head().min(start.saturating_add(page_size as u64));
        let slice = &self.entries[start as usize..end as usize];

        let mut last_kind: BTreeMap<&RecordId, &ChangeKind> = BTreeMap::new();
        for entry in slice {
            last_kind.insert(&entry.record_id, &entry.kind);
        }

        let mut changeset = Changeset::empty(encode_cursor(end));
        for (id, kind) in last_kind {
            match kind {
                ChangeKind::Delete => changeset.deleted.push(id.clone()),
                ChangeKind::Upsert if failing.contains(id) => {
                    changeset.changed.push(RecordFetch::Failed {
                        id: id.clone(),
                        reason: "record fetch failed".to_string(),
                    });
                }
                ChangeKind::Upsert => {
                    if let Some(fields) = self.records.get(id) {
                        changeset
                            .changed
                            .push(RecordFetch::Fetched(Record::new(id.clone(), fields.clone())));
                    }
                }
            }
        }
        changeset.more_pending = end < self.head();

        Ok(changeset)
    }

    fn append(&mut self, record_id: RecordId, kind: ChangeKind) -> u64 {
        let sequence = self.head() + 1;
        self.entries.push(LogEntry {
            sequence,
            record_id,
            kind,
        });
        sequence
    }

    fn decode_cursor(&self, cursor: &Cursor) -> ServerResult<u64> {
        let bytes = cursor.as_bytes();
        if bytes.is_empty() {
            return Ok(0);
        }
        let raw: [u8; 8] = bytes
            .try_into()
            .map_err(|_| ServerError::InvalidCursor(format!("expected 8 bytes, got {}", bytes.len())))?;
        let position = u64::from_le_bytes(raw);
        if position > self.head() {
            return Err(ServerError::InvalidCursor(format!(
                "position {} is ahead of log head {}",
                position,
                self.head()
            )));
        }
        Ok(position)
    }
}

fn encode_cursor(position: u64) -> Cursor {
    Cursor::from_bytes(position.to_le_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> RecordId {
        RecordId::from(s)
    }

    fn named(name: &str) -> RecordFields {
        RecordFields::with_name(name)
    }

    fn changed_ids(changeset: &Changeset) -> Vec<&str> {
        changeset.changed.iter().map(|fetch| fetch.id().as_str()).collect()
    }

    #[test]
    fn full_history_from_start() {
        let mut log = ZoneLog::new();
        log.put(id("a"), named("Alice"));
        log.put(id("b"), named("Bob"));

        let page = log.changes_since(None, 10, &HashSet::new()).unwrap();
        assert_eq!(changed_ids(&page), vec!["a", "b"]);
        assert!(!page.more_pending);
        assert_eq!(page.cursor, encode_cursor(2));
    }

    #[test]
    fn pages_until_drained() {
        let mut log = ZoneLog::new();
        for n in 0..5 {
            log.put(id(&format!("r{n}")), named("x"));
        }

        let first = log.changes_since(None, 2, &HashSet::new()).unwrap();
        assert_eq!(first.changed.len(), 2);
        assert!(first.more_pending);

        let second = log.changes_since(Some(&first.cursor), 2, &HashSet::new()).unwrap();
        assert!(second.more_pending);

        let third = log.changes_since(Some(&second.cursor), 2, &HashSet::new()).unwrap();
        assert_eq!(third.changed.len(), 1);
        assert!(!third.more_pending);

        let idle = log.changes_since(Some(&third.cursor), 2, &HashSet::new()).unwrap();
        assert!(idle.is_empty());
        assert_eq!(idle.cursor, third.cursor);
    }

    #[test]
    fn page_reports_current_value_once() {
        let mut log = ZoneLog::new();
        log.put(id("a"), named("Alice"));
        log.put(id("a"), named("Alicia"));

        let page = log.changes_since(None, 10, &HashSet::new()).unwrap();
        assert_eq!(page.changed.len(), 1);
        match &page.changed[0] {
            RecordFetch::Fetched(record) => assert_eq!(record.name(), "Alicia"),
            other => panic!("unexpected fetch {other:?}"),
        }
    }

    #[test]
    fn later_deletion_wins() {
        let mut log = ZoneLog::new();
        log.put(id("a"), named("Alice"));
        log.delete(&id("a")).unwrap();

        let whole = log.changes_since(None, 10, &HashSet::new()).unwrap();
        assert!(whole.changed.is_empty());
        assert_eq!(whole.deleted, vec![id("a")]);

        let first = log.changes_since(None, 1, &HashSet::new()).unwrap();
        assert!(first.changed.is_empty());
        assert!(first.more_pending);
    }

    #[test]
    fn failing_records_are_reported() {
        let mut log = ZoneLog::new();
        log.put(id("a"), named("Alice"));
        let failing: HashSet<RecordId> = [id("a")].into_iter().collect();

        let page = log.changes_since(None, 10, &failing).unwrap();
        assert!(matches!(page.changed[0], RecordFetch::Failed { .. }));
    }

    #[test]
    fn rejects_bad_cursors() {
        let mut log = ZoneLog::new();
        log.put(id("a"), named("Alice"));

        let short = Cursor::from_bytes(vec![1, 2, 3]);
        assert!(matches!(
            log.changes_since(Some(&short), 10, &HashSet::new()),
            Err(ServerError::InvalidCursor(_))
        ));

        let ahead = encode_cursor(7);
        assert!(matches!(
            log.changes_since(Some(&ahead), 10, &HashSet::new()),
            Err(ServerError::InvalidCursor(_))
        ));
    }

    #[test]
    fn deleting_unknown_record_fails() {
        let mut log = ZoneLog::new();
        assert!(matches!(
            log.delete(&id("ghost")),
            Err(ServerError::RecordNotFound(_))
        ));
        assert!(log.is_empty());
    }
}
