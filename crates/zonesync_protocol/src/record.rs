//! Synchronized records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Field holding the display name of a record.
pub const NAME_FIELD: &str = "name";

/// Identity of a record, assigned by the remote store on first save.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Creates a record ID from a remote-issued string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The attribute map of a record.
///
/// This domain only uses [`NAME_FIELD`], but the map is kept open so other
/// fields round-trip untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordFields(BTreeMap<String, String>);

impl RecordFields {
    /// Creates an empty field map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a field map holding only a display name.
    pub fn with_name(name: impl Into<String>) -> Self {
        let mut fields = Self::new();
        fields.insert(NAME_FIELD, name);
        fields
    }

    /// Sets a field, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns a field value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns the display name, if set.
    pub fn name(&self) -> Option<&str> {
        self.get(NAME_FIELD)
    }

    /// Iterates over all fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A record acknowledged by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Remote-assigned identity.
    pub id: RecordId,
    /// Current field values.
    pub fields: RecordFields,
}

impl Record {
    /// Creates a record.
    pub fn new(id: impl Into<RecordId>, fields: RecordFields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Returns the display name, or an empty string for unnamed records.
    pub fn name(&self) -> &str {
        self.fields.name().unwrap_or_default()
    }
}
