//! Opaque change cursors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in the change history of one zone.
///
/// Cursors are issued by the remote store and handed back to it unchanged.
/// The engine never builds or interprets one; it only stores the bytes.
/// Absence of a cursor means "fetch the full history".
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(Vec<u8>);

impl Cursor {
    /// Wraps remote-issued cursor bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the cursor, returning the raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Renders the bytes as lowercase hex, for logs and status output.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cursor({})", self.to_hex())
    }
}

impl From<&str> for Cursor {
    fn from(token: &str) -> Self {
        Self(token.as_bytes().to_vec())
    }
}
