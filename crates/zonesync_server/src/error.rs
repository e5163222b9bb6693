//! Error types for the reference remote store.

use thiserror::Error;
use zonesync_protocol::{CodecError, RecordId, ZoneId};

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the reference remote store.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The zone has not been created.
    #[error("unknown zone: {0}")]
    ZoneNotFound(ZoneId),

    /// No record with this identity exists in the zone.
    #[error("unknown record: {0}")]
    RecordNotFound(RecordId),

    /// The cursor is malformed or ahead of the zone's change log.
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    /// The server is simulating an outage.
    #[error("service unavailable")]
    Unavailable,

    /// A snapshot could not be encoded or decoded.
    #[error("snapshot codec error: {0}")]
    Codec(#[from] CodecError),
}

impl ServerError {
    /// Returns true if retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServerError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(ServerError::Unavailable.is_retryable());
        assert!(!ServerError::ZoneNotFound(ZoneId::new("z")).is_retryable());
        assert!(!ServerError::InvalidCursor("short".into()).is_retryable());
    }

    #[test]
    fn error_display() {
        let err = ServerError::RecordNotFound(RecordId::from("rec-9"));
        assert!(err.to_string().contains("rec-9"));
    }
}
