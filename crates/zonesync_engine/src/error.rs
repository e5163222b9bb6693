//! Error types for the sync engine.

use thiserror::Error;
use zonesync_protocol::CodecError;
use zonesync_storage::StorageError;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A remote call failed (network, auth, quota).
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Delete requested for a name with no matching cache entry.
    #[error("no record named {name:?} in the local cache")]
    RecordNotFound {
        /// Name that was looked up.
        name: String,
    },

    /// Durable storage failed; the current operation cannot complete.
    #[error("persistence error: {0}")]
    Persistence(#[from] StorageError),

    /// A persisted blob could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The remote store rejected the request.
    #[error("remote rejected request: {0}")]
    Remote(String),
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if re-invoking the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            _ => false,
        }
    }
}
