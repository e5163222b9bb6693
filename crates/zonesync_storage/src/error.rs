//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The persisted state could not be decoded.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// A key holds a value of a different kind than requested.
    #[error("key {key:?} holds a {found}, expected a {expected}")]
    TypeMismatch {
        /// The key that was read.
        key: String,
        /// The kind of value the caller asked for.
        expected: &'static str,
        /// The kind of value actually stored.
        found: &'static str,
    },

    /// Another process already owns the state directory.
    #[error("state directory is locked by another process")]
    Locked,

    /// A write was refused (used by failure-injecting wrappers).
    #[error("write refused for key {0:?}")]
    WriteRefused(String),
}
