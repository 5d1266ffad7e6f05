//! Error types for the storage layer.
//!
//! Every failure a backend can produce maps onto one of these variants so
//! that callers can tell a rejected operation (validation, deletion guard)
//! apart from a broken deployment (configuration, malformed document) or an
//! engine fault.

use std::path::PathBuf;

use thiserror::Error;

/// Storage-layer errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Missing or invalid deployment configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A persisted JSON document failed to parse. Surfaced rather than
    /// recovered, since blind recovery risks data loss.
    #[error("malformed document {path}: {source}")]
    MalformedDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A record violated a model invariant. The operation is rejected.
    #[error("validation error: {0}")]
    Validation(String),

    /// Deletion guard: the role still has recorded votes.
    #[error("role {0} has recorded votes and cannot be deleted")]
    RoleHasVotes(String),

    /// The operation requires a record that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Post-migration verification found a count mismatch.
    #[error("migration verification failed: {0}")]
    MigrationVerification(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
