//! Error types for jotbox.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::validation::ValidationError;

/// Result type alias using jotbox's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed underlying cause carried by store errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which of the two stores an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Metadata,
    Blob,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Metadata => "metadata",
            StoreKind::Blob => "blob",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State left behind when a compensation step itself failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Residue {
    /// A metadata record exists whose filename has no backing blob.
    OrphanRecord {
        id: Uuid,
        owner: String,
        filename: String,
    },
    /// A blob exists that no metadata record references.
    OrphanBlob { owner: String, filename: String },
    /// A renamed record has no blob under its new filename, while the note's
    /// content sits unreferenced under the old one.
    SplitNote {
        id: Uuid,
        owner: String,
        record_filename: String,
        blob_filename: String,
    },
}

impl fmt::Display for Residue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Residue::OrphanRecord {
                id,
                owner,
                filename,
            } => write!(
                f,
                "record {} ({}/{}) has no backing blob",
                id, owner, filename
            ),
            Residue::OrphanBlob { owner, filename } => {
                write!(f, "blob {}/{} is not referenced by any record", owner, filename)
            }
            Residue::SplitNote {
                id,
                owner,
                record_filename,
                blob_filename,
            } => write!(
                f,
                "record {} ({}/{}) has no backing blob and blob {}/{} is not referenced by any record",
                id, owner, record_filename, owner, blob_filename
            ),
        }
    }
}

/// Core error type for jotbox operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Filename or owner rejected before any store call
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A live record already holds (owner, filename)
    #[error("Duplicate name: a note named {filename:?} already exists for owner {owner:?}")]
    DuplicateName { owner: String, filename: String },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Store unreachable or timed out
    #[error("Connection error ({store} store): {source}")]
    Connection {
        store: StoreKind,
        #[source]
        source: BoxError,
    },

    /// Store reachable but the operation itself failed
    #[error("Store operation error ({store} store): {source}")]
    StoreOperation {
        store: StoreKind,
        #[source]
        source: BoxError,
    },

    /// Create failed and its metadata record was removed again
    #[error("Create failed and was rolled back: {source}")]
    CreateFailed {
        #[source]
        source: Box<Error>,
    },

    /// Delete failed and the metadata record was reinserted
    #[error("Delete failed and was rolled back: {source}")]
    DeleteFailed {
        #[source]
        source: Box<Error>,
    },

    /// Compensation failed; the two stores disagree
    #[error("Inconsistent state: {residue} (cause: {cause}; compensation failed: {compensation_error})")]
    Inconsistent {
        residue: Residue,
        #[source]
        cause: Box<Error>,
        compensation_error: Box<Error>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap an arbitrary cause as a connection failure.
    pub fn connection(store: StoreKind, source: impl Into<BoxError>) -> Self {
        Error::Connection {
            store,
            source: source.into(),
        }
    }

    /// Wrap an arbitrary cause as a failed store operation.
    pub fn store_operation(store: StoreKind, source: impl Into<BoxError>) -> Self {
        Error::StoreOperation {
            store,
            source: source.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// True for the terminal states where the stores no longer agree.
    pub fn is_inconsistent(&self) -> bool {
        matches!(self, Error::Inconsistent { .. })
    }

    /// Short machine-readable name, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::DuplicateName { .. } => "duplicate_name",
            Error::NotFound(_) => "not_found",
            Error::Connection { .. } => "connection",
            Error::StoreOperation { .. } => "store_operation",
            Error::CreateFailed { .. } => "create_failed",
            Error::DeleteFailed { .. } => "delete_failed",
            Error::Inconsistent { .. } => "inconsistent",
            Error::Config(_) => "config",
            Error::Internal(_) => "internal",
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Error::NotFound("Note record not found".into()),
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => Error::connection(StoreKind::Metadata, e),
            other => Error::store_operation(StoreKind::Metadata, other),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::NotFound => Error::NotFound(format!("Object not found: {}", e)),
            ErrorKind::TimedOut
            | ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected => Error::connection(StoreKind::Blob, e),
            _ => Error::store_operation(StoreKind::Blob, e),
        }
    }
}
