//! Store traits.
//!
//! The coordinator only talks to the two stores through these traits, so the
//! PostgreSQL and filesystem backends, the in-memory backends, and the
//! fault-injecting test wrappers are interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use crate::error::Result;
use crate::models::{NoteId, NoteRecord};

// =============================================================================
// METADATA STORE
// =============================================================================

/// Relational store of [`NoteRecord`]s.
///
/// Every call commits on its own; there is no transaction spanning calls.
#[async_trait]
pub trait NoteMetadataStore: Send + Sync {
    /// Insert a new record with a fresh identity and the current time.
    ///
    /// Fails with `DuplicateName` if a live record already has (owner, filename).
    async fn create_record(&self, owner: &str, filename: &str) -> Result<NoteId>;

    /// Look up a record by its (owner, filename) pair.
    async fn get_by_owner_and_filename(&self, owner: &str, filename: &str) -> Result<NoteRecord>;

    /// Look up a record by id.
    async fn get_by_id(&self, id: NoteId) -> Result<NoteRecord>;

    /// Change the filename of a record, leaving `created_at_utc` untouched.
    async fn rename_record(&self, id: NoteId, new_filename: &str) -> Result<()>;

    /// Remove a record.
    async fn delete_record(&self, id: NoteId) -> Result<()>;

    /// Recreate a previously deleted record with its original identity and
    /// timestamp. Only used to compensate a failed delete.
    async fn reinsert_record(
        &self,
        id: NoteId,
        owner: &str,
        filename: &str,
        created_at_utc: DateTime<Utc>,
    ) -> Result<()>;
}

// =============================================================================
// BLOB STORE
// =============================================================================

/// Object store holding immutable note content, one bucket per owner.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Provision the bucket for an owner. Succeeds if it already exists.
    async fn create_bucket(&self, owner: &str) -> Result<()>;

    /// Write an object, replacing any existing object with the same key.
    async fn put_object(&self, owner: &str, filename: &str, content: &[u8]) -> Result<()>;

    /// Read an object. Fails with `NotFound` if absent.
    async fn get_object(&self, owner: &str, filename: &str) -> Result<Vec<u8>>;

    /// Remove an object. Fails with `NotFound` if absent.
    async fn delete_object(&self, owner: &str, filename: &str) -> Result<()>;

    /// Lazily list object names in an owner's bucket.
    ///
    /// The stream is finite and cannot be restarted. Per-entry failures are
    /// yielded as `Err` items so callers can skip them.
    fn list_objects<'a>(&'a self, owner: &'a str) -> BoxStream<'a, Result<String>>;
}
