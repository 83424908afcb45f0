//! Note coordinator.
//!
//! Keeps the metadata store and the blob store in agreement for create,
//! update, and delete. Neither store offers a transaction spanning both, so
//! each operation is a fixed sequence of single-store writes with one
//! designated compensation step:
//!
//! | Operation | Writes, in order                        | Compensation on second write failure |
//! |-----------|-----------------------------------------|--------------------------------------|
//! | create    | record, blob                            | delete the record                    |
//! | update    | rename record, delete old blob, put new | revert rename / restore old blob     |
//! | delete    | record, blob                            | reinsert the record                  |
//!
//! A failed compensation is reported as `Error::Inconsistent` naming the
//! residue, or as `UpdateOutcome::Lost` when the note's content is gone.
//!
//! Every store call is bounded by [`CoordinatorConfig::store_timeout`]. Each
//! operation runs on its own Tokio task, so dropping the returned future
//! detaches the caller but never interrupts a saga midway.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use jotbox_core::{
    validate_filename, validate_owner, BlobStore, CoordinatorConfig, Error, NoteId,
    NoteMetadataStore, NoteRecord, Residue, Result, StoreKind, UpdateOutcome,
};
use jotbox_db::NoteStores;
use tracing::{debug, error, info, warn};

use crate::locks::{NoteLockGuard, NoteLocks};
use crate::store_call::{detached, timed};

/// Coordinates note writes across the metadata and blob stores.
///
/// Cheap to clone; clones share the store handles and the lock registry.
#[derive(Clone)]
pub struct Coordinator {
    metadata: Arc<dyn NoteMetadataStore>,
    blobs: Arc<dyn BlobStore>,
    config: CoordinatorConfig,
    locks: Option<Arc<NoteLocks>>,
}

impl Coordinator {
    pub fn new(metadata: Arc<dyn NoteMetadataStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            metadata,
            blobs,
            config: CoordinatorConfig::default(),
            locks: None,
        }
    }

    pub fn from_stores(stores: &NoteStores) -> Self {
        Self::new(stores.metadata.clone(), stores.blobs.clone())
    }

    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Serialize operations on the same note id or (owner, filename) within
    /// this process.
    pub fn with_locks(mut self, locks: NoteLocks) -> Self {
        self.locks = Some(Arc::new(locks));
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Provision the blob bucket for a newly registered owner.
    pub async fn provision_owner(&self, owner: &str) -> Result<()> {
        validate_owner(owner)?;
        self.blob_call("create_bucket", self.blobs.create_bucket(owner))
            .await?;
        info!(
            subsystem = "notes",
            component = "coordinator",
            op = "provision_owner",
            owner,
            "Owner provisioned"
        );
        Ok(())
    }

    /// Create a note and return its id.
    ///
    /// Fails `DuplicateName` if the owner already has a note with this
    /// filename, `CreateFailed` if the content could not be stored and the
    /// record was removed again, and `Inconsistent` if that removal failed too.
    pub async fn create(&self, owner: &str, filename: &str, content: &str) -> Result<NoteId> {
        validate_owner(owner)?;
        validate_filename(filename, self.config.max_filename_len)?;

        let this = self.clone();
        let (owner, filename, content) = (owner.to_string(), filename.to_string(), content.to_string());
        detached("create", async move { this.run_create(owner, filename, content).await }).await
    }

    /// Change a note's filename and content.
    ///
    /// Store failures after the first write are reported through the
    /// returned [`UpdateOutcome`]; `Err` is reserved for failures before any
    /// write and for `Inconsistent`.
    pub async fn update(&self, id: NoteId, new_filename: &str, new_content: &str) -> Result<UpdateOutcome> {
        validate_filename(new_filename, self.config.max_filename_len)?;

        let this = self.clone();
        let (new_filename, new_content) = (new_filename.to_string(), new_content.to_string());
        detached("update", async move { this.run_update(id, new_filename, new_content).await }).await
    }

    /// Delete a note.
    ///
    /// Fails `DeleteFailed` if the content could not be removed and the
    /// record was reinserted, and `Inconsistent` if the reinsert failed too.
    pub async fn delete(&self, id: NoteId) -> Result<()> {
        let this = self.clone();
        detached("delete", async move { this.run_delete(id).await }).await
    }

    // =========================================================================
    // SAGAS
    // =========================================================================

    async fn run_create(&self, owner: String, filename: String, content: String) -> Result<NoteId> {
        let start = Instant::now();
        let _name_guard = self.lock_name(&owner, &filename).await?;

        match self
            .metadata_call(
                "get_by_owner_and_filename",
                self.metadata.get_by_owner_and_filename(&owner, &filename),
            )
            .await
        {
            Ok(_) => {
                debug!(
                    subsystem = "notes",
                    component = "coordinator",
                    op = "create",
                    owner = %owner,
                    filename = %filename,
                    "Name already taken"
                );
                return Err(Error::DuplicateName { owner, filename });
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let id = self
            .metadata_call("create_record", self.metadata.create_record(&owner, &filename))
            .await?;

        if let Err(cause) = self
            .blob_call("put_object", self.blobs.put_object(&owner, &filename, content.as_bytes()))
            .await
        {
            warn!(
                subsystem = "notes",
                component = "coordinator",
                op = "create",
                note_id = %id,
                step = "put_object",
                error = %cause,
                "Storing content failed, removing record"
            );
            return Err(self.compensate_create(id, owner, filename, cause).await);
        }

        info!(
            subsystem = "notes",
            component = "coordinator",
            op = "create",
            note_id = %id,
            owner = %owner,
            duration_ms = start.elapsed().as_millis() as u64,
            "Note created"
        );
        Ok(id)
    }

    async fn compensate_create(&self, id: NoteId, owner: String, filename: String, cause: Error) -> Error {
        match self
            .metadata_call("delete_record", self.metadata.delete_record(id))
            .await
        {
            // A record that is already gone leaves nothing to undo
            Ok(()) | Err(Error::NotFound(_)) => Error::CreateFailed {
                source: Box::new(cause),
            },
            Err(compensation_error) => {
                let residue = Residue::OrphanRecord { id, owner, filename };
                error!(
                    subsystem = "notes",
                    component = "coordinator",
                    op = "create",
                    note_id = %id,
                    residue = %residue,
                    error = %compensation_error,
                    "Create compensation failed, stores are inconsistent"
                );
                Error::Inconsistent {
                    residue,
                    cause: Box::new(cause),
                    compensation_error: Box::new(compensation_error),
                }
            }
        }
    }

    async fn run_update(&self, id: NoteId, new_filename: String, new_content: String) -> Result<UpdateOutcome> {
        let start = Instant::now();
        let _note_guard = self.lock_note(id).await?;

        let record = self
            .metadata_call("get_by_id", self.metadata.get_by_id(id))
            .await?;
        let owner = record.owner;
        let old_filename = record.filename;
        let renaming = new_filename != old_filename;

        // Compensation writes back to the old name, so a rename holds both
        let (first, second) = if old_filename <= new_filename {
            (&old_filename, &new_filename)
        } else {
            (&new_filename, &old_filename)
        };
        let _first_name_guard = self.lock_name(&owner, first).await?;
        let _second_name_guard = if renaming {
            self.lock_name(&owner, second).await?
        } else {
            None
        };

        if renaming {
            match self
                .metadata_call(
                    "get_by_owner_and_filename",
                    self.metadata.get_by_owner_and_filename(&owner, &new_filename),
                )
                .await
            {
                Ok(other) if other.id != id => {
                    return Err(Error::DuplicateName {
                        owner,
                        filename: new_filename,
                    })
                }
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }

        let old_content = self
            .blob_call("get_object", self.blobs.get_object(&owner, &old_filename))
            .await?;

        if !renaming && old_content == new_content.as_bytes() {
            debug!(
                subsystem = "notes",
                component = "coordinator",
                op = "update",
                note_id = %id,
                outcome = "unchanged",
                "Nothing to update"
            );
            return Ok(UpdateOutcome::Unchanged);
        }

        if renaming {
            self.metadata_call("rename_record", self.metadata.rename_record(id, &new_filename))
                .await?;
        }

        if let Err(cause) = self
            .blob_call("delete_object", self.blobs.delete_object(&owner, &old_filename))
            .await
        {
            if !renaming {
                return Err(cause);
            }
            warn!(
                subsystem = "notes",
                component = "coordinator",
                op = "update",
                note_id = %id,
                step = "delete_object",
                error = %cause,
                "Removing old content failed, reverting rename"
            );
            return self
                .revert_rename(id, &owner, &old_filename, &new_filename, cause)
                .await;
        }

        if let Err(cause) = self
            .blob_call(
                "put_object",
                self.blobs.put_object(&owner, &new_filename, new_content.as_bytes()),
            )
            .await
        {
            warn!(
                subsystem = "notes",
                component = "coordinator",
                op = "update",
                note_id = %id,
                step = "put_object",
                error = %cause,
                "Storing new content failed, restoring old content"
            );

            if let Err(restore_error) = self
                .blob_call("put_object", self.blobs.put_object(&owner, &old_filename, &old_content))
                .await
            {
                error!(
                    subsystem = "notes",
                    component = "coordinator",
                    op = "update",
                    note_id = %id,
                    owner = %owner,
                    filename = %old_filename,
                    outcome = "lost",
                    cause = %cause,
                    error = %restore_error,
                    "Note content lost, old content could not be restored"
                );
                return Ok(UpdateOutcome::Lost { cause, restore_error });
            }

            if renaming {
                return self
                    .revert_rename(id, &owner, &old_filename, &new_filename, cause)
                    .await;
            }
            warn!(
                subsystem = "notes",
                component = "coordinator",
                op = "update",
                note_id = %id,
                outcome = "rolled_back",
                "Update rolled back"
            );
            return Ok(UpdateOutcome::RolledBack { cause });
        }

        info!(
            subsystem = "notes",
            component = "coordinator",
            op = "update",
            note_id = %id,
            owner = %owner,
            outcome = "updated",
            duration_ms = start.elapsed().as_millis() as u64,
            "Note updated"
        );
        Ok(UpdateOutcome::Updated)
    }

    /// Point the record back at `old_filename` after a failed update step.
    async fn revert_rename(
        &self,
        id: NoteId,
        owner: &str,
        old_filename: &str,
        new_filename: &str,
        cause: Error,
    ) -> Result<UpdateOutcome> {
        match self
            .metadata_call("rename_record", self.metadata.rename_record(id, old_filename))
            .await
        {
            Ok(()) => {
                warn!(
                    subsystem = "notes",
                    component = "coordinator",
                    op = "update",
                    note_id = %id,
                    outcome = "rolled_back",
                    "Update rolled back"
                );
                Ok(UpdateOutcome::RolledBack { cause })
            }
            Err(compensation_error) => {
                let residue = Residue::SplitNote {
                    id,
                    owner: owner.to_string(),
                    record_filename: new_filename.to_string(),
                    blob_filename: old_filename.to_string(),
                };
                error!(
                    subsystem = "notes",
                    component = "coordinator",
                    op = "update",
                    note_id = %id,
                    residue = %residue,
                    error = %compensation_error,
                    "Reverting rename failed, stores are inconsistent"
                );
                Err(Error::Inconsistent {
                    residue,
                    cause: Box::new(cause),
                    compensation_error: Box::new(compensation_error),
                })
            }
        }
    }

    async fn run_delete(&self, id: NoteId) -> Result<()> {
        let start = Instant::now();
        let _note_guard = self.lock_note(id).await?;

        let record = self
            .metadata_call("get_by_id", self.metadata.get_by_id(id))
            .await?;
        let _name_guard = self.lock_name(&record.owner, &record.filename).await?;
        self.metadata_call("delete_record", self.metadata.delete_record(id))
            .await?;

        match self
            .blob_call(
                "delete_object",
                self.blobs.delete_object(&record.owner, &record.filename),
            )
            .await
        {
            Ok(()) => {}
            // Content already absent (e.g. after a lost update); the note is gone either way
            Err(Error::NotFound(_)) => {
                warn!(
                    subsystem = "notes",
                    component = "coordinator",
                    op = "delete",
                    note_id = %id,
                    "Note had no content to remove"
                );
            }
            Err(cause) => {
                warn!(
                    subsystem = "notes",
                    component = "coordinator",
                    op = "delete",
                    note_id = %id,
                    step = "delete_object",
                    error = %cause,
                    "Removing content failed, reinserting record"
                );
                return Err(self.compensate_delete(record, cause).await);
            }
        }

        info!(
            subsystem = "notes",
            component = "coordinator",
            op = "delete",
            note_id = %id,
            owner = %record.owner,
            duration_ms = start.elapsed().as_millis() as u64,
            "Note deleted"
        );
        Ok(())
    }

    async fn compensate_delete(&self, record: NoteRecord, cause: Error) -> Error {
        match self
            .metadata_call(
                "reinsert_record",
                self.metadata.reinsert_record(
                    record.id,
                    &record.owner,
                    &record.filename,
                    record.created_at_utc,
                ),
            )
            .await
        {
            Ok(()) => Error::DeleteFailed {
                source: Box::new(cause),
            },
            Err(compensation_error) => {
                let residue = Residue::OrphanBlob {
                    owner: record.owner,
                    filename: record.filename,
                };
                error!(
                    subsystem = "notes",
                    component = "coordinator",
                    op = "delete",
                    note_id = %record.id,
                    residue = %residue,
                    error = %compensation_error,
                    "Delete compensation failed, stores are inconsistent"
                );
                Error::Inconsistent {
                    residue,
                    cause: Box::new(cause),
                    compensation_error: Box::new(compensation_error),
                }
            }
        }
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    async fn metadata_call<T>(
        &self,
        step: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        timed(self.config.store_timeout, StoreKind::Metadata, step, call).await
    }

    async fn blob_call<T>(
        &self,
        step: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        timed(self.config.store_timeout, StoreKind::Blob, step, call).await
    }

    async fn lock_note(&self, id: NoteId) -> Result<Option<NoteLockGuard>> {
        match &self.locks {
            Some(locks) => Ok(Some(locks.lock_note(id).await?)),
            None => Ok(None),
        }
    }

    async fn lock_name(&self, owner: &str, filename: &str) -> Result<Option<NoteLockGuard>> {
        match &self.locks {
            Some(locks) => Ok(Some(locks.lock_name(owner, filename).await?)),
            None => Ok(None),
        }
    }
}
