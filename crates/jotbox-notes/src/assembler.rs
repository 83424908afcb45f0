//! Read views over both stores.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use jotbox_core::{
    validate_filename, validate_owner, BlobStore, CoordinatorConfig, Error, Note, NoteId,
    NoteMetadataStore, NoteRecord, Result, StoreKind,
};
use jotbox_db::NoteStores;
use tracing::{debug, trace, warn};

use crate::store_call::timed;

/// Builds [`Note`] views by joining metadata records with blob content.
///
/// Reads only; never writes to either store.
#[derive(Clone)]
pub struct NoteViewAssembler {
    metadata: Arc<dyn NoteMetadataStore>,
    blobs: Arc<dyn BlobStore>,
    config: CoordinatorConfig,
}

impl NoteViewAssembler {
    pub fn new(metadata: Arc<dyn NoteMetadataStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            metadata,
            blobs,
            config: CoordinatorConfig::default(),
        }
    }

    pub fn from_stores(stores: &NoteStores) -> Self {
        Self::new(stores.metadata.clone(), stores.blobs.clone())
    }

    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// All readable notes of an owner, in blob listing order.
    ///
    /// Entries whose listing, metadata lookup, or content read fails are
    /// skipped. Only an invalid owner fails the call.
    pub async fn list_notes_of_owner(&self, owner: &str) -> Result<Vec<Note>> {
        validate_owner(owner)?;
        let start = Instant::now();
        let limit = self.config.store_timeout;

        let mut names = self.blobs.list_objects(owner);
        let mut notes = Vec::new();
        let mut skipped = 0usize;

        loop {
            let entry = match tokio::time::timeout(limit, names.next()).await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        subsystem = "notes",
                        component = "assembler",
                        op = "list",
                        owner,
                        timeout_ms = limit.as_millis() as u64,
                        "Listing stalled, returning partial result"
                    );
                    break;
                }
            };

            let filename = match entry {
                Ok(filename) => filename,
                Err(e) => {
                    skipped += 1;
                    debug!(
                        subsystem = "notes",
                        component = "assembler",
                        op = "list",
                        owner,
                        error = %e,
                        "Skipping unreadable listing entry"
                    );
                    continue;
                }
            };

            trace!(owner, filename = %filename, "Assembling listed note");
            match self.load_by_name(owner, &filename).await {
                Ok(note) => notes.push(note),
                Err(e) => {
                    skipped += 1;
                    if e.is_not_found() {
                        debug!(
                            subsystem = "notes",
                            component = "assembler",
                            op = "list",
                            owner,
                            filename = %filename,
                            "Skipping object without metadata"
                        );
                    } else {
                        warn!(
                            subsystem = "notes",
                            component = "assembler",
                            op = "list",
                            owner,
                            filename = %filename,
                            error = %e,
                            error_kind = e.kind(),
                            "Skipping note that could not be read"
                        );
                    }
                }
            }
        }

        debug!(
            subsystem = "notes",
            component = "assembler",
            op = "list",
            owner,
            result_count = notes.len(),
            skipped_count = skipped,
            duration_ms = start.elapsed().as_millis() as u64,
            "Listed notes"
        );
        Ok(notes)
    }

    /// A single note by id. `NotFound` if the record or its content is missing.
    pub async fn get_note(&self, id: NoteId) -> Result<Note> {
        let record = timed(
            self.config.store_timeout,
            StoreKind::Metadata,
            "get_by_id",
            self.metadata.get_by_id(id),
        )
        .await?;
        self.attach_content(record).await
    }

    /// A single note by owner and filename.
    pub async fn get_note_by_name(&self, owner: &str, filename: &str) -> Result<Note> {
        validate_owner(owner)?;
        validate_filename(filename, self.config.max_filename_len)?;
        self.load_by_name(owner, filename).await
    }

    async fn load_by_name(&self, owner: &str, filename: &str) -> Result<Note> {
        let record = timed(
            self.config.store_timeout,
            StoreKind::Metadata,
            "get_by_owner_and_filename",
            self.metadata.get_by_owner_and_filename(owner, filename),
        )
        .await?;
        self.attach_content(record).await
    }

    async fn attach_content(&self, record: NoteRecord) -> Result<Note> {
        let bytes = timed(
            self.config.store_timeout,
            StoreKind::Blob,
            "get_object",
            self.blobs.get_object(&record.owner, &record.filename),
        )
        .await?;
        let content = String::from_utf8(bytes).map_err(|e| Error::store_operation(StoreKind::Blob, e))?;
        Ok(Note::assemble(record, content))
    }
}
