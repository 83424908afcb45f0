//! In-memory metadata and blob stores.
//!
//! Same contracts as the PostgreSQL and filesystem stores, held in process
//! memory. Suitable for single-process deployments without persistence and
//! as the backing store for tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use jotbox_core::{BlobStore, Error, NoteId, NoteMetadataStore, NoteRecord, Result};
use uuid::Uuid;

fn poisoned<T>(_: T) -> Error {
    Error::Internal("in-memory store lock poisoned".into())
}

// =============================================================================
// METADATA
// =============================================================================

/// In-memory implementation of [`NoteMetadataStore`].
#[derive(Default)]
pub struct InMemoryNoteMetadataStore {
    records: RwLock<HashMap<NoteId, NoteRecord>>,
}

impl InMemoryNoteMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all live records, ordered by creation time.
    pub fn records(&self) -> Vec<NoteRecord> {
        let mut all: Vec<NoteRecord> = self
            .records
            .read()
            .map(|r| r.values().cloned().collect())
            .unwrap_or_default();
        all.sort_by_key(|r| (r.created_at_utc, r.id));
        all
    }
}

fn name_taken(records: &HashMap<NoteId, NoteRecord>, owner: &str, filename: &str) -> bool {
    records
        .values()
        .any(|r| r.owner == owner && r.filename == filename)
}

#[async_trait]
impl NoteMetadataStore for InMemoryNoteMetadataStore {
    async fn create_record(&self, owner: &str, filename: &str) -> Result<NoteId> {
        let mut records = self.records.write().map_err(poisoned)?;
        if name_taken(&records, owner, filename) {
            return Err(Error::DuplicateName {
                owner: owner.to_string(),
                filename: filename.to_string(),
            });
        }
        let id = Uuid::now_v7();
        records.insert(
            id,
            NoteRecord {
                id,
                owner: owner.to_string(),
                filename: filename.to_string(),
                created_at_utc: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn get_by_owner_and_filename(&self, owner: &str, filename: &str) -> Result<NoteRecord> {
        let records = self.records.read().map_err(poisoned)?;
        records
            .values()
            .find(|r| r.owner == owner && r.filename == filename)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Note {:?} not found for owner {:?}", filename, owner)))
    }

    async fn get_by_id(&self, id: NoteId) -> Result<NoteRecord> {
        let records = self.records.read().map_err(poisoned)?;
        records
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Note {} not found", id)))
    }

    async fn rename_record(&self, id: NoteId, new_filename: &str) -> Result<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        let owner = match records.get(&id) {
            Some(record) => record.owner.clone(),
            None => return Err(Error::NotFound(format!("Note {} not found", id))),
        };
        let clash = records
            .values()
            .any(|r| r.id != id && r.owner == owner && r.filename == new_filename);
        if clash {
            return Err(Error::DuplicateName {
                owner,
                filename: new_filename.to_string(),
            });
        }
        if let Some(record) = records.get_mut(&id) {
            record.filename = new_filename.to_string();
        }
        Ok(())
    }

    async fn delete_record(&self, id: NoteId) -> Result<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        records
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("Note {} not found", id)))
    }

    async fn reinsert_record(
        &self,
        id: NoteId,
        owner: &str,
        filename: &str,
        created_at_utc: DateTime<Utc>,
    ) -> Result<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        if records.contains_key(&id) || name_taken(&records, owner, filename) {
            return Err(Error::DuplicateName {
                owner: owner.to_string(),
                filename: filename.to_string(),
            });
        }
        records.insert(
            id,
            NoteRecord {
                id,
                owner: owner.to_string(),
                filename: filename.to_string(),
                created_at_utc,
            },
        );
        Ok(())
    }
}

// =============================================================================
// BLOBS
// =============================================================================

#[derive(Default)]
struct Buckets {
    owners: BTreeSet<String>,
    objects: BTreeMap<(String, String), Vec<u8>>,
}

/// In-memory implementation of [`BlobStore`]. Lists in filename order.
#[derive(Default)]
pub struct InMemoryBlobStore {
    buckets: RwLock<Buckets>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects across all buckets.
    pub fn object_count(&self) -> usize {
        self.buckets.read().map(|b| b.objects.len()).unwrap_or(0)
    }

    /// Whether an object exists, for assertions in tests.
    pub fn contains(&self, owner: &str, filename: &str) -> bool {
        self.buckets
            .read()
            .map(|b| {
                b.objects
                    .contains_key(&(owner.to_string(), filename.to_string()))
            })
            .unwrap_or(false)
    }
}

fn object_not_found(owner: &str, filename: &str) -> Error {
    Error::NotFound(format!("Object {}/{} not found", owner, filename))
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn create_bucket(&self, owner: &str) -> Result<()> {
        let mut buckets = self.buckets.write().map_err(poisoned)?;
        buckets.owners.insert(owner.to_string());
        Ok(())
    }

    async fn put_object(&self, owner: &str, filename: &str, content: &[u8]) -> Result<()> {
        let mut buckets = self.buckets.write().map_err(poisoned)?;
        if !buckets.owners.contains(owner) {
            return Err(Error::NotFound(format!("Bucket {:?} does not exist", owner)));
        }
        buckets
            .objects
            .insert((owner.to_string(), filename.to_string()), content.to_vec());
        Ok(())
    }

    async fn get_object(&self, owner: &str, filename: &str) -> Result<Vec<u8>> {
        let buckets = self.buckets.read().map_err(poisoned)?;
        buckets
            .objects
            .get(&(owner.to_string(), filename.to_string()))
            .cloned()
            .ok_or_else(|| object_not_found(owner, filename))
    }

    async fn delete_object(&self, owner: &str, filename: &str) -> Result<()> {
        let mut buckets = self.buckets.write().map_err(poisoned)?;
        buckets
            .objects
            .remove(&(owner.to_string(), filename.to_string()))
            .map(|_| ())
            .ok_or_else(|| object_not_found(owner, filename))
    }

    fn list_objects<'a>(&'a self, owner: &'a str) -> BoxStream<'a, Result<String>> {
        let snapshot: Result<Vec<String>> = self
            .buckets
            .read()
            .map_err(poisoned)
            .and_then(|buckets| {
                if !buckets.owners.contains(owner) {
                    return Err(Error::NotFound(format!("Bucket {:?} does not exist", owner)));
                }
                Ok(buckets
                    .objects
                    .keys()
                    .filter(|(o, _)| o == owner)
                    .map(|(_, f)| f.clone())
                    .collect())
            });

        match snapshot {
            Ok(names) => stream::iter(names.into_iter().map(Ok)).boxed(),
            Err(e) => stream::once(async move { Err(e) }).boxed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metadata_create_and_lookup() {
        let store = InMemoryNoteMetadataStore::new();
        let id = store.create_record("alice", "todo").await.unwrap();

        let by_id = store.get_by_id(id).await.unwrap();
        let by_name = store.get_by_owner_and_filename("alice", "todo").await.unwrap();
        assert_eq!(by_id, by_name);
        assert_eq!(by_id.filename, "todo");
    }

    #[tokio::test]
    async fn test_metadata_duplicate_name_rejected() {
        let store = InMemoryNoteMetadataStore::new();
        store.create_record("alice", "todo").await.unwrap();
        let err = store.create_record("alice", "todo").await.unwrap_err();
        assert!(matches!(err, Error::DuplicateName { .. }));

        // Same filename under another owner is fine
        store.create_record("bob", "todo").await.unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_metadata_rename_keeps_timestamp() {
        let store = InMemoryNoteMetadataStore::new();
        let id = store.create_record("alice", "todo").await.unwrap();
        let before = store.get_by_id(id).await.unwrap();

        store.rename_record(id, "done").await.unwrap();
        let after = store.get_by_id(id).await.unwrap();
        assert_eq!(after.filename, "done");
        assert_eq!(after.created_at_utc, before.created_at_utc);
        assert!(store
            .get_by_owner_and_filename("alice", "todo")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_metadata_reinsert_restores_identity() {
        let store = InMemoryNoteMetadataStore::new();
        let id = store.create_record("alice", "todo").await.unwrap();
        let original = store.get_by_id(id).await.unwrap();

        store.delete_record(id).await.unwrap();
        assert!(store.get_by_id(id).await.unwrap_err().is_not_found());

        store
            .reinsert_record(id, "alice", "todo", original.created_at_utc)
            .await
            .unwrap();
        assert_eq!(store.get_by_id(id).await.unwrap(), original);

        let err = store
            .reinsert_record(id, "alice", "todo", original.created_at_utc)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateName { .. }));
    }

    #[tokio::test]
    async fn test_metadata_delete_missing_is_not_found() {
        let store = InMemoryNoteMetadataStore::new();
        assert!(store
            .delete_record(Uuid::now_v7())
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_blob_list_in_filename_order() {
        let store = InMemoryBlobStore::new();
        store.create_bucket("alice").await.unwrap();
        store.create_bucket("bob").await.unwrap();
        store.put_object("alice", "zeta", b"z").await.unwrap();
        store.put_object("alice", "alpha", b"a").await.unwrap();
        store.put_object("bob", "beta", b"b").await.unwrap();

        let names: Vec<String> = store
            .list_objects("alice")
            .map(|item| item.unwrap())
            .collect()
            .await;
        assert_eq!(names, vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[tokio::test]
    async fn test_blob_missing_bucket() {
        let store = InMemoryBlobStore::new();
        assert!(store.put_object("alice", "x", b"1").await.unwrap_err().is_not_found());

        let items: Vec<Result<String>> = store.list_objects("alice").collect().await;
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }

    #[tokio::test]
    async fn test_blob_delete_missing_is_not_found() {
        let store = InMemoryBlobStore::new();
        store.create_bucket("alice").await.unwrap();
        assert!(store
            .delete_object("alice", "nope")
            .await
            .unwrap_err()
            .is_not_found());
    }
}
