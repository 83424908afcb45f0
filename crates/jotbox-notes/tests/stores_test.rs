//! End-to-end runs against the persistent store backends.
//!
//! The filesystem test always runs. The PostgreSQL test requires DATABASE_URL
//! with a reachable database.

use std::sync::Arc;

use jotbox_db::test_fixtures::TestDatabase;
use jotbox_db::{FilesystemBlobStore, InMemoryNoteMetadataStore};
use jotbox_notes::{logging, BlobStore, Coordinator, NoteStores, NoteViewAssembler, UpdateOutcome};
use tempfile::TempDir;

#[tokio::test]
async fn test_lifecycle_on_filesystem_blobs() {
    logging::init_test_tracing();
    let dir = TempDir::new().expect("Failed to create temp dir");
    let blobs = FilesystemBlobStore::new(dir.path());
    blobs.validate().await.unwrap();
    let stores = NoteStores::new(Arc::new(InMemoryNoteMetadataStore::new()), Arc::new(blobs.clone()));

    let notes = Coordinator::from_stores(&stores);
    let views = NoteViewAssembler::from_stores(&stores);

    notes.provision_owner("alice").await.unwrap();
    let id = notes.create("alice", "groceries", "milk").await.unwrap();
    assert_eq!(blobs.get_object("alice", "groceries").await.unwrap(), b"milk");

    let outcome = notes.update(id, "shopping", "milk, eggs").await.unwrap();
    assert!(matches!(outcome, UpdateOutcome::Updated));
    assert!(blobs.get_object("alice", "groceries").await.unwrap_err().is_not_found());

    let listed = views.list_notes_of_owner("alice").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].filename, "shopping");
    assert_eq!(listed[0].content, "milk, eggs");

    notes.delete(id).await.unwrap();
    assert!(views.get_note(id).await.unwrap_err().is_not_found());
    assert!(views.list_notes_of_owner("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_long_filenames_on_filesystem_blobs() {
    logging::init_test_tracing();
    let dir = TempDir::new().expect("Failed to create temp dir");
    let stores = NoteStores::new(
        Arc::new(InMemoryNoteMetadataStore::new()),
        Arc::new(FilesystemBlobStore::new(dir.path())),
    );
    let notes = Coordinator::from_stores(&stores);
    let views = NoteViewAssembler::from_stores(&stores);
    notes.provision_owner("alice").await.unwrap();

    let long_name = "n".repeat(300);
    let id = notes.create("alice", &long_name, "x").await.unwrap();
    let note = views.get_note(id).await.unwrap();
    assert_eq!(note.filename, long_name);
    assert_eq!(note.content, "x");

    let longest = "l".repeat(1024);
    let outcome = notes.update(id, &longest, "renamed").await.unwrap();
    assert!(matches!(outcome, UpdateOutcome::Updated));

    let listed = views.list_notes_of_owner("alice").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].filename, longest);
    assert_eq!(listed[0].content, "renamed");

    notes.delete(id).await.unwrap();
    assert!(views.list_notes_of_owner("alice").await.unwrap().is_empty());
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with a reachable database
async fn test_lifecycle_on_postgres_and_filesystem() {
    dotenvy::dotenv().ok();
    logging::init_test_tracing();
    let db = TestDatabase::new().await;
    let owner = db.unique_owner();
    let dir = TempDir::new().expect("Failed to create temp dir");

    let stores = NoteStores::new(
        Arc::new(db.store.clone()),
        Arc::new(FilesystemBlobStore::new(dir.path())),
    );
    let notes = Coordinator::from_stores(&stores);
    let views = NoteViewAssembler::from_stores(&stores);

    notes.provision_owner(&owner).await.unwrap();
    let id = notes.create(&owner, "journal", "day one").await.unwrap();
    let created = views.get_note(id).await.unwrap();

    let outcome = notes.update(id, "journal", "day one, revised").await.unwrap();
    assert!(matches!(outcome, UpdateOutcome::Updated));
    let updated = views.get_note_by_name(&owner, "journal").await.unwrap();
    assert_eq!(updated.created_at_utc, created.created_at_utc);
    assert_eq!(updated.content, "day one, revised");

    assert!(matches!(
        notes.create(&owner, "journal", "again").await.unwrap_err(),
        jotbox_notes::Error::DuplicateName { .. }
    ));

    notes.delete(id).await.unwrap();
    assert!(views.get_note(id).await.unwrap_err().is_not_found());

    db.cleanup_owner(&owner).await;
}
