//! Shared setup for coordinator and assembler tests.
#![allow(dead_code)]

use std::sync::Arc;

use jotbox_db::test_fixtures::{FaultyBlobStore, FaultyMetadataStore};
use jotbox_db::{InMemoryBlobStore, InMemoryNoteMetadataStore};
use jotbox_notes::{logging, Coordinator, CoordinatorConfig, NoteLocks, NoteViewAssembler};

pub const OWNER: &str = "alice";

/// In-memory stores behind fault-injecting wrappers.
pub struct Harness {
    pub metadata: Arc<FaultyMetadataStore>,
    pub blobs: Arc<FaultyBlobStore>,
    pub metadata_inner: Arc<InMemoryNoteMetadataStore>,
    pub blobs_inner: Arc<InMemoryBlobStore>,
    pub coordinator: Coordinator,
    pub assembler: NoteViewAssembler,
}

impl Harness {
    pub async fn new() -> Self {
        Self::build(CoordinatorConfig::default(), false).await
    }

    pub async fn with_config(config: CoordinatorConfig) -> Self {
        Self::build(config, false).await
    }

    pub async fn with_locks() -> Self {
        Self::build(CoordinatorConfig::default(), true).await
    }

    async fn build(config: CoordinatorConfig, locked: bool) -> Self {
        logging::init_test_tracing();

        let metadata_inner = Arc::new(InMemoryNoteMetadataStore::new());
        let blobs_inner = Arc::new(InMemoryBlobStore::new());
        let metadata = Arc::new(FaultyMetadataStore::new(metadata_inner.clone()));
        let blobs = Arc::new(FaultyBlobStore::new(blobs_inner.clone()));

        let mut coordinator =
            Coordinator::new(metadata.clone(), blobs.clone()).with_config(config.clone());
        if locked {
            coordinator = coordinator.with_locks(NoteLocks::new());
        }
        let assembler = NoteViewAssembler::new(metadata.clone(), blobs.clone()).with_config(config);

        coordinator
            .provision_owner(OWNER)
            .await
            .expect("Failed to provision test owner");

        let harness = Self {
            metadata,
            blobs,
            metadata_inner,
            blobs_inner,
            coordinator,
            assembler,
        };
        harness.reset_counts();
        harness
    }

    /// Forget call counts and any pending faults.
    pub fn reset_counts(&self) {
        self.metadata.reset();
        self.blobs.reset();
    }

    pub fn writes(&self) -> usize {
        self.metadata.writes() + self.blobs.writes()
    }

    pub fn total_calls(&self) -> usize {
        self.metadata.total_calls() + self.blobs.total_calls()
    }
}
