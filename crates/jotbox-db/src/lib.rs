//! # jotbox-db
//!
//! Store backends for jotbox notes.
//!
//! This crate provides:
//! - Connection pool management
//! - The PostgreSQL note metadata store
//! - The filesystem blob store (one directory per owner)
//! - In-memory variants of both stores
//! - Fault-injecting wrappers for saga tests
//!
//! ## Example
//!
//! ```rust,ignore
//! use jotbox_db::NoteStores;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stores = NoteStores::connect(
//!         "postgres://localhost/jotbox",
//!         "/var/lib/jotbox/blobs",
//!     )
//!     .await?;
//!
//!     stores.blobs.create_bucket("alice").await?;
//!     Ok(())
//! }
//! ```
pub mod blob_storage;
pub mod memory;
pub mod notes;
pub mod pool;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use the fault wrappers
pub mod test_fixtures;

use std::sync::Arc;

// Re-export core types
pub use jotbox_core::*;

pub use blob_storage::FilesystemBlobStore;
pub use memory::{InMemoryBlobStore, InMemoryNoteMetadataStore};
pub use notes::PgNoteMetadataStore;
pub use pool::{
    create_lazy_pool, create_pool, create_pool_with_config, log_pool_metrics, PoolConfig,
};

/// Environment variable naming the blob store base directory.
pub const ENV_BLOB_PATH: &str = "JOTBOX_BLOB_PATH";

/// The pair of store handles a coordinator and an assembler are built from.
#[derive(Clone)]
pub struct NoteStores {
    /// Metadata store (records).
    pub metadata: Arc<dyn NoteMetadataStore>,
    /// Blob store (content).
    pub blobs: Arc<dyn BlobStore>,
}

impl NoteStores {
    pub fn new(metadata: Arc<dyn NoteMetadataStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { metadata, blobs }
    }

    /// PostgreSQL metadata and filesystem blobs.
    pub async fn connect(database_url: &str, blob_path: &str) -> Result<Self> {
        Self::connect_with_config(database_url, blob_path, PoolConfig::default()).await
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(
        database_url: &str,
        blob_path: &str,
        config: PoolConfig,
    ) -> Result<Self> {
        let pool = create_pool_with_config(database_url, config).await?;
        log_pool_metrics(&pool);
        let blobs = FilesystemBlobStore::new(blob_path);
        blobs.validate().await?;
        Ok(Self::new(
            Arc::new(PgNoteMetadataStore::new(pool)),
            Arc::new(blobs),
        ))
    }

    /// Connect using `DATABASE_URL`, `JOTBOX_BLOB_PATH`, and the pool
    /// overrides read by [`PoolConfig::from_env`].
    pub async fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| Error::Config("DATABASE_URL is not set".into()))?;
        let blob_path = std::env::var(ENV_BLOB_PATH)
            .map_err(|_| Error::Config(format!("{} is not set", ENV_BLOB_PATH)))?;
        Self::connect_with_config(&database_url, &blob_path, PoolConfig::from_env()?).await
    }

    /// Both stores held in process memory.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryNoteMetadataStore::new()),
            Arc::new(InMemoryBlobStore::new()),
        )
    }
}
