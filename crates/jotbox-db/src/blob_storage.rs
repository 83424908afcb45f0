//! Filesystem blob store for note content.
//!
//! Layout under the base directory:
//!
//! ```text
//! {base_path}/buckets/{owner}/{key}.obj    note content
//! {base_path}/buckets/{owner}/{key}.name   filename the object was stored under
//! {base_path}/staging/{uuid}.tmp           in-flight writes
//! ```
//!
//! `{key}` is the hex SHA-256 of the filename, so any valid filename fits in a
//! single path component. The `.name` sidecar is written before the content
//! and listings are driven by `.obj` files, so a listed object always has
//! its real name available.
//!
//! Writes go to the staging directory first and are renamed into the bucket,
//! so an object is either absent or complete. Staging lives outside the
//! bucket tree and never shows up in listings.
//!
//! ## Example
//!
//! ```rust,ignore
//! use jotbox_db::FilesystemBlobStore;
//!
//! let blobs = FilesystemBlobStore::new("/var/lib/jotbox/blobs");
//! blobs.create_bucket("alice").await?;
//! blobs.put_object("alice", "groceries", b"milk, eggs").await?;
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use jotbox_core::defaults::FILENAME_MAX_LEN;
use jotbox_core::{validate_filename, validate_owner, BlobStore, Error, Result, StoreKind};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

const BUCKETS_DIR: &str = "buckets";
const STAGING_DIR: &str = "staging";
const OBJECT_EXT: &str = "obj";
const NAME_EXT: &str = "name";

/// Path-safe key for a filename.
fn object_key(filename: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(filename.as_bytes());
    hex::encode(hasher.finalize())
}

/// Filesystem implementation of [`BlobStore`].
#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    base_path: PathBuf,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store rooted at the given directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn bucket_path(&self, owner: &str) -> Result<PathBuf> {
        validate_owner(owner)?;
        Ok(self.base_path.join(BUCKETS_DIR).join(owner))
    }

    /// Content and name sidecar paths for an object.
    fn object_paths(&self, owner: &str, filename: &str) -> Result<(PathBuf, PathBuf)> {
        validate_filename(filename, FILENAME_MAX_LEN)?;
        let bucket = self.bucket_path(owner)?;
        let key = object_key(filename);
        Ok((
            bucket.join(format!("{}.{}", key, OBJECT_EXT)),
            bucket.join(format!("{}.{}", key, NAME_EXT)),
        ))
    }

    /// Validate that the store can write, read, and delete objects.
    ///
    /// Performs a full round trip through the staging directory so permission
    /// problems surface at startup rather than in the middle of a saga.
    pub async fn validate(&self) -> Result<()> {
        let staging = self.base_path.join(STAGING_DIR);
        fs::create_dir_all(&staging).await?;
        fs::create_dir_all(self.base_path.join(BUCKETS_DIR)).await?;

        let probe = staging.join(format!("health-{}.tmp", Uuid::new_v4()));
        let data = b"jotbox-blob-health-check";
        fs::write(&probe, data).await?;
        let read_back = fs::read(&probe).await?;
        fs::remove_file(&probe).await?;

        if read_back != data {
            return Err(Error::store_operation(
                StoreKind::Blob,
                "blob store health check read back different bytes",
            ));
        }
        Ok(())
    }

    /// Write `content` to a staging file and rename it onto `target`.
    ///
    /// The staging file is removed on any failure.
    async fn write_atomic(&self, target: &Path, content: &[u8]) -> Result<()> {
        let staging = self.base_path.join(STAGING_DIR);
        fs::create_dir_all(&staging).await?;
        let temp_path = staging.join(format!("{}.tmp", Uuid::new_v4()));

        let written = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(content).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp_path, target).await
        }
        .await;

        if let Err(e) = written {
            warn!(
                temp_path = %temp_path.display(),
                target = %target.display(),
                error = %e,
                "fs_blob: staged write failed"
            );
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

/// Resolve a bucket entry to the filename it stores.
///
/// `None` for entries that are not objects (sidecars, directories, strays).
async fn listed_name(bucket: &Path, entry: &fs::DirEntry) -> Option<Result<String>> {
    match entry.file_type().await {
        Ok(file_type) if !file_type.is_file() => return None,
        Ok(_) => {}
        Err(e) => return Some(Err(e.into())),
    }

    let entry_name: OsString = entry.file_name();
    let key = entry_name
        .to_str()?
        .strip_suffix(OBJECT_EXT)?
        .strip_suffix('.')?
        .to_string();

    let sidecar = bucket.join(format!("{}.{}", key, NAME_EXT));
    let filename = match fs::read(&sidecar).await {
        Ok(raw) => match String::from_utf8(raw) {
            Ok(name) => name,
            Err(_) => {
                return Some(Err(Error::store_operation(
                    StoreKind::Blob,
                    format!("object name for {} is not valid UTF-8", key),
                )))
            }
        },
        Err(e) => return Some(Err(e.into())),
    };

    if object_key(&filename) != key {
        return Some(Err(Error::store_operation(
            StoreKind::Blob,
            format!("object name {:?} does not match key {}", filename, key),
        )));
    }
    Some(Ok(filename))
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn create_bucket(&self, owner: &str) -> Result<()> {
        let bucket = self.bucket_path(owner)?;
        fs::create_dir_all(&bucket).await?;
        debug!(
            subsystem = "blob",
            component = "fs_blob",
            op = "create_bucket",
            owner,
            "Bucket ready"
        );
        Ok(())
    }

    async fn put_object(&self, owner: &str, filename: &str, content: &[u8]) -> Result<()> {
        let (object, name) = self.object_paths(owner, filename)?;
        let bucket = self.bucket_path(owner)?;
        if !fs::try_exists(&bucket).await? {
            return Err(Error::NotFound(format!("Bucket {:?} does not exist", owner)));
        }

        self.write_atomic(&name, filename.as_bytes()).await?;
        self.write_atomic(&object, content).await?;

        debug!(
            subsystem = "blob",
            component = "fs_blob",
            op = "put_object",
            owner,
            size = content.len(),
            "Stored object"
        );
        Ok(())
    }

    async fn get_object(&self, owner: &str, filename: &str) -> Result<Vec<u8>> {
        let (object, _) = self.object_paths(owner, filename)?;
        Ok(fs::read(object).await?)
    }

    async fn delete_object(&self, owner: &str, filename: &str) -> Result<()> {
        let (object, name) = self.object_paths(owner, filename)?;
        fs::remove_file(object).await?;

        // Listings ignore a sidecar without content
        if let Err(e) = fs::remove_file(&name).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    sidecar = %name.display(),
                    error = %e,
                    "fs_blob: removing name sidecar failed"
                );
            }
        }

        debug!(
            subsystem = "blob",
            component = "fs_blob",
            op = "delete_object",
            owner,
            "Removed object"
        );
        Ok(())
    }

    fn list_objects<'a>(&'a self, owner: &'a str) -> BoxStream<'a, Result<String>> {
        let bucket = match self.bucket_path(owner) {
            Ok(path) => path,
            Err(e) => return stream::once(async move { Err(e) }).boxed(),
        };

        stream::once(async move { fs::read_dir(&bucket).await.map(|dir| (dir, bucket)) })
            .flat_map(|opened| match opened {
                Ok(state) => stream::unfold(Some(state), |state| async move {
                    let (mut read_dir, bucket) = state?;
                    loop {
                        match read_dir.next_entry().await {
                            Ok(Some(entry)) => match listed_name(&bucket, &entry).await {
                                Some(item) => return Some((item, Some((read_dir, bucket)))),
                                None => continue,
                            },
                            Ok(None) => return None,
                            // A failing directory handle is not retried
                            Err(e) => return Some((Err(e.into()), None)),
                        }
                    }
                })
                .boxed(),
                Err(e) => stream::once(async move { Err(Error::from(e)) }).boxed(),
            })
            .boxed()
    }
}
