//! Filesystem-backed bucket directory and `bucketMetadata.json` sidecar.

use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::instrument;

use crate::types::{validate_bucket_name, Bucket, ObjectOwnership};

use super::error::{io_to_store_error, StoreError, StoreResult};

const BUCKET_METADATA_FILE: &str = "bucketMetadata.json";

pub struct BucketStore {
    root: PathBuf,
}

impl BucketStore {
    pub fn new(root: PathBuf) -> Self {
        BucketStore { root }
    }

    pub fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }

    fn metadata_path(&self, bucket: &str) -> PathBuf {
        self.bucket_dir(bucket).join(BUCKET_METADATA_FILE)
    }

    #[instrument(skip(self))]
    pub async fn create_bucket(
        &self,
        name: &str,
        region: &str,
        ownership: ObjectOwnership,
    ) -> StoreResult<Bucket> {
        validate_bucket_name(name).map_err(|e| StoreError::InvalidBucketName(e.to_string()))?;
        let dir = self.bucket_dir(name);
        if path_exists(&dir).await {
            return Err(StoreError::BucketAlreadyOwnedByYou(name.to_string()));
        }
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(io_to_store_error)?;
        let bucket = Bucket::new(name.to_string(), region.to_string(), ownership);
        self.write_metadata(&bucket).await?;
        Ok(bucket)
    }

    #[instrument(skip(self))]
    pub async fn delete_bucket(&self, name: &str) -> StoreResult<()> {
        let dir = self.bucket_dir(name);
        if !path_exists(&dir).await {
            return Err(StoreError::NoSuchBucket(name.to_string()));
        }
        if self.has_objects_or_uploads(name).await? {
            return Err(StoreError::BucketNotEmpty(name.to_string()));
        }
        tokio::fs::remove_dir_all(&dir)
            .await
            .map_err(io_to_store_error)?;
        Ok(())
    }

    async fn has_objects_or_uploads(&self, name: &str) -> StoreResult<bool> {
        let dir = self.bucket_dir(name);
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(io_to_store_error)?;
        while let Some(entry) = entries.next_entry().await.map_err(io_to_store_error)? {
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if file_name == BUCKET_METADATA_FILE {
                continue;
            }
            // Any other directory entry is an object key directory, which
            // holds either versions or an `uploads/` subdirectory. Either
            // way its mere presence is disqualifying; an empty leftover key
            // directory from a fully-deleted object is cleaned up eagerly
            // by the object store, so no directory here should be "empty".
            return Ok(true);
        }
        Ok(false)
    }

    #[instrument(skip(self))]
    pub async fn get_bucket(&self, name: &str) -> StoreResult<Bucket> {
        let path = self.metadata_path(name);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|_| StoreError::NoSuchBucket(name.to_string()))?;
        serde_json::from_slice(&bytes).map_err(StoreError::from)
    }

    #[instrument(skip(self))]
    pub async fn list_buckets(&self) -> StoreResult<Vec<Bucket>> {
        let mut buckets = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(io_to_store_error)?;
        while let Some(entry) = entries.next_entry().await.map_err(io_to_store_error)? {
            if !entry.file_type().await.map_err(io_to_store_error)?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Ok(bucket) = self.get_bucket(&name).await {
                buckets.push(bucket);
            }
        }
        buckets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(buckets)
    }

    pub async fn bucket_exists(&self, name: &str) -> bool {
        path_exists(&self.metadata_path(name)).await
    }

    #[instrument(skip(self, bucket))]
    pub async fn write_metadata(&self, bucket: &Bucket) -> StoreResult<()> {
        let path = self.metadata_path(&bucket.name);
        let json = serde_json::to_vec_pretty(bucket)?;
        atomic_write(&path, &json).await
    }
}

pub(crate) async fn path_exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}

/// Write `contents` to `path` via a same-directory temp file, `fsync`, then
/// rename, so a crash or disconnect mid-write never leaves a torn file in
/// place of the real one.
pub(crate) async fn atomic_write(path: &Path, contents: &[u8]) -> StoreResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| StoreError::Internal("write path has no parent".into()))?;
    tokio::fs::create_dir_all(dir).await.map_err(io_to_store_error)?;
    let dir = dir.to_path_buf();
    let contents = contents.to_vec();
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> StoreResult<()> {
        let mut tmp = NamedTempFile::new_in(&dir).map_err(io_to_store_error)?;
        use std::io::Write;
        tmp.write_all(&contents).map_err(io_to_store_error)?;
        tmp.as_file().sync_all().map_err(io_to_store_error)?;
        tmp.persist(&path)
            .map_err(|e| io_to_store_error(e.error))?;
        Ok(())
    })
    .await
    .map_err(|e| StoreError::Internal(e.to_string()))??;
    Ok(())
}
