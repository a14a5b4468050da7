//! Filesystem-backed object version store.
//!
//! Layout per object version:
//! `<root>/<bucket>/<key-encoded>/<versionId>/{binaryData,objectMetadata.json}`
//! with the current version id recorded in `<root>/<bucket>/<key-encoded>/currentVersion`.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use rand::RngCore;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::instrument;

use crate::types::{
    decode_key_from_fs, encode_key_for_fs, Checksum, ChecksumAlgorithm, ObjectVersion,
    SystemMetadata, TagSet, NULL_VERSION_ID,
};

use super::error::{io_to_store_error, StoreError, StoreResult};

const CURRENT_VERSION_FILE: &str = "currentVersion";
const OBJECT_METADATA_FILE: &str = "objectMetadata.json";
const BINARY_DATA_FILE: &str = "binaryData";

/// An inclusive byte range resolved against a known object size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: u64,
    pub end: u64,
}

pub struct NewObjectInput {
    pub system_metadata: SystemMetadata,
    pub user_metadata: std::collections::BTreeMap<String, String>,
    pub tags: TagSet,
    pub acl: crate::types::Acl,
    pub expected_md5: Option<String>,
    pub requested_checksum: Option<ChecksumAlgorithm>,
    pub expected_checksum: Option<String>,
    pub sse: Option<crate::types::SseInfo>,
    pub storage_class: String,
}

pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    pub fn new(root: PathBuf) -> Self {
        ObjectStore { root }
    }

    fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }

    fn key_dir(&self, bucket: &str, key: &str) -> PathBuf {
        self.bucket_dir(bucket).join(encode_key_for_fs(key))
    }

    fn current_version_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.key_dir(bucket, key).join(CURRENT_VERSION_FILE)
    }

    fn version_dir(&self, bucket: &str, key: &str, version_id: &str) -> PathBuf {
        self.key_dir(bucket, key).join(version_id)
    }

    fn metadata_path(&self, bucket: &str, key: &str, version_id: &str) -> PathBuf {
        self.version_dir(bucket, key, version_id)
            .join(OBJECT_METADATA_FILE)
    }

    fn data_path(&self, bucket: &str, key: &str, version_id: &str) -> PathBuf {
        self.version_dir(bucket, key, version_id)
            .join(BINARY_DATA_FILE)
    }

    async fn read_current_version_id(&self, bucket: &str, key: &str) -> StoreResult<Option<String>> {
        let path = self.current_version_path(bucket, key);
        match tokio::fs::read_to_string(&path).await {
            Ok(s) => Ok(Some(s.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_to_store_error(e)),
        }
    }

    async fn write_current_version_id(
        &self,
        bucket: &str,
        key: &str,
        version_id: &str,
    ) -> StoreResult<()> {
        let path = self.current_version_path(bucket, key);
        super::bucket_store::atomic_write(&path, version_id.as_bytes()).await
    }

    /// True if the version at `version_id` exists and is currently held by
    /// a legal hold or unexpired retention. A missing version is never
    /// locked; there is nothing there to protect.
    async fn is_version_locked(&self, bucket: &str, key: &str, version_id: &str, now: DateTime<Utc>) -> bool {
        let path = self.metadata_path(bucket, key, version_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<ObjectVersion>(&bytes)
                .map(|v| v.is_locked(now))
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    #[instrument(skip(self, bytes, input))]
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        versioning_enabled: bool,
        input: NewObjectInput,
    ) -> StoreResult<ObjectVersion> {
        let mut md5 = Md5::new();
        md5.update(&bytes);
        let md5_digest = md5.finalize();
        let etag = format!("\"{}\"", hex::encode(md5_digest));

        if let Some(expected) = &input.expected_md5 {
            let decoded = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, expected)
                .map_err(|_| StoreError::BadDigest)?;
            if decoded != md5_digest.as_slice() {
                return Err(StoreError::BadDigest);
            }
        }

        let checksum = if let Some(algo) = input.requested_checksum {
            let value = compute_checksum(algo, &bytes);
            if let Some(expected) = &input.expected_checksum {
                if expected != &value {
                    return Err(StoreError::BadDigest);
                }
            }
            Some(Checksum { algorithm: algo, value })
        } else {
            None
        };

        let version_id = if versioning_enabled {
            generate_version_id()
        } else {
            NULL_VERSION_ID.to_string()
        };

        if !versioning_enabled && self.is_version_locked(bucket, key, &version_id, Utc::now()).await {
            return Err(StoreError::AccessDenied(format!(
                "object {key} is under legal hold or retention and cannot be overwritten"
            )));
        }

        let data_path = self.data_path(bucket, key, &version_id);
        write_file_atomic(&data_path, &bytes).await?;

        let mut version = ObjectVersion::new_put(
            bucket.to_string(),
            key.to_string(),
            version_id.clone(),
            bytes.len() as u64,
            etag,
        );
        version.system_metadata = input.system_metadata;
        version.user_metadata = input.user_metadata;
        version.tags = input.tags;
        version.acl = input.acl;
        version.sse = input.sse;
        version.checksum = checksum;
        version.storage_class = input.storage_class;

        self.write_version_metadata(&version).await?;
        self.write_current_version_id(bucket, key, &version_id).await?;
        Ok(version)
    }

    /// Store a fully-assembled multipart completion as a new version, with
    /// metadata and ETag supplied by the caller (the multipart engine
    /// already computed the composite ETag and concatenated the bytes).
    #[instrument(skip(self, bytes, version))]
    pub async fn put_assembled_version(
        &self,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        versioning_enabled: bool,
        mut version: ObjectVersion,
    ) -> StoreResult<ObjectVersion> {
        let version_id = if versioning_enabled {
            generate_version_id()
        } else {
            NULL_VERSION_ID.to_string()
        };

        if !versioning_enabled && self.is_version_locked(bucket, key, &version_id, Utc::now()).await {
            return Err(StoreError::AccessDenied(format!(
                "object {key} is under legal hold or retention and cannot be overwritten"
            )));
        }

        version.bucket = bucket.to_string();
        version.key = key.to_string();
        version.version_id = version_id.clone();
        version.size = bytes.len() as u64;

        let data_path = self.data_path(bucket, key, &version_id);
        write_file_atomic(&data_path, &bytes).await?;
        self.write_version_metadata(&version).await?;
        self.write_current_version_id(bucket, key, &version_id).await?;
        Ok(version)
    }

    async fn write_version_metadata(&self, version: &ObjectVersion) -> StoreResult<()> {
        let path = self.metadata_path(&version.bucket, &version.key, &version.version_id);
        let json = serde_json::to_vec_pretty(version)?;
        super::bucket_store::atomic_write(&path, &json).await
    }

    /// Rewrite a version's metadata sidecar in place (tagging, ACL,
    /// retention, legal hold). Never touches the binary data or mints a new
    /// version id, unlike [`Self::put_object`]/[`Self::put_assembled_version`].
    #[instrument(skip(self, version))]
    pub async fn update_version_metadata(&self, version: &ObjectVersion) -> StoreResult<()> {
        self.write_version_metadata(version).await
    }

    #[instrument(skip(self))]
    pub async fn get_version(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> StoreResult<ObjectVersion> {
        let version_id = match version_id {
            Some(v) => v.to_string(),
            None => self
                .read_current_version_id(bucket, key)
                .await?
                .ok_or_else(|| StoreError::NoSuchKey(key.to_string()))?,
        };
        let path = self.metadata_path(bucket, key, &version_id);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|_| StoreError::NoSuchVersion(version_id.clone()))?;
        serde_json::from_slice(&bytes).map_err(StoreError::from)
    }

    /// Read object bytes, optionally sliced to a resolved range.
    #[instrument(skip(self))]
    pub async fn read_bytes(
        &self,
        bucket: &str,
        key: &str,
        version_id: &str,
        range: Option<ResolvedRange>,
    ) -> StoreResult<Bytes> {
        let path = self.data_path(bucket, key, version_id);
        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|_| StoreError::NoSuchVersion(version_id.to_string()))?;
        match range {
            None => {
                let mut buf = Vec::new();
                file.read_to_end(&mut buf).await.map_err(io_to_store_error)?;
                Ok(Bytes::from(buf))
            }
            Some(r) => {
                use tokio::io::AsyncSeekExt;
                file.seek(std::io::SeekFrom::Start(r.start))
                    .await
                    .map_err(io_to_store_error)?;
                let len = (r.end - r.start + 1) as usize;
                let mut buf = vec![0u8; len];
                file.read_exact(&mut buf).await.map_err(io_to_store_error)?;
                Ok(Bytes::from(buf))
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn delete_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
        versioning_state: crate::types::VersioningState,
    ) -> StoreResult<Option<ObjectVersion>> {
        use crate::types::VersioningState;
        match version_id {
            Some(v) => {
                // Permanent delete of a specific version.
                if self.is_version_locked(bucket, key, v, Utc::now()).await {
                    return Err(StoreError::AccessDenied(format!(
                        "version {v} of {key} is under legal hold or retention"
                    )));
                }
                let dir = self.version_dir(bucket, key, v);
                if super::bucket_store::path_exists(&dir).await {
                    tokio::fs::remove_dir_all(&dir).await.map_err(io_to_store_error)?;
                }
                self.cleanup_key_dir_if_empty(bucket, key).await?;
                Ok(None)
            }
            None => match versioning_state {
                VersioningState::Enabled => {
                    let marker = ObjectVersion::new_delete_marker(
                        bucket.to_string(),
                        key.to_string(),
                        generate_version_id(),
                    );
                    self.write_version_metadata(&marker).await?;
                    self.write_current_version_id(bucket, key, &marker.version_id)
                        .await?;
                    Ok(Some(marker))
                }
                VersioningState::Unversioned | VersioningState::Suspended => {
                    if self.is_version_locked(bucket, key, NULL_VERSION_ID, Utc::now()).await {
                        return Err(StoreError::AccessDenied(format!(
                            "object {key} is under legal hold or retention"
                        )));
                    }
                    let dir = self.version_dir(bucket, key, NULL_VERSION_ID);
                    if super::bucket_store::path_exists(&dir).await {
                        tokio::fs::remove_dir_all(&dir).await.map_err(io_to_store_error)?;
                    }
                    self.cleanup_key_dir_if_empty(bucket, key).await?;
                    Ok(None)
                }
            },
        }
    }

    async fn cleanup_key_dir_if_empty(&self, bucket: &str, key: &str) -> StoreResult<()> {
        let dir = self.key_dir(bucket, key);
        if !super::bucket_store::path_exists(&dir).await {
            return Ok(());
        }
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(io_to_store_error)?;
        let mut any = false;
        while let Some(entry) = entries.next_entry().await.map_err(io_to_store_error)? {
            if entry.file_name() == CURRENT_VERSION_FILE {
                continue;
            }
            any = true;
            break;
        }
        if !any {
            let cur = self.current_version_path(bucket, key);
            let _ = tokio::fs::remove_file(&cur).await;
            let _ = tokio::fs::remove_dir(&dir).await;
        }
        Ok(())
    }

    /// List every key directory under a bucket, alongside its current
    /// version, for non-versioned listing (ListObjects V1/V2).
    #[instrument(skip(self))]
    pub async fn list_current_versions(&self, bucket: &str) -> StoreResult<Vec<ObjectVersion>> {
        let dir = self.bucket_dir(bucket);
        let mut out = Vec::new();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NoSuchBucket(bucket.to_string()))
            }
            Err(e) => return Err(io_to_store_error(e)),
        };
        while let Some(entry) = entries.next_entry().await.map_err(io_to_store_error)? {
            let file_name = entry.file_name();
            let encoded = file_name.to_string_lossy();
            if encoded == "bucketMetadata.json" {
                continue;
            }
            if !entry.file_type().await.map_err(io_to_store_error)?.is_dir() {
                continue;
            }
            let key = decode_key_from_fs(&encoded);
            if let Ok(version) = self.get_version(bucket, &key, None).await {
                if !version.delete_marker {
                    out.push(version);
                }
            }
        }
        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(out)
    }

    /// List every version of every key under a bucket, newest first within
    /// each key, for ListObjectVersions.
    #[instrument(skip(self))]
    pub async fn list_all_versions(&self, bucket: &str) -> StoreResult<Vec<ObjectVersion>> {
        let dir = self.bucket_dir(bucket);
        let mut out = Vec::new();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NoSuchBucket(bucket.to_string()))
            }
            Err(e) => return Err(io_to_store_error(e)),
        };
        while let Some(entry) = entries.next_entry().await.map_err(io_to_store_error)? {
            let file_name = entry.file_name();
            let encoded = file_name.to_string_lossy();
            if encoded == "bucketMetadata.json" {
                continue;
            }
            if !entry.file_type().await.map_err(io_to_store_error)?.is_dir() {
                continue;
            }
            let key = decode_key_from_fs(&encoded);
            let key_dir = self.key_dir(bucket, &key);
            let mut version_entries = tokio::fs::read_dir(&key_dir).await.map_err(io_to_store_error)?;
            let mut versions = Vec::new();
            while let Some(ve) = version_entries.next_entry().await.map_err(io_to_store_error)? {
                if ve.file_name() == CURRENT_VERSION_FILE {
                    continue;
                }
                if !ve.file_type().await.map_err(io_to_store_error)?.is_dir() {
                    continue;
                }
                let vid = ve.file_name().to_string_lossy().into_owned();
                if let Ok(v) = self.get_version(bucket, &key, Some(&vid)).await {
                    versions.push(v);
                }
            }
            versions.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
            out.extend(versions);
        }
        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(out)
    }

}

async fn write_file_atomic(path: &Path, bytes: &Bytes) -> StoreResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| StoreError::Internal("data path has no parent".into()))?;
    tokio::fs::create_dir_all(dir).await.map_err(io_to_store_error)?;
    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_to_store_error)?;
    let tmp_path = tmp.path().to_path_buf();
    {
        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(io_to_store_error)?;
        file.write_all(bytes).await.map_err(io_to_store_error)?;
        file.sync_all().await.map_err(io_to_store_error)?;
    }
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || tmp.persist(&path).map_err(|e| io_to_store_error(e.error)))
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))??;
    Ok(())
}

fn compute_checksum(algo: ChecksumAlgorithm, bytes: &[u8]) -> String {
    use base64::Engine;
    match algo {
        ChecksumAlgorithm::Crc32 => {
            let v = crc32fast::hash(bytes);
            base64::engine::general_purpose::STANDARD.encode(v.to_be_bytes())
        }
        ChecksumAlgorithm::Crc32c => {
            let v = crc32c::crc32c(bytes);
            base64::engine::general_purpose::STANDARD.encode(v.to_be_bytes())
        }
        ChecksumAlgorithm::Sha1 => {
            use sha1::{Digest as _, Sha1};
            let mut h = Sha1::new();
            h.update(bytes);
            base64::engine::general_purpose::STANDARD.encode(h.finalize())
        }
        ChecksumAlgorithm::Sha256 => {
            use sha2::{Digest as _, Sha256};
            let mut h = Sha256::new();
            h.update(bytes);
            base64::engine::general_purpose::STANDARD.encode(h.finalize())
        }
    }
}

/// A version id that sorts lexicographically newest-first: the most
/// significant bits are a descending timestamp so smaller strings are more
/// recent, with a random suffix breaking ties within the same nanosecond.
fn generate_version_id() -> String {
    let now = Utc::now();
    let nanos = now.timestamp_nanos_opt().unwrap_or(0) as u64;
    let inverted = u64::MAX - nanos;
    let mut suffix = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut suffix);
    format!("{inverted:020}{}", hex::encode(suffix))
}

pub fn resolve_range(start: Option<u64>, end: Option<u64>, size: u64) -> StoreResult<Option<ResolvedRange>> {
    if start.is_none() && end.is_none() {
        return Ok(None);
    }
    if size == 0 {
        return Err(StoreError::InvalidRange);
    }
    let (s, e) = match (start, end) {
        (Some(s), Some(e)) => (s, e.min(size - 1)),
        (Some(s), None) => (s, size - 1),
        (None, Some(suffix_len)) => {
            if suffix_len == 0 {
                return Err(StoreError::InvalidRange);
            }
            let s = size.saturating_sub(suffix_len);
            (s, size - 1)
        }
        (None, None) => unreachable!(),
    };
    if s > e || s >= size {
        return Err(StoreError::InvalidRange);
    }
    Ok(Some(ResolvedRange { start: s, end: e }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_bytes_a_b_form() {
        let r = resolve_range(Some(0), Some(0), 2).unwrap().unwrap();
        assert_eq!(r, ResolvedRange { start: 0, end: 0 });
    }

    #[test]
    fn resolves_suffix_form() {
        let r = resolve_range(None, Some(4), 10).unwrap().unwrap();
        assert_eq!(r, ResolvedRange { start: 6, end: 9 });
    }

    #[test]
    fn resolves_open_ended_form() {
        let r = resolve_range(Some(5), None, 10).unwrap().unwrap();
        assert_eq!(r, ResolvedRange { start: 5, end: 9 });
    }

    #[test]
    fn rejects_unsatisfiable_range() {
        assert!(resolve_range(Some(20), None, 10).is_err());
        assert!(resolve_range(None, Some(0), 10).is_err());
    }

    #[test]
    fn no_range_returns_none() {
        assert!(resolve_range(None, None, 10).unwrap().is_none());
    }
}
