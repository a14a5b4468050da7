//! Disk-backed multipart upload engine.
//!
//! Staging layout: `<root>/<bucket>/<key>/uploads/<uploadId>/{uploadMetadata.json,
//! parts/<partNumber>, parts/<partNumber>.md5}`. Terminal states
//! (Completed/Aborted) remove the staging directory entirely, which is also
//! what makes a second `CompleteMultipartUpload` on the same id
//! naturally observe `NoSuchUpload`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use md5::{Digest, Md5};
use sha2::Sha256;
use tracing::instrument;

use crate::store::bucket_store::atomic_write;
use crate::store::error::{io_to_store_error, StoreError, StoreResult};
use crate::types::{
    encode_key_for_fs, Checksum, PartRecord, SseInfo, SystemMetadata, TagSet, UploadMetadata,
    MAX_PART_NUMBER, MIN_PART_SIZE,
};

const UPLOAD_METADATA_FILE: &str = "uploadMetadata.json";
const PARTS_DIR: &str = "parts";

static UPLOAD_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct MultipartEngine {
    root: PathBuf,
    /// Serializes CompleteMultipartUpload per upload id so a racing second
    /// complete (or abort) observes the upload gone rather than double-assembling.
    completing: DashMap<String, ()>,
}

pub struct NewUploadInput {
    pub storage_class: String,
    pub system_metadata: SystemMetadata,
    pub user_metadata: std::collections::BTreeMap<String, String>,
    pub tags: TagSet,
    pub sse: Option<SseInfo>,
}

impl MultipartEngine {
    pub fn new(root: PathBuf) -> Self {
        MultipartEngine {
            root,
            completing: DashMap::new(),
        }
    }

    fn key_dir(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(encode_key_for_fs(key))
    }

    fn upload_dir(&self, bucket: &str, key: &str, upload_id: &str) -> PathBuf {
        self.key_dir(bucket, key).join("uploads").join(upload_id)
    }

    fn metadata_path(&self, bucket: &str, key: &str, upload_id: &str) -> PathBuf {
        self.upload_dir(bucket, key, upload_id).join(UPLOAD_METADATA_FILE)
    }

    fn parts_dir(&self, bucket: &str, key: &str, upload_id: &str) -> PathBuf {
        self.upload_dir(bucket, key, upload_id).join(PARTS_DIR)
    }

    fn part_path(&self, bucket: &str, key: &str, upload_id: &str, part_number: u32) -> PathBuf {
        self.parts_dir(bucket, key, upload_id).join(part_number.to_string())
    }

    fn part_md5_path(&self, bucket: &str, key: &str, upload_id: &str, part_number: u32) -> PathBuf {
        self.parts_dir(bucket, key, upload_id)
            .join(format!("{part_number}.md5"))
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        bucket: &str,
        key: &str,
        input: NewUploadInput,
    ) -> StoreResult<UploadMetadata> {
        let upload_id = generate_upload_id(bucket, key);
        let mut meta = UploadMetadata::new(bucket.to_string(), key.to_string(), upload_id.clone());
        meta.storage_class = input.storage_class;
        meta.system_metadata = input.system_metadata;
        meta.user_metadata = input.user_metadata;
        meta.tags = input.tags;
        meta.sse = input.sse;
        self.write_metadata(&meta).await?;
        Ok(meta)
    }

    async fn write_metadata(&self, meta: &UploadMetadata) -> StoreResult<()> {
        let path = self.metadata_path(&meta.bucket, &meta.key, &meta.upload_id);
        let json = serde_json::to_vec_pretty(meta)?;
        atomic_write(&path, &json).await
    }

    async fn read_metadata(&self, bucket: &str, key: &str, upload_id: &str) -> StoreResult<UploadMetadata> {
        let path = self.metadata_path(bucket, key, upload_id);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|_| StoreError::NoSuchUpload(upload_id.to_string()))?;
        serde_json::from_slice(&bytes).map_err(StoreError::from)
    }

    #[instrument(skip(self, bytes))]
    pub async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        bytes: Bytes,
    ) -> StoreResult<PartRecord> {
        if !(1..=MAX_PART_NUMBER).contains(&part_number) {
            return Err(StoreError::InvalidPart(format!(
                "part number {part_number} out of range"
            )));
        }
        // Confirm the upload still exists before staging bytes to disk.
        self.read_metadata(bucket, key, upload_id).await?;

        let mut md5 = Md5::new();
        md5.update(&bytes);
        let digest = md5.finalize();
        let etag = format!("\"{}\"", hex::encode(digest));

        let part_path = self.part_path(bucket, key, upload_id, part_number);
        write_bytes(&part_path, &bytes).await?;
        let md5_path = self.part_md5_path(bucket, key, upload_id, part_number);
        atomic_write(&md5_path, hex::encode(digest).as_bytes()).await?;

        Ok(PartRecord {
            part_number,
            size: bytes.len() as u64,
            etag,
            last_modified: Utc::now(),
            checksum: None,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> StoreResult<Vec<PartRecord>> {
        self.read_metadata(bucket, key, upload_id).await?;
        let parts_dir = self.parts_dir(bucket, key, upload_id);
        let mut parts = Vec::new();
        let mut entries = match tokio::fs::read_dir(&parts_dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(parts),
            Err(e) => return Err(io_to_store_error(e)),
        };
        while let Some(entry) = entries.next_entry().await.map_err(io_to_store_error)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".md5") {
                continue;
            }
            let part_number: u32 = match name.parse() {
                Ok(n) => n,
                Err(_) => continue,
            };
            let meta = entry.metadata().await.map_err(io_to_store_error)?;
            let md5_path = self.part_md5_path(bucket, key, upload_id, part_number);
            let hex_md5 = tokio::fs::read_to_string(&md5_path)
                .await
                .map_err(io_to_store_error)?;
            parts.push(PartRecord {
                part_number,
                size: meta.len(),
                etag: format!("\"{}\"", hex_md5.trim()),
                last_modified: meta
                    .modified()
                    .ok()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(Utc::now),
                checksum: None,
            });
        }
        parts.sort_by_key(|p| p.part_number);
        Ok(parts)
    }

    #[instrument(skip(self))]
    pub async fn list_uploads(&self, bucket: &str) -> StoreResult<Vec<UploadMetadata>> {
        let bucket_dir = self.root.join(bucket);
        let mut out = Vec::new();
        let mut key_entries = match tokio::fs::read_dir(&bucket_dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NoSuchBucket(bucket.to_string()))
            }
            Err(e) => return Err(io_to_store_error(e)),
        };
        while let Some(key_entry) = key_entries.next_entry().await.map_err(io_to_store_error)? {
            if !key_entry.file_type().await.map_err(io_to_store_error)?.is_dir() {
                continue;
            }
            let uploads_dir = key_entry.path().join("uploads");
            let mut upload_entries = match tokio::fs::read_dir(&uploads_dir).await {
                Ok(e) => e,
                Err(_) => continue,
            };
            while let Some(upload_entry) = upload_entries.next_entry().await.map_err(io_to_store_error)? {
                let upload_id = upload_entry.file_name().to_string_lossy().into_owned();
                let path = upload_entry.path().join(UPLOAD_METADATA_FILE);
                if let Ok(bytes) = tokio::fs::read(&path).await {
                    if let Ok(meta) = serde_json::from_slice::<UploadMetadata>(&bytes) {
                        out.push(meta);
                    }
                }
                let _ = upload_id;
            }
        }
        out.sort_by(|a, b| a.key.cmp(&b.key).then(a.upload_id.cmp(&b.upload_id)));
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn abort(&self, bucket: &str, key: &str, upload_id: &str) -> StoreResult<()> {
        self.read_metadata(bucket, key, upload_id).await?;
        let dir = self.upload_dir(bucket, key, upload_id);
        tokio::fs::remove_dir_all(&dir).await.map_err(io_to_store_error)?;
        self.completing.remove(upload_id);
        Ok(())
    }

    /// Validate and assemble the requested parts into final bytes plus the
    /// composite ETag and aggregate size, removing the staging directory on
    /// success. Returns `NoSuchUpload` if a concurrent complete already won.
    #[instrument(skip(self, requested_parts))]
    pub async fn complete(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        requested_parts: Vec<(u32, String)>,
    ) -> StoreResult<(Bytes, String, u64, UploadMetadata)> {
        if self.completing.insert(upload_id.to_string(), ()).is_some() {
            return Err(StoreError::NoSuchUpload(upload_id.to_string()));
        }
        let result = self
            .complete_inner(bucket, key, upload_id, requested_parts)
            .await;
        // Whether it succeeded or failed, nothing further needs to block on
        // this id: success already removed the staging directory, and a
        // failure should be retryable rather than permanently wedged.
        self.completing.remove(upload_id);
        result
    }

    async fn complete_inner(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        requested_parts: Vec<(u32, String)>,
    ) -> StoreResult<(Bytes, String, u64, UploadMetadata)> {
        let meta = self.read_metadata(bucket, key, upload_id).await?;

        if requested_parts.is_empty() {
            return Err(StoreError::InvalidPart("no parts supplied".into()));
        }
        for w in requested_parts.windows(2) {
            if w[0].0 >= w[1].0 {
                return Err(StoreError::InvalidPartOrder);
            }
        }

        let mut assembled = Vec::new();
        let mut md5_concat = Vec::new();
        let count = requested_parts.len();

        for (idx, (part_number, client_etag)) in requested_parts.iter().enumerate() {
            let part_path = self.part_path(bucket, key, upload_id, *part_number);
            let bytes = tokio::fs::read(&part_path)
                .await
                .map_err(|_| StoreError::InvalidPart(format!("part {part_number} not found")))?;

            let md5_path = self.part_md5_path(bucket, key, upload_id, *part_number);
            let hex_md5 = tokio::fs::read_to_string(&md5_path)
                .await
                .map_err(io_to_store_error)?;
            let hex_md5 = hex_md5.trim();
            let stored_etag = format!("\"{hex_md5}\"");
            let normalized_client = client_etag.trim_matches('"');
            if normalized_client != hex_md5 {
                return Err(StoreError::InvalidPart(format!(
                    "ETag mismatch for part {part_number}"
                )));
            }
            let _ = &stored_etag;

            let is_last = idx == count - 1;
            if !is_last && (bytes.len() as u64) < MIN_PART_SIZE {
                return Err(StoreError::EntityTooSmall(format!(
                    "part {part_number} is smaller than the 5 MiB minimum"
                )));
            }

            md5_concat.extend_from_slice(&hex::decode(hex_md5).map_err(|_| {
                StoreError::Internal("corrupt stored part digest".into())
            })?);
            assembled.extend_from_slice(&bytes);
        }

        let mut final_md5 = Md5::new();
        final_md5.update(&md5_concat);
        let final_digest = final_md5.finalize();
        let etag = format!("\"{}-{}\"", hex::encode(final_digest), count);
        let size = assembled.len() as u64;

        let dir = self.upload_dir(bucket, key, upload_id);
        tokio::fs::remove_dir_all(&dir).await.map_err(io_to_store_error)?;

        Ok((Bytes::from(assembled), etag, size, meta))
    }

    /// Remove uploads initiated longer than `max_age` ago. Run periodically
    /// from a background task; never blocks request handling.
    #[instrument(skip(self))]
    pub async fn cleanup_expired(&self, max_age: Duration) -> StoreResult<usize> {
        let cutoff = Utc::now() - max_age;
        let mut removed = 0;
        let mut bucket_entries = match tokio::fs::read_dir(&self.root).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(io_to_store_error(e)),
        };
        while let Some(bucket_entry) = bucket_entries.next_entry().await.map_err(io_to_store_error)? {
            if !bucket_entry.file_type().await.map_err(io_to_store_error)?.is_dir() {
                continue;
            }
            let mut key_entries = match tokio::fs::read_dir(bucket_entry.path()).await {
                Ok(e) => e,
                Err(_) => continue,
            };
            while let Some(key_entry) = key_entries.next_entry().await.map_err(io_to_store_error)? {
                let uploads_dir = key_entry.path().join("uploads");
                let mut upload_entries = match tokio::fs::read_dir(&uploads_dir).await {
                    Ok(e) => e,
                    Err(_) => continue,
                };
                while let Some(upload_entry) =
                    upload_entries.next_entry().await.map_err(io_to_store_error)?
                {
                    let meta_path = upload_entry.path().join(UPLOAD_METADATA_FILE);
                    if let Ok(bytes) = tokio::fs::read(&meta_path).await {
                        if let Ok(meta) = serde_json::from_slice::<UploadMetadata>(&bytes) {
                            if meta.initiated < cutoff {
                                if tokio::fs::remove_dir_all(upload_entry.path()).await.is_ok() {
                                    removed += 1;
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(removed)
    }
}

async fn write_bytes(path: &std::path::Path, bytes: &Bytes) -> StoreResult<()> {
    use tokio::io::AsyncWriteExt;
    let dir = path
        .parent()
        .ok_or_else(|| StoreError::Internal("part path has no parent".into()))?;
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

/// Derive a unique, unguessable upload id from a monotonic counter, the
/// current time, and the target bucket/key.
fn generate_upload_id(bucket: &str, key: &str) -> String {
    let counter = UPLOAD_COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or(0) as u64;
    let mut hasher = Sha256::new();
    hasher.update(counter.to_le_bytes());
    hasher.update(nanos.to_le_bytes());
    hasher.update(bucket.as_bytes());
    hasher.update(key.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_upload_part_complete_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let engine = MultipartEngine::new(dir.path().to_path_buf());
        let meta = engine
            .create(
                "b",
                "big",
                NewUploadInput {
                    storage_class: "STANDARD".into(),
                    system_metadata: SystemMetadata::default(),
                    user_metadata: Default::default(),
                    tags: TagSet::default(),
                    sse: None,
                },
            )
            .await
            .unwrap();

        let part1 = vec![b'a'; 5 * 1024 * 1024];
        let p1 = engine
            .upload_part("b", "big", &meta.upload_id, 1, Bytes::from(part1))
            .await
            .unwrap();
        let p2 = engine
            .upload_part("b", "big", &meta.upload_id, 2, Bytes::from_static(b"tail"))
            .await
            .unwrap();

        let (bytes, etag, size, _) = engine
            .complete(
                "b",
                "big",
                &meta.upload_id,
                vec![(1, p1.etag.clone()), (2, p2.etag.clone())],
            )
            .await
            .unwrap();

        assert_eq!(size, 5 * 1024 * 1024 + 4);
        assert!(etag.ends_with("-2\""));
        assert_eq!(&bytes[bytes.len() - 4..], b"tail");
    }

    #[tokio::test]
    async fn rejects_out_of_order_parts() {
        let dir = tempfile::tempdir().unwrap();
        let engine = MultipartEngine::new(dir.path().to_path_buf());
        let meta = engine
            .create(
                "b",
                "k",
                NewUploadInput {
                    storage_class: "STANDARD".into(),
                    system_metadata: SystemMetadata::default(),
                    user_metadata: Default::default(),
                    tags: TagSet::default(),
                    sse: None,
                },
            )
            .await
            .unwrap();
        let err = engine
            .complete("b", "k", &meta.upload_id, vec![(2, "x".into()), (1, "y".into())])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidPartOrder));
    }

    #[tokio::test]
    async fn second_complete_sees_no_such_upload() {
        let dir = tempfile::tempdir().unwrap();
        let engine = MultipartEngine::new(dir.path().to_path_buf());
        let meta = engine
            .create(
                "b",
                "k",
                NewUploadInput {
                    storage_class: "STANDARD".into(),
                    system_metadata: SystemMetadata::default(),
                    user_metadata: Default::default(),
                    tags: TagSet::default(),
                    sse: None,
                },
            )
            .await
            .unwrap();
        let part = engine
            .upload_part("b", "k", &meta.upload_id, 1, Bytes::from_static(b"only"))
            .await
            .unwrap();
        engine
            .complete("b", "k", &meta.upload_id, vec![(1, part.etag.clone())])
            .await
            .unwrap();
        let err = engine
            .complete("b", "k", &meta.upload_id, vec![(1, part.etag)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NoSuchUpload(_)));
    }

    #[tokio::test]
    async fn abort_removes_staging_directory() {
        let dir = tempfile::tempdir().unwrap();
        let engine = MultipartEngine::new(dir.path().to_path_buf());
        let meta = engine
            .create(
                "b",
                "k",
                NewUploadInput {
                    storage_class: "STANDARD".into(),
                    system_metadata: SystemMetadata::default(),
                    user_metadata: Default::default(),
                    tags: TagSet::default(),
                    sse: None,
                },
            )
            .await
            .unwrap();
        engine.abort("b", "k", &meta.upload_id).await.unwrap();
        let err = engine.list_parts("b", "k", &meta.upload_id).await.unwrap_err();
        assert!(matches!(err, StoreError::NoSuchUpload(_)));
    }
}
