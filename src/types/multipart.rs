//! Multipart-upload data model shared between the engine and the XML codec.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::object::{Checksum, SseInfo, SystemMetadata, TagSet};

pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;
pub const MAX_PART_NUMBER: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRecord {
    pub part_number: u32,
    pub size: u64,
    /// Quoted hex-MD5 ETag of this part's bytes.
    pub etag: String,
    pub last_modified: DateTime<Utc>,
    pub checksum: Option<Checksum>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub upload_id: String,
    pub bucket: String,
    pub key: String,
    pub initiated: DateTime<Utc>,
    pub storage_class: String,
    #[serde(default)]
    pub user_metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub system_metadata: SystemMetadata,
    #[serde(default)]
    pub tags: TagSet,
    #[serde(default)]
    pub sse: Option<SseInfo>,
    #[serde(default)]
    pub parts: BTreeMap<u32, PartRecord>,
}

impl UploadMetadata {
    pub fn new(bucket: String, key: String, upload_id: String) -> Self {
        UploadMetadata {
            upload_id,
            bucket,
            key,
            initiated: Utc::now(),
            storage_class: "STANDARD".to_string(),
            user_metadata: BTreeMap::new(),
            system_metadata: SystemMetadata::default(),
            tags: TagSet::default(),
            sse: None,
            parts: BTreeMap::new(),
        }
    }
}
