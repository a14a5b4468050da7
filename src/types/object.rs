//! Object-version data model: everything stored in `objectMetadata.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::acl::{synthetic_owner, Acl};

/// Sentinel version id used for objects in an Unversioned or Suspended bucket.
pub const NULL_VERSION_ID: &str = "null";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChecksumAlgorithm {
    Crc32,
    Crc32c,
    Sha1,
    Sha256,
}

impl ChecksumAlgorithm {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "CRC32" => Some(Self::Crc32),
            "CRC32C" => Some(Self::Crc32c),
            "SHA1" => Some(Self::Sha1),
            "SHA256" => Some(Self::Sha256),
            _ => None,
        }
    }

    pub fn header_name(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Crc32 => "x-amz-checksum-crc32",
            ChecksumAlgorithm::Crc32c => "x-amz-checksum-crc32c",
            ChecksumAlgorithm::Sha1 => "x-amz-checksum-sha1",
            ChecksumAlgorithm::Sha256 => "x-amz-checksum-sha256",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    pub algorithm: ChecksumAlgorithm,
    /// Base64-encoded digest value.
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SseAlgorithm {
    Aes256,
    #[serde(rename = "aws:kms")]
    AwsKms,
}

impl SseAlgorithm {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "AES256" => Some(Self::Aes256),
            "aws:kms" => Some(Self::AwsKms),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SseAlgorithm::Aes256 => "AES256",
            SseAlgorithm::AwsKms => "aws:kms",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SseInfo {
    pub algorithm: SseAlgorithm,
    pub kms_key_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RetentionMode {
    Governance,
    Compliance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Retention {
    pub mode: RetentionMode,
    pub retain_until: DateTime<Utc>,
}

/// System (HTTP-surfaced) metadata, as opposed to user `x-amz-meta-*` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SystemMetadata {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_disposition: Option<String>,
    pub cache_control: Option<String>,
    pub expires: Option<String>,
}

/// Object tag set. Keys are unique; at most 10 pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TagSet(pub Vec<(String, String)>);

impl TagSet {
    pub const MAX_TAGS: usize = 10;

    pub fn validate(&self) -> Result<(), String> {
        if self.0.len() > Self::MAX_TAGS {
            return Err(format!("Object tags cannot exceed {} pairs", Self::MAX_TAGS));
        }
        let mut seen = std::collections::HashSet::new();
        for (k, _) in &self.0 {
            if k.len() > 128 {
                return Err("Tag key must be <= 128 characters".into());
            }
            if !seen.insert(k.clone()) {
                return Err(format!("Duplicate tag key {k}"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectVersion {
    pub bucket: String,
    pub key: String,
    pub version_id: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    /// Quoted ETag string, e.g. `"\"abcd1234\""` or `"\"abcd-2\""` for
    /// multipart completions.
    pub etag: String,
    #[serde(default)]
    pub user_metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub system_metadata: SystemMetadata,
    #[serde(default)]
    pub tags: TagSet,
    pub acl: Acl,
    #[serde(default)]
    pub legal_hold: bool,
    #[serde(default)]
    pub retention: Option<Retention>,
    #[serde(default)]
    pub sse: Option<SseInfo>,
    #[serde(default)]
    pub checksum: Option<Checksum>,
    #[serde(default)]
    pub delete_marker: bool,
    #[serde(default)]
    pub storage_class: String,
}

impl ObjectVersion {
    /// True if this version may currently be overwritten/deleted given its
    /// legal hold and retention state.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        if self.legal_hold {
            return true;
        }
        match &self.retention {
            Some(r) => now < r.retain_until,
            None => false,
        }
    }

    pub fn new_put(
        bucket: String,
        key: String,
        version_id: String,
        size: u64,
        etag: String,
    ) -> Self {
        ObjectVersion {
            bucket,
            key,
            version_id,
            size,
            last_modified: Utc::now(),
            etag,
            user_metadata: BTreeMap::new(),
            system_metadata: SystemMetadata::default(),
            tags: TagSet::default(),
            acl: super::acl::CannedAcl::Private.expand(&synthetic_owner()),
            legal_hold: false,
            retention: None,
            sse: None,
            checksum: None,
            delete_marker: false,
            storage_class: "STANDARD".to_string(),
        }
    }

    pub fn new_delete_marker(bucket: String, key: String, version_id: String) -> Self {
        ObjectVersion {
            bucket,
            key,
            version_id,
            size: 0,
            last_modified: Utc::now(),
            etag: String::new(),
            user_metadata: BTreeMap::new(),
            system_metadata: SystemMetadata::default(),
            tags: TagSet::default(),
            acl: super::acl::CannedAcl::Private.expand(&synthetic_owner()),
            legal_hold: false,
            retention: None,
            sse: None,
            checksum: None,
            delete_marker: true,
            storage_class: "STANDARD".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_set_rejects_duplicate_keys() {
        let tags = TagSet(vec![("a".into(), "1".into()), ("a".into(), "2".into())]);
        assert!(tags.validate().is_err());
    }

    #[test]
    fn tag_set_rejects_too_many_pairs() {
        let tags = TagSet((0..11).map(|i| (format!("k{i}"), "v".into())).collect());
        assert!(tags.validate().is_err());
    }

    #[test]
    fn checksum_algorithm_roundtrips_known_names() {
        assert_eq!(ChecksumAlgorithm::parse("sha256"), Some(ChecksumAlgorithm::Sha256));
        assert_eq!(ChecksumAlgorithm::parse("bogus"), None);
    }
}
