//! Bucket-level data model: configuration persisted as `bucketMetadata.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::acl::{synthetic_owner, Acl};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum VersioningState {
    #[default]
    Unversioned,
    Enabled,
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum ObjectOwnership {
    #[default]
    BucketOwnerEnforced,
    BucketOwnerPreferred,
    ObjectWriter,
}

impl ObjectOwnership {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "BucketOwnerEnforced" => Some(Self::BucketOwnerEnforced),
            "BucketOwnerPreferred" => Some(Self::BucketOwnerPreferred),
            "ObjectWriter" => Some(Self::ObjectWriter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ObjectLockConfiguration {
    pub enabled: bool,
    pub default_retention_mode: Option<super::object::RetentionMode>,
    pub default_retention_days: Option<u32>,
    pub default_retention_years: Option<u32>,
}

/// Opaque JSON bucket policy document. Never evaluated — stored and
/// returned verbatim since IAM policy enforcement is out of scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketPolicy(pub String);

/// Opaque CORS configuration, stored and returned as received (parsed only
/// enough to round-trip the XML element structure, not evaluated).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CorsConfiguration {
    pub rules: Vec<CorsRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsRule {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    pub max_age_seconds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LifecycleConfiguration {
    pub rules: Vec<LifecycleRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleRule {
    pub id: String,
    pub prefix: String,
    pub status_enabled: bool,
    pub expiration_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SseDefaultConfig {
    pub algorithm: super::object::SseAlgorithm,
    pub kms_key_id: Option<String>,
}

/// Bucket-level tag set, distinct from object tagging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TagSet(pub Vec<(String, String)>);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    pub region: String,
    pub creation_date: DateTime<Utc>,
    #[serde(default)]
    pub versioning: VersioningState,
    #[serde(default)]
    pub object_lock: Option<ObjectLockConfiguration>,
    #[serde(default)]
    pub lifecycle: Option<LifecycleConfiguration>,
    #[serde(default)]
    pub policy: Option<BucketPolicy>,
    #[serde(default)]
    pub cors: Option<CorsConfiguration>,
    #[serde(default = "ObjectOwnership::default")]
    pub ownership: ObjectOwnership,
    #[serde(default)]
    pub default_encryption: Option<SseDefaultConfig>,
    #[serde(default)]
    pub tags: TagSet,
    #[serde(default = "default_acl")]
    pub acl: Acl,
}

fn default_acl() -> Acl {
    Acl {
        owner: synthetic_owner(),
        grants: vec![],
    }
}

impl Bucket {
    pub fn new(name: String, region: String, ownership: ObjectOwnership) -> Self {
        let owner = synthetic_owner();
        Bucket {
            name,
            region,
            creation_date: Utc::now(),
            versioning: VersioningState::Unversioned,
            object_lock: None,
            lifecycle: None,
            policy: None,
            cors: None,
            ownership,
            default_encryption: None,
            tags: TagSet::default(),
            acl: super::acl::CannedAcl::Private.expand(&owner),
        }
    }
}
