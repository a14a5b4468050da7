//! Core data model: buckets, object versions, multipart uploads, ACLs.

pub mod acl;
pub mod bucket;
pub mod key;
pub mod multipart;
pub mod object;

pub use acl::{synthetic_owner, Acl, CannedAcl, Grant, Grantee, Owner, Permission};
pub use bucket::{
    Bucket, BucketPolicy, CorsConfiguration, CorsRule, LifecycleConfiguration, LifecycleRule,
    ObjectOwnership, ObjectLockConfiguration, SseDefaultConfig, VersioningState,
};
pub use key::{
    decode_key_from_fs, encode_key_for_fs, validate_bucket_name, validate_object_key,
    KeyValidationError,
};
pub use multipart::{PartRecord, UploadMetadata, MAX_PART_NUMBER, MIN_PART_SIZE};
pub use object::{
    ChecksumAlgorithm, ObjectVersion, Retention, RetentionMode, SseAlgorithm, SseInfo,
    SystemMetadata, NULL_VERSION_ID,
};
pub use object::Checksum;
/// Object-level tag set (bucket-level tagging uses `bucket::TagSet` directly).
pub use object::TagSet;
