//! Errors produced by the bucket/object/multipart stores.
//!
//! These are internal, store-layer errors; the API layer maps them onto the
//! S3 XML error envelope and HTTP status codes (see `api::errors::S3Error`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bucket already exists: {0}")]
    BucketAlreadyExists(String),
    #[error("bucket already owned by you: {0}")]
    BucketAlreadyOwnedByYou(String),
    #[error("no such bucket: {0}")]
    NoSuchBucket(String),
    #[error("bucket not empty: {0}")]
    BucketNotEmpty(String),
    #[error("invalid bucket name: {0}")]
    InvalidBucketName(String),

    #[error("no such key: {0}")]
    NoSuchKey(String),
    #[error("no such version: {0}")]
    NoSuchVersion(String),
    #[error("invalid range")]
    InvalidRange,
    #[error("precondition failed")]
    PreconditionFailed,
    #[error("not modified")]
    NotModified,
    #[error("digest mismatch")]
    BadDigest,
    #[error("invalid tag: {0}")]
    InvalidTag(String),
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("no such upload: {0}")]
    NoSuchUpload(String),
    #[error("invalid part: {0}")]
    InvalidPart(String),
    #[error("invalid part order")]
    InvalidPartOrder,
    #[error("entity too small: {0}")]
    EntityTooSmall(String),

    #[error("kms key unknown: {0}")]
    KmsKeyUnknown(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("out of disk space")]
    DiskFull,
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// `ENOSPC` on Linux; used to distinguish disk-full conditions from other
/// I/O failures so the API layer can report a clearer internal error.
const ENOSPC: i32 = 28;

pub fn io_to_store_error(err: std::io::Error) -> StoreError {
    if err.raw_os_error() == Some(ENOSPC) {
        StoreError::DiskFull
    } else {
        StoreError::Io(err)
    }
}
