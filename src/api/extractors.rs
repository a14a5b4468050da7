//! Axum extractors pulling the bucket (and, where present, object key) out
//! of the request path. These only validate *shape*; existence is a store
//! concern decided per-request so every bucket is handled identically (no
//! assumption of a single configured bucket).

use axum::async_trait;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

use super::errors::S3Error;
use crate::types::validate_bucket_name;

/// Extracted from `/{bucket}` or `/{bucket}/*key` routes.
pub struct ValidatedBucket(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ValidatedBucket
where
    S: Send + Sync,
{
    type Rejection = S3Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(bucket) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| S3Error::InvalidRequest("missing bucket in path".into()))?;
        validate_bucket_name(&bucket).map_err(|e| S3Error::InvalidBucketName(e.to_string()))?;
        Ok(ValidatedBucket(bucket))
    }
}

/// Extracted from `/{bucket}/*key` routes.
pub struct ValidatedPath {
    pub bucket: String,
    pub key: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for ValidatedPath
where
    S: Send + Sync,
{
    type Rejection = S3Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path((bucket, key)) = Path::<(String, String)>::from_request_parts(parts, state)
            .await
            .map_err(|_| S3Error::InvalidRequest("missing bucket/key in path".into()))?;
        validate_bucket_name(&bucket).map_err(|e| S3Error::InvalidBucketName(e.to_string()))?;
        crate::types::validate_object_key(&key)
            .map_err(|e| S3Error::InvalidRequest(e.to_string()))?;
        Ok(ValidatedPath { bucket, key })
    }
}
