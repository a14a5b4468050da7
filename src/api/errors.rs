//! Maps internal store/request errors onto the S3 XML error envelope and the
//! correct HTTP status code.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::store::StoreError;
use crate::xml::error::{ErrorEnvelope, KmsErrorEnvelope};

#[derive(Debug, Error)]
pub enum S3Error {
    #[error("{0}")]
    BucketAlreadyExists(String),
    #[error("{0}")]
    BucketAlreadyOwnedByYou(String),
    #[error("{0}")]
    NoSuchBucket(String),
    #[error("{0}")]
    BucketNotEmpty(String),
    #[error("{0}")]
    InvalidBucketName(String),

    #[error("{0}")]
    NoSuchKey(String),
    #[error("{0}")]
    NoSuchVersion(String),
    #[error("invalid range")]
    InvalidRange,
    #[error("precondition failed")]
    PreconditionFailed,
    #[error("not modified")]
    NotModified,
    #[error("digest mismatch")]
    BadDigest,
    #[error("{0}")]
    InvalidTag(String),
    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    NoSuchUpload(String),
    #[error("{0}")]
    InvalidPart(String),
    #[error("invalid part order")]
    InvalidPartOrder,
    #[error("{0}")]
    EntityTooSmall(String),

    #[error("{0}")]
    KmsKeyUnknown(String),

    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    MalformedXml(String),

    #[error("{0}")]
    Internal(String),
}

impl S3Error {
    pub fn code(&self) -> &'static str {
        match self {
            S3Error::BucketAlreadyExists(_) => "BucketAlreadyExists",
            S3Error::BucketAlreadyOwnedByYou(_) => "BucketAlreadyOwnedByYou",
            S3Error::NoSuchBucket(_) => "NoSuchBucket",
            S3Error::BucketNotEmpty(_) => "BucketNotEmpty",
            S3Error::InvalidBucketName(_) => "InvalidBucketName",
            S3Error::NoSuchKey(_) => "NoSuchKey",
            S3Error::NoSuchVersion(_) => "NoSuchVersion",
            S3Error::InvalidRange => "InvalidRange",
            S3Error::PreconditionFailed => "PreconditionFailed",
            S3Error::NotModified => "NotModified",
            S3Error::BadDigest => "BadDigest",
            S3Error::InvalidTag(_) => "InvalidTag",
            S3Error::AccessDenied(_) => "AccessDenied",
            S3Error::NoSuchUpload(_) => "NoSuchUpload",
            S3Error::InvalidPart(_) => "InvalidPart",
            S3Error::InvalidPartOrder => "InvalidPartOrder",
            S3Error::EntityTooSmall(_) => "EntityTooSmall",
            S3Error::KmsKeyUnknown(_) => "KMS.NotFoundException",
            S3Error::InvalidRequest(_) => "InvalidRequest",
            S3Error::MalformedXml(_) => "MalformedXML",
            S3Error::Internal(_) => "InternalError",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            S3Error::NoSuchBucket(_)
            | S3Error::NoSuchKey(_)
            | S3Error::NoSuchVersion(_)
            | S3Error::NoSuchUpload(_) => StatusCode::NOT_FOUND,
            S3Error::BucketAlreadyExists(_)
            | S3Error::BucketAlreadyOwnedByYou(_)
            | S3Error::BucketNotEmpty(_) => StatusCode::CONFLICT,
            S3Error::InvalidRange => StatusCode::RANGE_NOT_SATISFIABLE,
            S3Error::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            S3Error::NotModified => StatusCode::NOT_MODIFIED,
            S3Error::AccessDenied(_) => StatusCode::FORBIDDEN,
            S3Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            S3Error::InvalidBucketName(_)
            | S3Error::BadDigest
            | S3Error::InvalidTag(_)
            | S3Error::InvalidPart(_)
            | S3Error::InvalidPartOrder
            | S3Error::EntityTooSmall(_)
            | S3Error::KmsKeyUnknown(_)
            | S3Error::InvalidRequest(_)
            | S3Error::MalformedXml(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn to_xml(&self, resource: &str, request_id: &str) -> String {
        if matches!(self, S3Error::KmsKeyUnknown(_)) {
            return KmsErrorEnvelope {
                message: &self.to_string(),
            }
            .to_xml();
        }
        ErrorEnvelope {
            code: self.code(),
            message: &self.to_string(),
            resource,
            request_id,
        }
        .to_xml()
    }
}

impl From<StoreError> for S3Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::BucketAlreadyExists(b) => S3Error::BucketAlreadyExists(b),
            StoreError::BucketAlreadyOwnedByYou(b) => S3Error::BucketAlreadyOwnedByYou(b),
            StoreError::NoSuchBucket(b) => S3Error::NoSuchBucket(b),
            StoreError::BucketNotEmpty(b) => S3Error::BucketNotEmpty(b),
            StoreError::InvalidBucketName(b) => S3Error::InvalidBucketName(b),
            StoreError::NoSuchKey(k) => S3Error::NoSuchKey(k),
            StoreError::NoSuchVersion(v) => S3Error::NoSuchVersion(v),
            StoreError::InvalidRange => S3Error::InvalidRange,
            StoreError::PreconditionFailed => S3Error::PreconditionFailed,
            StoreError::NotModified => S3Error::NotModified,
            StoreError::BadDigest => S3Error::BadDigest,
            StoreError::InvalidTag(t) => S3Error::InvalidTag(t),
            StoreError::AccessDenied(a) => S3Error::AccessDenied(a),
            StoreError::NoSuchUpload(u) => S3Error::NoSuchUpload(u),
            StoreError::InvalidPart(p) => S3Error::InvalidPart(p),
            StoreError::InvalidPartOrder => S3Error::InvalidPartOrder,
            StoreError::EntityTooSmall(p) => S3Error::EntityTooSmall(p),
            StoreError::KmsKeyUnknown(k) => S3Error::KmsKeyUnknown(k),
            StoreError::InvalidRequest(m) => S3Error::InvalidRequest(m),
            StoreError::Io(e) => {
                tracing::error!(error = %e, "store I/O error");
                S3Error::Internal("internal error".into())
            }
            StoreError::DiskFull => {
                tracing::error!("store ran out of disk space");
                S3Error::Internal("internal error".into())
            }
            StoreError::Serialization(e) => {
                tracing::error!(error = %e, "metadata serialization error");
                S3Error::Internal("internal error".into())
            }
            StoreError::Internal(m) => {
                tracing::error!(message = %m, "internal store error");
                S3Error::Internal("internal error".into())
            }
        }
    }
}

impl IntoResponse for S3Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_xml("", "");
        (status, [(header::CONTENT_TYPE, "application/xml")], body).into_response()
    }
}

/// Carries the request path and id alongside the error, for handlers that
/// want those fields reflected in the XML envelope rather than left blank.
pub struct S3ErrorResponse {
    pub error: S3Error,
    pub resource: String,
    pub request_id: String,
}

impl IntoResponse for S3ErrorResponse {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        let body = self.error.to_xml(&self.resource, &self.request_id);
        (
            status,
            [(header::CONTENT_TYPE, "application/xml")],
            body,
        )
            .into_response()
    }
}
