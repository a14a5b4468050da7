//! Request handlers, one module per resource kind.

pub mod bucket;
pub mod health;
pub mod multipart;
pub mod object;

pub use bucket::*;
pub use health::*;
pub use multipart::*;
pub use object::*;

use std::collections::BTreeMap;

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::api::errors::S3Error;

pub fn new_request_id() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn xml_response(xml: String) -> axum::response::Response {
    use axum::http::header;
    use axum::response::IntoResponse;
    (
        axum::http::StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        xml,
    )
        .into_response()
}

/// Validate a body is UTF-8 without copying it.
pub fn body_to_utf8(body: &[u8]) -> Result<&str, S3Error> {
    std::str::from_utf8(body).map_err(|_| S3Error::MalformedXml("body is not valid UTF-8".into()))
}

/// Collect `x-amz-meta-*` headers into the user-metadata map, keyed by the
/// suffix after the prefix.
pub fn extract_user_metadata(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (name, value) in headers {
        if let Some(suffix) = name.as_str().strip_prefix("x-amz-meta-") {
            if let Ok(v) = value.to_str() {
                out.insert(suffix.to_string(), v.to_string());
            }
        }
    }
    out
}

pub fn extract_system_metadata(headers: &HeaderMap) -> crate::types::SystemMetadata {
    let h = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(String::from);
    crate::types::SystemMetadata {
        content_type: h("content-type"),
        content_encoding: h("content-encoding"),
        content_language: h("content-language"),
        content_disposition: h("content-disposition"),
        cache_control: h("cache-control"),
        expires: h("expires"),
    }
}

pub fn extract_sse(headers: &HeaderMap) -> Option<crate::types::SseInfo> {
    let algo = headers
        .get("x-amz-server-side-encryption")
        .and_then(|v| v.to_str().ok())
        .and_then(crate::types::SseAlgorithm::parse)?;
    let kms_key_id = headers
        .get("x-amz-server-side-encryption-aws-kms-key-id")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    Some(crate::types::SseInfo {
        algorithm: algo,
        kms_key_id,
    })
}

pub fn extract_requested_checksum(
    headers: &HeaderMap,
) -> (Option<crate::types::ChecksumAlgorithm>, Option<String>) {
    use crate::types::ChecksumAlgorithm;
    for algo in [
        ChecksumAlgorithm::Crc32,
        ChecksumAlgorithm::Crc32c,
        ChecksumAlgorithm::Sha1,
        ChecksumAlgorithm::Sha256,
    ] {
        if let Some(v) = headers.get(algo.header_name()).and_then(|v| v.to_str().ok()) {
            return (Some(algo), Some(v.to_string()));
        }
    }
    (None, None)
}

/// Evaluate `If-Match` / `If-None-Match` / `If-Unmodified-Since` /
/// `If-Modified-Since` against a known ETag and last-modified time, in the
/// order S3 documents: match conditions take priority over date conditions.
pub fn check_conditional_get(
    headers: &HeaderMap,
    etag: &str,
    last_modified: chrono::DateTime<chrono::Utc>,
) -> Result<(), S3Error> {
    let h = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Some(v) = h("if-match") {
        if !if_match_satisfied(v, etag) {
            return Err(S3Error::PreconditionFailed);
        }
    } else if let Some(v) = h("if-unmodified-since") {
        if let Ok(since) = chrono::DateTime::parse_from_rfc2822(v) {
            if last_modified > since {
                return Err(S3Error::PreconditionFailed);
            }
        }
    }

    if let Some(v) = h("if-none-match") {
        if if_match_satisfied(v, etag) {
            return Err(S3Error::NotModified);
        }
    } else if let Some(v) = h("if-modified-since") {
        if let Ok(since) = chrono::DateTime::parse_from_rfc2822(v) {
            if last_modified <= since {
                return Err(S3Error::NotModified);
            }
        }
    }
    Ok(())
}

fn if_match_satisfied(header_value: &str, etag: &str) -> bool {
    header_value
        .split(',')
        .map(|v| v.trim())
        .any(|v| v == "*" || v == etag)
}

pub fn base64_decode(input: &str) -> Result<Vec<u8>, S3Error> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input)
        .map_err(|_| S3Error::InvalidRequest("invalid base64".into()))
}
