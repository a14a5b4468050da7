//! Object-level handlers: PUT/GET/HEAD/DELETE, CopyObject, tagging/acl/
//! retention/legal-hold sub-resources, and the batch DeleteObjects POST.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::api::errors::S3Error;
use crate::api::extractors::{ValidatedBucket, ValidatedPath};
use crate::api::headers::{decode_aws_chunked, is_aws_chunked, parse_range_header};
use crate::api::state::AppState;
use crate::store::locks::object_key;
use crate::store::object_store::{resolve_range, NewObjectInput};
use crate::types::{synthetic_owner, CannedAcl, Retention, RetentionMode, TagSet, VersioningState};
use crate::xml::requests::{LegalHoldRequest, RetentionRequest, TaggingRequest};
use crate::xml::responses;

use super::{
    body_to_utf8, check_conditional_get, extract_requested_checksum, extract_sse,
    extract_system_metadata, extract_user_metadata, xml_response,
};

#[derive(Debug, Deserialize, Default)]
pub struct ObjectQuery {
    #[serde(rename = "uploadId")]
    pub upload_id: Option<String>,
    #[serde(rename = "partNumber")]
    pub part_number: Option<u32>,
    pub uploads: Option<String>,
    pub tagging: Option<String>,
    pub acl: Option<String>,
    pub retention: Option<String>,
    #[serde(rename = "legal-hold")]
    pub legal_hold: Option<String>,
    #[serde(rename = "versionId")]
    pub version_id: Option<String>,
    pub delete: Option<String>,
}

pub async fn put_object_or_copy(
    State(state): State<AppState>,
    ValidatedPath { bucket, key }: ValidatedPath,
    Query(q): Query<ObjectQuery>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Response, S3Error> {
    if let (Some(upload_id), Some(part_number)) = (q.upload_id.clone(), q.part_number) {
        if headers.get("x-amz-copy-source").is_some() {
            return upload_part_copy(&state, &bucket, &key, &upload_id, part_number, &headers).await;
        }
        return super::multipart::upload_part(&state, &bucket, &key, &upload_id, part_number, body).await;
    }

    if headers.get("x-amz-copy-source").is_some() {
        return copy_object(&state, &bucket, &key, &headers).await;
    }
    if q.tagging.is_some() {
        return put_object_tagging(&state, &bucket, &key, &body).await;
    }
    if q.acl.is_some() {
        return put_object_acl(&state, &bucket, &key, &headers).await;
    }
    if q.retention.is_some() {
        return put_object_retention(&state, &bucket, &key, &body).await;
    }
    if q.legal_hold.is_some() {
        return put_object_legal_hold(&state, &bucket, &key, &body).await;
    }

    put_object(&state, &bucket, &key, &headers, body).await
}

async fn put_object(
    state: &AppState,
    bucket: &str,
    key: &str,
    headers: &HeaderMap,
    body: axum::body::Bytes,
) -> Result<Response, S3Error> {
    let body = if is_aws_chunked(headers.get("x-amz-content-sha256").and_then(|v| v.to_str().ok())) {
        bytes::Bytes::from(decode_aws_chunked(&body)?)
    } else {
        body
    };

    let _guard = state.locks().write(&object_key(bucket, key)).await;
    let bucket_cfg = state.buckets().get_bucket(bucket).await?;

    let sse = extract_sse(headers);
    if let Some(info) = &sse {
        if let Some(kid) = &info.kms_key_id {
            if !state.kms().is_known(kid) {
                return Err(S3Error::KmsKeyUnknown(format!("KMS key {kid} is not recognized")));
            }
        }
    }

    let acl = headers
        .get("x-amz-acl")
        .and_then(|v| v.to_str().ok())
        .and_then(CannedAcl::parse)
        .unwrap_or(CannedAcl::Private)
        .expand(&synthetic_owner());

    let tags = headers
        .get("x-amz-tagging")
        .and_then(|v| v.to_str().ok())
        .map(|v| crate::api::headers::parse_tagging_query(v).map(TagSet))
        .transpose()?
        .unwrap_or_default();

    let expected_md5 = headers
        .get(header::CONTENT_MD5)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let (requested_checksum, expected_checksum) = extract_requested_checksum(headers);

    let versioning_enabled = bucket_cfg.versioning == VersioningState::Enabled;
    let version = state
        .objects()
        .put_object(
            bucket,
            key,
            body,
            versioning_enabled,
            NewObjectInput {
                system_metadata: extract_system_metadata(headers),
                user_metadata: extract_user_metadata(headers),
                tags,
                acl,
                expected_md5,
                requested_checksum,
                expected_checksum,
                sse,
                storage_class: headers
                    .get("x-amz-storage-class")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("STANDARD")
                    .to_string(),
            },
        )
        .await?;

    let mut resp_headers = vec![(header::ETAG, version.etag.clone())];
    if versioning_enabled {
        resp_headers.push((
            header::HeaderName::from_static("x-amz-version-id"),
            version.version_id.clone(),
        ));
    }
    Ok((StatusCode::OK, resp_headers).into_response())
}

async fn copy_object(
    state: &AppState,
    dest_bucket: &str,
    dest_key: &str,
    headers: &HeaderMap,
) -> Result<Response, S3Error> {
    let source = headers
        .get("x-amz-copy-source")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| S3Error::InvalidRequest("missing x-amz-copy-source".into()))?;
    let decoded = urlencoding::decode(source.trim_start_matches('/'))
        .map_err(|_| S3Error::InvalidRequest("malformed x-amz-copy-source".into()))?;
    let (src_bucket, rest) = decoded
        .split_once('/')
        .ok_or_else(|| S3Error::InvalidRequest("malformed x-amz-copy-source".into()))?;
    let (src_key, src_version) = match rest.split_once("?versionId=") {
        Some((k, v)) => (k, Some(v.to_string())),
        None => (rest, None),
    };

    let is_replace = headers
        .get("x-amz-metadata-directive")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("REPLACE"))
        .unwrap_or(false);

    if src_bucket == dest_bucket && src_key == dest_key && src_version.is_none() && !is_replace {
        return Err(S3Error::InvalidRequest(
            "cannot copy an object onto itself without changing metadata".into(),
        ));
    }

    // Acquire locks in a fixed lexicographic order across the two
    // (bucket, key) pairs so a concurrent reverse-direction copy can never
    // deadlock against this one. A self-copy takes a single write lock
    // rather than a read+write pair on the same key, which would deadlock.
    let src_lock_key = object_key(src_bucket, src_key);
    let dest_lock_key = object_key(dest_bucket, dest_key);
    let (_first, _second);
    if src_lock_key == dest_lock_key {
        _first = state.locks().write(&dest_lock_key).await;
        _second = None;
    } else if src_lock_key < dest_lock_key {
        _first = state.locks().read(&src_lock_key).await;
        _second = Some(state.locks().write(&dest_lock_key).await);
    } else {
        _second = Some(state.locks().write(&dest_lock_key).await);
        _first = state.locks().read(&src_lock_key).await;
    }

    let source_version = state
        .objects()
        .get_version(src_bucket, src_key, src_version.as_deref())
        .await?;
    let bytes = state
        .objects()
        .read_bytes(src_bucket, src_key, &source_version.version_id, None)
        .await?;

    let dest_bucket_cfg = state.buckets().get_bucket(dest_bucket).await?;
    let versioning_enabled = dest_bucket_cfg.versioning == VersioningState::Enabled;

    let input = if is_replace {
        NewObjectInput {
            system_metadata: extract_system_metadata(headers),
            user_metadata: extract_user_metadata(headers),
            tags: source_version.tags.clone(),
            acl: source_version.acl.clone(),
            expected_md5: None,
            requested_checksum: None,
            expected_checksum: None,
            sse: extract_sse(headers).or_else(|| source_version.sse.clone()),
            storage_class: headers
                .get("x-amz-storage-class")
                .and_then(|v| v.to_str().ok())
                .unwrap_or(&source_version.storage_class)
                .to_string(),
        }
    } else {
        NewObjectInput {
            system_metadata: source_version.system_metadata.clone(),
            user_metadata: source_version.user_metadata.clone(),
            tags: source_version.tags.clone(),
            acl: source_version.acl.clone(),
            expected_md5: None,
            requested_checksum: None,
            expected_checksum: None,
            sse: source_version.sse.clone(),
            storage_class: source_version.storage_class.clone(),
        }
    };

    let version = state
        .objects()
        .put_object(dest_bucket, dest_key, bytes, versioning_enabled, input)
        .await?;

    Ok(xml_response(responses::copy_object_result(
        &version.etag,
        version.last_modified,
    )))
}

async fn upload_part_copy(
    state: &AppState,
    dest_bucket: &str,
    dest_key: &str,
    upload_id: &str,
    part_number: u32,
    headers: &HeaderMap,
) -> Result<Response, S3Error> {
    let source = headers
        .get("x-amz-copy-source")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| S3Error::InvalidRequest("missing x-amz-copy-source".into()))?;
    let decoded = urlencoding::decode(source.trim_start_matches('/'))
        .map_err(|_| S3Error::InvalidRequest("malformed x-amz-copy-source".into()))?;
    let (src_bucket, src_key) = decoded
        .split_once('/')
        .ok_or_else(|| S3Error::InvalidRequest("malformed x-amz-copy-source".into()))?;

    let source_version = state.objects().get_version(src_bucket, src_key, None).await?;
    let copy_range_spec = headers
        .get("x-amz-copy-source-range")
        .and_then(|v| v.to_str().ok())
        .map(parse_range_header)
        .transpose()?;
    let range = match copy_range_spec {
        Some(spec) => {
            let (s, e) = spec.as_start_end();
            resolve_range(s, e, source_version.size)?
        }
        None => None,
    };
    let bytes = state
        .objects()
        .read_bytes(src_bucket, src_key, &source_version.version_id, range)
        .await?;

    let _guard = state.locks().write(&object_key(dest_bucket, dest_key)).await;
    let part = state
        .multipart()
        .upload_part(dest_bucket, dest_key, upload_id, part_number, bytes)
        .await?;

    Ok(xml_response(responses::copy_part_result(&part.etag, part.last_modified)))
}

async fn put_object_tagging(
    state: &AppState,
    bucket: &str,
    key: &str,
    body: &[u8],
) -> Result<Response, S3Error> {
    let _guard = state.locks().write(&object_key(bucket, key)).await;
    let xml = body_to_utf8(body)?;
    let req = TaggingRequest::from_xml(xml).map_err(|e| S3Error::MalformedXml(e.to_string()))?;
    let pairs = req.into_pairs();
    TagSet(pairs.clone()).validate().map_err(S3Error::InvalidTag)?;

    let mut version = state.objects().get_version(bucket, key, None).await?;
    version.tags = TagSet(pairs);
    state.objects().update_version_metadata(&version).await?;
    Ok(StatusCode::OK.into_response())
}

async fn put_object_acl(state: &AppState, bucket: &str, key: &str, headers: &HeaderMap) -> Result<Response, S3Error> {
    let _guard = state.locks().write(&object_key(bucket, key)).await;
    let canned = headers
        .get("x-amz-acl")
        .and_then(|v| v.to_str().ok())
        .and_then(CannedAcl::parse)
        .unwrap_or(CannedAcl::Private);

    let mut version = state.objects().get_version(bucket, key, None).await?;
    version.acl = canned.expand(&version.acl.owner.clone());
    state.objects().update_version_metadata(&version).await?;
    Ok(StatusCode::OK.into_response())
}

async fn put_object_retention(
    state: &AppState,
    bucket: &str,
    key: &str,
    body: &[u8],
) -> Result<Response, S3Error> {
    let _guard = state.locks().write(&object_key(bucket, key)).await;
    let xml = body_to_utf8(body)?;
    let req = RetentionRequest::from_xml(xml).map_err(|e| S3Error::MalformedXml(e.to_string()))?;
    let mode = match req.mode.as_str() {
        "GOVERNANCE" => RetentionMode::Governance,
        "COMPLIANCE" => RetentionMode::Compliance,
        other => return Err(S3Error::InvalidRequest(format!("unknown retention mode {other}"))),
    };
    let retain_until = chrono::DateTime::parse_from_rfc3339(&req.retain_until)
        .map_err(|_| S3Error::InvalidRequest("malformed RetainUntilDate".into()))?
        .with_timezone(&chrono::Utc);

    let mut version = state.objects().get_version(bucket, key, None).await?;
    let now = chrono::Utc::now();
    if let Some(existing) = &version.retention {
        let still_in_force = existing.mode == RetentionMode::Compliance && now < existing.retain_until;
        let shortened = mode != RetentionMode::Compliance || retain_until < existing.retain_until;
        if still_in_force && shortened {
            return Err(S3Error::AccessDenied(
                "retention period cannot be shortened or removed while in COMPLIANCE mode".into(),
            ));
        }
    }
    version.retention = Some(Retention { mode, retain_until });
    state.objects().update_version_metadata(&version).await?;
    Ok(StatusCode::OK.into_response())
}

async fn put_object_legal_hold(
    state: &AppState,
    bucket: &str,
    key: &str,
    body: &[u8],
) -> Result<Response, S3Error> {
    let _guard = state.locks().write(&object_key(bucket, key)).await;
    let xml = body_to_utf8(body)?;
    let req = LegalHoldRequest::from_xml(xml).map_err(|e| S3Error::MalformedXml(e.to_string()))?;

    let mut version = state.objects().get_version(bucket, key, None).await?;
    version.legal_hold = req.is_on();
    state.objects().update_version_metadata(&version).await?;
    Ok(StatusCode::OK.into_response())
}

pub async fn get_object(
    State(state): State<AppState>,
    ValidatedPath { bucket, key }: ValidatedPath,
    Query(q): Query<ObjectQuery>,
    headers: HeaderMap,
) -> Result<Response, S3Error> {
    if let Some(upload_id) = &q.upload_id {
        return super::multipart::list_parts(&state, &bucket, &key, upload_id).await;
    }

    let _guard = state.locks().read(&object_key(&bucket, &key)).await;
    let version = state
        .objects()
        .get_version(&bucket, &key, q.version_id.as_deref())
        .await?;
    if version.delete_marker {
        return Err(S3Error::NoSuchKey(key));
    }

    if q.tagging.is_some() {
        return Ok(xml_response(responses::tagging(&version.tags.0)));
    }
    if q.acl.is_some() {
        return Ok(xml_response(responses::access_control_policy(&version.acl)));
    }
    if q.retention.is_some() {
        let r = version
            .retention
            .ok_or_else(|| S3Error::InvalidRequest("no retention configured".into()))?;
        return Ok(xml_response(responses::retention(r.mode, r.retain_until)));
    }
    if q.legal_hold.is_some() {
        return Ok(xml_response(responses::legal_hold(version.legal_hold)));
    }

    check_conditional_get(&headers, &version.etag, version.last_modified)?;

    let range_spec = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(parse_range_header)
        .transpose()?;
    let range = match range_spec {
        Some(spec) => {
            let (s, e) = spec.as_start_end();
            resolve_range(s, e, version.size)?
        }
        None => None,
    };

    let bytes = state
        .objects()
        .read_bytes(&bucket, &key, &version.version_id, range)
        .await?;

    let mut resp_headers = vec![
        (header::ETAG, version.etag.clone()),
        (header::CONTENT_LENGTH, bytes.len().to_string()),
        (header::LAST_MODIFIED, version.last_modified.to_rfc2822()),
    ];
    if let Some(ct) = &version.system_metadata.content_type {
        resp_headers.push((header::CONTENT_TYPE, ct.clone()));
    }
    let status = if range.is_some() {
        if let Some(r) = range {
            resp_headers.push((
                header::CONTENT_RANGE,
                format!("bytes {}-{}/{}", r.start, r.end, version.size),
            ));
        }
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    Ok((status, resp_headers, bytes).into_response())
}

pub async fn head_object(
    State(state): State<AppState>,
    ValidatedPath { bucket, key }: ValidatedPath,
    Query(q): Query<ObjectQuery>,
    headers: HeaderMap,
) -> Result<Response, S3Error> {
    let _guard = state.locks().read(&object_key(&bucket, &key)).await;
    let version = state
        .objects()
        .get_version(&bucket, &key, q.version_id.as_deref())
        .await?;
    if version.delete_marker {
        return Err(S3Error::NoSuchKey(key));
    }
    check_conditional_get(&headers, &version.etag, version.last_modified)?;

    let mut resp_headers = vec![
        (header::ETAG, version.etag.clone()),
        (header::CONTENT_LENGTH, version.size.to_string()),
        (header::LAST_MODIFIED, version.last_modified.to_rfc2822()),
    ];
    if let Some(ct) = &version.system_metadata.content_type {
        resp_headers.push((header::CONTENT_TYPE, ct.clone()));
    }
    Ok((StatusCode::OK, resp_headers).into_response())
}

pub async fn delete_object(
    State(state): State<AppState>,
    ValidatedPath { bucket, key }: ValidatedPath,
    Query(q): Query<ObjectQuery>,
) -> Result<Response, S3Error> {
    if let Some(upload_id) = &q.upload_id {
        return super::multipart::abort_multipart_upload(&state, &bucket, &key, upload_id).await;
    }

    let _guard = state.locks().write(&object_key(&bucket, &key)).await;
    let bucket_cfg = match state.buckets().get_bucket(&bucket).await {
        Ok(b) => b,
        Err(_) => return Ok(StatusCode::NO_CONTENT.into_response()),
    };

    let marker = state
        .objects()
        .delete_object(&bucket, &key, q.version_id.as_deref(), bucket_cfg.versioning)
        .await?;

    let mut resp_headers = Vec::new();
    if let Some(m) = marker {
        resp_headers.push((
            header::HeaderName::from_static("x-amz-delete-marker"),
            "true".to_string(),
        ));
        resp_headers.push((
            header::HeaderName::from_static("x-amz-version-id"),
            m.version_id,
        ));
    }
    Ok((StatusCode::NO_CONTENT, resp_headers).into_response())
}

pub async fn post_object(
    State(state): State<AppState>,
    ValidatedPath { bucket, key }: ValidatedPath,
    Query(q): Query<ObjectQuery>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Response, S3Error> {
    if q.uploads.is_some() {
        return super::multipart::initiate_multipart_upload(&state, &bucket, &key, &headers).await;
    }
    if let Some(upload_id) = &q.upload_id {
        return super::multipart::complete_multipart_upload(&state, &bucket, &key, upload_id, &body).await;
    }
    Err(S3Error::InvalidRequest("unsupported POST operation on object".into()))
}

#[derive(Debug, Deserialize)]
pub struct BucketPostQuery {
    pub delete: Option<String>,
}

pub async fn delete_objects(
    State(state): State<AppState>,
    ValidatedBucket(bucket): ValidatedBucket,
    Query(q): Query<BucketPostQuery>,
    body: axum::body::Bytes,
) -> Result<Response, S3Error> {
    if q.delete.is_none() {
        return Err(S3Error::InvalidRequest("unsupported POST operation on bucket".into()));
    }
    let xml = body_to_utf8(&body)?;
    let req = crate::xml::requests::DeleteRequest::from_xml(xml)
        .map_err(|e| S3Error::MalformedXml(e.to_string()))?;

    let bucket_cfg = state.buckets().get_bucket(&bucket).await?;

    let mut deleted = Vec::new();
    let mut errors = Vec::new();
    for obj in &req.objects {
        let _guard = state.locks().write(&object_key(&bucket, &obj.key)).await;
        match state
            .objects()
            .delete_object(&bucket, &obj.key, obj.version_id.as_deref(), bucket_cfg.versioning)
            .await
        {
            Ok(marker) => deleted.push((obj.key.clone(), obj.version_id.clone(), marker)),
            Err(e) => {
                let s3_err: S3Error = e.into();
                errors.push((obj.key.clone(), s3_err.code().to_string(), s3_err.to_string()));
            }
        }
    }

    let deleted_entries: Vec<responses::DeletedEntry> = deleted
        .iter()
        .map(|(key, version_id, marker)| responses::DeletedEntry {
            key,
            version_id: version_id.as_deref(),
            delete_marker: marker.is_some(),
        })
        .collect();
    let error_entries: Vec<responses::DeleteErrorEntry> = errors
        .iter()
        .map(|(key, code, message)| responses::DeleteErrorEntry { key, code, message })
        .collect();

    Ok(xml_response(responses::delete_result(
        &deleted_entries,
        &error_entries,
        req.quiet,
    )))
}
