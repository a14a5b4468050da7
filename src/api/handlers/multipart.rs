//! Multipart upload handlers: create, upload part, list parts, list
//! uploads, abort, complete.

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::api::errors::S3Error;
use crate::api::state::AppState;
use crate::multipart::NewUploadInput;
use crate::store::locks::object_key;
use crate::types::synthetic_owner;
use crate::xml::requests::CompleteMultipartUploadRequest;
use crate::xml::responses;

use super::{body_to_utf8, extract_sse, extract_system_metadata, extract_user_metadata, xml_response};

pub async fn initiate_multipart_upload(
    state: &AppState,
    bucket: &str,
    key: &str,
    headers: &HeaderMap,
) -> Result<Response, S3Error> {
    let input = NewUploadInput {
        storage_class: headers
            .get("x-amz-storage-class")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("STANDARD")
            .to_string(),
        system_metadata: extract_system_metadata(headers),
        user_metadata: extract_user_metadata(headers),
        tags: headers
            .get("x-amz-tagging")
            .and_then(|v| v.to_str().ok())
            .map(|v| crate::types::TagSet(crate::api::headers::parse_tagging_query(v).unwrap_or_default()))
            .unwrap_or_default(),
        sse: extract_sse(headers),
    };
    if let Some(sse) = &input.sse {
        if let Some(key_id) = &sse.kms_key_id {
            if !state.kms().is_known(key_id) {
                return Err(S3Error::KmsKeyUnknown(format!("KMS key {key_id} is not recognized")));
            }
        }
    }
    let meta = state.multipart().create(bucket, key, input).await?;
    state.metrics().active_multipart_uploads.inc();
    Ok(xml_response(responses::initiate_multipart_upload_result(
        bucket,
        key,
        &meta.upload_id,
    )))
}

pub async fn upload_part(
    state: &AppState,
    bucket: &str,
    key: &str,
    upload_id: &str,
    part_number: u32,
    body: axum::body::Bytes,
) -> Result<Response, S3Error> {
    let _guard = state.locks().write(&object_key(bucket, key)).await;
    let part = state
        .multipart()
        .upload_part(bucket, key, upload_id, part_number, body)
        .await?;
    Ok((StatusCode::OK, [(header::ETAG, part.etag)]).into_response())
}

pub async fn list_parts(
    state: &AppState,
    bucket: &str,
    key: &str,
    upload_id: &str,
) -> Result<Response, S3Error> {
    let parts = state.multipart().list_parts(bucket, key, upload_id).await?;
    Ok(xml_response(responses::list_parts_result(
        bucket,
        key,
        upload_id,
        &synthetic_owner(),
        &parts,
        false,
    )))
}

pub async fn list_multipart_uploads(state: &AppState, bucket: &str) -> Result<Response, S3Error> {
    let uploads = state.multipart().list_uploads(bucket).await?;
    Ok(xml_response(responses::list_multipart_uploads_result(bucket, &uploads)))
}

pub async fn abort_multipart_upload(
    state: &AppState,
    bucket: &str,
    key: &str,
    upload_id: &str,
) -> Result<Response, S3Error> {
    state.multipart().abort(bucket, key, upload_id).await?;
    state.metrics().active_multipart_uploads.dec();
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn complete_multipart_upload(
    state: &AppState,
    bucket: &str,
    key: &str,
    upload_id: &str,
    body: &[u8],
) -> Result<Response, S3Error> {
    let xml = body_to_utf8(body)?;
    let req =
        CompleteMultipartUploadRequest::from_xml(xml).map_err(|e| S3Error::MalformedXml(e.to_string()))?;
    let requested_parts: Vec<(u32, String)> =
        req.parts.into_iter().map(|p| (p.part_number, p.etag)).collect();

    let _guard = state.locks().write(&object_key(bucket, key)).await;

    let (bytes, etag, _size, meta) = state
        .multipart()
        .complete(bucket, key, upload_id, requested_parts)
        .await?;

    let bucket_cfg = state.buckets().get_bucket(bucket).await?;
    let versioning_enabled = bucket_cfg.versioning == crate::types::VersioningState::Enabled;

    let mut version = crate::types::ObjectVersion::new_put(
        bucket.to_string(),
        key.to_string(),
        String::new(),
        0,
        etag.clone(),
    );
    version.system_metadata = meta.system_metadata;
    version.user_metadata = meta.user_metadata;
    version.tags = meta.tags;
    version.sse = meta.sse;
    version.storage_class = meta.storage_class;

    state
        .objects()
        .put_assembled_version(bucket, key, bytes, versioning_enabled, version)
        .await?;
    state.metrics().active_multipart_uploads.dec();

    Ok(xml_response(responses::complete_multipart_upload_result(
        bucket, key, &etag,
    )))
}
