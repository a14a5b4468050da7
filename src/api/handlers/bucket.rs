//! Bucket-level handlers: creation/deletion, listing objects, and the
//! bucket sub-resources (versioning, tagging, acl, cors, lifecycle, policy,
//! encryption, object-lock, ownership controls, multipart upload listing).

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::api::errors::S3Error;
use crate::api::extractors::ValidatedBucket;
use crate::api::state::AppState;
use crate::store::locks::bucket_key;
use crate::types::{
    synthetic_owner, CannedAcl, ObjectOwnership, SseAlgorithm, SseDefaultConfig, VersioningState,
};
use crate::xml::requests::{
    CorsConfigurationRequest, LifecycleConfigurationRequest, TaggingRequest,
    VersioningConfigurationRequest,
};
use crate::xml::responses;

use super::{body_to_utf8, xml_response};

#[derive(Debug, Deserialize, Default)]
pub struct BucketQuery {
    pub location: Option<String>,
    pub versioning: Option<String>,
    pub acl: Option<String>,
    pub tagging: Option<String>,
    pub policy: Option<String>,
    pub cors: Option<String>,
    pub lifecycle: Option<String>,
    #[serde(rename = "object-lock")]
    pub object_lock: Option<String>,
    #[serde(rename = "ownershipControls")]
    pub ownership_controls: Option<String>,
    pub encryption: Option<String>,
    pub uploads: Option<String>,
    #[serde(rename = "list-type")]
    pub list_type: Option<u32>,
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
    #[serde(rename = "max-keys")]
    pub max_keys: Option<u32>,
    #[serde(rename = "continuation-token")]
    pub continuation_token: Option<String>,
    pub marker: Option<String>,
    #[serde(rename = "start-after")]
    pub start_after: Option<String>,
    #[serde(rename = "key-marker")]
    pub key_marker: Option<String>,
    #[serde(rename = "version-id-marker")]
    pub version_id_marker: Option<String>,
    pub versions: Option<String>,
    pub delete: Option<String>,
}

const DEFAULT_MAX_KEYS: u32 = 1000;

pub async fn list_buckets(State(state): State<AppState>) -> Result<Response, S3Error> {
    let buckets = state.buckets().list_buckets().await?;
    Ok(xml_response(responses::list_all_my_buckets_result(
        &buckets,
        &synthetic_owner(),
    )))
}

pub async fn head_root() -> impl IntoResponse {
    (StatusCode::OK, [(header::SERVER, "s3emu")])
}

pub async fn create_bucket(
    State(state): State<AppState>,
    ValidatedBucket(bucket): ValidatedBucket,
    Query(q): Query<BucketQuery>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Response, S3Error> {
    let _guard = state.locks().write(&bucket_key(&bucket)).await;

    if q.versioning.is_some() {
        return put_bucket_versioning(&state, &bucket, &body).await;
    }
    if q.tagging.is_some() {
        return put_bucket_tagging(&state, &bucket, &body).await;
    }
    if q.acl.is_some() {
        return put_bucket_acl(&state, &bucket, &headers).await;
    }
    if q.cors.is_some() {
        return put_bucket_cors(&state, &bucket, &body).await;
    }
    if q.lifecycle.is_some() {
        return put_bucket_lifecycle(&state, &bucket, &body).await;
    }
    if q.policy.is_some() {
        return put_bucket_policy(&state, &bucket, &body).await;
    }
    if q.encryption.is_some() {
        return put_bucket_encryption(&state, &bucket, &body).await;
    }
    if q.object_lock.is_some() {
        return put_bucket_object_lock(&state, &bucket, &body).await;
    }
    if q.ownership_controls.is_some() {
        return put_bucket_ownership_controls(&state, &bucket, &body).await;
    }

    let region = headers
        .get("x-amz-bucket-location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or(&state.config().region)
        .to_string();
    let ownership = headers
        .get("x-amz-object-ownership")
        .and_then(|v| v.to_str().ok())
        .and_then(ObjectOwnership::parse)
        .unwrap_or_default();

    state.buckets().create_bucket(&bucket, &region, ownership).await?;
    Ok((
        StatusCode::OK,
        [(header::LOCATION, format!("/{bucket}"))],
    )
        .into_response())
}

async fn put_bucket_versioning(state: &AppState, bucket: &str, body: &[u8]) -> Result<Response, S3Error> {
    let mut b = state.buckets().get_bucket(bucket).await?;
    let xml = body_to_utf8(body)?;
    let req = VersioningConfigurationRequest::from_xml(xml)
        .map_err(|e| S3Error::MalformedXml(e.to_string()))?;
    b.versioning = match req.status.as_deref() {
        Some("Enabled") => VersioningState::Enabled,
        Some("Suspended") => VersioningState::Suspended,
        _ => VersioningState::Unversioned,
    };
    state.buckets().write_metadata(&b).await?;
    Ok(StatusCode::OK.into_response())
}

async fn put_bucket_tagging(state: &AppState, bucket: &str, body: &[u8]) -> Result<Response, S3Error> {
    let mut b = state.buckets().get_bucket(bucket).await?;
    let xml = body_to_utf8(body)?;
    let req = TaggingRequest::from_xml(xml).map_err(|e| S3Error::MalformedXml(e.to_string()))?;
    b.tags = crate::types::bucket::TagSet(req.into_pairs());
    state.buckets().write_metadata(&b).await?;
    Ok(StatusCode::OK.into_response())
}

async fn put_bucket_acl(state: &AppState, bucket: &str, headers: &HeaderMap) -> Result<Response, S3Error> {
    let mut b = state.buckets().get_bucket(bucket).await?;
    let canned = headers
        .get("x-amz-acl")
        .and_then(|v| v.to_str().ok())
        .and_then(CannedAcl::parse)
        .unwrap_or(CannedAcl::Private);
    b.acl = canned.expand(&b.acl.owner.clone());
    state.buckets().write_metadata(&b).await?;
    Ok(StatusCode::OK.into_response())
}

async fn put_bucket_cors(state: &AppState, bucket: &str, body: &[u8]) -> Result<Response, S3Error> {
    let mut b = state.buckets().get_bucket(bucket).await?;
    let xml = body_to_utf8(body)?;
    let req = CorsConfigurationRequest::from_xml(xml).map_err(|e| S3Error::MalformedXml(e.to_string()))?;
    b.cors = Some(req.into_config());
    state.buckets().write_metadata(&b).await?;
    Ok(StatusCode::OK.into_response())
}

async fn put_bucket_lifecycle(state: &AppState, bucket: &str, body: &[u8]) -> Result<Response, S3Error> {
    let mut b = state.buckets().get_bucket(bucket).await?;
    let xml = body_to_utf8(body)?;
    let req =
        LifecycleConfigurationRequest::from_xml(xml).map_err(|e| S3Error::MalformedXml(e.to_string()))?;
    b.lifecycle = Some(req.into_config());
    state.buckets().write_metadata(&b).await?;
    Ok(StatusCode::OK.into_response())
}

async fn put_bucket_policy(state: &AppState, bucket: &str, body: &[u8]) -> Result<Response, S3Error> {
    let mut b = state.buckets().get_bucket(bucket).await?;
    let text = body_to_utf8(body)?;
    b.policy = Some(crate::types::BucketPolicy(text.to_string()));
    state.buckets().write_metadata(&b).await?;
    Ok(StatusCode::OK.into_response())
}

async fn put_bucket_encryption(state: &AppState, bucket: &str, body: &[u8]) -> Result<Response, S3Error> {
    let mut b = state.buckets().get_bucket(bucket).await?;
    let xml = body_to_utf8(body)?;
    // Minimal inline parse: look for the algorithm and optional KMS key id.
    let algorithm = if xml.contains("aws:kms") {
        SseAlgorithm::AwsKms
    } else {
        SseAlgorithm::Aes256
    };
    let kms_key_id = extract_tag_value(xml, "KMSMasterKeyID");
    if let (SseAlgorithm::AwsKms, Some(key_id)) = (algorithm, &kms_key_id) {
        if !state.kms().is_known(key_id) {
            return Err(S3Error::KmsKeyUnknown(format!("KMS key {key_id} is not recognized")));
        }
    }
    b.default_encryption = Some(SseDefaultConfig { algorithm, kms_key_id });
    state.buckets().write_metadata(&b).await?;
    Ok(StatusCode::OK.into_response())
}

async fn put_bucket_object_lock(state: &AppState, bucket: &str, body: &[u8]) -> Result<Response, S3Error> {
    let mut b = state.buckets().get_bucket(bucket).await?;
    let xml = body_to_utf8(body)?;
    let enabled = extract_tag_value(xml, "ObjectLockEnabled").as_deref() == Some("Enabled");
    let mode = extract_tag_value(xml, "Mode").and_then(|m| match m.as_str() {
        "GOVERNANCE" => Some(crate::types::RetentionMode::Governance),
        "COMPLIANCE" => Some(crate::types::RetentionMode::Compliance),
        _ => None,
    });
    let days = extract_tag_value(xml, "Days").and_then(|d| d.parse().ok());
    let years = extract_tag_value(xml, "Years").and_then(|y| y.parse().ok());
    b.object_lock = Some(crate::types::ObjectLockConfiguration {
        enabled,
        default_retention_mode: mode,
        default_retention_days: days,
        default_retention_years: years,
    });
    state.buckets().write_metadata(&b).await?;
    Ok(StatusCode::OK.into_response())
}

async fn put_bucket_ownership_controls(
    state: &AppState,
    bucket: &str,
    body: &[u8],
) -> Result<Response, S3Error> {
    let mut b = state.buckets().get_bucket(bucket).await?;
    let xml = body_to_utf8(body)?;
    let ownership = extract_tag_value(xml, "ObjectOwnership")
        .as_deref()
        .and_then(ObjectOwnership::parse)
        .unwrap_or_default();
    b.ownership = ownership;
    state.buckets().write_metadata(&b).await?;
    Ok(StatusCode::OK.into_response())
}

fn extract_tag_value(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(xml[start..end].to_string())
}

pub async fn bucket_get_handler(
    State(state): State<AppState>,
    ValidatedBucket(bucket): ValidatedBucket,
    Query(q): Query<BucketQuery>,
) -> Result<Response, S3Error> {
    if q.location.is_some() {
        let b = state.buckets().get_bucket(&bucket).await?;
        return Ok(xml_response(responses::location_constraint(&b.region)));
    }
    if q.versioning.is_some() {
        let b = state.buckets().get_bucket(&bucket).await?;
        return Ok(xml_response(responses::versioning_configuration(b.versioning)));
    }
    if q.acl.is_some() {
        let b = state.buckets().get_bucket(&bucket).await?;
        return Ok(xml_response(responses::access_control_policy(&b.acl)));
    }
    if q.tagging.is_some() {
        let b = state.buckets().get_bucket(&bucket).await?;
        return Ok(xml_response(responses::tagging(&b.tags.0)));
    }
    if q.cors.is_some() {
        let b = state.buckets().get_bucket(&bucket).await?;
        let cors = b.cors.unwrap_or_default();
        return Ok(xml_response(responses::cors_configuration(&cors)));
    }
    if q.lifecycle.is_some() {
        let b = state.buckets().get_bucket(&bucket).await?;
        let lifecycle = b.lifecycle.unwrap_or_default();
        return Ok(xml_response(responses::lifecycle_configuration(&lifecycle)));
    }
    if q.policy.is_some() {
        let b = state.buckets().get_bucket(&bucket).await?;
        let policy = b
            .policy
            .ok_or_else(|| S3Error::InvalidRequest("no bucket policy".into()))?;
        return Ok((StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], policy.0).into_response());
    }
    if q.encryption.is_some() {
        let b = state.buckets().get_bucket(&bucket).await?;
        let cfg = b
            .default_encryption
            .ok_or_else(|| S3Error::InvalidRequest("no default encryption configuration".into()))?;
        return Ok(xml_response(responses::server_side_encryption_configuration(&cfg)));
    }
    if q.object_lock.is_some() {
        let b = state.buckets().get_bucket(&bucket).await?;
        let cfg = b.object_lock.unwrap_or_default();
        return Ok(xml_response(format!(
            "{}\n<ObjectLockConfiguration xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\"><ObjectLockEnabled>{}</ObjectLockEnabled></ObjectLockConfiguration>",
            crate::xml::XML_DECLARATION,
            if cfg.enabled { "Enabled" } else { "Disabled" }
        )));
    }
    if q.ownership_controls.is_some() {
        let b = state.buckets().get_bucket(&bucket).await?;
        return Ok(xml_response(responses::ownership_controls(b.ownership)));
    }
    if q.uploads.is_some() {
        return super::multipart::list_multipart_uploads(&state, &bucket).await;
    }

    let max_keys = q.max_keys.unwrap_or(DEFAULT_MAX_KEYS).min(DEFAULT_MAX_KEYS);
    let is_v2 = q.list_type == Some(2);
    let with_versions = q.versions.is_some();

    if with_versions {
        return list_object_versions(&state, &bucket, &q, max_keys).await;
    }

    let mut versions = state.objects().list_current_versions(&bucket).await?;

    if let Some(prefix) = q.prefix.as_deref().filter(|p| !p.is_empty()) {
        versions.retain(|v| v.key.starts_with(prefix));
    }

    let start_after = if is_v2 {
        q.continuation_token.clone().or_else(|| q.start_after.clone())
    } else {
        q.marker.clone()
    };
    if let Some(after) = start_after.as_deref().filter(|a| !a.is_empty()) {
        versions.retain(|v| v.key.as_str() > after);
    }

    let (contents, common_prefixes, next_marker, is_truncated) =
        apply_delimiter_and_page(versions, q.delimiter.as_deref(), max_keys);

    let key_count = contents.len() as u32 + common_prefixes.len() as u32;
    let params = responses::ListObjectsParams {
        bucket: &bucket,
        prefix: q.prefix.as_deref(),
        delimiter: q.delimiter.as_deref(),
        max_keys,
        is_truncated,
        key_count,
        marker: q.marker.as_deref(),
        next_marker: if is_v2 { None } else { next_marker.as_deref() },
        continuation_token: q.continuation_token.as_deref(),
        next_continuation_token: if is_v2 { next_marker.as_deref() } else { None },
        start_after: q.start_after.as_deref(),
        is_v2,
    };
    Ok(xml_response(responses::list_bucket_result(
        &params,
        &contents,
        &common_prefixes,
    )))
}

async fn list_object_versions(
    state: &AppState,
    bucket: &str,
    q: &BucketQuery,
    max_keys: u32,
) -> Result<Response, S3Error> {
    let mut all = state.objects().list_all_versions(bucket).await?;
    if let Some(prefix) = q.prefix.as_deref().filter(|p| !p.is_empty()) {
        all.retain(|v| v.key.starts_with(prefix));
    }
    if let Some(after) = q.key_marker.as_deref().filter(|a| !a.is_empty()) {
        all.retain(|v| v.key.as_str() >= after);
    }

    let mut latest_seen: std::collections::HashSet<String> = std::collections::HashSet::new();
    let mut tagged: Vec<(crate::types::ObjectVersion, bool)> = Vec::new();
    for v in all {
        let is_latest = latest_seen.insert(v.key.clone());
        tagged.push((v, is_latest));
    }

    let truncated = tagged.len() > max_keys as usize;
    tagged.truncate(max_keys as usize);

    let mut common_prefixes: Vec<String> = Vec::new();
    if let Some(delim) = q.delimiter.as_deref() {
        let mut seen = std::collections::BTreeSet::new();
        tagged.retain(|(v, _)| {
            let rest = q
                .prefix
                .as_deref()
                .and_then(|p| v.key.strip_prefix(p))
                .unwrap_or(&v.key);
            if let Some(idx) = rest.find(delim) {
                let prefix_len = q.prefix.as_deref().map(|p| p.len()).unwrap_or(0) + idx + delim.len();
                seen.insert(v.key[..prefix_len].to_string());
                false
            } else {
                true
            }
        });
        common_prefixes = seen.into_iter().collect();
    }

    Ok(xml_response(responses::list_versions_result(
        bucket,
        q.prefix.as_deref(),
        q.delimiter.as_deref(),
        max_keys,
        truncated,
        q.key_marker.as_deref(),
        q.version_id_marker.as_deref(),
        None,
        None,
        &tagged,
        &common_prefixes,
    )))
}

enum Entry {
    Object(crate::types::ObjectVersion),
    Prefix(String),
}

impl Entry {
    fn key(&self) -> &str {
        match self {
            Entry::Object(v) => &v.key,
            Entry::Prefix(p) => p,
        }
    }
}

fn apply_delimiter_and_page(
    mut versions: Vec<crate::types::ObjectVersion>,
    delimiter: Option<&str>,
    max_keys: u32,
) -> (Vec<crate::types::ObjectVersion>, Vec<String>, Option<String>, bool) {
    versions.sort_by(|a, b| a.key.cmp(&b.key));

    let mut seen_prefixes = std::collections::BTreeSet::new();
    let mut entries = Vec::new();

    for v in versions {
        if let Some(delim) = delimiter {
            if let Some(idx) = v.key.find(delim) {
                let prefix = v.key[..idx + delim.len()].to_string();
                if seen_prefixes.insert(prefix.clone()) {
                    entries.push(Entry::Prefix(prefix));
                }
                continue;
            }
        }
        entries.push(Entry::Object(v));
    }
    entries.sort_by(|a, b| a.key().cmp(b.key()));

    let is_truncated = entries.len() > max_keys as usize;
    let next_marker = if is_truncated {
        Some(entries[max_keys as usize - 1].key().to_string())
    } else {
        None
    };
    entries.truncate(max_keys as usize);

    let mut contents = Vec::new();
    let mut common_prefixes = Vec::new();
    for e in entries {
        match e {
            Entry::Object(v) => contents.push(v),
            Entry::Prefix(p) => common_prefixes.push(p),
        }
    }

    (contents, common_prefixes, next_marker, is_truncated)
}

pub async fn delete_bucket(
    State(state): State<AppState>,
    ValidatedBucket(bucket): ValidatedBucket,
    Query(q): Query<BucketQuery>,
) -> Result<Response, S3Error> {
    let _guard = state.locks().write(&bucket_key(&bucket)).await;

    if q.tagging.is_some() {
        let mut b = state.buckets().get_bucket(&bucket).await?;
        b.tags = crate::types::bucket::TagSet::default();
        state.buckets().write_metadata(&b).await?;
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    if q.cors.is_some() {
        let mut b = state.buckets().get_bucket(&bucket).await?;
        b.cors = None;
        state.buckets().write_metadata(&b).await?;
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    if q.lifecycle.is_some() {
        let mut b = state.buckets().get_bucket(&bucket).await?;
        b.lifecycle = None;
        state.buckets().write_metadata(&b).await?;
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    if q.policy.is_some() {
        let mut b = state.buckets().get_bucket(&bucket).await?;
        b.policy = None;
        state.buckets().write_metadata(&b).await?;
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    if q.encryption.is_some() {
        let mut b = state.buckets().get_bucket(&bucket).await?;
        b.default_encryption = None;
        state.buckets().write_metadata(&b).await?;
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    state.buckets().delete_bucket(&bucket).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn head_bucket(
    State(state): State<AppState>,
    ValidatedBucket(bucket): ValidatedBucket,
) -> Result<Response, S3Error> {
    if !state.buckets().bucket_exists(&bucket).await {
        return Err(S3Error::NoSuchBucket(bucket));
    }
    Ok(StatusCode::OK.into_response())
}

