//! Response-side XML builders, one function per S3 operation response shape.

use crate::types::{
    Acl, Bucket, Grantee, ObjectVersion, Owner, Permission, PartRecord, UploadMetadata,
};

use super::{escape_xml, format_timestamp, XML_DECLARATION};

fn owner_xml(owner: &Owner) -> String {
    format!(
        "<Owner><ID>{}</ID><DisplayName>{}</DisplayName></Owner>",
        escape_xml(&owner.id),
        escape_xml(&owner.display_name)
    )
}

pub fn list_all_my_buckets_result(buckets: &[Bucket], owner: &Owner) -> String {
    let mut body = String::new();
    for b in buckets {
        body.push_str(&format!(
            "<Bucket><Name>{}</Name><CreationDate>{}</CreationDate></Bucket>",
            escape_xml(&b.name),
            format_timestamp(b.creation_date)
        ));
    }
    format!(
        "{XML_DECLARATION}\n<ListAllMyBucketsResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">{}<Buckets>{body}</Buckets></ListAllMyBucketsResult>",
        owner_xml(owner)
    )
}

pub struct ListObjectsParams<'a> {
    pub bucket: &'a str,
    pub prefix: Option<&'a str>,
    pub delimiter: Option<&'a str>,
    pub max_keys: u32,
    pub is_truncated: bool,
    pub key_count: u32,
    /// v1 only
    pub marker: Option<&'a str>,
    pub next_marker: Option<&'a str>,
    /// v2 only
    pub continuation_token: Option<&'a str>,
    pub next_continuation_token: Option<&'a str>,
    pub start_after: Option<&'a str>,
    pub is_v2: bool,
}

fn contents_entry(v: &ObjectVersion) -> String {
    format!(
        "<Contents><Key>{}</Key><LastModified>{}</LastModified><ETag>{}</ETag><Size>{}</Size><StorageClass>{}</StorageClass>{}</Contents>",
        escape_xml(&v.key),
        format_timestamp(v.last_modified),
        escape_xml(&v.etag),
        v.size,
        escape_xml(&v.storage_class),
        owner_xml(&v.acl.owner),
    )
}

pub fn list_bucket_result(
    params: &ListObjectsParams,
    contents: &[ObjectVersion],
    common_prefixes: &[String],
) -> String {
    let mut body = String::new();
    body.push_str(&format!("<Name>{}</Name>", escape_xml(params.bucket)));
    if let Some(p) = params.prefix.filter(|p| !p.is_empty()) {
        body.push_str(&format!("<Prefix>{}</Prefix>", escape_xml(p)));
    } else {
        body.push_str("<Prefix></Prefix>");
    }
    if params.is_v2 {
        if let Some(t) = params.continuation_token {
            body.push_str(&format!("<ContinuationToken>{}</ContinuationToken>", escape_xml(t)));
        }
        if let Some(t) = params.next_continuation_token {
            body.push_str(&format!(
                "<NextContinuationToken>{}</NextContinuationToken>",
                escape_xml(t)
            ));
        }
        if let Some(s) = params.start_after {
            body.push_str(&format!("<StartAfter>{}</StartAfter>", escape_xml(s)));
        }
        body.push_str(&format!("<KeyCount>{}</KeyCount>", params.key_count));
    } else {
        if let Some(m) = params.marker {
            body.push_str(&format!("<Marker>{}</Marker>", escape_xml(m)));
        } else {
            body.push_str("<Marker></Marker>");
        }
        if let Some(m) = params.next_marker {
            body.push_str(&format!("<NextMarker>{}</NextMarker>", escape_xml(m)));
        }
    }
    body.push_str(&format!("<MaxKeys>{}</MaxKeys>", params.max_keys));
    if let Some(d) = params.delimiter {
        body.push_str(&format!("<Delimiter>{}</Delimiter>", escape_xml(d)));
    }
    body.push_str(&format!("<IsTruncated>{}</IsTruncated>", params.is_truncated));
    for c in contents {
        body.push_str(&contents_entry(c));
    }
    for p in common_prefixes {
        body.push_str(&format!(
            "<CommonPrefixes><Prefix>{}</Prefix></CommonPrefixes>",
            escape_xml(p)
        ));
    }
    let root = if params.is_v2 { "ListBucketResult" } else { "ListBucketResult" };
    format!(
        "{XML_DECLARATION}\n<{root} xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">{body}</{root}>"
    )
}

fn version_entry(v: &ObjectVersion, is_latest: bool) -> String {
    if v.delete_marker {
        format!(
            "<DeleteMarker><Key>{}</Key><VersionId>{}</VersionId><IsLatest>{}</IsLatest><LastModified>{}</LastModified>{}</DeleteMarker>",
            escape_xml(&v.key),
            escape_xml(&v.version_id),
            is_latest,
            format_timestamp(v.last_modified),
            owner_xml(&v.acl.owner),
        )
    } else {
        format!(
            "<Version><Key>{}</Key><VersionId>{}</VersionId><IsLatest>{}</IsLatest><LastModified>{}</LastModified><ETag>{}</ETag><Size>{}</Size><StorageClass>{}</StorageClass>{}</Version>",
            escape_xml(&v.key),
            escape_xml(&v.version_id),
            is_latest,
            format_timestamp(v.last_modified),
            escape_xml(&v.etag),
            v.size,
            escape_xml(&v.storage_class),
            owner_xml(&v.acl.owner),
        )
    }
}

pub fn list_versions_result(
    bucket: &str,
    prefix: Option<&str>,
    delimiter: Option<&str>,
    max_keys: u32,
    is_truncated: bool,
    key_marker: Option<&str>,
    version_id_marker: Option<&str>,
    next_key_marker: Option<&str>,
    next_version_id_marker: Option<&str>,
    versions: &[(ObjectVersion, bool)],
    common_prefixes: &[String],
) -> String {
    let mut body = String::new();
    body.push_str(&format!("<Name>{}</Name>", escape_xml(bucket)));
    body.push_str(&format!(
        "<Prefix>{}</Prefix>",
        escape_xml(prefix.unwrap_or(""))
    ));
    body.push_str(&format!(
        "<KeyMarker>{}</KeyMarker>",
        escape_xml(key_marker.unwrap_or(""))
    ));
    body.push_str(&format!(
        "<VersionIdMarker>{}</VersionIdMarker>",
        escape_xml(version_id_marker.unwrap_or(""))
    ));
    if let Some(k) = next_key_marker {
        body.push_str(&format!("<NextKeyMarker>{}</NextKeyMarker>", escape_xml(k)));
    }
    if let Some(v) = next_version_id_marker {
        body.push_str(&format!(
            "<NextVersionIdMarker>{}</NextVersionIdMarker>",
            escape_xml(v)
        ));
    }
    body.push_str(&format!("<MaxKeys>{max_keys}</MaxKeys>"));
    if let Some(d) = delimiter {
        body.push_str(&format!("<Delimiter>{}</Delimiter>", escape_xml(d)));
    }
    body.push_str(&format!("<IsTruncated>{is_truncated}</IsTruncated>"));
    for (v, is_latest) in versions {
        body.push_str(&version_entry(v, *is_latest));
    }
    for p in common_prefixes {
        body.push_str(&format!(
            "<CommonPrefixes><Prefix>{}</Prefix></CommonPrefixes>",
            escape_xml(p)
        ));
    }
    format!(
        "{XML_DECLARATION}\n<ListVersionsResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">{body}</ListVersionsResult>"
    )
}

pub fn copy_object_result(etag: &str, last_modified: chrono::DateTime<chrono::Utc>) -> String {
    format!(
        "{XML_DECLARATION}\n<CopyObjectResult><ETag>{}</ETag><LastModified>{}</LastModified></CopyObjectResult>",
        escape_xml(etag),
        format_timestamp(last_modified)
    )
}

pub fn copy_part_result(etag: &str, last_modified: chrono::DateTime<chrono::Utc>) -> String {
    format!(
        "{XML_DECLARATION}\n<CopyPartResult><ETag>{}</ETag><LastModified>{}</LastModified></CopyPartResult>",
        escape_xml(etag),
        format_timestamp(last_modified)
    )
}

pub fn initiate_multipart_upload_result(bucket: &str, key: &str, upload_id: &str) -> String {
    format!(
        "{XML_DECLARATION}\n<InitiateMultipartUploadResult><Bucket>{}</Bucket><Key>{}</Key><UploadId>{}</UploadId></InitiateMultipartUploadResult>",
        escape_xml(bucket),
        escape_xml(key),
        escape_xml(upload_id)
    )
}

pub fn complete_multipart_upload_result(bucket: &str, key: &str, etag: &str) -> String {
    format!(
        "{XML_DECLARATION}\n<CompleteMultipartUploadResult><Location></Location><Bucket>{}</Bucket><Key>{}</Key><ETag>{}</ETag></CompleteMultipartUploadResult>",
        escape_xml(bucket),
        escape_xml(key),
        escape_xml(etag)
    )
}

pub fn list_parts_result(
    bucket: &str,
    key: &str,
    upload_id: &str,
    owner: &Owner,
    parts: &[PartRecord],
    is_truncated: bool,
) -> String {
    let mut body = String::new();
    body.push_str(&format!("<Bucket>{}</Bucket>", escape_xml(bucket)));
    body.push_str(&format!("<Key>{}</Key>", escape_xml(key)));
    body.push_str(&format!("<UploadId>{}</UploadId>", escape_xml(upload_id)));
    body.push_str(&owner_xml(owner));
    body.push_str(&format!("<IsTruncated>{is_truncated}</IsTruncated>"));
    for p in parts {
        body.push_str(&format!(
            "<Part><PartNumber>{}</PartNumber><LastModified>{}</LastModified><ETag>{}</ETag><Size>{}</Size></Part>",
            p.part_number,
            format_timestamp(p.last_modified),
            escape_xml(&p.etag),
            p.size
        ));
    }
    format!(
        "{XML_DECLARATION}\n<ListPartsResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">{body}</ListPartsResult>"
    )
}

pub fn list_multipart_uploads_result(bucket: &str, uploads: &[UploadMetadata]) -> String {
    let mut body = String::new();
    body.push_str(&format!("<Bucket>{}</Bucket>", escape_xml(bucket)));
    body.push_str("<IsTruncated>false</IsTruncated>");
    for u in uploads {
        body.push_str(&format!(
            "<Upload><Key>{}</Key><UploadId>{}</UploadId><Initiated>{}</Initiated><StorageClass>{}</StorageClass></Upload>",
            escape_xml(&u.key),
            escape_xml(&u.upload_id),
            format_timestamp(u.initiated),
            escape_xml(&u.storage_class)
        ));
    }
    format!(
        "{XML_DECLARATION}\n<ListMultipartUploadsResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">{body}</ListMultipartUploadsResult>"
    )
}

pub struct DeletedEntry<'a> {
    pub key: &'a str,
    pub version_id: Option<&'a str>,
    pub delete_marker: bool,
}

pub struct DeleteErrorEntry<'a> {
    pub key: &'a str,
    pub code: &'a str,
    pub message: &'a str,
}

pub fn delete_result(
    deleted: &[DeletedEntry],
    errors: &[DeleteErrorEntry],
    quiet: bool,
) -> String {
    let mut body = String::new();
    if !quiet {
        for d in deleted {
            body.push_str("<Deleted>");
            body.push_str(&format!("<Key>{}</Key>", escape_xml(d.key)));
            if let Some(v) = d.version_id {
                body.push_str(&format!("<VersionId>{}</VersionId>", escape_xml(v)));
            }
            if d.delete_marker {
                body.push_str("<DeleteMarker>true</DeleteMarker>");
            }
            body.push_str("</Deleted>");
        }
    }
    for e in errors {
        body.push_str(&format!(
            "<Error><Key>{}</Key><Code>{}</Code><Message>{}</Message></Error>",
            escape_xml(e.key),
            escape_xml(e.code),
            escape_xml(e.message)
        ));
    }
    format!("{XML_DECLARATION}\n<DeleteResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">{body}</DeleteResult>")
}

pub fn versioning_configuration(status: crate::types::VersioningState) -> String {
    use crate::types::VersioningState;
    let status_xml = match status {
        VersioningState::Unversioned => String::new(),
        VersioningState::Enabled => "<Status>Enabled</Status>".to_string(),
        VersioningState::Suspended => "<Status>Suspended</Status>".to_string(),
    };
    format!(
        "{XML_DECLARATION}\n<VersioningConfiguration xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">{status_xml}</VersioningConfiguration>"
    )
}

pub fn tagging(tags: &[(String, String)]) -> String {
    let mut set = String::new();
    for (k, v) in tags {
        set.push_str(&format!(
            "<Tag><Key>{}</Key><Value>{}</Value></Tag>",
            escape_xml(k),
            escape_xml(v)
        ));
    }
    format!(
        "{XML_DECLARATION}\n<Tagging xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\"><TagSet>{set}</TagSet></Tagging>"
    )
}

fn grantee_xml(grantee: &Grantee) -> String {
    match grantee {
        Grantee::Owner(o) => format!(
            "<Grantee xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" xsi:type=\"CanonicalUser\"><ID>{}</ID><DisplayName>{}</DisplayName></Grantee>",
            escape_xml(&o.id),
            escape_xml(&o.display_name)
        ),
        Grantee::AllUsers => "<Grantee xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" xsi:type=\"Group\"><URI>http://acs.amazonaws.com/groups/global/AllUsers</URI></Grantee>".to_string(),
        Grantee::AuthenticatedUsers => "<Grantee xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" xsi:type=\"Group\"><URI>http://acs.amazonaws.com/groups/global/AuthenticatedUsers</URI></Grantee>".to_string(),
    }
}

pub fn access_control_policy(acl: &Acl) -> String {
    let mut grants = String::new();
    for g in &acl.grants {
        grants.push_str(&format!(
            "<Grant>{}<Permission>{}</Permission></Grant>",
            grantee_xml(&g.grantee),
            g.permission.as_str()
        ));
    }
    let _ = Permission::Read;
    format!(
        "{XML_DECLARATION}\n<AccessControlPolicy xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">{}<AccessControlList>{grants}</AccessControlList></AccessControlPolicy>",
        owner_xml(&acl.owner)
    )
}

pub fn location_constraint(region: &str) -> String {
    format!(
        "{XML_DECLARATION}\n<LocationConstraint xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">{}</LocationConstraint>",
        escape_xml(region)
    )
}

pub fn legal_hold(on: bool) -> String {
    let status = if on { "ON" } else { "OFF" };
    format!(
        "{XML_DECLARATION}\n<LegalHold xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\"><Status>{status}</Status></LegalHold>"
    )
}

pub fn retention(mode: crate::types::RetentionMode, retain_until: chrono::DateTime<chrono::Utc>) -> String {
    use crate::types::RetentionMode;
    let mode_str = match mode {
        RetentionMode::Governance => "GOVERNANCE",
        RetentionMode::Compliance => "COMPLIANCE",
    };
    format!(
        "{XML_DECLARATION}\n<Retention xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\"><Mode>{mode_str}</Mode><RetainUntilDate>{}</RetainUntilDate></Retention>",
        format_timestamp(retain_until)
    )
}

pub fn cors_configuration(cors: &crate::types::CorsConfiguration) -> String {
    let mut rules = String::new();
    for r in &cors.rules {
        let mut rule = String::new();
        for o in &r.allowed_origins {
            rule.push_str(&format!("<AllowedOrigin>{}</AllowedOrigin>", escape_xml(o)));
        }
        for m in &r.allowed_methods {
            rule.push_str(&format!("<AllowedMethod>{}</AllowedMethod>", escape_xml(m)));
        }
        for h in &r.allowed_headers {
            rule.push_str(&format!("<AllowedHeader>{}</AllowedHeader>", escape_xml(h)));
        }
        for e in &r.expose_headers {
            rule.push_str(&format!("<ExposeHeader>{}</ExposeHeader>", escape_xml(e)));
        }
        if let Some(age) = r.max_age_seconds {
            rule.push_str(&format!("<MaxAgeSeconds>{age}</MaxAgeSeconds>"));
        }
        rules.push_str(&format!("<CORSRule>{rule}</CORSRule>"));
    }
    format!(
        "{XML_DECLARATION}\n<CORSConfiguration xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">{rules}</CORSConfiguration>"
    )
}

pub fn lifecycle_configuration(lifecycle: &crate::types::LifecycleConfiguration) -> String {
    let mut rules = String::new();
    for r in &lifecycle.rules {
        let status = if r.status_enabled { "Enabled" } else { "Disabled" };
        let expiration = r
            .expiration_days
            .map(|d| format!("<Expiration><Days>{d}</Days></Expiration>"))
            .unwrap_or_default();
        rules.push_str(&format!(
            "<Rule><ID>{}</ID><Prefix>{}</Prefix><Status>{status}</Status>{expiration}</Rule>",
            escape_xml(&r.id),
            escape_xml(&r.prefix),
        ));
    }
    format!(
        "{XML_DECLARATION}\n<LifecycleConfiguration xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">{rules}</LifecycleConfiguration>"
    )
}

pub fn ownership_controls(ownership: crate::types::ObjectOwnership) -> String {
    let value = match ownership {
        crate::types::ObjectOwnership::BucketOwnerEnforced => "BucketOwnerEnforced",
        crate::types::ObjectOwnership::BucketOwnerPreferred => "BucketOwnerPreferred",
        crate::types::ObjectOwnership::ObjectWriter => "ObjectWriter",
    };
    format!(
        "{XML_DECLARATION}\n<OwnershipControls xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\"><Rule><ObjectOwnership>{value}</ObjectOwnership></Rule></OwnershipControls>"
    )
}

pub fn server_side_encryption_configuration(cfg: &crate::types::SseDefaultConfig) -> String {
    let algo = cfg.algorithm.as_str();
    let kms = cfg
        .kms_key_id
        .as_deref()
        .map(|k| format!("<KMSMasterKeyID>{}</KMSMasterKeyID>", escape_xml(k)))
        .unwrap_or_default();
    format!(
        "{XML_DECLARATION}\n<ServerSideEncryptionConfiguration xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\"><Rule><ApplyServerSideEncryptionByDefault><SSEAlgorithm>{algo}</SSEAlgorithm>{kms}</ApplyServerSideEncryptionByDefault></Rule></ServerSideEncryptionConfiguration>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::synthetic_owner;

    #[test]
    fn escapes_bucket_name_in_buckets_listing() {
        let owner = synthetic_owner();
        let xml = list_all_my_buckets_result(&[], &owner);
        assert!(xml.contains("<Owner>"));
        assert!(xml.starts_with(XML_DECLARATION));
    }

    #[test]
    fn delete_result_quiet_omits_deleted_entries() {
        let deleted = [DeletedEntry {
            key: "a",
            version_id: None,
            delete_marker: false,
        }];
        let xml = delete_result(&deleted, &[], true);
        assert!(!xml.contains("<Deleted>"));
    }

    #[test]
    fn delete_result_non_quiet_includes_deleted_entries() {
        let deleted = [DeletedEntry {
            key: "a",
            version_id: None,
            delete_marker: false,
        }];
        let xml = delete_result(&deleted, &[], false);
        assert!(xml.contains("<Deleted><Key>a</Key></Deleted>"));
    }
}
