//! Request-body XML deserializers, backed by `quick_xml`'s serde support.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename = "Delete")]
pub struct DeleteRequest {
    #[serde(rename = "Object", default)]
    pub objects: Vec<DeleteObjectIdentifier>,
    #[serde(rename = "Quiet", default)]
    pub quiet: bool,
}

#[derive(Debug, Deserialize)]
pub struct DeleteObjectIdentifier {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "VersionId", default)]
    pub version_id: Option<String>,
}

impl DeleteRequest {
    pub fn from_xml(xml: &str) -> Result<Self, quick_xml::de::DeError> {
        quick_xml::de::from_str(xml)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename = "CompleteMultipartUpload")]
pub struct CompleteMultipartUploadRequest {
    #[serde(rename = "Part", default)]
    pub parts: Vec<CompletedPart>,
}

#[derive(Debug, Deserialize)]
pub struct CompletedPart {
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    #[serde(rename = "ETag")]
    pub etag: String,
}

impl CompleteMultipartUploadRequest {
    pub fn from_xml(xml: &str) -> Result<Self, quick_xml::de::DeError> {
        quick_xml::de::from_str(xml)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Tagging")]
pub struct TaggingRequest {
    #[serde(rename = "TagSet")]
    pub tag_set: TagSetXml,
}

#[derive(Debug, Deserialize)]
pub struct TagSetXml {
    #[serde(rename = "Tag", default)]
    pub tags: Vec<TagXml>,
}

#[derive(Debug, Deserialize)]
pub struct TagXml {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl TaggingRequest {
    pub fn from_xml(xml: &str) -> Result<Self, quick_xml::de::DeError> {
        quick_xml::de::from_str(xml)
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.tag_set.tags.into_iter().map(|t| (t.key, t.value)).collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename = "VersioningConfiguration")]
pub struct VersioningConfigurationRequest {
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
}

impl VersioningConfigurationRequest {
    pub fn from_xml(xml: &str) -> Result<Self, quick_xml::de::DeError> {
        quick_xml::de::from_str(xml)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename = "LegalHold")]
pub struct LegalHoldRequest {
    #[serde(rename = "Status")]
    pub status: String,
}

impl LegalHoldRequest {
    pub fn from_xml(xml: &str) -> Result<Self, quick_xml::de::DeError> {
        quick_xml::de::from_str(xml)
    }

    pub fn is_on(&self) -> bool {
        self.status.eq_ignore_ascii_case("ON")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Retention")]
pub struct RetentionRequest {
    #[serde(rename = "Mode")]
    pub mode: String,
    #[serde(rename = "RetainUntilDate")]
    pub retain_until: String,
}

impl RetentionRequest {
    pub fn from_xml(xml: &str) -> Result<Self, quick_xml::de::DeError> {
        quick_xml::de::from_str(xml)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename = "CORSConfiguration")]
pub struct CorsConfigurationRequest {
    #[serde(rename = "CORSRule", default)]
    pub rules: Vec<CorsRuleXml>,
}

#[derive(Debug, Deserialize)]
pub struct CorsRuleXml {
    #[serde(rename = "AllowedOrigin", default)]
    pub allowed_origins: Vec<String>,
    #[serde(rename = "AllowedMethod", default)]
    pub allowed_methods: Vec<String>,
    #[serde(rename = "AllowedHeader", default)]
    pub allowed_headers: Vec<String>,
    #[serde(rename = "ExposeHeader", default)]
    pub expose_headers: Vec<String>,
    #[serde(rename = "MaxAgeSeconds", default)]
    pub max_age_seconds: Option<u32>,
}

impl CorsConfigurationRequest {
    pub fn from_xml(xml: &str) -> Result<Self, quick_xml::de::DeError> {
        quick_xml::de::from_str(xml)
    }

    pub fn into_config(self) -> crate::types::CorsConfiguration {
        crate::types::CorsConfiguration {
            rules: self
                .rules
                .into_iter()
                .map(|r| crate::types::CorsRule {
                    allowed_origins: r.allowed_origins,
                    allowed_methods: r.allowed_methods,
                    allowed_headers: r.allowed_headers,
                    expose_headers: r.expose_headers,
                    max_age_seconds: r.max_age_seconds,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename = "LifecycleConfiguration")]
pub struct LifecycleConfigurationRequest {
    #[serde(rename = "Rule", default)]
    pub rules: Vec<LifecycleRuleXml>,
}

#[derive(Debug, Deserialize)]
pub struct LifecycleRuleXml {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "Prefix", default)]
    pub prefix: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Expiration", default)]
    pub expiration: Option<LifecycleExpirationXml>,
}

#[derive(Debug, Deserialize)]
pub struct LifecycleExpirationXml {
    #[serde(rename = "Days", default)]
    pub days: Option<u32>,
}

impl LifecycleConfigurationRequest {
    pub fn from_xml(xml: &str) -> Result<Self, quick_xml::de::DeError> {
        quick_xml::de::from_str(xml)
    }

    pub fn into_config(self) -> crate::types::LifecycleConfiguration {
        crate::types::LifecycleConfiguration {
            rules: self
                .rules
                .into_iter()
                .map(|r| crate::types::LifecycleRule {
                    id: r.id,
                    prefix: r.prefix,
                    status_enabled: r.status.eq_ignore_ascii_case("Enabled"),
                    expiration_days: r.expiration.and_then(|e| e.days),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_delete_request_basic() {
        let xml = r#"<Delete><Object><Key>a</Key></Object><Object><Key>b</Key><VersionId>v1</VersionId></Object></Delete>"#;
        let req = DeleteRequest::from_xml(xml).unwrap();
        assert_eq!(req.objects.len(), 2);
        assert_eq!(req.objects[1].version_id.as_deref(), Some("v1"));
        assert!(!req.quiet);
    }

    #[test]
    fn parses_delete_request_quiet() {
        let xml = r#"<Delete><Quiet>true</Quiet><Object><Key>a</Key></Object></Delete>"#;
        let req = DeleteRequest::from_xml(xml).unwrap();
        assert!(req.quiet);
    }

    #[test]
    fn rejects_malformed_delete_xml() {
        assert!(DeleteRequest::from_xml("<Delete><Object>").is_err());
    }

    #[test]
    fn parses_complete_multipart_upload_request() {
        let xml = r#"<CompleteMultipartUpload><Part><PartNumber>1</PartNumber><ETag>"abc"</ETag></Part></CompleteMultipartUpload>"#;
        let req = CompleteMultipartUploadRequest::from_xml(xml).unwrap();
        assert_eq!(req.parts.len(), 1);
        assert_eq!(req.parts[0].part_number, 1);
    }

    #[test]
    fn parses_tagging_request() {
        let xml = r#"<Tagging><TagSet><Tag><Key>env</Key><Value>prod</Value></Tag></TagSet></Tagging>"#;
        let req = TaggingRequest::from_xml(xml).unwrap();
        assert_eq!(req.into_pairs(), vec![("env".to_string(), "prod".to_string())]);
    }
}
