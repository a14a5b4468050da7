//! Bucket/object sub-resources: versioning, tagging, ACLs, retention,
//! legal hold, and the bucket-level configuration documents.

mod common;

use common::{extract_xml_tag, TestServer};

#[tokio::test]
async fn versioning_enabled_bucket_keeps_prior_version_readable() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();

    let versioning_body = r#"<?xml version="1.0" encoding="UTF-8"?>
<VersioningConfiguration xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Status>Enabled</Status></VersioningConfiguration>"#;
    let resp = client
        .put(format!("{}?versioning", server.bucket_url("bucket")))
        .body(versioning_body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let put1 = client
        .put(server.object_url("bucket", "k"))
        .body("version one")
        .send()
        .await
        .unwrap();
    let v1 = put1.headers().get("x-amz-version-id").unwrap().to_str().unwrap().to_string();

    let put2 = client
        .put(server.object_url("bucket", "k"))
        .body("version two")
        .send()
        .await
        .unwrap();
    let v2 = put2.headers().get("x-amz-version-id").unwrap().to_str().unwrap().to_string();
    assert_ne!(v1, v2);

    let current = client.get(server.object_url("bucket", "k")).send().await.unwrap();
    assert_eq!(current.text().await.unwrap(), "version two");

    let old = client
        .get(format!("{}?versionId={}", server.object_url("bucket", "k"), v1))
        .send()
        .await
        .unwrap();
    assert_eq!(old.text().await.unwrap(), "version one");
}

#[tokio::test]
async fn object_tagging_roundtrip() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();
    client.put(server.object_url("bucket", "k")).body("x").send().await.unwrap();

    let tagging_body = r#"<?xml version="1.0" encoding="UTF-8"?>
<Tagging xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><TagSet><Tag><Key>env</Key><Value>prod</Value></Tag></TagSet></Tagging>"#;
    let resp = client
        .put(format!("{}?tagging", server.object_url("bucket", "k")))
        .body(tagging_body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{}?tagging", server.object_url("bucket", "k")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let xml = resp.text().await.unwrap();
    assert_eq!(extract_xml_tag(&xml, "Key"), Some("env"));
    assert_eq!(extract_xml_tag(&xml, "Value"), Some("prod"));
}

#[tokio::test]
async fn object_acl_put_get_roundtrip() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();
    client.put(server.object_url("bucket", "k")).body("x").send().await.unwrap();

    let resp = client
        .put(format!("{}?acl", server.object_url("bucket", "k")))
        .header("x-amz-acl", "public-read")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{}?acl", server.object_url("bucket", "k")))
        .send()
        .await
        .unwrap();
    let xml = resp.text().await.unwrap();
    assert!(xml.contains("AllUsers"));
}

#[tokio::test]
async fn bucket_tagging_put_get_delete() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();

    let tagging_body = r#"<?xml version="1.0" encoding="UTF-8"?>
<Tagging xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><TagSet><Tag><Key>team</Key><Value>storage</Value></Tag></TagSet></Tagging>"#;
    client
        .put(format!("{}?tagging", server.bucket_url("bucket")))
        .body(tagging_body)
        .send()
        .await
        .unwrap();

    let resp = client.get(format!("{}?tagging", server.bucket_url("bucket"))).send().await.unwrap();
    let xml = resp.text().await.unwrap();
    assert_eq!(extract_xml_tag(&xml, "Key"), Some("team"));

    let resp = client.delete(format!("{}?tagging", server.bucket_url("bucket"))).send().await.unwrap();
    assert_eq!(resp.status(), 204);

    let resp = client.get(format!("{}?tagging", server.bucket_url("bucket"))).send().await.unwrap();
    let xml = resp.text().await.unwrap();
    assert!(!xml.contains("<Tag>"));
}

#[tokio::test]
async fn object_legal_hold_and_retention_roundtrip() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();
    client.put(server.object_url("bucket", "k")).body("x").send().await.unwrap();

    let legal_hold = r#"<?xml version="1.0" encoding="UTF-8"?>
<LegalHold xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Status>ON</Status></LegalHold>"#;
    client
        .put(format!("{}?legal-hold", server.object_url("bucket", "k")))
        .body(legal_hold)
        .send()
        .await
        .unwrap();
    let resp = client
        .get(format!("{}?legal-hold", server.object_url("bucket", "k")))
        .send()
        .await
        .unwrap();
    assert!(resp.text().await.unwrap().contains("ON"));

    let retention = r#"<?xml version="1.0" encoding="UTF-8"?>
<Retention xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Mode>GOVERNANCE</Mode><RetainUntilDate>2099-01-01T00:00:00Z</RetainUntilDate></Retention>"#;
    let resp = client
        .put(format!("{}?retention", server.object_url("bucket", "k")))
        .body(retention)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{}?retention", server.object_url("bucket", "k")))
        .send()
        .await
        .unwrap();
    let xml = resp.text().await.unwrap();
    assert_eq!(extract_xml_tag(&xml, "Mode"), Some("GOVERNANCE"));
}

#[tokio::test]
async fn bucket_ownership_controls_and_object_lock_roundtrip() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();

    let ownership = r#"<?xml version="1.0" encoding="UTF-8"?>
<OwnershipControls xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Rule><ObjectOwnership>BucketOwnerPreferred</ObjectOwnership></Rule></OwnershipControls>"#;
    let resp = client
        .put(format!("{}?ownershipControls", server.bucket_url("bucket")))
        .body(ownership)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{}?ownershipControls", server.bucket_url("bucket")))
        .send()
        .await
        .unwrap();
    assert!(resp.text().await.unwrap().contains("BucketOwnerPreferred"));

    let object_lock = r#"<?xml version="1.0" encoding="UTF-8"?>
<ObjectLockConfiguration xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><ObjectLockEnabled>Enabled</ObjectLockEnabled></ObjectLockConfiguration>"#;
    let resp = client
        .put(format!("{}?object-lock", server.bucket_url("bucket")))
        .body(object_lock)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{}?object-lock", server.bucket_url("bucket")))
        .send()
        .await
        .unwrap();
    assert!(resp.text().await.unwrap().contains("<ObjectLockEnabled>Enabled</ObjectLockEnabled>"));
}

#[tokio::test]
async fn bucket_cors_configuration_roundtrip() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();

    let cors = r#"<?xml version="1.0" encoding="UTF-8"?>
<CORSConfiguration xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <CORSRule><AllowedMethod>GET</AllowedMethod><AllowedOrigin>*</AllowedOrigin></CORSRule>
</CORSConfiguration>"#;
    let resp = client
        .put(format!("{}?cors", server.bucket_url("bucket")))
        .body(cors)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client.get(format!("{}?cors", server.bucket_url("bucket"))).send().await.unwrap();
    let xml = resp.text().await.unwrap();
    assert!(xml.contains("AllowedOrigin"));
}
