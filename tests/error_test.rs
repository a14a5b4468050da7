//! Error responses and conditional-request handling.

mod common;

use common::{extract_xml_tag, TestServer};

#[tokio::test]
async fn get_missing_object_returns_no_such_key() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();

    let resp = client.get(server.object_url("bucket", "missing")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    let xml = resp.text().await.unwrap();
    assert_eq!(extract_xml_tag(&xml, "Code"), Some("NoSuchKey"));
}

#[tokio::test]
async fn get_object_in_missing_bucket_returns_no_such_bucket() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let resp = client.get(server.object_url("ghost", "k")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    let xml = resp.text().await.unwrap();
    assert_eq!(extract_xml_tag(&xml, "Code"), Some("NoSuchBucket"));
}

#[tokio::test]
async fn invalid_bucket_name_is_rejected() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let resp = client.put(server.bucket_url("AB")).send().await.unwrap();
    assert_eq!(resp.status(), 400);
    let xml = resp.text().await.unwrap();
    assert_eq!(extract_xml_tag(&xml, "Code"), Some("InvalidBucketName"));
}

#[tokio::test]
async fn if_match_precondition_failure() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();
    client.put(server.object_url("bucket", "k")).body("hello").send().await.unwrap();

    let resp = client
        .get(server.object_url("bucket", "k"))
        .header("if-match", "\"not-the-real-etag\"")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 412);
}

#[tokio::test]
async fn if_none_match_returns_not_modified() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();
    let put_resp = client.put(server.object_url("bucket", "k")).body("hello").send().await.unwrap();
    let etag = put_resp.headers().get("etag").unwrap().to_str().unwrap().to_string();

    let resp = client
        .get(server.object_url("bucket", "k"))
        .header("if-none-match", etag)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 304);
}

#[tokio::test]
async fn unsatisfiable_range_returns_416() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();
    client.put(server.object_url("bucket", "k")).body(vec![0u8; 10]).send().await.unwrap();

    let resp = client
        .get(server.object_url("bucket", "k"))
        .header("range", "bytes=100-200")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 416);
}

#[tokio::test]
async fn sse_kms_with_unknown_key_is_rejected() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();

    let resp = client
        .put(server.object_url("bucket", "k"))
        .header("x-amz-server-side-encryption", "aws:kms")
        .header("x-amz-server-side-encryption-aws-kms-key-id", "not-a-real-key")
        .body("data")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let xml = resp.text().await.unwrap();
    assert_eq!(extract_xml_tag(&xml, "Code"), Some("KMS.NotFoundException"));
}
