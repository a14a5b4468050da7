//! Pagination and delimiter/prefix handling for bucket listings.

mod common;

use common::TestServer;

async fn put_keys(client: &reqwest::Client, server: &TestServer, bucket: &str, keys: &[&str]) {
    for key in keys {
        client
            .put(server.object_url(bucket, key))
            .body("x")
            .send()
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn list_v2_paginates_with_continuation_token() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();
    let keys: Vec<String> = (0..5).map(|i| format!("k{i:02}")).collect();
    put_keys(&client, &server, "bucket", &keys.iter().map(String::as_str).collect::<Vec<_>>()).await;

    let first = client
        .get(format!("{}?list-type=2&max-keys=2", server.bucket_url("bucket")))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(first.contains("<IsTruncated>true</IsTruncated>"));
    assert!(first.contains("NextContinuationToken"));
    assert!(first.contains("k00"));
    assert!(first.contains("k01"));
    assert!(!first.contains("k02"));

    let token_start = first.find("<NextContinuationToken>").unwrap() + "<NextContinuationToken>".len();
    let token_end = first[token_start..].find("</NextContinuationToken>").unwrap() + token_start;
    let token = &first[token_start..token_end];

    let second = client
        .get(format!(
            "{}?list-type=2&max-keys=2&continuation-token={}",
            server.bucket_url("bucket"),
            token
        ))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(second.contains("k02"));
    assert!(second.contains("k03"));
    assert!(!second.contains("k00"));
}

#[tokio::test]
async fn delimiter_rolls_up_common_prefixes() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();
    put_keys(
        &client,
        &server,
        "bucket",
        &["logs/2024/a.txt", "logs/2024/b.txt", "logs/2025/c.txt", "readme.txt"],
    )
    .await;

    let body = client
        .get(format!("{}?list-type=2&delimiter=/", server.bucket_url("bucket")))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains("<Prefix>logs/</Prefix>"));
    assert!(body.contains("readme.txt"));
    assert!(!body.contains("2024/a.txt"));
}

#[tokio::test]
async fn prefix_filters_listing() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();
    put_keys(&client, &server, "bucket", &["a/1", "a/2", "b/1"]).await;

    let body = client
        .get(format!("{}?list-type=2&prefix=a/", server.bucket_url("bucket")))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains("a/1"));
    assert!(body.contains("a/2"));
    assert!(!body.contains("b/1"));
}
