//! End-to-end bucket and object lifecycle against a spawned server.

mod common;

use common::{generate_binary, TestServer};

#[tokio::test]
async fn create_bucket_then_list_it() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let resp = client.put(server.bucket_url("mybucket")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client.get(server.endpoint()).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("mybucket"));
}

#[tokio::test]
async fn duplicate_bucket_create_conflicts() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    client.put(server.bucket_url("dup")).send().await.unwrap();
    let resp = client.put(server.bucket_url("dup")).send().await.unwrap();
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn put_get_head_delete_object_roundtrip() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();
    let body = generate_binary(4096, 1);

    let put_resp = client
        .put(server.object_url("bucket", "hello.bin"))
        .header("content-type", "application/octet-stream")
        .body(body.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(put_resp.status(), 200);
    let etag = put_resp.headers().get("etag").unwrap().to_str().unwrap().to_string();

    let get_resp = client.get(server.object_url("bucket", "hello.bin")).send().await.unwrap();
    assert_eq!(get_resp.status(), 200);
    assert_eq!(get_resp.headers().get("etag").unwrap().to_str().unwrap(), etag);
    let got = get_resp.bytes().await.unwrap();
    assert_eq!(got.as_ref(), body.as_slice());

    let head_resp = client.head(server.object_url("bucket", "hello.bin")).send().await.unwrap();
    assert_eq!(head_resp.status(), 200);
    assert_eq!(
        head_resp.headers().get("content-length").unwrap().to_str().unwrap(),
        body.len().to_string()
    );

    let del_resp = client.delete(server.object_url("bucket", "hello.bin")).send().await.unwrap();
    assert_eq!(del_resp.status(), 204);

    let get_after = client.get(server.object_url("bucket", "hello.bin")).send().await.unwrap();
    assert_eq!(get_after.status(), 404);
}

#[tokio::test]
async fn get_object_with_range_header_returns_partial_content() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();
    let body = generate_binary(1000, 2);

    client
        .put(server.object_url("bucket", "ranged.bin"))
        .body(body.clone())
        .send()
        .await
        .unwrap();

    let resp = client
        .get(server.object_url("bucket", "ranged.bin"))
        .header("range", "bytes=10-19")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 206);
    assert_eq!(
        resp.headers().get("content-range").unwrap().to_str().unwrap(),
        "bytes 10-19/1000"
    );
    let got = resp.bytes().await.unwrap();
    assert_eq!(got.as_ref(), &body[10..20]);
}

#[tokio::test]
async fn copy_object_between_keys_preserves_content() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();
    let body = generate_binary(256, 3);

    client
        .put(server.object_url("bucket", "src.bin"))
        .body(body.clone())
        .send()
        .await
        .unwrap();

    let resp = client
        .put(server.object_url("bucket", "dst.bin"))
        .header("x-amz-copy-source", "/bucket/src.bin")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let got = client
        .get(server.object_url("bucket", "dst.bin"))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    assert_eq!(got.as_ref(), body.as_slice());
}

#[tokio::test]
async fn bucket_not_empty_cannot_be_deleted() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();
    client
        .put(server.object_url("bucket", "k"))
        .body(vec![1, 2, 3])
        .send()
        .await
        .unwrap();

    let resp = client.delete(server.bucket_url("bucket")).send().await.unwrap();
    assert_eq!(resp.status(), 409);
}
