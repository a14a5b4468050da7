//! Concurrent request handling: overlapping writes to distinct keys proceed
//! independently, while the lock registry serializes writes to the same key.

mod common;

use common::{generate_binary, TestServer};

#[tokio::test]
async fn concurrent_puts_to_distinct_keys_all_succeed() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();

    let mut handles = Vec::new();
    for i in 0..16 {
        let client = client.clone();
        let url = server.object_url("bucket", &format!("key-{i}"));
        let body = generate_binary(512, i);
        handles.push(tokio::spawn(async move {
            client.put(url).body(body).send().await.unwrap().status()
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), 200);
    }

    let listing = client
        .get(format!("{}?list-type=2", server.bucket_url("bucket")))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    for i in 0..16 {
        assert!(listing.contains(&format!("key-{i}")));
    }
}

#[tokio::test]
async fn concurrent_overwrites_of_same_key_leave_one_consistent_winner() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();

    let mut handles = Vec::new();
    for i in 0..8u64 {
        let client = client.clone();
        let url = server.object_url("bucket", "contended");
        let body = generate_binary(128, i);
        handles.push(tokio::spawn(async move {
            client.put(url).body(body).send().await.unwrap().status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 200);
    }

    // Whichever write landed last, a GET must return a single complete body
    // matching the recorded Content-Length and ETag, never a torn write.
    let resp = client.get(server.object_url("bucket", "contended")).send().await.unwrap();
    let content_length: usize = resp
        .headers()
        .get("content-length")
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    let body = resp.bytes().await.unwrap();
    assert_eq!(body.len(), content_length);
    assert_eq!(content_length, 128);
}

#[tokio::test]
async fn concurrent_bucket_creation_only_one_succeeds() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        let url = server.bucket_url("race");
        handles.push(tokio::spawn(async move {
            client.put(url).send().await.unwrap().status()
        }));
    }

    let mut ok = 0;
    let mut conflict = 0;
    for handle in handles {
        match handle.await.unwrap().as_u16() {
            200 => ok += 1,
            409 => conflict += 1,
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(conflict, 7);
}
