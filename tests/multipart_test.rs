//! Multipart upload lifecycle: create, upload parts, complete, abort, and
//! part-ordering/size validation.

mod common;

use common::{extract_xml_tag, generate_binary, TestServer};

async fn initiate(client: &reqwest::Client, server: &TestServer, bucket: &str, key: &str) -> String {
    let resp = client
        .post(format!("{}?uploads", server.object_url(bucket, key)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let xml = resp.text().await.unwrap();
    extract_xml_tag(&xml, "UploadId").unwrap().to_string()
}

#[tokio::test]
async fn complete_multipart_upload_assembles_parts_in_order() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();
    let upload_id = initiate(&client, &server, "bucket", "big.bin").await;

    let part1 = generate_binary(5 * 1024 * 1024, 1);
    let part2 = generate_binary(1024, 2);

    let r1 = client
        .put(format!(
            "{}?partNumber=1&uploadId={}",
            server.object_url("bucket", "big.bin"),
            upload_id
        ))
        .body(part1.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(r1.status(), 200);
    let etag1 = r1.headers().get("etag").unwrap().to_str().unwrap().to_string();

    let r2 = client
        .put(format!(
            "{}?partNumber=2&uploadId={}",
            server.object_url("bucket", "big.bin"),
            upload_id
        ))
        .body(part2.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(r2.status(), 200);
    let etag2 = r2.headers().get("etag").unwrap().to_str().unwrap().to_string();

    let complete_body = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<CompleteMultipartUpload xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Part><PartNumber>1</PartNumber><ETag>{etag1}</ETag></Part>
  <Part><PartNumber>2</PartNumber><ETag>{etag2}</ETag></Part>
</CompleteMultipartUpload>"#
    );
    let resp = client
        .post(format!(
            "{}?uploadId={}",
            server.object_url("bucket", "big.bin"),
            upload_id
        ))
        .body(complete_body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let got = client
        .get(server.object_url("bucket", "big.bin"))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    let mut expected = part1;
    expected.extend(part2);
    assert_eq!(got.len(), expected.len());
    assert_eq!(got.as_ref(), expected.as_slice());
}

#[tokio::test]
async fn abort_multipart_upload_removes_staged_parts() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();
    let upload_id = initiate(&client, &server, "bucket", "aborted.bin").await;

    client
        .put(format!(
            "{}?partNumber=1&uploadId={}",
            server.object_url("bucket", "aborted.bin"),
            upload_id
        ))
        .body(generate_binary(1024, 1))
        .send()
        .await
        .unwrap();

    let resp = client
        .delete(format!(
            "{}?uploadId={}",
            server.object_url("bucket", "aborted.bin"),
            upload_id
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    let list_parts = client
        .get(format!(
            "{}?uploadId={}",
            server.object_url("bucket", "aborted.bin"),
            upload_id
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(list_parts.status(), 404);
}

#[tokio::test]
async fn complete_with_out_of_order_parts_is_rejected() {
    let server = TestServer::start_with_buckets(&["bucket"]).await;
    let client = reqwest::Client::new();
    let upload_id = initiate(&client, &server, "bucket", "unordered.bin").await;

    for part_number in [1, 2] {
        client
            .put(format!(
                "{}?partNumber={}&uploadId={}",
                server.object_url("bucket", "unordered.bin"),
                part_number,
                upload_id
            ))
            .body(generate_binary(5 * 1024 * 1024, part_number as u64))
            .send()
            .await
            .unwrap();
    }

    let complete_body = r#"<?xml version="1.0" encoding="UTF-8"?>
<CompleteMultipartUpload xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Part><PartNumber>2</PartNumber><ETag>"whatever"</ETag></Part>
  <Part><PartNumber>1</PartNumber><ETag>"whatever"</ETag></Part>
</CompleteMultipartUpload>"#;
    let resp = client
        .post(format!(
            "{}?uploadId={}",
            server.object_url("bucket", "unordered.bin"),
            upload_id
        ))
        .body(complete_body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}
