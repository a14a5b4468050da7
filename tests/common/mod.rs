//! Shared test infrastructure for integration tests.
//!
//! Spawns the real `s3emu` binary against a fresh temp data directory and
//! drives it over plain HTTP with `reqwest`. No AWS SDK: the emulator's
//! surface is narrow enough that hand-built requests keep the tests close
//! to the wire format they are checking.

#![allow(dead_code)]

use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

static PORT_COUNTER: AtomicU16 = AtomicU16::new(19000);

pub struct TestServer {
    process: Child,
    http_port: u16,
    _data_dir: TempDir,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with_buckets(&[]).await
    }

    pub async fn start_with_buckets(buckets: &[&str]) -> Self {
        let http_port = PORT_COUNTER.fetch_add(2, Ordering::SeqCst);
        let https_port = http_port + 1;
        let data_dir = TempDir::new().expect("failed to create temp dir");

        let process = Command::new(env!("CARGO_BIN_EXE_s3emu"))
            .env("S3EMU_ROOT", data_dir.path())
            .env("S3EMU_HTTP_PORT", http_port.to_string())
            .env("S3EMU_HTTPS_PORT", https_port.to_string())
            .env("S3EMU_RETAIN_FILES_ON_EXIT", "true")
            .env("S3EMU_INITIAL_BUCKETS", buckets.join(","))
            .env("S3EMU_VALID_KMS_KEYS", "test-key-1")
            .env("RUST_LOG", "s3emu=warn")
            .spawn()
            .expect("failed to start s3emu");

        let mut server = Self {
            process,
            http_port,
            _data_dir: data_dir,
        };
        server.wait_ready().await;
        server
    }

    async fn wait_ready(&mut self) {
        let url = format!("http://127.0.0.1:{}/health", self.http_port);
        for _ in 0..150 {
            if let Ok(resp) = reqwest::get(&url).await {
                if resp.status().is_success() {
                    return;
                }
            }
            if let Ok(Some(status)) = self.process.try_wait() {
                panic!("server exited before becoming ready: {status}");
            }
            sleep(Duration::from_millis(100)).await;
        }
        let _ = self.process.kill();
        panic!("timed out waiting for server readiness on {url}");
    }

    pub fn endpoint(&self) -> String {
        format!("http://127.0.0.1:{}", self.http_port)
    }

    pub fn bucket_url(&self, bucket: &str) -> String {
        format!("{}/{}", self.endpoint(), bucket)
    }

    pub fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint(), bucket, key)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.process.kill();
    }
}

/// Generate deterministic pseudo-random binary content for object bodies.
pub fn generate_binary(size: usize, seed: u64) -> Vec<u8> {
    use rand::{Rng, SeedableRng};
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; size];
    rng.fill(&mut data[..]);
    data
}

/// Pull a tag's text content out of an S3 XML response without a full parser.
pub fn extract_xml_tag<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(&xml[start..end])
}
