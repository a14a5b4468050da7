//! s3emu - a local, in-process emulator of the S3 object-storage HTTP API.

pub mod api;
pub mod config;
pub mod metrics;
pub mod multipart;
pub mod store;
pub mod tls;
pub mod types;
pub mod xml;
