//! Multipart upload engine: part staging, composite-ETag assembly, cleanup.

pub mod engine;

pub use engine::{MultipartEngine, NewUploadInput};
