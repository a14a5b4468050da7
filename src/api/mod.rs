//! S3 API surface: request dispatch, handlers, and error mapping.

pub mod dispatch;
pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod headers;
pub mod state;

pub use dispatch::build_router;
pub use errors::S3Error;
pub use extractors::{ValidatedBucket, ValidatedPath};
