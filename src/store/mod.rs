//! Filesystem-backed stores: buckets, object versions, KMS key allow-list,
//! and the keyed lock registry serializing writes across them.

pub mod bucket_store;
pub mod error;
pub mod kms;
pub mod locks;
pub mod object_store;

pub use bucket_store::BucketStore;
pub use error::{StoreError, StoreResult};
pub use kms::KmsKeyRegistry;
pub use locks::LockRegistry;
pub use object_store::{NewObjectInput, ObjectStore, ResolvedRange};
