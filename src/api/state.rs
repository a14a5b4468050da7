//! Shared application state threaded through every handler.

use std::sync::Arc;

use crate::config::Config;
use crate::metrics::Metrics;
use crate::multipart::MultipartEngine;
use crate::store::{BucketStore, KmsKeyRegistry, LockRegistry, ObjectStore};

#[derive(Clone)]
pub struct AppState(Arc<Inner>);

struct Inner {
    pub buckets: BucketStore,
    pub objects: ObjectStore,
    pub multipart: MultipartEngine,
    pub kms: KmsKeyRegistry,
    pub locks: LockRegistry,
    pub config: Config,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: Config, metrics: Metrics) -> Self {
        let root = config.data_dir();
        AppState(Arc::new(Inner {
            buckets: BucketStore::new(root.clone()),
            objects: ObjectStore::new(root.clone()),
            multipart: MultipartEngine::new(root),
            kms: KmsKeyRegistry::new(config.valid_kms_keys.clone()),
            locks: LockRegistry::new(),
            config,
            metrics,
        }))
    }

    pub fn buckets(&self) -> &BucketStore {
        &self.0.buckets
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.0.objects
    }

    pub fn multipart(&self) -> &MultipartEngine {
        &self.0.multipart
    }

    pub fn kms(&self) -> &KmsKeyRegistry {
        &self.0.kms
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.0.locks
    }

    pub fn config(&self) -> &Config {
        &self.0.config
    }

    pub fn metrics(&self) -> &Metrics {
        &self.0.metrics
    }
}
