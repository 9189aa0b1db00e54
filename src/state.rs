//! Shared application state handed to every handler.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::generator::RenderEngine;
use crate::storage::{LocalStorage, ObjectStorage, StorageError};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn ObjectStorage + Send + Sync>,
    pub engine: RenderEngine,
}

impl AppState {
    /// Local-disk state; creates the template, output and upload directories.
    pub async fn new(config: AppConfig) -> Result<Self, StorageError> {
        let storage = Arc::new(LocalStorage::new(&config));
        storage.ensure_buckets().await?;
        Ok(Self::new_with_storage(config, storage))
    }

    pub fn new_with_storage(
        config: AppConfig,
        storage: Arc<dyn ObjectStorage + Send + Sync>,
    ) -> Self {
        let engine =
            RenderEngine::new(config.failure_policy).with_inflate_limit(config.max_inflated_bytes);
        Self {
            config: Arc::new(config),
            storage,
            engine,
        }
    }
}
