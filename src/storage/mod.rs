//! Object storage module
//!
//! The ingest handler writes through the [`ObjectStore`] trait so the backend
//! can be swapped: S3 in production, an in-memory map for local runs and tests.

use crate::config::{StorageBackend, StorageConfig};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

pub mod memory;
pub mod s3;

pub use memory::{MemoryStore, StoredObject};
pub use s3::S3Store;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result of a successful object write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectOutput {
    pub etag: String,
}

/// Put-by-key object storage. Writes overwrite any existing object.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `body` to `bucket`/`key`
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<PutObjectOutput, StorageError>;
}

/// Build the configured store
pub async fn from_config(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, StorageError> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; uploads are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::S3 => {
            let s3 = config.s3.as_ref().ok_or_else(|| {
                StorageError::ConfigError("storage.s3 is required for the s3 backend".into())
            })?;
            Ok(Arc::new(S3Store::from_config(s3).await))
        }
    }
}
