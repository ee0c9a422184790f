//! In-memory object store
//!
//! Keeps objects in a concurrent map keyed by `(bucket, key)`. Used for local
//! runs without S3 and as the storage fake in tests.

use super::{ObjectStore, PutObjectOutput, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};

/// A stored object
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub etag: String,
    pub last_modified: DateTime<Utc>,
}

impl StoredObject {
    /// Body as UTF-8 text, if it is text
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// In-memory object store
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: DashMap<(String, String), StoredObject>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a copy of an object
    pub fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Number of stored objects across all buckets
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Quoted hex digest, shaped like an S3 ETag
    fn etag_for(body: &[u8]) -> String {
        let digest = Sha256::digest(body);
        format!("\"{}\"", hex::encode(&digest[..16]))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    #[tracing::instrument(
        name = "storage.memory.put_object",
        skip(self, body),
        fields(
            storage.bucket = %bucket,
            storage.key = %key,
            upload.bytes = body.len()
        )
    )]
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<PutObjectOutput, StorageError> {
        let etag = Self::etag_for(&body);
        let object = StoredObject {
            body,
            content_type: content_type.map(str::to_string),
            etag: etag.clone(),
            last_modified: Utc::now(),
        };

        if self
            .objects
            .insert((bucket.to_string(), key.to_string()), object)
            .is_some()
        {
            tracing::debug!("Replaced existing object");
        }

        Ok(PutObjectOutput { etag })
    }
}
