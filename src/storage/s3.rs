//! S3 object store
//!
//! Writes objects with the AWS SDK. A custom endpoint (MinIO, RustFS, a test
//! mock) switches the client to path-style addressing.
//!
//! # Example
//!
//! ```no_run
//! use file_upload_ingest::config::S3Config;
//! use file_upload_ingest::storage::{ObjectStore, S3Store};
//! use bytes::Bytes;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = S3Store::from_config(&S3Config {
//!     bucket: "ts-file-upload-bucket".to_string(),
//!     region: "us-east-1".to_string(),
//!     endpoint: Some("http://localhost:9000".to_string()),
//!     access_key: Some("minioadmin".to_string()),
//!     secret_key: Some("minioadmin".to_string()),
//! })
//! .await;
//!
//! let output = store
//!     .put_object("ts-file-upload-bucket", "data/hello.txt", Bytes::from("Hello"), None)
//!     .await?;
//! println!("ETag: {}", output.etag);
//! # Ok(())
//! # }
//! ```

use super::{ObjectStore, PutObjectOutput, StorageError};
use crate::config::S3Config;
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;

/// S3-backed object store
#[derive(Debug, Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    /// Build a store from configuration.
    ///
    /// Static credentials are used when both keys are set; otherwise the
    /// default AWS provider chain applies. Retries are disabled: a failed
    /// write is reported to the caller as-is.
    pub async fn from_config(config: &S3Config) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .retry_config(RetryConfig::disabled());

        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "file-upload-ingest-static",
            ));
        }

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint.clone());
        }

        let shared = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.endpoint.is_some())
            .build();

        Self::with_client(aws_sdk_s3::Client::from_conf(s3_config))
    }

    /// Wrap an already configured SDK client
    pub fn with_client(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    #[tracing::instrument(
        name = "s3.put_object",
        skip(self, body),
        fields(
            s3.bucket = %bucket,
            s3.key = %key,
            http.method = "PUT",
            upload.bytes = body.len(),
            s3.etag = tracing::field::Empty
        ),
        err
    )]
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<PutObjectOutput, StorageError> {
        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .set_content_type(content_type.map(str::to_string))
            .send()
            .await
            .map_err(|e| StorageError::Backend(DisplayErrorContext(&e).to_string()))?;

        let etag = output.e_tag().unwrap_or_default().to_string();
        tracing::Span::current().record("s3.etag", etag.as_str());

        Ok(PutObjectOutput { etag })
    }
}
