//! Ingest module
//!
//! Turns one upload request into one object write: locate the file part,
//! stamp its text with the processing time, and store it under
//! `<key_prefix>/<filename>`.

use crate::config::{ContentMode, IngestConfig, ParserMode};
use crate::metrics;
use crate::storage::{ObjectStore, StorageError};
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use hyper::StatusCode;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

pub mod multipart;
pub mod positional;

/// Separator placed between the file content and the timestamp
pub const TIMESTAMP_LABEL: &str = "\n\n Process Timestamp: ";

/// Content type of every stored object
pub const STORED_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Ingest errors
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Malformed upload body: {0}")]
    MalformedBody(String),

    #[error("No file part found in upload")]
    MissingFile,

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Uploaded content is not valid UTF-8 text")]
    NonTextContent,

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Upload exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl IngestError {
    /// HTTP status the error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedBody(_)
            | Self::MissingFile
            | Self::InvalidFilename(_)
            | Self::NonTextContent => StatusCode::BAD_REQUEST,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller sent something we cannot process
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedBody(_) => "malformed_body",
            Self::MissingFile => "missing_file",
            Self::InvalidFilename(_) => "invalid_filename",
            Self::NonTextContent => "non_text_content",
            Self::UnsupportedMediaType(_) => "unsupported_media_type",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::Storage(_) => "storage",
        }
    }

    /// Message safe to return to the caller. Storage details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Storage(_) => "Failed to store uploaded file".to_string(),
            other => other.to_string(),
        }
    }
}

/// The file pulled out of an upload body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub content: String,
}

/// A raw upload as received by the server
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl IngestRequest {
    pub fn new(content_type: Option<&str>, body: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }
}

/// Result of a completed ingest
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub key: String,
    pub etag: String,
    pub bytes_written: u64,
    pub processed_at: DateTime<Utc>,
}

/// Ingest settings resolved from configuration
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub bucket: String,
    pub key_prefix: String,
    pub parser: ParserMode,
    pub content: ContentMode,
}

impl IngestSettings {
    pub fn new(bucket: impl Into<String>, config: &IngestConfig) -> Self {
        Self {
            bucket: bucket.into(),
            key_prefix: config.key_prefix.clone(),
            parser: config.parser,
            content: config.content,
        }
    }
}

/// Object key for an uploaded file
pub fn object_key(prefix: &str, filename: &str) -> String {
    format!("{}/{}", prefix, filename)
}

/// Render a processing time as ISO-8601 UTC with millisecond precision
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Append the processing timestamp to file content
pub fn stamp_content(content: &str, processed_at: DateTime<Utc>) -> String {
    let mut stamped = String::with_capacity(content.len() + TIMESTAMP_LABEL.len() + 24);
    stamped.push_str(content);
    stamped.push_str(TIMESTAMP_LABEL);
    stamped.push_str(&format_timestamp(processed_at));
    stamped
}

/// First line of `content`, trimmed
pub(crate) fn first_line(content: &str) -> String {
    content.lines().next().unwrap_or_default().trim().to_string()
}

/// Reject filenames that would produce a bare prefix key
pub(crate) fn validate_filename(filename: &str) -> Result<(), IngestError> {
    if filename.is_empty() {
        return Err(IngestError::InvalidFilename("filename is empty".into()));
    }
    Ok(())
}

/// Ingest handler
///
/// Holds the injected object store; one instance serves every request.
pub struct IngestHandler {
    store: Arc<dyn ObjectStore>,
    settings: IngestSettings,
}

impl IngestHandler {
    pub fn new(store: Arc<dyn ObjectStore>, settings: IngestSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    /// Locate the file in the body using the configured parser
    pub async fn extract(&self, request: &IngestRequest) -> Result<ExtractedFile, IngestError> {
        match self.settings.parser {
            ParserMode::Positional => {
                let body =
                    std::str::from_utf8(&request.body).map_err(|_| IngestError::NonTextContent)?;
                positional::extract(body, self.settings.content)
            }
            ParserMode::Multipart => {
                let content_type = request.content_type.as_deref().ok_or_else(|| {
                    IngestError::UnsupportedMediaType("missing Content-Type header".into())
                })?;
                multipart::extract(content_type, request.body.clone(), self.settings.content)
                    .await
            }
        }
    }

    /// Extract, stamp and store one upload
    #[tracing::instrument(
        name = "ingest.process",
        skip(self, request),
        fields(
            ingest.parser = ?self.settings.parser,
            ingest.body_bytes = request.body.len(),
            ingest.filename = tracing::field::Empty,
            s3.key = tracing::field::Empty,
            s3.etag = tracing::field::Empty
        ),
        err
    )]
    pub async fn process(&self, request: IngestRequest) -> Result<IngestOutcome, IngestError> {
        let start_time = Instant::now();
        let file = self.extract(&request).await?;

        let span = tracing::Span::current();
        span.record("ingest.filename", file.filename.as_str());

        let processed_at = Utc::now();
        let stamped = stamp_content(&file.content, processed_at);
        let bytes_written = stamped.len() as u64;
        let key = object_key(&self.settings.key_prefix, &file.filename);
        span.record("s3.key", key.as_str());

        let result = self
            .store
            .put_object(
                &self.settings.bucket,
                &key,
                Bytes::from(stamped),
                Some(STORED_CONTENT_TYPE),
            )
            .await;

        let duration = start_time.elapsed();
        metrics::record_ingest_duration(duration.as_secs_f64());

        match result {
            Ok(output) => {
                metrics::record_ingest_success(bytes_written);
                span.record("s3.etag", output.etag.as_str());

                tracing::info!(
                    key = %key,
                    etag = %output.etag,
                    bytes_written = bytes_written,
                    duration_ms = duration.as_millis(),
                    "Stored uploaded file"
                );

                Ok(IngestOutcome {
                    key,
                    etag: output.etag,
                    bytes_written,
                    processed_at,
                })
            }
            Err(e) => {
                tracing::error!(
                    key = %key,
                    error = %e,
                    duration_ms = duration.as_millis(),
                    "Storage write failed"
                );
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, PutObjectOutput};
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct RejectingStore;

    #[async_trait]
    impl ObjectStore for RejectingStore {
        async fn put_object(
            &self,
            _bucket: &str,
            _key: &str,
            _body: Bytes,
            _content_type: Option<&str>,
        ) -> Result<PutObjectOutput, StorageError> {
            Err(StorageError::Backend("AccessDenied".into()))
        }
    }

    fn positional_settings(content: ContentMode) -> IngestSettings {
        IngestSettings {
            bucket: "bucket".into(),
            key_prefix: "data".into(),
            parser: ParserMode::Positional,
            content,
        }
    }

    fn legacy_body() -> String {
        [
            "--boundary",
            "Content-Disposition: form-data; name=\"file\"; filename=\"hello.txt\"",
            "Content-Type: text/plain",
            "",
            "Hello World",
        ]
        .join("\r\n")
    }

    #[test]
    fn test_stamp_content_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(
            stamp_content("Hello", at),
            "Hello\n\n Process Timestamp: 2024-03-01T12:30:05.000Z"
        );
    }

    #[test]
    fn test_object_key() {
        assert_eq!(object_key("data", "hello.txt"), "data/hello.txt");
        assert_eq!(object_key("data", "my file (1).txt"), "data/my file (1).txt");
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("  one  \r\ntwo\nthree"), "one");
        assert_eq!(first_line(""), "");
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(
            IngestError::MalformedBody("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            IngestError::UnsupportedMediaType("x".into()).status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            IngestError::PayloadTooLarge { limit: 1 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        let storage = IngestError::Storage(StorageError::Backend("secret detail".into()));
        assert_eq!(storage.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!storage.is_client_error());
        assert!(!storage.public_message().contains("secret detail"));
    }

    #[tokio::test]
    async fn test_process_writes_stamped_object() {
        let store = Arc::new(MemoryStore::new());
        let handler = IngestHandler::new(store.clone(), positional_settings(ContentMode::FirstLine));

        let outcome = handler
            .process(IngestRequest::new(None, legacy_body()))
            .await
            .unwrap();

        assert_eq!(outcome.key, "data/hello.txt");
        let stored = store.get("bucket", "data/hello.txt").unwrap();
        let text = stored.text().unwrap();
        assert!(text.starts_with("Hello World\n\n Process Timestamp: "));
        assert_eq!(stored.content_type.as_deref(), Some(STORED_CONTENT_TYPE));
        assert_eq!(outcome.bytes_written, text.len() as u64);
        assert_eq!(outcome.etag, stored.etag);
    }

    #[tokio::test]
    async fn test_storage_failure_is_server_error() {
        let handler = IngestHandler::new(
            Arc::new(RejectingStore),
            positional_settings(ContentMode::FirstLine),
        );

        let err = handler
            .process(IngestRequest::new(None, legacy_body()))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Storage(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_malformed_body_never_reaches_storage() {
        let store = Arc::new(MemoryStore::new());
        let handler = IngestHandler::new(store.clone(), positional_settings(ContentMode::Full));

        let err = handler
            .process(IngestRequest::new(None, "--boundary\r\nshort"))
            .await
            .unwrap_err();

        assert!(err.is_client_error());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_multipart_requires_content_type() {
        let handler = IngestHandler::new(
            Arc::new(MemoryStore::new()),
            IngestSettings {
                parser: ParserMode::Multipart,
                ..positional_settings(ContentMode::Full)
            },
        );

        let err = handler
            .process(IngestRequest::new(None, legacy_body()))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::UnsupportedMediaType(_)));
    }
}
