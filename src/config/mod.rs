//! Configuration module for the ingest service
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion and validation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Route that is always reserved for the health check
pub const HEALTH_PATH: &str = "/health";

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate that a URL starts with http:// or https://
fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "server.max_body_bytes must be greater than zero".into(),
            ));
        }

        let upload_path = &self.ingest.upload_path;
        if !upload_path.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "Upload path '{}' must start with /",
                upload_path
            )));
        }
        if upload_path == HEALTH_PATH {
            return Err(ConfigError::ValidationError(format!(
                "Upload path cannot be {}",
                HEALTH_PATH
            )));
        }

        let prefix = &self.ingest.key_prefix;
        if prefix.is_empty() || prefix.starts_with('/') || prefix.ends_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "Invalid key prefix '{}': must be non-empty without leading or trailing /",
                prefix
            )));
        }

        if self.storage.bucket().trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage bucket cannot be empty".into(),
            ));
        }

        if self.storage.backend == StorageBackend::S3 {
            let Some(ref s3) = self.storage.s3 else {
                return Err(ConfigError::ValidationError(
                    "storage.s3 is required when backend is 's3'".into(),
                ));
            };
            if self.storage.bucket != default_bucket() && self.storage.bucket != s3.bucket {
                return Err(ConfigError::ValidationError(format!(
                    "storage.bucket '{}' only applies to the memory backend; set storage.s3.bucket instead",
                    self.storage.bucket
                )));
            }
            if s3.region.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "storage.s3.region cannot be empty".into(),
                ));
            }
            if let Some(ref endpoint) = s3.endpoint {
                if !is_valid_http_url(endpoint) {
                    return Err(ConfigError::ValidationError(format!(
                        "Invalid S3 endpoint '{}': must start with http:// or https://",
                        endpoint
                    )));
                }
            }
            if s3.access_key.is_some() != s3.secret_key.is_some() {
                return Err(ConfigError::ValidationError(
                    "storage.s3.access_key and secret_key must be set together".into(),
                ));
            }
        }

        if !is_valid_http_url(&self.client.endpoint) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid client endpoint '{}': must start with http:// or https://",
                self.client.endpoint
            )));
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_body_bytes() -> usize {
    10485760 // 10MB
}

/// How the file part is located inside the request body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserMode {
    /// Standards-compliant multipart/form-data decoding
    #[default]
    Multipart,
    /// Fixed line offsets, kept for parity with the legacy demo
    Positional,
}

/// How much of the uploaded file is stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentMode {
    /// Keep the whole file
    #[default]
    Full,
    /// Keep only the first line, trimmed
    FirstLine,
}

/// Ingest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_upload_path")]
    pub upload_path: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default)]
    pub parser: ParserMode,
    #[serde(default)]
    pub content: ContentMode,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            upload_path: default_upload_path(),
            key_prefix: default_key_prefix(),
            parser: ParserMode::default(),
            content: ContentMode::default(),
        }
    }
}

fn default_upload_path() -> String {
    "/file-upload".to_string()
}

fn default_key_prefix() -> String {
    "data".to_string()
}

/// Storage backend selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    S3,
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Bucket used by the in-memory backend. The s3 backend writes to
    /// `s3.bucket`; setting this to anything else there is rejected.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default)]
    pub s3: Option<S3Config>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            bucket: default_bucket(),
            s3: Some(S3Config::default()),
        }
    }
}

impl StorageConfig {
    /// In-memory storage, mostly for local runs and tests
    pub fn memory() -> Self {
        Self {
            backend: StorageBackend::Memory,
            bucket: default_bucket(),
            s3: None,
        }
    }

    /// The bucket uploads are written to
    pub fn bucket(&self) -> &str {
        match (self.backend, &self.s3) {
            (StorageBackend::S3, Some(s3)) => &s3.bucket,
            _ => &self.bucket,
        }
    }
}

fn default_bucket() -> String {
    "ts-file-upload-bucket".to_string()
}

/// S3 backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            region: default_region(),
            endpoint: None,
            access_key: None,
            secret_key: None,
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_address")]
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            address: default_metrics_address(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_address() -> String {
    "0.0.0.0:9090".to_string()
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Upload client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_client_endpoint")]
    pub endpoint: String,
    /// Multipart field the file is sent under
    #[serde(default = "default_field_name")]
    pub field_name: String,
    #[serde(default = "default_client_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_client_endpoint(),
            field_name: default_field_name(),
            timeout_seconds: default_client_timeout(),
        }
    }
}

fn default_client_endpoint() -> String {
    "http://localhost:8080/file-upload".to_string()
}

fn default_field_name() -> String {
    "demo file".to_string()
}

fn default_client_timeout() -> u64 {
    30
}
