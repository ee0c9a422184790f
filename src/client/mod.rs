//! Upload client
//!
//! Sends one selected file to the ingest endpoint as `multipart/form-data`
//! and tracks the three states of the upload screen: waiting for a file, a
//! file selected, and upload finished.
//!
//! # Example
//!
//! ```no_run
//! use file_upload_ingest::client::{SelectedFile, UploadClient, UploadSession};
//! use file_upload_ingest::config::ClientConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = UploadClient::new(&ClientConfig::default())?;
//! let mut session = UploadSession::new(client);
//!
//! session.select(SelectedFile::from_path("notes.txt").await?);
//! println!("{}", session.render());
//!
//! session.upload().await?;
//! println!("{}", session.render());
//! # Ok(())
//! # }
//! ```

use crate::config::ClientConfig;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("No file selected")]
    NothingSelected,

    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upload rejected with status {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

/// A file chosen for upload
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub contents: Bytes,
}

impl SelectedFile {
    /// In-memory file; the MIME type is guessed from the name
    pub fn new(name: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        let name = name.into();
        let mime_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            name,
            mime_type,
            last_modified: None,
            contents: contents.into(),
        }
    }

    /// Read a file from disk
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::InvalidFile(format!("{} has no file name", path.display())))?
            .to_string();

        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(ClientError::InvalidFile(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        let contents = tokio::fs::read(path).await?;

        let mut file = Self::new(name, contents);
        file.last_modified = metadata.modified().ok().map(DateTime::<Utc>::from);
        Ok(file)
    }

    pub fn with_last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified = Some(at);
        self
    }
}

/// Response from a successful upload
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub status: StatusCode,
    pub body: String,
}

/// Sends files to the ingest endpoint
#[derive(Debug, Clone)]
pub struct UploadClient {
    http: reqwest::Client,
    endpoint: String,
    field_name: String,
}

impl UploadClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            field_name: config.field_name.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST the file. Any 2xx status counts as success.
    #[tracing::instrument(
        name = "client.upload",
        skip(self, file),
        fields(
            http.url = %self.endpoint,
            file.name = %file.name,
            file.bytes = file.contents.len()
        ),
        err
    )]
    pub async fn upload(&self, file: &SelectedFile) -> Result<UploadReceipt, ClientError> {
        let part = Part::bytes(file.contents.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)?;
        let form = Form::new().part(self.field_name.clone(), part);

        let response = self.http.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Rejected { status, body });
        }

        tracing::info!(status = status.as_u16(), "Upload accepted");
        Ok(UploadReceipt { status, body })
    }
}

/// State of the upload screen
#[derive(Debug, Clone)]
pub enum UploadState {
    AwaitingSelection,
    Selected(SelectedFile),
    Uploaded { status: StatusCode },
}

/// One client session: pick a file, upload it, show the result.
///
/// `upload` takes `&mut self`, so a session cannot start a second upload
/// while one is in flight.
#[derive(Debug)]
pub struct UploadSession {
    client: UploadClient,
    state: UploadState,
}

impl UploadSession {
    pub fn new(client: UploadClient) -> Self {
        Self {
            client,
            state: UploadState::AwaitingSelection,
        }
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    /// Choose (or replace) the file to upload
    pub fn select(&mut self, file: SelectedFile) {
        self.state = UploadState::Selected(file);
    }

    /// Upload the selected file.
    ///
    /// On success the selection is cleared and the session moves to
    /// `Uploaded`. On failure the selection is kept so the user can retry.
    pub async fn upload(&mut self) -> Result<UploadReceipt, ClientError> {
        let UploadState::Selected(file) = &self.state else {
            return Err(ClientError::NothingSelected);
        };

        let receipt = self.client.upload(file).await?;
        self.state = UploadState::Uploaded {
            status: receipt.status,
        };
        Ok(receipt)
    }

    /// Text for the current state
    pub fn render(&self) -> String {
        match &self.state {
            UploadState::Selected(file) => {
                let modified = file
                    .last_modified
                    .map(|at| at.format("%a %b %d %Y").to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                format!(
                    "File Details\nFile Name: {}\nFile Type: {}\nLast Modified: {}",
                    file.name, file.mime_type, modified
                )
            }
            UploadState::Uploaded { .. } => "File successfully uploaded".to_string(),
            UploadState::AwaitingSelection => "Choose a file to upload:".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session() -> UploadSession {
        UploadSession::new(UploadClient::new(&ClientConfig::default()).unwrap())
    }

    #[test]
    fn test_mime_guess() {
        assert_eq!(SelectedFile::new("a.txt", "x").mime_type, "text/plain");
        assert_eq!(SelectedFile::new("a.json", "{}").mime_type, "application/json");
        assert_eq!(
            SelectedFile::new("noext", "x").mime_type,
            "application/octet-stream"
        );
    }

    #[test]
    fn test_render_states() {
        let mut session = session();
        assert_eq!(session.render(), "Choose a file to upload:");

        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        session.select(SelectedFile::new("hello.txt", "Hello").with_last_modified(at));
        assert_eq!(
            session.render(),
            "File Details\nFile Name: hello.txt\nFile Type: text/plain\nLast Modified: Fri Mar 01 2024"
        );
    }

    #[tokio::test]
    async fn test_upload_without_selection() {
        let mut session = session();
        let err = session.upload().await.unwrap_err();
        assert!(matches!(err, ClientError::NothingSelected));
    }

    #[tokio::test]
    async fn test_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "line one\nline two").unwrap();

        let file = SelectedFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "notes.txt");
        assert_eq!(file.mime_type, "text/plain");
        assert_eq!(&file.contents[..], b"line one\nline two");
        assert!(file.last_modified.is_some());
    }

    #[tokio::test]
    async fn test_from_path_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = SelectedFile::from_path(dir.path()).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidFile(_)));
    }
}
