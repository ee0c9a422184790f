//! Upload Client Integration Tests
//!
//! ## Test Coverage
//!
//! - Multipart request shape (field name, filename, contents)
//! - Session state after success and after rejection
//! - Client against the real ingest server

use chrono::{TimeZone, Utc};
use file_upload_ingest::client::{
    ClientError, SelectedFile, UploadClient, UploadSession, UploadState,
};
use file_upload_ingest::config::{ClientConfig, Config, StorageConfig};
use file_upload_ingest::server::Server;
use file_upload_ingest::storage::MemoryStore;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(endpoint: String) -> UploadClient {
    UploadClient::new(&ClientConfig {
        endpoint,
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_upload_sends_multipart_form() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/file-upload"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains("name=\"demo file\""))
        .and(body_string_contains("filename=\"notes.txt\""))
        .and(body_string_contains("remember the milk"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"message":"File uploaded"}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(format!("{}/file-upload", mock_server.uri()));
    let receipt = client
        .upload(&SelectedFile::new("notes.txt", "remember the milk"))
        .await
        .unwrap();

    assert_eq!(receipt.status.as_u16(), 200);
    assert!(receipt.body.contains("File uploaded"));
}

#[tokio::test]
async fn test_session_success_moves_to_uploaded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let mut session = UploadSession::new(client_for(format!("{}/file-upload", mock_server.uri())));
    assert_eq!(session.render(), "Choose a file to upload:");

    let modified = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    session.select(SelectedFile::new("report.csv", "a,b\n1,2").with_last_modified(modified));
    assert_eq!(
        session.render(),
        "File Details\nFile Name: report.csv\nFile Type: text/csv\nLast Modified: Fri Mar 01 2024"
    );

    session.upload().await.unwrap();

    assert!(matches!(session.state(), UploadState::Uploaded { .. }));
    assert_eq!(session.render(), "File successfully uploaded");
}

#[tokio::test]
async fn test_rejected_upload_keeps_selection() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string(r#"{"error":"boom"}"#))
        .mount(&mock_server)
        .await;

    let mut session = UploadSession::new(client_for(format!("{}/file-upload", mock_server.uri())));
    session.select(SelectedFile::new("hello.txt", "Hello"));

    let err = session.upload().await.unwrap_err();
    match err {
        ClientError::Rejected { status, body } => {
            assert_eq!(status.as_u16(), 500);
            assert!(body.contains("boom"));
        }
        other => panic!("expected rejection, got {:?}", other),
    }

    match session.state() {
        UploadState::Selected(file) => assert_eq!(file.name, "hello.txt"),
        other => panic!("selection should survive a failed upload, got {:?}", other),
    }
    assert_ne!(session.render(), "File successfully uploaded");
}

#[tokio::test]
async fn test_unreachable_endpoint_is_http_error() {
    // Bind and drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(format!("http://{}/file-upload", addr));
    let err = client
        .upload(&SelectedFile::new("hello.txt", "Hello"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Http(_)));
}

#[tokio::test]
async fn test_client_against_ingest_server() {
    let mut config = Config {
        storage: StorageConfig::memory(),
        ..Default::default()
    };
    config.server.address = "127.0.0.1:0".into();

    let store = Arc::new(MemoryStore::new());
    let server = Server::with_store(&config, store.clone()).await.unwrap();
    let addr = server.local_addr();
    tokio::spawn(server.run());

    let mut session = UploadSession::new(client_for(format!("http://{}/file-upload", addr)));
    session.select(SelectedFile::new("hello.txt", "Hello World"));
    let receipt = session.upload().await.unwrap();

    assert_eq!(receipt.status.as_u16(), 200);
    let stored = store.get("ts-file-upload-bucket", "data/hello.txt").unwrap();
    assert!(stored.text().unwrap().starts_with("Hello World\n\n Process Timestamp: "));
}
