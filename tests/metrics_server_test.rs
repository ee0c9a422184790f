//! Metrics Server Integration Tests
//!
//! Tests for Prometheus metrics HTTP endpoint.

use file_upload_ingest::metrics::{self, server::MetricsServer};
use std::time::Duration;

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let mut server = MetricsServer::new("127.0.0.1:0");
    let addr = server.start().await.expect("Server should start");

    metrics::record_ingest_success(42);

    let response = reqwest::Client::new()
        .get(format!("http://{}/metrics", addr))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Should connect to metrics server");

    assert!(response.status().is_success());
    let content_type = response
        .headers()
        .get("content-type")
        .expect("Should have content-type")
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = response.text().await.unwrap();
    assert!(body.contains("ingest_uploads_total"));
    assert!(body.contains("ingest_stored_bytes_total"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_unknown_path_returns_404() {
    let mut server = MetricsServer::new("127.0.0.1:0");
    let addr = server.start().await.unwrap();

    let response = reqwest::get(format!("http://{}/other", addr)).await.unwrap();
    assert_eq!(response.status(), 404);

    server.shutdown().await;
}

#[tokio::test]
async fn test_start_twice_fails() {
    let mut server = MetricsServer::new("127.0.0.1:0");
    server.start().await.unwrap();
    assert!(server.start().await.is_err());
    server.shutdown().await;
}
