//! Metrics module
//!
//! Provides Prometheus metrics for the ingest service.

pub mod server;

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, Counter, CounterVec, Histogram,
};

lazy_static! {
    // Request metrics
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "ingest_requests_total",
        "Total HTTP requests by route and status",
        &["route", "status"]
    ).unwrap();

    // Ingest metrics
    pub static ref INGESTS_TOTAL: CounterVec = register_counter_vec!(
        "ingest_uploads_total",
        "Total number of ingested uploads",
        &["status"]
    ).unwrap();

    pub static ref INGEST_BYTES_TOTAL: Counter = register_counter!(
        "ingest_stored_bytes_total",
        "Total bytes written to storage"
    ).unwrap();

    pub static ref INGEST_DURATION: Histogram = register_histogram!(
        "ingest_duration_seconds",
        "Time from extraction to completed storage write",
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]
    ).unwrap();

    // Error metrics
    pub static ref ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "ingest_errors_total",
        "Total errors",
        &["type"]
    ).unwrap();
}

/// Record a served request
pub fn record_request(route: &str, status: u16) {
    REQUESTS_TOTAL
        .with_label_values(&[route, &status.to_string()])
        .inc();
}

/// Record a successful ingest
pub fn record_ingest_success(bytes: u64) {
    INGESTS_TOTAL.with_label_values(&["success"]).inc();
    INGEST_BYTES_TOTAL.inc_by(bytes as f64);
}

/// Record a failed ingest
pub fn record_ingest_failure(kind: &str) {
    INGESTS_TOTAL.with_label_values(&["failure"]).inc();
    record_error(kind);
}

/// Record ingest duration
pub fn record_ingest_duration(duration_secs: f64) {
    INGEST_DURATION.observe(duration_secs);
}

/// Record an error
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_ingest_success() {
        let before = INGEST_BYTES_TOTAL.get();
        record_ingest_success(1024);
        assert!(INGEST_BYTES_TOTAL.get() >= before + 1024.0);
    }

    #[test]
    fn test_record_ingest_failure() {
        record_ingest_failure("malformed_body");
        assert!(ERRORS_TOTAL.with_label_values(&["malformed_body"]).get() >= 1.0);
    }

    #[test]
    fn test_record_request() {
        record_request("not_found", 404);
        assert!(REQUESTS_TOTAL.with_label_values(&["not_found", "404"]).get() >= 1.0);
    }
}
