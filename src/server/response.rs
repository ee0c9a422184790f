//! Response builders
//!
//! Every response carries a JSON body and a permissive CORS origin so a
//! browser front-end on another origin can read the result.

use crate::ingest::{IngestError, IngestOutcome};
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde_json::json;

pub type JsonResponse = Response<Full<Bytes>>;

/// Build a JSON response with the given status
pub fn build_response(status: StatusCode, body: &serde_json::Value) -> JsonResponse {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

pub fn uploaded(outcome: &IngestOutcome) -> JsonResponse {
    build_response(
        StatusCode::OK,
        &json!({
            "message": "File uploaded",
            "key": outcome.key,
            "etag": outcome.etag,
        }),
    )
}

pub fn ingest_error(error: &IngestError) -> JsonResponse {
    build_response(error.status_code(), &json!({ "error": error.public_message() }))
}

pub fn health() -> JsonResponse {
    build_response(StatusCode::OK, &json!({ "status": "ok" }))
}

pub fn not_found() -> JsonResponse {
    build_response(StatusCode::NOT_FOUND, &json!({ "error": "Not Found" }))
}
