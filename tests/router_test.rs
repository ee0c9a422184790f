//! Router Integration Tests
//!
//! Only `POST <upload_path>` reaches the ingest handler; every other
//! method/path combination is a 404.

use file_upload_ingest::config::IngestConfig;
use file_upload_ingest::router::{Route, Router};
use hyper::Method;

fn router() -> Router {
    Router::from_config(&IngestConfig::default())
}

#[test]
fn test_default_upload_path() {
    assert_eq!(router().upload_path(), "/file-upload");
}

#[test]
fn test_post_upload_path_routes_to_ingest() {
    assert_eq!(router().resolve(&Method::POST, "/file-upload"), Route::Ingest);
}

#[test]
fn test_get_upload_path_not_found() {
    assert_eq!(router().resolve(&Method::GET, "/file-upload"), Route::NotFound);
}

#[test]
fn test_post_other_path_not_found() {
    assert_eq!(router().resolve(&Method::POST, "/other-path"), Route::NotFound);
}

#[test]
fn test_delete_upload_path_not_found() {
    assert_eq!(router().resolve(&Method::DELETE, "/file-upload"), Route::NotFound);
}

#[test]
fn test_other_methods_not_found() {
    for method in [Method::PUT, Method::PATCH, Method::OPTIONS, Method::HEAD] {
        assert_eq!(
            router().resolve(&method, "/file-upload"),
            Route::NotFound,
            "{} should not reach the ingest handler",
            method
        );
    }
}

#[test]
fn test_custom_upload_path() {
    let router = Router::new("/api/v1/upload");
    assert_eq!(router.resolve(&Method::POST, "/api/v1/upload"), Route::Ingest);
    assert_eq!(router.resolve(&Method::POST, "/file-upload"), Route::NotFound);
}
