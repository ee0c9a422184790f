//! Request router
//!
//! Maps an incoming method and path to the handler that serves it. Only an
//! exact `POST <upload_path>` reaches the ingest handler.

use crate::config::{IngestConfig, HEALTH_PATH};
use hyper::Method;

/// Routes served by the ingest server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// POST <upload_path>
    Ingest,
    /// GET /health
    Health,
    /// Anything else
    NotFound,
}

/// Route table built from configuration
#[derive(Debug, Clone)]
pub struct Router {
    upload_path: String,
}

impl Router {
    pub fn new(upload_path: impl Into<String>) -> Self {
        Self {
            upload_path: upload_path.into(),
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(config.upload_path.clone())
    }

    pub fn upload_path(&self) -> &str {
        &self.upload_path
    }

    /// Resolve a request to a route
    pub fn resolve(&self, method: &Method, path: &str) -> Route {
        if *method == Method::POST && path == self.upload_path {
            Route::Ingest
        } else if *method == Method::GET && path == HEALTH_PATH {
            Route::Health
        } else {
            Route::NotFound
        }
    }
}
