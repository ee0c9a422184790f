//! HTTP server module
//!
//! Accepts connections with hyper and routes each request: `POST
//! <upload_path>` to the ingest handler, `GET /health` to the health check,
//! everything else to 404.
//!
//! # Example
//!
//! ```no_run
//! use file_upload_ingest::config::Config;
//! use file_upload_ingest::server::Server;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = Server::bind(Config::default()).await?;
//! println!("Listening on {}", server.local_addr());
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use crate::ingest::{IngestError, IngestHandler, IngestRequest, IngestSettings};
use crate::metrics;
use crate::router::{Route, Router};
use crate::storage::{self, ObjectStore, StorageError};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{body::Incoming, Request};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info, warn, Instrument};

pub mod response;

use response::JsonResponse;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(String),

    #[error("Storage setup failed: {0}")]
    Storage(#[from] StorageError),
}

/// State shared by every connection
pub struct AppState {
    router: Router,
    handler: IngestHandler,
    max_body_bytes: usize,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<dyn ObjectStore>) -> Self {
        let settings = IngestSettings::new(config.storage.bucket(), &config.ingest);
        Self {
            router: Router::from_config(&config.ingest),
            handler: IngestHandler::new(store, settings),
            max_body_bytes: config.server.max_body_bytes,
        }
    }
}

/// Ingest HTTP server
pub struct Server {
    state: Arc<AppState>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Build the configured store and bind the listener
    pub async fn bind(config: Config) -> Result<Self, ServerError> {
        let store = storage::from_config(&config.storage).await?;
        Self::with_store(&config, store).await
    }

    /// Bind the listener using an already constructed store.
    ///
    /// Port 0 lets the OS pick a port; see [`Server::local_addr`].
    pub async fn with_store(
        config: &Config,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self, ServerError> {
        let addr: SocketAddr = config
            .server
            .address
            .parse()
            .map_err(|e| ServerError::BindError(format!("Invalid address: {}", e)))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(format!("Failed to bind to {}: {}", addr, e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(format!("Failed to get local address: {}", e)))?;

        info!(
            address = %local_addr,
            upload_path = %config.ingest.upload_path,
            bucket = %config.storage.bucket(),
            "Server bound"
        );

        Ok(Self {
            state: Arc::new(AppState::new(config, store)),
            listener,
            local_addr,
        })
    }

    /// The address the server is listening on
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until the process is stopped
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves. In-flight connections finish on their
    /// own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let (stream, peer_addr) = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down server");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                },
            };

            let state = Arc::clone(&self.state);

            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let state = Arc::clone(&state);
                    async move { handle_request(req, state).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection from {}: {}", peer_addr, e);
                }
            });
        }
    }
}

/// Handle one HTTP request
async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<JsonResponse, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let route = state.router.resolve(&method, &path);

    let span = tracing::info_span!(
        "http.request",
        request_id = %uuid::Uuid::new_v4(),
        http.method = %method,
        http.path = %path,
        http.route = ?route,
        http.status_code = tracing::field::Empty
    );

    async move {
        let response = match route {
            Route::Health => response::health(),
            Route::NotFound => {
                info!("No route for {} {}", method, path);
                response::not_found()
            }
            Route::Ingest => match ingest(req, &state).await {
                Ok(response) => response,
                Err(e) => {
                    metrics::record_ingest_failure(e.kind());
                    if e.is_client_error() {
                        warn!(error = %e, "Rejected upload");
                    } else {
                        error!(error = %e, "Upload failed");
                    }
                    response::ingest_error(&e)
                }
            },
        };

        let status = response.status().as_u16();
        tracing::Span::current().record("http.status_code", status);
        metrics::record_request(route_label(route), status);
        Ok(response)
    }
    .instrument(span)
    .await
}

async fn ingest(req: Request<Incoming>, state: &AppState) -> Result<JsonResponse, IngestError> {
    let content_type = req
        .headers()
        .get(hyper::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = Limited::new(req.into_body(), state.max_body_bytes)
        .collect()
        .await
        .map_err(|e| {
            if e.is::<LengthLimitError>() {
                IngestError::PayloadTooLarge {
                    limit: state.max_body_bytes,
                }
            } else {
                IngestError::MalformedBody(format!("failed to read body: {}", e))
            }
        })?
        .to_bytes();

    info!(bytes = body.len(), "Upload received");

    let outcome = state
        .handler
        .process(IngestRequest { content_type, body })
        .await?;

    Ok(response::uploaded(&outcome))
}

fn route_label(route: Route) -> &'static str {
    match route {
        Route::Ingest => "ingest",
        Route::Health => "health",
        Route::NotFound => "not_found",
    }
}
