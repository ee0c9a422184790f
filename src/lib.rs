//! File Upload Ingest Library
//!
//! Receives a file posted as `multipart/form-data`, appends a processing
//! timestamp to its text, and writes it to object storage under
//! `<prefix>/<filename>`.
//!
//! # Features
//!
//! - **Real Multipart Decoding**: `multer` locates the file part; a
//!   positional parser is kept for parity with legacy clients
//! - **Injected Storage**: S3 in production, in-memory for local runs
//! - **Classified Errors**: malformed uploads get 4xx, storage failures 5xx
//! - **Upload Client**: a session-based client that reports every failure
//!
//! # Example
//!
//! ```no_run
//! use file_upload_ingest::{config::Config, server::Server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let server = Server::bind(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod router;
pub mod server;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use ingest::{IngestError, IngestHandler};
pub use server::Server;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
