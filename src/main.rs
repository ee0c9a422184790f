//! File Upload Ingest - multipart upload service and client
//!
//! `serve` runs the ingest HTTP server; `upload` sends one file to it.

use clap::{Parser, Subcommand};
use file_upload_ingest::client::{SelectedFile, UploadClient, UploadSession};
use file_upload_ingest::metrics::server::MetricsServer;
use file_upload_ingest::{config::Config, logging, server::Server};
use std::path::{Path, PathBuf};
use tracing::info;

/// File Upload Ingest - stamp uploaded files and store them in S3
#[derive(Parser, Debug)]
#[command(name = "file-upload-ingest")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the ingest server
    Serve,

    /// Upload one file to the ingest endpoint
    Upload {
        /// File to upload
        file: PathBuf,

        /// Override the configured endpoint URL
        #[arg(long)]
        endpoint: Option<String>,
    },
}

/// Missing config file means defaults; any other problem is fatal
fn load_config(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        Ok(Config::load(path)?)
    } else {
        Ok(Config::default())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    logging::init_subscriber(&config.logging)?;

    info!("Starting file-upload-ingest v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Serve => serve(config).await,
        Command::Upload { file, endpoint } => {
            if let Some(endpoint) = endpoint {
                config.client.endpoint = endpoint;
            }
            upload(config, &file).await
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let mut metrics_server = if config.metrics.enabled {
        let mut server = MetricsServer::new(config.metrics.address.clone());
        server.start().await?;
        Some(server)
    } else {
        None
    };

    let server = Server::bind(config).await?;
    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    if let Some(server) = metrics_server.as_mut() {
        server.shutdown().await;
    }

    Ok(())
}

async fn upload(config: Config, path: &Path) -> anyhow::Result<()> {
    let client = UploadClient::new(&config.client)?;
    info!(endpoint = %client.endpoint(), "Uploading {}", path.display());

    let mut session = UploadSession::new(client);
    println!("{}", session.render());

    session.select(SelectedFile::from_path(path).await?);
    println!("{}", session.render());

    match session.upload().await {
        Ok(receipt) => {
            info!(status = receipt.status.as_u16(), "Upload finished");
            println!("{}", session.render());
            Ok(())
        }
        Err(e) => {
            eprintln!("Upload failed: {}", e);
            Err(e.into())
        }
    }
}
