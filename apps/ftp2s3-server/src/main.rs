//! ftp2s3 server - an FTP front end for a single S3 bucket.
//!
//! Every FTP session sees the bucket as a directory tree: `/` separators in
//! object keys become directories, objects become files. Uploads, downloads,
//! listings, deletes, `SIZE` and `MDTM` are supported; directory creation,
//! removal and renames are refused.
//!
//! # Usage
//!
//! ```text
//! AWS_BUCKET_NAME=my-bucket FTP_USERNAME=alice FTP_PASSWORD=secret ftp2s3-server
//! ftp2s3-server --store-backend memory --port 2121
//! ```
//!
//! Every flag falls back to the environment variable of the same name in
//! upper snake case (`--aws-bucket-name` reads `AWS_BUCKET_NAME`); run with
//! `--help` for the full list. `RUST_LOG` overrides `LOG_LEVEL` for
//! fine-grained tracing filters.

mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ftp2s3_core::{Ftp2S3Config, StoreBackend};
use ftp2s3_ftp::FtpServer;
use ftp2s3_s3::{BucketRef, MemoryObjectStore, ObjectStore, S3DriverFactory, S3ObjectStore};

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the object store selected by `STORE_BACKEND`.
async fn build_store(config: &Ftp2S3Config) -> Arc<dyn ObjectStore> {
    match config.store_backend {
        StoreBackend::S3 => {
            let bucket = BucketRef::from_config(config);
            info!(
                bucket = %bucket.bucket,
                region = %bucket.region,
                endpoint = ?bucket.endpoint_url,
                "using S3 object store"
            );
            Arc::new(S3ObjectStore::connect(bucket).await)
        }
        StoreBackend::Memory => {
            info!("using in-memory object store, files are lost on exit");
            Arc::new(MemoryObjectStore::new())
        }
    }
}

/// Connect to the control port and expect a `220` greeting.
///
/// Exits with code 0 if healthy, 1 otherwise.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;
    let (reader, mut writer) = stream.into_split();
    let mut greeting = String::new();
    BufReader::new(reader).read_line(&mut greeting).await?;
    writer.write_all(b"QUIT\r\n").await.ok();

    if greeting.starts_with("220") {
        Ok(())
    } else {
        anyhow::bail!("unexpected greeting from {addr}: {}", greeting.trim_end())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let config = cli.config();

    // Handle --health-check flag for container health probes.
    if cli.health_check {
        let addr = config.listen_addr().replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level)?;
    config.validate().context("invalid configuration")?;

    info!(
        listen = %config.listen_addr(),
        server_name = %config.server_name,
        store_backend = %config.store_backend,
        passive_ports = %format!("{}-{}", config.passive_port_low, config.passive_port_high),
        version = VERSION,
        "starting ftp2s3 server",
    );

    let store = build_store(&config).await;
    let factory = Arc::new(S3DriverFactory::from_config(store, &config));

    let server = FtpServer::bind(&config, factory)
        .await
        .context("failed to start FTP listener")?;
    let addr = server.local_addr()?;
    info!(
        url = %format!("ftp://{}@{addr}", config.ftp_username),
        "listening for connections"
    );

    server.serve().await?;
    Ok(())
}
