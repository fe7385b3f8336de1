//! Bucketeer - MinIO bucket and file operations
//!
//! Loads the MinIO connection settings, provisions the default bucket and
//! runs a single command against the server.

mod commands;

use anyhow::Context;
use bucketeer_core::MinioConfig;
use bucketeer_s3::MinioFiles;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "bucketeer")]
#[command(about = "MinIO bucket and file operations", long_about = None)]
struct Args {
    /// Configuration file (bucketeer.toml in the working directory if omitted)
    #[arg(short, long, env = "BUCKETEER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "BUCKETEER_LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "bucketeer={0},bucketeer_s3={0},bucketeer_core={0}",
                    args.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = MinioConfig::load_from(args.config.as_deref())
        .context("failed to load MinIO configuration")?;

    info!(
        endpoint = %config.endpoint,
        default_bucket = %config.default_bucket_name,
        "Starting Bucketeer..."
    );

    let files = MinioFiles::connect(config).await?;
    args.command.run(&files).await
}
