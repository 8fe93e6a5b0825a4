//! Stowage CLI: command-line access to the configured remote storage.
//!
//! Reads S3_BUCKET, S3_HOST, S3_REGION and AWS credentials from the
//! environment (or a .env file).

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use stowage_cli::{init_tracing, PutOptions};
use stowage_core::AppConfig;
use stowage_storage::create_storage;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "stowage", about = "Remote file storage CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file
    Put {
        /// Path to the file to upload
        file: PathBuf,
        /// Object key to store it under
        key: String,
        /// Content type (guessed from the file extension when omitted)
        #[arg(long)]
        content_type: Option<String>,
        #[arg(long)]
        cache_control: Option<String>,
        #[arg(long)]
        content_disposition: Option<String>,
        #[arg(long)]
        content_encoding: Option<String>,
    },
    /// Download an object
    Get {
        /// Object key
        key: String,
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Delete an object (succeeds when it is already gone)
    Rm {
        /// Object key
        key: String,
    },
    /// Check whether an object exists
    Exists {
        /// Object key
        key: String,
    },
    /// Print object metadata as JSON
    Stat {
        /// Object key
        key: String,
    },
    /// Print a presigned GET URL
    Presign {
        /// Object key
        key: String,
        /// Validity in seconds
        #[arg(long, default_value = "3600")]
        expires_in: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let storage = create_storage(&config).context("Failed to configure remote storage")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    match cli.command {
        Commands::Put {
            file,
            key,
            content_type,
            cache_control,
            content_disposition,
            content_encoding,
        } => {
            let options = PutOptions {
                content_type,
                cache_control,
                content_disposition,
                content_encoding,
            };
            stowage_cli::put(storage.as_ref(), &file, &key, options, &cancel).await?;
        }
        Commands::Get { key, output } => {
            let written =
                stowage_cli::get(storage.as_ref(), &key, output.as_deref(), &cancel).await?;
            if let Some(path) = output {
                eprintln!("{} bytes written to {}", written, path.display());
            }
        }
        Commands::Rm { key } => {
            stowage_cli::remove(storage.as_ref(), &key, &cancel).await?;
        }
        Commands::Exists { key } => {
            let found = stowage_cli::exists(storage.as_ref(), &key, &cancel).await?;
            println!("{}", found);
            return Ok(ExitCode::from(stowage_cli::exists_status(found)));
        }
        Commands::Stat { key } => {
            let metadata = stowage_cli::stat(storage.as_ref(), &key, &cancel).await?;
            let out = serde_json::to_string_pretty(&metadata).context("Serialize metadata")?;
            println!("{}", out);
        }
        Commands::Presign { key, expires_in } => {
            let url = stowage_cli::presign(
                storage.as_ref(),
                &key,
                Duration::from_secs(expires_in),
            )
            .await?;
            println!("{}", url);
        }
    }

    Ok(ExitCode::SUCCESS)
}
