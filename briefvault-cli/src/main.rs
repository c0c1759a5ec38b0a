use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing::info;

use briefvault_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use briefvault_core::{
    Config, OfflineClient, PushError, RecordId, RemotePush, SyncQueueItem,
};

#[derive(Parser, Debug)]
#[command(name = "briefvault")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// Configuration file (toml); defaults to environment + built-ins
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Passphrase for at-rest payload encryption
    #[arg(long)]
    encryption_key: Option<String>,

    /// Make the demo remote refuse every push (exercise the failure path)
    #[arg(long)]
    decline_pushes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a new record
    Store {
        /// Record type ("disbursement", "payment", ...)
        record_type: String,
        /// Payload as a JSON document
        payload: String,
        /// Encrypt the payload at rest
        #[arg(long)]
        encrypt: bool,
    },
    /// Fetch a record by id
    Get { id: String },
    /// List all records of a type
    List { record_type: String },
    /// Replace a record's payload
    Update {
        id: String,
        /// New payload as a JSON document
        payload: String,
    },
    /// Delete a record locally
    Remove { id: String },
    /// Print storage statistics
    Stats,
    /// Push pending items to the demo remote
    Sync,
    /// Retry items that previously failed to sync
    Retry,
    /// Wipe all local records and the sync queue
    ClearAll {
        /// Required confirmation flag
        #[arg(long)]
        yes: bool,
    },
}

/// Stand-in remote for the CLI: logs each item and confirms it,
/// unless started with --decline-pushes
struct DemoRemote {
    decline: bool,
}

#[async_trait]
impl RemotePush for DemoRemote {
    async fn push(&self, item: &SyncQueueItem) -> Result<bool, PushError> {
        info!(
            record_id = %item.record_id,
            record_type = %item.record_type,
            action = %item.action,
            "Pushing item to demo remote"
        );
        Ok(!self.decline)
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::from_env().context("Failed to load config from environment")?,
    };

    if let Some(data_dir) = &args.data_dir {
        config.store.data_dir = data_dir.clone();
    }
    if let Some(key) = &args.encryption_key {
        config.store.encryption_key = Some(key.clone());
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = LogLevel::from_str(&args.log_level).unwrap_or_else(|| {
        eprintln!("Invalid log level '{}', using 'info'", args.log_level);
        LogLevel::Info
    });

    let log_config = LogConfig::new(log_level).json_format(args.json_logs);
    init_logging_with_config(log_config)?;

    let config = load_config(&args)?;
    let remote = Arc::new(DemoRemote {
        decline: args.decline_pushes,
    });

    let client = OfflineClient::connect(config, remote)
        .await
        .context("Failed to open the vault")?;

    match args.command {
        Command::Store {
            record_type,
            payload,
            encrypt,
        } => {
            let payload: serde_json::Value =
                serde_json::from_str(&payload).context("Payload is not valid JSON")?;
            let id = client.store(&record_type, payload, encrypt).await?;
            println!("{}", id);
        }
        Command::Get { id } => {
            match client.get(&RecordId::new(id)).await? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => {
                    eprintln!("Record not found");
                    std::process::exit(1);
                }
            }
        }
        Command::List { record_type } => {
            let records = client.get_all(&record_type).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::Update { id, payload } => {
            let payload: serde_json::Value =
                serde_json::from_str(&payload).context("Payload is not valid JSON")?;
            client.update(&RecordId::new(id), payload).await?;
            println!("updated");
        }
        Command::Remove { id } => {
            client.remove(&RecordId::new(id)).await?;
            println!("removed");
        }
        Command::Stats => {
            let stats = client.stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Sync => {
            let report = client.sync().await?;
            if !report.ran {
                println!("sync declined (offline or already running)");
            } else {
                println!(
                    "synced: {}, failed: {}, skipped: {}",
                    report.synced, report.failed, report.skipped
                );
            }
        }
        Command::Retry => {
            let report = client.retry_failed().await?;
            println!(
                "retried: {}, synced: {}, failed: {}",
                report.attempted, report.synced, report.failed
            );
        }
        Command::ClearAll { yes } => {
            if !yes {
                eprintln!("Refusing to wipe the vault without --yes");
                std::process::exit(1);
            }
            client.clear_all().await?;
            println!("cleared");
        }
    }

    client.close();
    Ok(())
}
