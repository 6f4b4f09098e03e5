//! Batch ingestion driver CLI
//!
//! Run with: cargo run --bin docbatch -- --config docbatch.toml run --index-name <name>

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docbatch::indexing::IndexClient;
use docbatch::tracker::Outcome;
use docbatch::{BatchDriver, DriverConfig, HttpIngestService, RemoteIngestService};

#[derive(Parser)]
#[command(name = "docbatch", about = "Batch ingestion driver for a remote document processing service")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "docbatch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the search index and print its generated name
    CreateIndex,
    /// Submit every file in the source container and poll to convergence
    Run {
        /// Target index name (as returned by create-index)
        #[arg(long)]
        index_name: String,
    },
    /// Synchronize the index with the extract container and report chunk counts
    SyncIndex {
        /// Index to synchronize
        #[arg(long)]
        index_name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docbatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = DriverConfig::from_file(&cli.config)?;
    let service: Arc<dyn RemoteIngestService> = Arc::new(HttpIngestService::new(&config.service)?);

    match cli.command {
        Command::CreateIndex => {
            let client = IndexClient::new(service, &config.polling);
            let name = client.create_index(&config.index).await?;
            println!("{}", name);
        }
        Command::Run { index_name } => {
            let work_items = service.list_files(&config.containers.source).await?;
            tracing::info!(
                "Found {} files in '{}'",
                work_items.len(),
                config.containers.source
            );

            // Ctrl-C interrupts the loop between rounds; tracker state stays valid
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupt received, stopping after current round");
                    let _ = shutdown_tx.send(true);
                }
            });

            let driver = BatchDriver::new(service, config);
            let run = driver.run(&index_name, &work_items, shutdown_rx).await;

            if let Outcome::Interrupted { rounds } = run.outcome {
                tracing::warn!("Stopped before convergence ({} rounds)", rounds);
            }

            let partition = run.partition();
            println!("succeeded ({}):", partition.succeeded.len());
            for item in &partition.succeeded {
                println!("  {}", item);
            }
            println!("failed ({}):", partition.failed.len());
            for item in &partition.failed {
                let detail = run
                    .tracker
                    .entry(item)
                    .and_then(|e| e.error.clone())
                    .unwrap_or_default();
                println!("  {}: {}", item, detail);
            }
            for (item, error) in &run.submission_failures {
                println!("  {} (not submitted): {}", item, error);
            }
        }
        Command::SyncIndex { index_name } => {
            let client = IndexClient::new(service, &config.polling);
            let chunks = client
                .sync_to_completion(&index_name, &config.containers.extract)
                .await?;
            println!("indexed {} chunks", chunks.len());
            for chunk in chunks.iter().take(10) {
                println!(
                    "  {} p{} [{}]",
                    chunk.source_file,
                    chunk.page_number.unwrap_or(0),
                    chunk.category.as_deref().unwrap_or("-")
                );
            }
        }
    }

    Ok(())
}
