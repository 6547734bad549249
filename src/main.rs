use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use earnings_index::service::automation::{run_refresh, RefreshError, RefreshOptions};
use earnings_index::service::caching::{Artifact, ArtifactStore};
use earnings_index::service::calendar::FetchError;
use earnings_index::service::finance::FinnhubClient;
use earnings_index::{ConfigError, IndexerConfig};

#[derive(Parser)]
#[command(name = "earnings-index")]
#[command(about = "Maintain a cached index of upcoming earnings dates", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding earnings.json and its companion files
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Refetch even if the stored index is still fresh
    #[arg(long)]
    force: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("earnings_index={}", cli.log_level))),
        )
        .compact()
        .init();

    let mut config = match IndexerConfig::from_env() {
        Ok(config) => config,
        Err(ConfigError::Missing(key)) => {
            eprintln!("ERROR: {key} is not set.");
            return ExitCode::FAILURE;
        }
    };
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }

    match run(&config, RefreshOptions { force: cli.force }).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("earnings refresh failed: {err:#}");
            eprintln!("ERROR: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &IndexerConfig, options: RefreshOptions) -> Result<()> {
    info!(
        "Indexing earnings for {} exchange(s) into {}",
        config.exchanges.len(),
        config.output_dir.display()
    );

    let client = FinnhubClient::from_config(config).context("failed to build Finnhub client")?;
    let store = ArtifactStore::new(config.output_dir.clone());

    match run_refresh(&client, &store, config, options, Utc::now()).await {
        Ok(outcome) => {
            println!("{outcome}");
            Ok(())
        }
        // The stored index stays authoritative; this is not a process failure.
        Err(RefreshError::Fetch(FetchError::SourceUnavailable { range, source })) => {
            warn!("Calendar fetch aborted at {}: {}", range, source);
            println!(
                "Calendar fetch failed for {range}: {source}; keeping existing {}.",
                Artifact::EarningsIndex.file_name()
            );
            Ok(())
        }
        Err(RefreshError::Cache(err)) => Err(err).context("artifact storage failed"),
    }
}
