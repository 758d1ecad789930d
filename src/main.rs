//! Irbis-Harvest main entry point
//!
//! This is the command-line interface for the Irbis-Harvest catalog scraper.

use anyhow::Context;
use clap::Parser;
use irbis_harvest::config::{load_config_with_hash, Config};
use irbis_harvest::crawler::{build_http_client, run_crawl};
use irbis_harvest::output::{
    latest_run, load_statistics, print_statistics, relay_run, run_export, BackendClient,
    FileKeyValueStore,
};
use irbis_harvest::storage::SqliteStorage;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Irbis-Harvest: a catalog scraper for a miniatures shop
///
/// Irbis-Harvest crawls the shop's collection pages, extracts product
/// listings, downloads product images and exports the results as JSON
/// grouped by collection.
#[derive(Parser, Debug)]
#[command(name = "irbis-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A catalog scraper for a miniatures shop", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "export_only"])]
    dry_run: bool,

    /// Show statistics for the latest run and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_only"])]
    stats: bool,

    /// Re-export the latest run's data without crawling
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_only: bool,

    /// Send the exported data to the backend even if disabled in config
    #[arg(long)]
    send_to_backend: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.send_to_backend {
        config.backend.enabled = true;
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_only {
        handle_export(&config, None).await?;
    } else {
        handle_crawl(&config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("irbis_harvest=info,warn"),
            1 => EnvFilter::new("irbis_harvest=debug,info"),
            2 => EnvFilter::new("irbis_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Irbis-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Max requests per crawl: {}",
        config.crawler.max_requests_per_crawl
    );
    println!("  Max concurrency: {}", config.crawler.max_concurrency);
    println!("  Max request retries: {}", config.crawler.max_request_retries);
    println!(
        "  Request timeout: {}s",
        config.crawler.request_timeout_secs
    );

    println!("\nUser Agent: {}", config.user_agent.header_value());
    println!("Site origin: {}", config.site.origin);

    println!("\nStart URLs ({}):", config.crawler.start_urls.len());
    for url in &config.crawler.start_urls {
        println!("  - {}", url);
    }

    println!("\nSelectors:");
    let selectors = &config.selectors;
    println!("  Listing item: {}", selectors.listing_item);
    println!("  Item name: {}", selectors.item_name);
    println!("  Item description: {}", selectors.item_description);
    println!("  Item price: {}", selectors.item_price);
    println!("  Item link: {}", selectors.item_link);
    println!("  Collection link: {}", selectors.collection_link);
    println!("  Primary image: {}", selectors.primary_image);
    println!("  Gallery image: {}", selectors.gallery_image);
    println!("  Full-size marker: {}", selectors.full_size_marker);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Artifacts: {}", config.output.artifacts_dir);
    println!("  Images: {}", config.output.images_dir);

    println!(
        "\nBackend relay: {}",
        if config.backend.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics for the latest run
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_database(config)?;
    let run = latest_run(&storage)?;
    let stats = load_statistics(&storage, run.id)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation, followed by export
async fn handle_crawl(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Start URLs: {}, request limit: {}, concurrency: {}",
        config.crawler.start_urls.len(),
        config.crawler.max_requests_per_crawl,
        config.crawler.max_concurrency
    );

    let outcome = run_crawl(config, config_hash)
        .await
        .context("Crawl failed")?;
    tracing::info!(
        "Crawl finished: {} handled, {} failed, {} skipped",
        outcome.handled,
        outcome.failed,
        outcome.skipped
    );

    handle_export(config, Some(outcome.run_id)).await
}

/// Exports a run's artifacts, then relays them when the backend is enabled
///
/// Without an explicit run the latest one is exported.
async fn handle_export(config: &Config, run_id: Option<i64>) -> anyhow::Result<()> {
    let storage = open_database(config)?;
    let run_id = match run_id {
        Some(id) => id,
        None => latest_run(&storage)?.id,
    };

    let store = FileKeyValueStore::new(&config.output.artifacts_dir);
    let summary = run_export(&storage, &store, run_id);
    tracing::info!(
        "Exported {} products in {} collections, {} collection links, {} image records to {}",
        summary.products,
        summary.groups,
        summary.collections,
        summary.product_images,
        store.dir().display()
    );

    if config.backend.enabled {
        relay(config, &storage, run_id).await;
    }

    if !summary.is_success() {
        let failed: Vec<&str> = summary.failures.iter().map(|f| f.artifact).collect();
        anyhow::bail!("Export failed for {}", failed.join(", "));
    }

    Ok(())
}

/// Sends the run to the backend; failures are logged only
async fn relay(config: &Config, storage: &SqliteStorage, run_id: i64) {
    let client = match build_http_client(
        &config.user_agent,
        Duration::from_secs(config.crawler.request_timeout_secs),
    ) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to build backend client: {}", e);
            return;
        }
    };

    let backend = match BackendClient::from_config(client, &config.backend) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::error!("Backend relay skipped: {}", e);
            return;
        }
    };

    match relay_run(&backend, storage, run_id).await {
        Ok(()) => tracing::info!("Backend relay completed"),
        Err(e) => tracing::error!("Backend relay failed: {}", e),
    }
}

fn open_database(config: &Config) -> anyhow::Result<SqliteStorage> {
    let path = Path::new(&config.output.database_path);
    SqliteStorage::new(path).with_context(|| format!("Failed to open database {}", path.display()))
}
