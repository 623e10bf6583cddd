//! Autotrawl main entry point
//!
//! This is the command-line interface for the Autotrawl vehicle-listing crawler.

use anyhow::Context;
use autotrawl::config::{load_config_with_hash, Config, OutputFormat};
use autotrawl::crawler::run_crawl;
use autotrawl::output::{load_statistics, print_statistics, print_summary};
use autotrawl::query::SearchQuery;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Autotrawl: a budgeted vehicle-listing crawler
///
/// Autotrawl walks the search result pages of a vehicle marketplace,
/// extracts a normalized record from each listing page, and stops once the
/// result budget or the page ceiling is reached.
#[derive(Parser, Debug)]
#[command(name = "autotrawl")]
#[command(version = "1.0.0")]
#[command(about = "A budgeted vehicle-listing crawler", long_about = None)]
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

    /// Validate config and show the search URLs without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the SQLite output and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(&config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("autotrawl=info,warn"),
            1 => EnvFilter::new("autotrawl=debug,info"),
            2 => EnvFilter::new("autotrawl=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved search and seed URLs
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Autotrawl Dry Run ===\n");

    let query = SearchQuery::from(&config.search);
    let origin = Url::parse(&config.site.origin).context("Invalid site origin")?;

    println!("Search:");
    for (label, value) in [
        ("Make", &query.make),
        ("Model", &query.model),
        ("Province", &query.province),
        ("City", &query.city),
        ("Body type", &query.body_type),
        ("Fuel type", &query.fuel_type),
        ("Transmission", &query.transmission),
    ] {
        if let Some(value) = value {
            println!("  {}: {}", label, value);
        }
    }
    for (label, range) in [("Year", query.year), ("Price", query.price), ("Mileage", query.mileage)] {
        if let Some(encoded) = range.encode() {
            println!("  {}: {}", label, encoded);
        }
    }

    println!("\nCrawler Configuration:");
    println!("  Results wanted: {}", config.crawler.budget());
    println!("  Max search pages: {}", config.crawler.page_ceiling());
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Batch size: {}", config.crawler.batch_size);

    println!("\nFetch:");
    println!("  User agent: {}", config.fetch.user_agent);
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!(
        "  Retries: {} ({}ms apart)",
        config.fetch.max_retries, config.fetch.retry_delay_ms
    );
    if config.fetch.proxy.is_some() {
        println!("  Proxy: configured");
    }

    println!("\nOutput:");
    println!("  {:?}: {}", config.output.format, config.output.path);

    let seeds = query.seed_urls(&origin);
    println!("\nSeed URLs ({}):", seeds.len());
    for seed in &seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the SQLite output
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    if config.output.format != OutputFormat::Sqlite {
        anyhow::bail!("--stats needs SQLite output, configured format is {:?}", config.output.format);
    }

    println!("Database: {}\n", config.output.path);

    let stats = load_statistics(Path::new(&config.output.path))
        .with_context(|| format!("Failed to read {}", config.output.path))?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    match run_crawl(config, config_hash).await {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e).context("Crawl failed")
        }
    }
}
