//! Crawler module for search and listing page processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - Detail link discovery on search result pages
//! - Request queueing and concurrency limiting
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod links;

pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, FetchResult, FetchedPage, Fetcher, HttpFetcher};
pub use frontier::{Frontier, PageKind, PageRequest};
pub use links::discover_links;

use crate::config::Config;
use crate::output::{open_sink, CrawlSummary};
use crate::Result;
use std::sync::Arc;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP fetcher
/// 2. Open the configured output sink
/// 3. Walk the search result pages and fetch listing pages
/// 4. Extract, merge and write accepted records
///
/// # Arguments
///
/// * `config` - The crawl configuration
/// * `config_hash` - Hash of the configuration file, stored with the run
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl completed successfully
/// * `Err(TrawlError)` - Crawl failed
pub async fn run_crawl(config: &Config, config_hash: &str) -> Result<CrawlSummary> {
    let fetcher = HttpFetcher::new(&config.fetch)?;
    let sink = open_sink(&config.output, config_hash)?;

    let coordinator = Coordinator::new(config, Arc::new(fetcher), sink)?;
    coordinator.run().await
}
