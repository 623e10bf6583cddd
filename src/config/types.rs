use crate::query::PAGE_SIZE;
use serde::Deserialize;

/// Highest page number whose offset (`(page - 1) * PAGE_SIZE`) fits in a `u32`
pub const MAX_PAGE_CEILING: u32 = u32::MAX / PAGE_SIZE;

/// Main configuration structure for Autotrawl
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub site: SiteConfig,
    pub output: OutputConfig,
}

/// The vehicle search to run
///
/// Numeric bounds accept integers or floats; non-finite or negative values
/// are treated as absent when the query is built.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SearchConfig {
    pub make: Option<String>,
    pub model: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub min_year: Option<f64>,
    pub max_year: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_mileage: Option<f64>,
    pub max_mileage: Option<f64>,
    pub body_type: Option<String>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,

    /// Explicit LIST page URLs; replaces the URL built from the filters
    #[serde(default)]
    pub seeds: Vec<String>,
}

/// Crawl budget and scheduling configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of accepted vehicle records
    #[serde(default = "default_results_wanted")]
    pub results_wanted: i64,

    /// Maximum number of LIST pages to walk
    #[serde(default = "default_max_pages")]
    pub max_pages: i64,

    /// Maximum number of concurrent page fetches
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Number of accepted records buffered before a sink write
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

impl CrawlerConfig {
    /// Result budget, clamped to at least one record
    pub fn budget(&self) -> u32 {
        self.results_wanted.clamp(1, u32::MAX as i64) as u32
    }

    /// LIST page ceiling, clamped to at least one page and to the last
    /// page whose result offset fits in a `u32`
    pub fn page_ceiling(&self) -> u32 {
        self.max_pages.clamp(1, MAX_PAGE_CEILING as i64) as u32
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            results_wanted: default_results_wanted(),
            max_pages: default_max_pages(),
            concurrency: default_concurrency(),
            batch_size: default_batch_size(),
        }
    }
}

/// HTTP fetch configuration, handed to the fetch layer as-is
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FetchConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retries (milliseconds)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Proxy URL applied to every request
    pub proxy: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            proxy: None,
        }
    }
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Scheme and host the search URL is built on
    #[serde(default = "default_origin")]
    pub origin: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
        }
    }
}

/// Output sink selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Sqlite,
    Jsonl,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Path to the SQLite database or JSON lines file
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            path: "./vehicles.db".to_string(),
        }
    }
}

fn default_results_wanted() -> i64 {
    50
}

fn default_max_pages() -> i64 {
    20
}

fn default_concurrency() -> u32 {
    5
}

fn default_batch_size() -> u32 {
    20
}

fn default_user_agent() -> String {
    format!("autotrawl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_origin() -> String {
    "https://www.autotrader.ca".to_string()
}
