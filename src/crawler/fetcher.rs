//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent, timeout and proxy
//! - GET requests to fetch page content
//! - Bounded retries for transient failures
//!
//! The crawl core only ever sees a page body with its final URL, or a
//! failure with a reason. It never retries on its own.

use crate::config::FetchConfig;
use async_trait::async_trait;
use reqwest::{Client, Proxy, StatusCode};
use std::time::Duration;
use url::Url;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: u16,
    /// Page body content
    pub body: String,
}

/// Result of a fetch operation
#[derive(Debug, Clone)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success(FetchedPage),

    /// The page could not be fetched, retries included
    Failed {
        /// Error description
        reason: String,
    },
}

/// The fetch collaborator
///
/// Implementations own retries and timeouts.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> FetchResult;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetch configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client (for example a bad proxy URL)
///
/// # Example
///
/// ```no_run
/// use autotrawl::config::FetchConfig;
/// use autotrawl::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(Proxy::all(proxy.as_str())?);
    }

    builder.build()
}

/// What to do after one attempt
enum Attempt {
    Done(FetchResult),
    Retry(String),
}

/// reqwest-backed fetcher
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 2xx | Success |
/// | HTTP 4xx | Immediate failure |
/// | HTTP 5xx | Retry up to `max-retries` times |
/// | Timeout | Retry up to `max-retries` times |
/// | Connection error | Retry up to `max-retries` times |
/// | Other errors | Immediate failure |
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher from the fetch configuration
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    async fn attempt(&self, url: &Url) -> Attempt {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Attempt::Retry("Request timeout".to_string()),
            Err(e) if e.is_connect() => return Attempt::Retry(format!("Connection failed: {}", e)),
            Err(e) => {
                return Attempt::Done(FetchResult::Failed {
                    reason: e.to_string(),
                })
            }
        };

        let status = response.status();
        let final_url = response.url().clone();

        if status.is_server_error() {
            return Attempt::Retry(format!("HTTP {}", status.as_u16()));
        }
        if !status.is_success() {
            let reason = if status == StatusCode::TOO_MANY_REQUESTS {
                "HTTP 429 (rate limited)".to_string()
            } else {
                format!("HTTP {}", status.as_u16())
            };
            return Attempt::Done(FetchResult::Failed { reason });
        }

        match response.text().await {
            Ok(body) => Attempt::Done(FetchResult::Success(FetchedPage {
                final_url,
                status: status.as_u16(),
                body,
            })),
            Err(e) if e.is_timeout() => Attempt::Retry("Timeout reading body".to_string()),
            Err(e) => Attempt::Done(FetchResult::Failed {
                reason: format!("Failed to read body: {}", e),
            }),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> FetchResult {
        let mut attempt = 0;
        loop {
            match self.attempt(url).await {
                Attempt::Done(result) => return result,
                Attempt::Retry(reason) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::debug!(
                        "Retrying {} ({}), attempt {}/{}",
                        url,
                        reason,
                        attempt,
                        self.max_retries
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Attempt::Retry(reason) => {
                    return FetchResult::Failed {
                        reason: format!("{} after {} retries", reason, self.max_retries),
                    }
                }
            }
        }
    }
}
