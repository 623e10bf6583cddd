//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Seeding the frontier with search result pages
//! - Running fetches on a bounded worker pool
//! - Dispatching search pages to link discovery and listing pages to
//!   extraction
//! - Budget, pagination and backlog decisions
//! - Flushing accepted records to the sink
//!
//! Workers suspend only at the fetch boundary. Parsing, link discovery and
//! extraction run synchronously afterwards, and every change to the shared
//! [`CrawlState`] happens under its mutex in a single call.

use crate::config::Config;
use crate::crawler::fetcher::{FetchResult, FetchedPage, Fetcher};
use crate::crawler::frontier::{Frontier, PageKind, PageRequest, ScheduledRequest};
use crate::crawler::links::discover_links;
use crate::extract::{default_extractors, merge, run_pipeline, Extractor, Page};
use crate::output::{CrawlSummary, RecordSink, RunStatus};
use crate::query::{page_url, SearchQuery, PAGE_SIZE};
use crate::record::VehicleRecord;
use crate::state::{Acceptance, CrawlState, RequestState};
use crate::{Result, TrawlError};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinSet;
use url::Url;

/// Accepted records between progress lines
const PROGRESS_EVERY: usize = 10;

type Extractors = Arc<Vec<Box<dyn Extractor>>>;

/// What a worker hands back to the coordinator
#[derive(Debug)]
enum Report {
    /// A search page was fetched and its new detail links discovered
    List {
        page: u32,
        final_url: Url,
        links: Vec<Url>,
    },

    /// A listing page was fetched and extracted
    Detail {
        url: Url,
        state: RequestState,
        batch: Option<Vec<VehicleRecord>>,
    },

    /// The fetch collaborator gave up on the request
    Failed { request: PageRequest, reason: String },
}

/// Main crawler coordinator structure
pub struct Coordinator {
    seeds: Vec<Url>,
    fetcher: Arc<dyn Fetcher>,
    extractors: Extractors,
    sink: Box<dyn RecordSink>,
    state: Arc<Mutex<CrawlState>>,
    frontier: Frontier,
    summary: CrawlSummary,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawl configuration
    /// * `fetcher` - The fetch collaborator
    /// * `sink` - Where accepted records are written
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(TrawlError)` - The site origin is not a valid URL
    pub fn new(config: &Config, fetcher: Arc<dyn Fetcher>, sink: Box<dyn RecordSink>) -> Result<Self> {
        let origin = Url::parse(&config.site.origin)?;
        let query = SearchQuery::from(&config.search);
        let seeds = query.seed_urls(&origin);

        let results_wanted = config.crawler.budget() as usize;
        let state = CrawlState::new(
            results_wanted,
            config.crawler.page_ceiling(),
            config.crawler.batch_size as usize,
        );

        Ok(Self {
            seeds,
            fetcher,
            extractors: Arc::new(default_extractors()),
            sink,
            state: Arc::new(Mutex::new(state)),
            frontier: Frontier::new(config.crawler.concurrency as usize),
            summary: CrawlSummary::new(results_wanted),
        })
    }

    /// The search result pages the run starts from
    pub fn seeds(&self) -> &[Url] {
        &self.seeds
    }

    /// Runs the crawl to completion
    ///
    /// The run ends when the frontier is empty and no request is in flight.
    /// Reaching the page ceiling with fewer records than wanted is a normal
    /// ending.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - Counters for the finished run
    /// * `Err(TrawlError)` - No seed page could be fetched, or the sink failed
    pub async fn run(mut self) -> Result<CrawlSummary> {
        {
            let state = lock(&self.state);
            tracing::info!(
                "Starting crawl: {} vehicles wanted, up to {} search pages, {} seed(s)",
                state.results_wanted(),
                state.max_pages(),
                self.seeds.len()
            );
        }

        let outcome = self.crawl().await;
        self.summary.accepted = lock(&self.state).accepted() as u64;
        self.summary.finish();

        let outcome = outcome.and_then(|()| {
            if self.summary.list_pages == 0 {
                Err(TrawlError::SeedUnreachable {
                    attempted: self.seeds.len(),
                })
            } else {
                Ok(())
            }
        });

        let status = if outcome.is_ok() {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        if let Err(e) = self.sink.finish(&self.summary, status) {
            tracing::error!("Failed to finalize output: {}", e);
            outcome?;
            return Err(e.into());
        }
        outcome?;

        tracing::info!(
            "Crawl completed: {} / {} vehicles from {} search pages and {} listing pages",
            self.summary.accepted,
            self.summary.results_wanted,
            self.summary.list_pages,
            self.summary.detail_pages
        );

        Ok(self.summary)
    }

    /// The main crawl loop
    async fn crawl(&mut self) -> Result<()> {
        self.frontier
            .extend(self.seeds.iter().cloned().map(|url| PageRequest::list(url, 1)));

        let mut workers: JoinSet<Report> = JoinSet::new();

        loop {
            while let Some(scheduled) = self.frontier.try_next() {
                self.dispatch(scheduled, &mut workers);
            }

            // Nothing queued and nothing in flight
            let Some(joined) = workers.join_next().await else {
                tracing::info!("Frontier is empty, crawl complete");
                break;
            };

            match joined? {
                Report::List {
                    page,
                    final_url,
                    links,
                } => self.on_list(page, &final_url, links),
                Report::Detail { url, state, batch } => {
                    self.on_detail(&url, state);
                    if let Some(batch) = batch {
                        self.flush(&batch)?;
                    }
                    self.schedule_follow_ups();
                }
                Report::Failed { request, reason } => {
                    tracing::warn!("Failed to fetch {} {}: {}", request.kind, request.url, reason);
                    if request.is_detail() {
                        self.on_detail(&request.url, RequestState::Failed);
                        self.schedule_follow_ups();
                    } else {
                        self.summary.failed += 1;
                    }
                }
            }
        }

        let rest = lock(&self.state).drain_buffer();
        if !rest.is_empty() {
            self.flush(&rest)?;
        }

        Ok(())
    }

    /// Starts a worker for a dequeued request
    ///
    /// Listing requests are refused here, without a fetch, once the budget
    /// is met.
    fn dispatch(&mut self, scheduled: ScheduledRequest, workers: &mut JoinSet<Report>) {
        let ScheduledRequest { request, _permit } = scheduled;

        if request.is_detail() && !lock(&self.state).begin_detail() {
            tracing::debug!("Budget met, skipping {}", request.url);
            self.summary.skipped += 1;
            return;
        }

        tracing::debug!("Processing {} {}", request.kind, request.url);
        let fetcher = Arc::clone(&self.fetcher);
        let extractors = Arc::clone(&self.extractors);
        let state = Arc::clone(&self.state);

        workers.spawn(async move {
            let _permit = _permit;
            process_request(request, fetcher, extractors, state).await
        });
    }

    /// Schedules detail work and the next search page after a search page
    fn on_list(&mut self, page: u32, final_url: &Url, links: Vec<Url>) {
        self.summary.list_pages += 1;

        let mut state = lock(&self.state);
        let base = state.capture_base_list_url(final_url).clone();
        let found = links.len();
        let scheduled = state.reserve_details(links);

        tracing::info!(
            "Search page {}: {} new listings, {} scheduled, {} held back",
            page,
            found,
            scheduled.len(),
            found - scheduled.len()
        );

        let mut next = None;
        if found > 0 && !state.budget_met() && page < state.max_pages() {
            if state.remaining() > 0 {
                if let Some(offset) = list_offset(page + 1) {
                    if state.claim_list_page(page + 1) {
                        next = Some(PageRequest::list(page_url(&base, offset), page + 1));
                    }
                }
            } else {
                tracing::debug!("Budget saturated, deferring search page {}", page + 1);
                state.defer_list_page(page + 1);
            }
        }
        drop(state);

        self.frontier
            .extend(scheduled.into_iter().map(PageRequest::detail));
        if let Some(request) = next {
            self.frontier.push(request);
        }
    }

    fn on_detail(&mut self, url: &Url, state: RequestState) {
        tracing::trace!("Listing {} ended {}", url, state);
        match state {
            RequestState::Accepted => {
                self.summary.detail_pages += 1;
            }
            RequestState::Rejected => {
                self.summary.detail_pages += 1;
                self.summary.rejected += 1;
                tracing::warn!("No make, model or price found on {}", url);
            }
            RequestState::Skipped => {
                self.summary.detail_pages += 1;
                self.summary.skipped += 1;
                tracing::debug!("Budget met while extracting {}, record dropped", url);
            }
            RequestState::Failed => {
                self.summary.failed += 1;
            }
        }
    }

    /// Refills detail work from the backlog, or releases a deferred search
    /// page when the backlog is exhausted and the budget is still unmet
    fn schedule_follow_ups(&mut self) {
        let mut state = lock(&self.state);
        let refill = state.refill_from_backlog();

        let mut next = None;
        if let Some(page) = state.release_deferred_list() {
            if let Some(offset) = list_offset(page) {
                if state.claim_list_page(page) {
                    if let Some(base) = state.base_list_url() {
                        tracing::debug!("Releasing deferred search page {}", page);
                        next = Some(PageRequest::list(page_url(base, offset), page));
                    }
                }
            }
        }
        drop(state);

        self.frontier.extend(refill.into_iter().map(PageRequest::detail));
        if let Some(request) = next {
            self.frontier.push(request);
        }
    }

    fn flush(&mut self, batch: &[VehicleRecord]) -> Result<()> {
        tracing::debug!("Flushing {} records", batch.len());
        self.sink.write_batch(batch)?;
        Ok(())
    }
}

/// Locks the shared state, recovering it if a worker panicked
/// Result offset of a 1-based search page, `None` past the `u32` range
fn list_offset(page: u32) -> Option<u32> {
    page.checked_sub(1)?.checked_mul(PAGE_SIZE)
}

fn lock(state: &Mutex<CrawlState>) -> MutexGuard<'_, CrawlState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Fetches one request and handles the page
async fn process_request(
    request: PageRequest,
    fetcher: Arc<dyn Fetcher>,
    extractors: Extractors,
    state: Arc<Mutex<CrawlState>>,
) -> Report {
    let fetched = match fetcher.fetch(&request.url).await {
        FetchResult::Success(fetched) => fetched,
        FetchResult::Failed { reason } => {
            if request.is_detail() {
                lock(&state).release_detail();
            }
            return Report::Failed { request, reason };
        }
    };

    match request.kind {
        PageKind::List { page } => handle_list(page, fetched, &state),
        PageKind::Detail => handle_detail(request.url, fetched, &extractors, &state),
    }
}

fn handle_list(page: u32, fetched: FetchedPage, state: &Mutex<CrawlState>) -> Report {
    let parsed = Page::parse(&fetched.body, fetched.final_url.clone());
    let links = discover_links(&parsed, lock(state).seen_mut());

    Report::List {
        page,
        final_url: fetched.final_url,
        links,
    }
}

fn handle_detail(
    url: Url,
    fetched: FetchedPage,
    extractors: &[Box<dyn Extractor>],
    state: &Mutex<CrawlState>,
) -> Report {
    let parsed = Page::parse(&fetched.body, fetched.final_url);
    let partials = run_pipeline(extractors, &parsed);

    let Some(record) = merge(&partials, url.as_str()) else {
        lock(state).release_detail();
        return Report::Detail {
            url,
            state: RequestState::Rejected,
            batch: None,
        };
    };

    let label = record.label();
    let mut state = lock(state);
    match state.try_accept(record) {
        Acceptance::Accepted { count, batch } => {
            tracing::debug!("Accepted {} ({})", label, url);
            if count % PROGRESS_EVERY == 0 {
                tracing::info!("Progress: {}/{} vehicles", count, state.results_wanted());
            }
            Report::Detail {
                url,
                state: RequestState::Accepted,
                batch,
            }
        }
        Acceptance::BudgetMet => Report::Detail {
            url,
            state: RequestState::Skipped,
            batch: None,
        },
    }
}
