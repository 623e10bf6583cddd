//! Run-wide crawl bookkeeping
//!
//! One `CrawlState` lives for a whole run behind a mutex. Every mutation
//! that the budget depends on happens in a single method call, so a caller
//! holding the lock always sees a consistent picture.
//!
//! Budget accounting counts accepted records plus detail requests that are
//! scheduled but not yet finished. A search page therefore never schedules
//! more detail work than the budget can still use; the rest of its links
//! wait in a backlog.

use crate::output::RecordBatcher;
use crate::query::strip_pagination;
use crate::record::VehicleRecord;
use std::collections::{HashSet, VecDeque};
use url::Url;

/// Detail URLs already scheduled or held back during this run
#[derive(Debug, Default)]
pub struct SeenUrls {
    urls: HashSet<String>,
}

impl SeenUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `url` as seen, returning true if it was not seen before
    pub fn insert(&mut self, url: &Url) -> bool {
        self.urls.insert(url.as_str().to_string())
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.urls.contains(url.as_str())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Outcome of offering a merged record to the budget
#[derive(Debug)]
pub enum Acceptance {
    /// The record was counted; `batch` is set when the buffer filled up
    Accepted {
        count: usize,
        batch: Option<Vec<VehicleRecord>>,
    },
    /// The budget was already met; the record was dropped
    BudgetMet,
}

/// Shared state for one crawl run
#[derive(Debug)]
pub struct CrawlState {
    results_wanted: usize,
    max_pages: u32,
    seen: SeenUrls,
    accepted: usize,
    details_in_flight: usize,
    backlog: VecDeque<Url>,
    deferred_list_page: Option<u32>,
    highest_list_page: u32,
    base_list_url: Option<Url>,
    buffer: RecordBatcher,
}

impl CrawlState {
    /// Creates the state for a run
    ///
    /// # Arguments
    ///
    /// * `results_wanted` - Record budget (at least one)
    /// * `max_pages` - Search page ceiling (at least one)
    /// * `batch_size` - Records buffered per sink write
    pub fn new(results_wanted: usize, max_pages: u32, batch_size: usize) -> Self {
        Self {
            results_wanted: results_wanted.max(1),
            max_pages: max_pages.max(1),
            seen: SeenUrls::new(),
            accepted: 0,
            details_in_flight: 0,
            backlog: VecDeque::new(),
            deferred_list_page: None,
            // Seeds are page one
            highest_list_page: 1,
            base_list_url: None,
            buffer: RecordBatcher::new(batch_size),
        }
    }

    pub fn results_wanted(&self) -> usize {
        self.results_wanted
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn details_in_flight(&self) -> usize {
        self.details_in_flight
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    pub fn budget_met(&self) -> bool {
        self.accepted >= self.results_wanted
    }

    /// Detail requests the budget can still absorb
    pub fn remaining(&self) -> usize {
        self.results_wanted
            .saturating_sub(self.accepted + self.details_in_flight)
    }

    /// The seen-set used by link discovery
    pub fn seen_mut(&mut self) -> &mut SeenUrls {
        &mut self.seen
    }

    pub fn seen(&self) -> &SeenUrls {
        &self.seen
    }

    /// Captures the canonical search URL from the first search response
    ///
    /// Later calls keep the first value. Returns the captured URL.
    pub fn capture_base_list_url(&mut self, final_url: &Url) -> &Url {
        self.base_list_url
            .get_or_insert_with(|| strip_pagination(final_url))
    }

    pub fn base_list_url(&self) -> Option<&Url> {
        self.base_list_url.as_ref()
    }

    /// Claims a search page number for scheduling
    ///
    /// Returns false if the page is past the ceiling or a page at least this
    /// far along was already claimed.
    pub fn claim_list_page(&mut self, page: u32) -> bool {
        if page > self.max_pages || page <= self.highest_list_page {
            return false;
        }
        self.highest_list_page = page;
        true
    }

    /// Splits newly discovered detail URLs into work to schedule now and a
    /// backlog, preserving discovery order
    ///
    /// The returned URLs are counted as in flight.
    pub fn reserve_details(&mut self, discovered: Vec<Url>) -> Vec<Url> {
        let take = self.remaining().min(discovered.len());
        let mut discovered = discovered.into_iter();

        let scheduled: Vec<Url> = discovered.by_ref().take(take).collect();
        self.details_in_flight += scheduled.len();
        self.backlog.extend(discovered);

        scheduled
    }

    /// Moves backlog URLs into flight while the budget has room
    pub fn refill_from_backlog(&mut self) -> Vec<Url> {
        let mut scheduled = Vec::new();
        while self.remaining() > 0 {
            let Some(url) = self.backlog.pop_front() else {
                break;
            };
            self.details_in_flight += 1;
            scheduled.push(url);
        }
        scheduled
    }

    /// Checks a dequeued detail request against the budget
    ///
    /// Returns false (and releases the reservation) if the budget is
    /// already met, in which case the page must not be fetched.
    pub fn begin_detail(&mut self) -> bool {
        if self.budget_met() {
            self.release_detail();
            return false;
        }
        true
    }

    /// Releases the reservation of a detail request that produced no record
    pub fn release_detail(&mut self) {
        self.details_in_flight = self.details_in_flight.saturating_sub(1);
    }

    /// Offers a merged record to the budget
    ///
    /// Releases the request's reservation, then counts and buffers the
    /// record only if the budget is not yet met.
    pub fn try_accept(&mut self, record: VehicleRecord) -> Acceptance {
        self.release_detail();

        if self.budget_met() {
            return Acceptance::BudgetMet;
        }

        self.accepted += 1;
        let batch = self.buffer.push(record);
        Acceptance::Accepted {
            count: self.accepted,
            batch,
        }
    }

    /// Holds the next search page until detail work shows it is needed
    pub fn defer_list_page(&mut self, page: u32) {
        self.deferred_list_page = Some(page);
    }

    pub fn deferred_list_page(&self) -> Option<u32> {
        self.deferred_list_page
    }

    /// Releases the deferred search page if the budget can still use it
    ///
    /// The page is released only when nothing in the backlog can cover the
    /// remaining budget, and dropped for good once the budget is met.
    pub fn release_deferred_list(&mut self) -> Option<u32> {
        if self.budget_met() {
            if let Some(page) = self.deferred_list_page.take() {
                tracing::debug!("Budget met, dropping deferred search page {}", page);
            }
            return None;
        }

        if self.remaining() > 0 && self.backlog.is_empty() {
            return self.deferred_list_page.take();
        }

        None
    }

    /// Takes whatever records are still buffered
    pub fn drain_buffer(&mut self) -> Vec<VehicleRecord> {
        self.buffer.drain()
    }
}
