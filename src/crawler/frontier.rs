//! Frontier of pending page requests
//!
//! This module handles:
//! - FIFO queueing of search and listing page requests
//! - Global concurrency limiting via a semaphore

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

/// What a request is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// A search result page; `page` is 1-based
    List { page: u32 },
    /// A single listing page
    Detail,
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List { page } => write!(f, "LIST#{}", page),
            Self::Detail => write!(f, "DETAIL"),
        }
    }
}

/// A page to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Absolute URL to fetch
    pub url: Url,

    /// Request kind
    pub kind: PageKind,
}

impl PageRequest {
    pub fn list(url: Url, page: u32) -> Self {
        Self {
            url,
            kind: PageKind::List { page },
        }
    }

    pub fn detail(url: Url) -> Self {
        Self {
            url,
            kind: PageKind::Detail,
        }
    }

    pub fn is_detail(&self) -> bool {
        self.kind == PageKind::Detail
    }
}

/// A request with a concurrency permit
pub struct ScheduledRequest {
    /// The request to run
    pub request: PageRequest,

    /// Held until the request is finished
    pub _permit: OwnedSemaphorePermit,
}

/// Frontier manages the request queue and the worker limit
pub struct Frontier {
    /// Global semaphore for limiting concurrent fetches
    semaphore: Arc<Semaphore>,

    /// Pending requests in enqueue order
    queue: VecDeque<PageRequest>,
}

impl Frontier {
    /// Creates a frontier allowing `concurrency` requests at once
    pub fn new(concurrency: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            queue: VecDeque::new(),
        }
    }

    /// Adds a request to the back of the queue
    pub fn push(&mut self, request: PageRequest) {
        tracing::trace!("Enqueued {} {}", request.kind, request.url);
        self.queue.push_back(request);
    }

    pub fn extend(&mut self, requests: impl IntoIterator<Item = PageRequest>) {
        for request in requests {
            self.push(request);
        }
    }

    /// Takes the next request if a worker slot is free right now
    ///
    /// # Returns
    ///
    /// * `Some(ScheduledRequest)` - A request with its permit
    /// * `None` - The queue is empty or every slot is busy
    pub fn try_next(&mut self) -> Option<ScheduledRequest> {
        if self.queue.is_empty() {
            return None;
        }

        let permit = self.semaphore.clone().try_acquire_owned().ok()?;
        let request = self.queue.pop_front()?;

        Some(ScheduledRequest {
            request,
            _permit: permit,
        })
    }

    /// Number of queued requests
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of free worker slots
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }
}
