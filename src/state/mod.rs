//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: Run-wide bookkeeping shared by the coordinator and its
//!   workers (seen URLs, budget, pagination, pending records)
//! - `RequestState`: How a single listing request ended

mod crawl_state;
mod request_state;

// Re-export main types
pub use crawl_state::{Acceptance, CrawlState, SeenUrls};
pub use request_state::RequestState;
