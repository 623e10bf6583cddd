//! URL handling module for Autotrawl
//!
//! This module provides URL normalization for de-duplication and the
//! rules that recognize listing-detail pages.

mod detail;
mod normalize;

// Re-export main functions
pub use detail::{ad_id_from_url, is_detail_url};
pub use normalize::{normalize, normalize_url};
