//! Search queries and listing-page URLs
//!
//! A [`SearchQuery`] is fixed for the lifetime of a run. The builder turns it
//! into the canonical LIST page URL for a given result offset.

mod builder;

pub use builder::{build_url, page_url, strip_pagination, PAGE_SIZE};

use crate::config::SearchConfig;
use crate::url::normalize_url;
use url::Url;

/// An optional numeric interval used by the year, price and mileage filters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Range {
    pub min: Option<u64>,
    pub max: Option<u64>,
}

impl Range {
    /// Creates a range from already-validated bounds
    pub fn new(min: Option<u64>, max: Option<u64>) -> Self {
        Self { min, max }
    }

    /// Creates a range from raw configuration numbers
    ///
    /// Non-finite and negative bounds are coerced to "absent".
    pub fn from_raw(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            min: min.and_then(coerce_bound),
            max: max.and_then(coerce_bound),
        }
    }

    /// Returns true if neither bound is present
    pub fn is_open(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Encodes the range as `"<min>,<max>"` with an empty side for a missing
    /// bound, or `None` when both bounds are missing
    pub fn encode(&self) -> Option<String> {
        if self.is_open() {
            return None;
        }
        let side = |bound: Option<u64>| bound.map(|b| b.to_string()).unwrap_or_default();
        Some(format!("{},{}", side(self.min), side(self.max)))
    }
}

fn coerce_bound(value: f64) -> Option<u64> {
    if value.is_finite() && value >= 0.0 && value <= u64::MAX as f64 {
        Some(value.round() as u64)
    } else {
        None
    }
}

/// A structured vehicle search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub make: Option<String>,
    pub model: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub year: Range,
    pub price: Range,
    pub mileage: Range,
    pub body_type: Option<String>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    /// Explicit LIST page URLs that replace the built search URL
    pub seeds: Vec<Url>,
}

impl SearchQuery {
    /// Returns the LIST page URLs a run starts from
    ///
    /// Explicit seeds win; otherwise the query is built at offset zero.
    pub fn seed_urls(&self, origin: &Url) -> Vec<Url> {
        if self.seeds.is_empty() {
            vec![build_url(origin, self, 0)]
        } else {
            self.seeds.clone()
        }
    }
}

impl From<&SearchConfig> for SearchQuery {
    fn from(config: &SearchConfig) -> Self {
        let seeds = config
            .seeds
            .iter()
            .filter_map(|seed| match normalize_url(seed) {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!("Ignoring malformed seed URL {:?}: {}", seed, e);
                    None
                }
            })
            .collect();

        Self {
            make: non_blank(&config.make),
            model: non_blank(&config.model),
            province: non_blank(&config.province),
            city: non_blank(&config.city),
            year: Range::from_raw(config.min_year, config.max_year),
            price: Range::from_raw(config.min_price, config.max_price),
            mileage: Range::from_raw(config.min_mileage, config.max_mileage),
            body_type: non_blank(&config.body_type),
            fuel_type: non_blank(&config.fuel_type),
            transmission: non_blank(&config.transmission),
            seeds,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
