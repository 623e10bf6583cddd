//! Request state definitions for tracking crawl progress

use std::fmt;

/// Outcome of a listing page request
///
/// Every listing request that leaves the frontier ends in exactly one of
/// these states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    /// Listing page produced an accepted record
    Accepted,

    /// Listing page produced no make, model or price
    Rejected,

    /// Listing page was not fetched, or its record was dropped, because the
    /// budget was already met
    Skipped,

    /// The fetch collaborator reported a failure
    Failed,
}

impl RequestState {
    /// Converts the state to its display string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
