//! Sink trait and shared output types
//!
//! A sink durably records accepted vehicle records in batches. Sinks never
//! read records back during a run.

use crate::output::stats::CrawlSummary;
use crate::record::VehicleRecord;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Final status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Trait for record sinks
///
/// The coordinator is the only writer, so implementations need `Send` but
/// not `Sync`.
pub trait RecordSink: Send {
    /// Durably records a batch of accepted records
    ///
    /// # Arguments
    ///
    /// * `records` - The batch, in acceptance order
    fn write_batch(&mut self, records: &[VehicleRecord]) -> OutputResult<()>;

    /// Finalizes the output after the last batch
    ///
    /// # Arguments
    ///
    /// * `summary` - Counters for the finished run
    /// * `status` - The final status of the crawl run
    fn finish(&mut self, summary: &CrawlSummary, status: RunStatus) -> OutputResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_roundtrip() {
        for status in &[RunStatus::Running, RunStatus::Completed, RunStatus::Failed] {
            assert_eq!(RunStatus::from_db_string(status.to_db_string()), Some(*status));
        }
    }

    #[test]
    fn test_run_status_invalid() {
        assert_eq!(RunStatus::from_db_string("interrupted"), None);
    }
}
