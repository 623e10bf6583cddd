//! In-memory record sink for tests and embedders

use crate::output::stats::CrawlSummary;
use crate::output::traits::{OutputResult, RecordSink, RunStatus};
use crate::record::VehicleRecord;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Collected {
    records: Vec<VehicleRecord>,
    batch_sizes: Vec<usize>,
    status: Option<RunStatus>,
}

/// A sink that keeps every record in memory
///
/// Clones share the same storage, so a caller can keep one handle and give
/// the other to the crawler.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<Collected>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records written so far, in write order
    pub fn records(&self) -> Vec<VehicleRecord> {
        self.lock().records.clone()
    }

    /// Size of each batch received
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.lock().batch_sizes.clone()
    }

    /// Final status, once the run has finished
    pub fn status(&self) -> Option<RunStatus> {
        self.lock().status
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Collected> {
        // A poisoned lock still holds usable data
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RecordSink for MemorySink {
    fn write_batch(&mut self, records: &[VehicleRecord]) -> OutputResult<()> {
        let mut inner = self.lock();
        inner.batch_sizes.push(records.len());
        inner.records.extend_from_slice(records);
        Ok(())
    }

    fn finish(&mut self, _summary: &CrawlSummary, status: RunStatus) -> OutputResult<()> {
        self.lock().status = Some(status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_records() {
        let handle = MemorySink::new();
        let mut sink = handle.clone();

        let record = VehicleRecord {
            url: "https://example.com/a/1".to_string(),
            ..Default::default()
        };
        sink.write_batch(&[record.clone(), record]).unwrap();
        sink.finish(&CrawlSummary::new(2), RunStatus::Completed).unwrap();

        assert_eq!(handle.records().len(), 2);
        assert_eq!(handle.batch_sizes(), vec![2]);
        assert_eq!(handle.status(), Some(RunStatus::Completed));
    }
}
