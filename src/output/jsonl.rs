//! JSON lines record sink

use crate::output::stats::CrawlSummary;
use crate::output::traits::{OutputResult, RecordSink, RunStatus};
use crate::record::VehicleRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes one JSON object per accepted record, one record per line
pub struct JsonLinesSink {
    writer: BufWriter<File>,
}

impl JsonLinesSink {
    /// Creates (truncating) the output file at `path`
    pub fn new(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl RecordSink for JsonLinesSink {
    fn write_batch(&mut self, records: &[VehicleRecord]) -> OutputResult<()> {
        for record in records {
            serde_json::to_writer(&mut self.writer, record)?;
            self.writer.write_all(b"\n")?;
        }
        // Each batch is durable once written
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self, summary: &CrawlSummary, status: RunStatus) -> OutputResult<()> {
        self.writer.flush()?;
        tracing::debug!(
            "Closed JSON lines output ({} records, {})",
            summary.accepted,
            status.to_db_string()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_one_record_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vehicles.jsonl");
        let mut sink = JsonLinesSink::new(&path).unwrap();

        let records: Vec<VehicleRecord> = (1..=3)
            .map(|i| VehicleRecord {
                make: Some("Honda".to_string()),
                url: format!("https://example.com/a/{}", i),
                ..Default::default()
            })
            .collect();
        sink.write_batch(&records[..2]).unwrap();
        sink.write_batch(&records[2..]).unwrap();
        sink.finish(&CrawlSummary::new(3), RunStatus::Completed).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);

        let value: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(value["url"], "https://example.com/a/3");
        assert!(value["price"].is_null());
    }
}
