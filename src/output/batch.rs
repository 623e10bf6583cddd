//! Accepted-record buffer
//!
//! Records are handed to the sink in batches of a fixed size, plus one
//! final partial batch when the run ends.

use crate::record::VehicleRecord;

/// Buffers accepted records until a batch is full
#[derive(Debug)]
pub struct RecordBatcher {
    batch_size: usize,
    pending: Vec<VehicleRecord>,
}

impl RecordBatcher {
    /// Creates a batcher; a zero size is treated as one
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            pending: Vec::with_capacity(batch_size),
        }
    }

    /// Buffers a record, returning a full batch when one is ready
    pub fn push(&mut self, record: VehicleRecord) -> Option<Vec<VehicleRecord>> {
        self.pending.push(record);
        if self.pending.len() >= self.batch_size {
            Some(self.drain())
        } else {
            None
        }
    }

    /// Takes whatever is buffered
    pub fn drain(&mut self) -> Vec<VehicleRecord> {
        std::mem::replace(&mut self.pending, Vec::with_capacity(self.batch_size))
    }

    /// Number of buffered records
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(i: usize) -> VehicleRecord {
        VehicleRecord {
            url: format!("https://example.com/a/{}", i),
            ..Default::default()
        }
    }

    #[test]
    fn test_emits_full_batches() {
        let mut batcher = RecordBatcher::new(2);

        assert!(batcher.push(record(1)).is_none());
        let batch = batcher.push(record(2)).unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batcher.is_empty());

        assert!(batcher.push(record(3)).is_none());
        assert_eq!(batcher.len(), 1);
        let rest = batcher.drain();
        assert_eq!(rest[0].url, "https://example.com/a/3");
        assert!(batcher.drain().is_empty());
    }

    #[test]
    fn test_zero_batch_size_flushes_every_record() {
        let mut batcher = RecordBatcher::new(0);
        assert_eq!(batcher.push(record(1)).map(|b| b.len()), Some(1));
    }
}
