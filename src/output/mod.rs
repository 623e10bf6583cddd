//! Output module for accepted vehicle records
//!
//! This module handles:
//! - Buffering accepted records into batches
//! - Writing batches to SQLite or JSON lines sinks
//! - Summarizing runs and reading statistics back

mod batch;
mod jsonl;
mod memory;
mod sqlite_output;
pub mod stats;
mod traits;

pub use batch::RecordBatcher;
pub use jsonl::JsonLinesSink;
pub use memory::MemorySink;
pub use sqlite_output::SqliteSink;
pub use stats::{load_statistics, print_statistics, print_summary, CrawlSummary, RecordStatistics};
pub use traits::{OutputError, OutputResult, RecordSink, RunStatus};

use crate::config::{OutputConfig, OutputFormat};
use std::path::Path;

/// Opens the sink selected by the output configuration
///
/// # Arguments
///
/// * `config` - Output section of the configuration
/// * `config_hash` - Hash of the configuration, stored with SQLite runs
///
/// # Returns
///
/// * `Ok(Box<dyn RecordSink>)` - Sink ready for the first batch
/// * `Err(OutputError)` - The output file could not be created
pub fn open_sink(config: &OutputConfig, config_hash: &str) -> OutputResult<Box<dyn RecordSink>> {
    let path = Path::new(&config.path);
    tracing::info!("Writing {:?} output to {}", config.format, path.display());

    match config.format {
        OutputFormat::Sqlite => Ok(Box::new(SqliteSink::new(path, config_hash)?)),
        OutputFormat::Jsonl => Ok(Box::new(JsonLinesSink::new(path)?)),
    }
}
