//! Run summaries and output statistics
//!
//! [`CrawlSummary`] is produced by every run. [`load_statistics`] reads an
//! existing SQLite output back for the `--stats` command.

use crate::output::traits::{OutputResult, RunStatus};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::path::Path;

/// Counters for one crawl run
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Records requested by the configuration
    pub results_wanted: usize,

    /// Search result pages fetched successfully
    pub list_pages: u64,

    /// Listing pages fetched successfully
    pub detail_pages: u64,

    /// Records accepted and handed to the sink
    pub accepted: u64,

    /// Listing pages whose merged record had no make, model or price
    pub rejected: u64,

    /// Fetches that failed
    pub failed: u64,

    /// Listing requests dropped because the budget was already met
    pub skipped: u64,
}

impl CrawlSummary {
    /// Creates an empty summary for a run starting now
    pub fn new(results_wanted: usize) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            results_wanted,
            list_pages: 0,
            detail_pages: 0,
            accepted: 0,
            rejected: 0,
            failed: 0,
            skipped: 0,
        }
    }

    /// Marks the run as finished now
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Run duration in seconds, if finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }

    /// Returns true if the run collected every requested record
    pub fn budget_met(&self) -> bool {
        self.accepted as usize >= self.results_wanted
    }

    /// Share of fetched listing pages that produced a record, as a percentage
    pub fn acceptance_rate(&self) -> f64 {
        if self.detail_pages == 0 {
            return 0.0;
        }
        (self.accepted as f64 / self.detail_pages as f64) * 100.0
    }
}

/// Prints a run summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");

    println!(
        "Vehicles: {} / {} requested{}",
        summary.accepted,
        summary.results_wanted,
        if summary.budget_met() { "" } else { " (page ceiling or frontier exhausted)" }
    );
    println!("  Search pages fetched: {}", summary.list_pages);
    println!("  Listing pages fetched: {}", summary.detail_pages);
    println!("  Rejected (no make/model/price): {}", summary.rejected);
    println!("  Failed fetches: {}", summary.failed);
    println!("  Skipped (budget met): {}", summary.skipped);
    println!("  Acceptance rate: {:.1}%", summary.acceptance_rate());

    if let Some(seconds) = summary.duration_seconds() {
        println!("  Duration: {}s", seconds);
    }
}

/// Statistics read back from a SQLite output file
#[derive(Debug, Clone)]
pub struct RecordStatistics {
    /// Number of runs recorded in the file
    pub total_runs: u64,

    /// Number of stored vehicles
    pub total_vehicles: u64,

    /// Vehicles per make, most common first
    pub by_make: Vec<(String, u64)>,

    /// Latest run: started at, status, record count
    pub latest_run: Option<(String, RunStatus, u64)>,
}

/// Loads statistics from a SQLite output file
///
/// # Arguments
///
/// * `path` - Path to a database written by the SQLite sink
///
/// # Returns
///
/// * `Ok(RecordStatistics)` - Successfully loaded statistics
/// * `Err(OutputError)` - The file could not be opened or queried
pub fn load_statistics(path: &Path) -> OutputResult<RecordStatistics> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let total_runs: i64 = conn.query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
    let total_vehicles: i64 =
        conn.query_row("SELECT COUNT(*) FROM vehicles", [], |row| row.get(0))?;

    let mut stmt = conn.prepare(
        "SELECT COALESCE(make, '(unknown)'), COUNT(*) AS n FROM vehicles
         GROUP BY COALESCE(make, '(unknown)') ORDER BY n DESC, 1 ASC",
    )?;
    let by_make = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?
        .collect::<Result<Vec<(String, u64)>, _>>()?;

    let latest_run = conn
        .query_row(
            "SELECT started_at, status, record_count FROM runs ORDER BY id DESC LIMIT 1",
            [],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)? as u64,
                ))
            },
        )
        .optional()?
        .map(|(started, status, count)| {
            (
                started,
                RunStatus::from_db_string(&status).unwrap_or(RunStatus::Running),
                count,
            )
        });

    Ok(RecordStatistics {
        total_runs: total_runs as u64,
        total_vehicles: total_vehicles as u64,
        by_make,
        latest_run,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &RecordStatistics) {
    println!("=== Output Statistics ===\n");

    println!("Overview:");
    println!("  Runs recorded: {}", stats.total_runs);
    println!("  Vehicles stored: {}", stats.total_vehicles);
    println!();

    if let Some((started, status, count)) = &stats.latest_run {
        println!("Latest Run:");
        println!("  Started: {}", started);
        println!("  Status: {}", status.to_db_string());
        println!("  Records: {}", count);
        println!();
    }

    if !stats.by_make.is_empty() {
        println!("Vehicles by Make:");
        for (make, count) in &stats.by_make {
            let percentage = if stats.total_vehicles > 0 {
                (*count as f64 / stats.total_vehicles as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", make, count, percentage);
        }
    }
}
