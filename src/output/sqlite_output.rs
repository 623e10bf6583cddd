//! SQLite record sink
//!
//! Stores each run in a `runs` table and every accepted record in a
//! `vehicles` table keyed by listing URL. Key columns are broken out for
//! querying; the full record is kept as JSON.

use crate::output::stats::CrawlSummary;
use crate::output::traits::{OutputResult, RecordSink, RunStatus};
use crate::record::VehicleRecord;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;

/// SQL schema for the output database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    record_count INTEGER NOT NULL DEFAULT 0
);

-- Accepted vehicle records, latest write wins per listing URL
CREATE TABLE IF NOT EXISTS vehicles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    ad_id TEXT,
    make TEXT,
    model TEXT,
    year INTEGER,
    price INTEGER,
    mileage INTEGER,
    record_json TEXT NOT NULL,
    scraped_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_vehicles_make ON vehicles(make);
CREATE INDEX IF NOT EXISTS idx_vehicles_run ON vehicles(run_id);
"#;

/// SQLite-backed sink
pub struct SqliteSink {
    conn: Connection,
    run_id: i64,
    written: u64,
}

impl SqliteSink {
    /// Opens (or creates) the database at `path` and starts a new run
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `config_hash` - Hash of the configuration driving this run
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteSink)` - Database ready, run row created
    /// * `Err(OutputError)` - Failed to open or initialize the database
    pub fn new(path: &Path, config_hash: &str) -> OutputResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        Self::with_connection(conn, config_hash)
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory(config_hash: &str) -> OutputResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::with_connection(conn, config_hash)
    }

    fn with_connection(conn: Connection, config_hash: &str) -> OutputResult<Self> {
        conn.execute_batch(SCHEMA_SQL)?;

        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        let run_id = conn.last_insert_rowid();
        tracing::debug!("Started output run {}", run_id);

        Ok(Self {
            conn,
            run_id,
            written: 0,
        })
    }

    /// The run row this sink writes under
    pub fn run_id(&self) -> i64 {
        self.run_id
    }
}

impl RecordSink for SqliteSink {
    fn write_batch(&mut self, records: &[VehicleRecord]) -> OutputResult<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO vehicles (url, run_id, ad_id, make, model, year, price, mileage, record_json, scraped_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(url) DO UPDATE SET
                    run_id = excluded.run_id,
                    ad_id = excluded.ad_id,
                    make = excluded.make,
                    model = excluded.model,
                    year = excluded.year,
                    price = excluded.price,
                    mileage = excluded.mileage,
                    record_json = excluded.record_json,
                    scraped_at = excluded.scraped_at",
            )?;

            for record in records {
                let json = serde_json::to_string(record)?;
                stmt.execute(params![
                    record.url,
                    self.run_id,
                    record.ad_id,
                    record.make,
                    record.model,
                    record.year,
                    record.price.and_then(column_int),
                    record.mileage.and_then(column_int),
                    json,
                    now,
                ])?;
            }
        }
        tx.commit()?;

        self.written += records.len() as u64;
        tracing::debug!("Wrote {} records to run {}", records.len(), self.run_id);
        Ok(())
    }

    fn finish(&mut self, summary: &CrawlSummary, status: RunStatus) -> OutputResult<()> {
        let finished = summary.finished_at.unwrap_or_else(Utc::now).to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, record_count = ?3 WHERE id = ?4",
            params![status.to_db_string(), finished, self.written as i64, self.run_id],
        )?;
        Ok(())
    }
}

/// SQLite integers are signed; values past `i64::MAX` are stored as NULL
/// and survive only in `record_json`
fn column_int(value: u64) -> Option<i64> {
    i64::try_from(value).ok()
}
