//! Persistence of scan results
//!
//! The crawl engine reports to a [`ScanRecorder`]: every finished page,
//! throttled progress counters, and the final status of the scan.
//!
//! # Components
//!
//! - `SqliteRecorder`: writes scans, pages, links and images to SQLite
//! - `MemoryRecorder`: keeps everything in memory (tests, embedding)
//! - `NoopRecorder`: discards everything

mod memory;
mod schema;
mod sqlite;

pub use memory::{MemoryRecorder, ProgressRecord};
pub use schema::{initialize_schema, SCHEMA_SQL};
pub use sqlite::{ScanRecord, SqliteRecorder};

use crate::config::CrawlJob;
use crate::scanner::ScanResult;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while recording results
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Sink for everything a crawl produces
#[async_trait]
pub trait ScanRecorder: Send + Sync {
    /// Stores one scanned page
    async fn record_scan_result(&self, scan_id: &str, result: &ScanResult) -> PersistenceResult<()>;

    /// Stores the running page and link counters
    async fn record_progress(
        &self,
        scan_id: &str,
        pages_scanned: usize,
        links_scanned: usize,
    ) -> PersistenceResult<()>;

    /// Marks a scan that could not run
    async fn record_scan_failed(&self, scan_id: &str, reason: &str) -> PersistenceResult<()>;

    /// Registers a scan before seeding starts
    async fn record_scan_started(&self, _job: &CrawlJob, _config_hash: Option<&str>) -> PersistenceResult<()> {
        Ok(())
    }

    /// Stores the final phase of a scan (`completed` or `timed_out`)
    async fn record_scan_finished(&self, _scan_id: &str, _status: &str) -> PersistenceResult<()> {
        Ok(())
    }
}

/// Recorder that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecorder;

#[async_trait]
impl ScanRecorder for NoopRecorder {
    async fn record_scan_result(&self, _scan_id: &str, _result: &ScanResult) -> PersistenceResult<()> {
        Ok(())
    }

    async fn record_progress(
        &self,
        _scan_id: &str,
        _pages_scanned: usize,
        _links_scanned: usize,
    ) -> PersistenceResult<()> {
        Ok(())
    }

    async fn record_scan_failed(&self, _scan_id: &str, _reason: &str) -> PersistenceResult<()> {
        Ok(())
    }
}
