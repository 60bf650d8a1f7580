//! Crawler module: the orchestrator tying the other components together
//!
//! This module contains the crawl loop itself, including:
//! - Seeding from the start URL, robots.txt and sitemaps
//! - A pool of workers draining the priority queue
//! - Escalation of client-side rendered pages to the headless scanner
//! - Retries of transient failures
//! - Detection of the site's preferred `www.` form

mod coordinator;
mod retry;
mod worker;
pub mod www;

pub use coordinator::Crawler;
pub use retry::{retry_item, RETRY_DEMOTION};
pub use worker::MAX_IDLE_SLEEP;

use crate::config::{CrawlJob, CrawlOptions};
use crate::output::CrawlStatistics;
use crate::scanner::ScanResult;
use crate::Result;
use std::fmt;

/// Lifecycle of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Seeding,
    Running,
    Completed,
    /// The overall deadline ended the crawl; results are partial
    TimedOut,
}

impl CrawlPhase {
    /// Status string stored with the scan
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Seeding => "seeding",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::TimedOut => "timed_out",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::TimedOut)
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Seeding => "Seeding",
            Self::Running => "Running",
            Self::Completed => "Completed",
            Self::TimedOut => "Timed out",
        };
        f.write_str(label)
    }
}

/// What a finished crawl hands back
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// One result per recorded page, in recording order
    pub results: Vec<ScanResult>,
    pub phase: CrawlPhase,
    pub stats: CrawlStatistics,
}

impl CrawlOutcome {
    pub fn timed_out(&self) -> bool {
        self.phase == CrawlPhase::TimedOut
    }
}

/// Crawls `seed_url` with in-process state and no persistence
///
/// This is the simple entry point; use [`Crawler`] to attach a recorder, a
/// shared state store or a browser.
///
/// # Returns
///
/// * `Ok(results)` - Every recorded page, also when the deadline cut the
///   crawl short
/// * `Err(SeoscanError)` - The options or the seed URL are invalid
pub async fn crawl_website(
    seed_url: &str,
    options: CrawlOptions,
    scan_id: Option<String>,
    project_id: Option<String>,
) -> Result<Vec<ScanResult>> {
    let mut job = CrawlJob::new(seed_url, options);
    if let Some(scan_id) = scan_id {
        job = job.with_scan_id(scan_id);
    }
    if let Some(project_id) = project_id {
        job = job.with_project_id(project_id);
    }

    let outcome = Crawler::new(job).run().await?;
    Ok(outcome.results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_strings() {
        assert_eq!(CrawlPhase::Seeding.to_db_string(), "seeding");
        assert_eq!(CrawlPhase::Running.to_db_string(), "running");
        assert_eq!(CrawlPhase::Completed.to_db_string(), "completed");
        assert_eq!(CrawlPhase::TimedOut.to_db_string(), "timed_out");
        assert_eq!(CrawlPhase::TimedOut.to_string(), "Timed out");
    }

    #[test]
    fn test_finished_phases() {
        assert!(!CrawlPhase::Seeding.is_finished());
        assert!(!CrawlPhase::Running.is_finished());
        assert!(CrawlPhase::Completed.is_finished());
        assert!(CrawlPhase::TimedOut.is_finished());
    }

    #[tokio::test]
    async fn test_invalid_seed_is_rejected() {
        let result = crawl_website("   ", CrawlOptions::default(), None, None).await;
        assert!(matches!(result, Err(crate::SeoscanError::InvalidSeed { .. })));
    }
}
