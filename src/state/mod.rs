//! Crawl state management
//!
//! [`CrawlStateManager`] owns the visited set, the in-flight set and the
//! collected results of one crawl. The data itself lives in a
//! [`StateStore`]: in process ([`LocalStateStore`]) or in Redis
//! ([`RedisStateStore`]) when several processes share a crawl.
//!
//! Progress is reported to the [`ScanRecorder`] at most once per
//! progress interval unless a flush is forced.

mod local_store;
mod redis_store;
mod store;

pub use local_store::LocalStateStore;
pub use redis_store::RedisStateStore;
pub use store::{StateError, StateResult, StateStore};

use crate::persistence::ScanRecorder;
use crate::scanner::ScanResult;
use crate::url::dedup_key;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use url::Url;

#[derive(Debug, Default)]
struct ProgressMark {
    last_flush: Option<Instant>,
    last_reported: Option<(usize, usize)>,
}

/// Shared crawl state handle
pub struct CrawlStateManager {
    scan_id: String,
    store: Arc<dyn StateStore>,
    recorder: Arc<dyn ScanRecorder>,
    links_scanned: AtomicUsize,
    progress_interval: Duration,
    progress: Mutex<ProgressMark>,
}

impl CrawlStateManager {
    pub fn new(
        scan_id: impl Into<String>,
        store: Arc<dyn StateStore>,
        recorder: Arc<dyn ScanRecorder>,
        progress_interval: Duration,
    ) -> Self {
        Self {
            scan_id: scan_id.into(),
            store,
            recorder,
            links_scanned: AtomicUsize::new(0),
            progress_interval,
            progress: Mutex::new(ProgressMark::default()),
        }
    }

    /// In-process state with the given recorder
    pub fn local(scan_id: impl Into<String>, recorder: Arc<dyn ScanRecorder>, progress_interval: Duration) -> Self {
        Self::new(scan_id, Arc::new(LocalStateStore::new()), recorder, progress_interval)
    }

    pub fn scan_id(&self) -> &str {
        &self.scan_id
    }

    pub fn recorder(&self) -> &Arc<dyn ScanRecorder> {
        &self.recorder
    }

    pub async fn has_visited(&self, url: &Url) -> StateResult<bool> {
        self.store.is_visited(&dedup_key(url)).await
    }

    /// Claims `url` for scanning; true only for the caller that claimed it
    ///
    /// The `www.` and bare host forms of a page are one claim.
    pub async fn mark_visited(&self, url: &Url) -> StateResult<bool> {
        self.store.try_mark_visited(&dedup_key(url)).await
    }

    /// Releases a claim so the URL can be scanned again (retry path)
    pub async fn unmark_visited(&self, url: &Url) -> StateResult<()> {
        self.store.release_visited(&dedup_key(url)).await
    }

    pub async fn start_processing(&self, url: &Url) -> StateResult<()> {
        self.store.add_processing(url.as_str()).await
    }

    pub async fn finish_processing(&self, url: &Url) -> StateResult<()> {
        self.store.remove_processing(url.as_str()).await
    }

    pub async fn processing_count(&self) -> StateResult<usize> {
        self.store.processing_count().await
    }

    /// Stores a finished result and hands it to the recorder
    ///
    /// Recorder failures are logged; the result stays in the crawl state.
    pub async fn add_page_scanned(&self, result: &ScanResult) -> StateResult<()> {
        self.store.push_result(result).await?;

        if let Err(e) = self.recorder.record_scan_result(&self.scan_id, result).await {
            tracing::warn!("Failed to record result for {}: {}", result.url, e);
        }
        Ok(())
    }

    pub async fn get_scanned_count(&self) -> StateResult<usize> {
        self.store.result_count().await
    }

    /// All results collected so far
    pub async fn get_pages_scanned(&self) -> StateResult<Vec<ScanResult>> {
        self.store.results().await
    }

    /// Adds `count` to the number of links seen
    pub fn record_links(&self, count: usize) {
        self.links_scanned.fetch_add(count, Ordering::Relaxed);
    }

    pub fn links_scanned(&self) -> usize {
        self.links_scanned.load(Ordering::Relaxed)
    }

    /// Reports progress to the recorder
    ///
    /// Without `force`, at most one report is sent per progress interval.
    /// Returns true when a report was sent.
    pub async fn update_progress(&self, force: bool) -> StateResult<bool> {
        let mut mark = self.progress.lock().await;
        let now = Instant::now();

        let due = mark
            .last_flush
            .map_or(true, |last| now.duration_since(last) >= self.progress_interval);
        if !force && !due {
            return Ok(false);
        }

        let pages = self.store.result_count().await?;
        let links = self.links_scanned();
        mark.last_flush = Some(now);

        if !force && mark.last_reported == Some((pages, links)) {
            return Ok(false);
        }
        mark.last_reported = Some((pages, links));

        tracing::debug!("Progress: {} pages, {} links", pages, links);
        if let Err(e) = self.recorder.record_progress(&self.scan_id, pages, links).await {
            tracing::warn!("Failed to record progress: {}", e);
        }
        Ok(true)
    }
}
