//! Crawl workers
//!
//! Every worker loops over: deadline and budget checks, dequeue, the skip
//! rules (depth, exclusion, robots, visited claim), page-budget reservation,
//! scan with escalation, then either a retry or recording the result and
//! queueing its internal links.

use crate::config::CrawlOptions;
use crate::crawler::retry::retry_item;
use crate::crawler::www::WwwTally;
use crate::queue::{QueueItem, QueueManager};
use crate::robots::{path_and_query, RobotsCache};
use crate::scanner::{
    initial_method, needs_headless_verification, HeadlessScanner, ScanMethod, ScanResult, Scanner,
};
use crate::state::CrawlStateManager;
use crate::url::{extract_domain, UrlProcessor};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Longest idle sleep between dequeue attempts
pub const MAX_IDLE_SLEEP: Duration = Duration::from_millis(250);

const MIN_IDLE_SLEEP: Duration = Duration::from_millis(10);

/// Everything the workers of one crawl share
pub(crate) struct CrawlContext {
    pub options: CrawlOptions,
    pub processor: Arc<UrlProcessor>,
    pub queue: QueueManager,
    pub state: CrawlStateManager,
    pub robots: RobotsCache,
    pub http: Arc<dyn Scanner>,
    pub headless: Option<Arc<HeadlessScanner>>,
    pub www: Mutex<WwwTally>,
    pub deadline: Instant,
    /// Workers currently between a dequeue attempt and the end of its item
    pub active: AtomicUsize,
    /// Page-budget slots taken (scans in flight plus recorded results)
    pub reserved: AtomicUsize,
    pub timed_out: AtomicBool,
}

impl CrawlContext {
    fn budget_exhausted(&self) -> bool {
        self.reserved.load(Ordering::SeqCst) >= self.options.max_pages
    }

    /// Takes one page-budget slot; false when the budget is used up
    fn reserve_slot(&self) -> bool {
        let max = self.options.max_pages;
        self.reserved
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < max).then_some(n + 1))
            .is_ok()
    }

    fn release_slot(&self) {
        self.reserved.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs one worker until the crawl is finished
pub(crate) async fn run_worker(ctx: Arc<CrawlContext>, id: usize) {
    tracing::debug!("Worker {} started", id);

    loop {
        if Instant::now() >= ctx.deadline {
            if !ctx.timed_out.swap(true, Ordering::SeqCst) {
                tracing::warn!("Crawl deadline reached, stopping workers");
            }
            break;
        }
        if ctx.budget_exhausted() {
            tracing::debug!("Worker {}: page budget reached", id);
            break;
        }

        ctx.active.fetch_add(1, Ordering::SeqCst);
        let Some(item) = ctx.queue.get_next_item() else {
            let others_active = ctx.active.fetch_sub(1, Ordering::SeqCst) > 1;
            if !others_active && ctx.queue.is_empty() {
                break;
            }

            let wait = ctx
                .queue
                .time_until_ready()
                .unwrap_or(MAX_IDLE_SLEEP)
                .clamp(MIN_IDLE_SLEEP, MAX_IDLE_SLEEP);
            tokio::time::sleep(wait).await;
            continue;
        };

        process_item(&ctx, item).await;
        ctx.active.fetch_sub(1, Ordering::SeqCst);
    }

    tracing::debug!("Worker {} finished", id);
}

async fn process_item(ctx: &CrawlContext, item: QueueItem) {
    let url = &item.url;

    if item.depth > ctx.options.max_depth {
        tracing::trace!("Skipping {}: depth {} over limit", url, item.depth);
        return;
    }
    if ctx.processor.should_exclude(url) {
        tracing::debug!("Skipping excluded URL {}", url);
        return;
    }
    if !robots_allow(ctx, &item).await {
        return;
    }

    match ctx.state.mark_visited(url).await {
        Ok(true) => {}
        Ok(false) => return,
        Err(e) => {
            tracing::warn!("Cannot claim {}: {}", url, e);
            return;
        }
    }

    if !ctx.reserve_slot() {
        if let Err(e) = ctx.state.unmark_visited(url).await {
            tracing::warn!("Cannot release {}: {}", url, e);
        }
        return;
    }

    if let Err(e) = ctx.state.start_processing(url).await {
        tracing::warn!("Cannot mark {} as processing: {}", url, e);
    }
    let result = scan_with_escalation(ctx, &item).await;
    if let Err(e) = ctx.state.finish_processing(url).await {
        tracing::warn!("Cannot clear processing flag of {}: {}", url, e);
    }

    if let Some(retry) = retry_item(&item, &result, ctx.options.max_retries) {
        tracing::debug!(
            "Transient failure on {} (status {}), retry {} queued",
            url,
            result.status,
            retry.retries
        );
        if let Err(e) = ctx.state.unmark_visited(url).await {
            tracing::warn!("Cannot release {} for retry: {}", url, e);
        }
        ctx.release_slot();
        ctx.queue.requeue(retry);
        return;
    }

    record_result(ctx, &item, result).await;
}

/// Checks robots.txt for the item's host, registering its crawl-delay the
/// first time the host is seen
async fn robots_allow(ctx: &CrawlContext, item: &QueueItem) -> bool {
    let (robots, fetched_now) = ctx.robots.get_or_fetch(&item.url).await;

    if fetched_now {
        if let (Some(delay), Some(domain)) = (robots.crawl_delay_ms, extract_domain(&item.url)) {
            ctx.queue.set_crawl_delay(&domain, delay);
        }
    }

    let allowed = robots.is_allowed(&path_and_query(&item.url));
    if !allowed {
        tracing::debug!("Skipping {}: disallowed by robots.txt", item.url);
    }
    allowed
}

/// Scans with the method chosen for the URL and escalates static results
/// that look client-side rendered
async fn scan_with_escalation(ctx: &CrawlContext, item: &QueueItem) -> ScanResult {
    let method = initial_method(&ctx.options, &item.url);

    let result = match (method, ctx.headless.as_ref()) {
        (ScanMethod::Headless, Some(headless)) => headless.scan(&item.url, item.depth).await,
        _ => ctx.http.scan(&item.url, item.depth).await,
    };

    if !ctx.options.allow_escalation || !needs_headless_verification(&result) {
        return result;
    }
    let Some(headless) = ctx.headless.as_ref() else {
        return result;
    };
    if Instant::now() >= ctx.deadline {
        tracing::debug!("Deadline passed, keeping static result for {}", item.url);
        return result;
    }

    tracing::debug!("Escalating {} to headless rendering", item.url);
    let rendered = headless.scan(&item.url, item.depth).await;
    if rendered.status == 0 {
        let mut result = result;
        result.warnings.push(format!(
            "Headless verification failed: {}",
            rendered.errors.join("; ")
        ));
        return result;
    }
    rendered
}

async fn record_result(ctx: &CrawlContext, item: &QueueItem, result: ScanResult) {
    if !result.errors.is_empty() {
        tracing::debug!("{} recorded with errors: {}", item.url, result.errors.join("; "));
    }

    if let Err(e) = ctx.state.add_page_scanned(&result).await {
        tracing::warn!("Cannot store result for {}: {}", item.url, e);
    }
    ctx.state.record_links(result.link_count());

    let learned = ctx
        .www
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .observe(&result.internal_links);
    if let Some(preference) = learned {
        tracing::info!("Detected preferred host form: {}", preference);
        ctx.processor.set_preferred_www_format(preference);
    }

    if result.depth < ctx.options.max_depth {
        enqueue_links(ctx, &result);
    }

    if let Err(e) = ctx.state.update_progress(false).await {
        tracing::warn!("Progress update failed: {}", e);
    }
}

fn enqueue_links(ctx: &CrawlContext, result: &ScanResult) {
    let depth = result.depth + 1;
    let mut added = 0;

    for link in &result.internal_links {
        let Ok(url) = ctx.processor.normalize(&link.url) else {
            tracing::trace!("Dropping malformed link {}", link.url);
            continue;
        };
        if !ctx.processor.is_internal(&url) || ctx.processor.should_exclude(&url) {
            continue;
        }

        let priority = ctx.processor.priority(&url, depth);
        if ctx.queue.add_to_queue(QueueItem::new(url, depth, priority)) {
            added += 1;
        }
    }

    if added > 0 {
        tracing::debug!("Queued {} new link(s) from {}", added, result.url);
    }
}
