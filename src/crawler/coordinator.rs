//! Crawler coordinator - seeding and the worker pool
//!
//! A crawl moves through [`CrawlPhase::Seeding`] (validation, www
//! detection, robots.txt, sitemaps, seed) and [`CrawlPhase::Running`]
//! (worker pool) to either [`CrawlPhase::Completed`] or
//! [`CrawlPhase::TimedOut`].

use crate::config::{validate_crawl_options, CrawlJob, HeadlessConfig};
use crate::crawler::worker::{run_worker, CrawlContext};
use crate::crawler::www::{probe_www_preference, WwwTally};
use crate::crawler::{CrawlOutcome, CrawlPhase};
use crate::output::CrawlStatistics;
use crate::persistence::{NoopRecorder, ScanRecorder};
use crate::queue::{QueueItem, QueueManager};
use crate::robots::RobotsCache;
use crate::scanner::{
    build_http_client, BrowserDriver, HeadlessScanner, HttpScanner, Scanner, WebDriverBrowser,
};
use crate::sitemap::SitemapProcessor;
use crate::state::{CrawlStateManager, LocalStateStore, StateStore};
use crate::url::{extract_domain, UrlProcessor, WwwPreference, SEED_PRIORITY, SITEMAP_PRIORITY};
use crate::{Result, SeoscanError};
use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use url::Url;

/// Main crawler structure
///
/// ```no_run
/// use seoscan::{CrawlJob, CrawlOptions, Crawler};
///
/// # async fn demo() -> seoscan::Result<()> {
/// let job = CrawlJob::new("https://example.com", CrawlOptions::default());
/// let outcome = Crawler::new(job).run().await?;
/// println!("{} pages", outcome.results.len());
/// # Ok(())
/// # }
/// ```
pub struct Crawler {
    job: CrawlJob,
    headless_config: HeadlessConfig,
    recorder: Arc<dyn ScanRecorder>,
    store: Option<Arc<dyn StateStore>>,
    browser: Option<Box<dyn BrowserDriver>>,
    config_hash: Option<String>,
}

impl Crawler {
    pub fn new(job: CrawlJob) -> Self {
        Self {
            job,
            headless_config: HeadlessConfig::default(),
            recorder: Arc::new(NoopRecorder),
            store: None,
            browser: None,
            config_hash: None,
        }
    }

    /// Sends results, progress and status to `recorder`
    pub fn with_recorder(mut self, recorder: Arc<dyn ScanRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Keeps crawl state in `store` instead of process memory
    pub fn with_state_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Headless settings; a WebDriver session is opened from
    /// `webdriver_url` unless a browser is supplied directly
    pub fn with_headless_config(mut self, config: HeadlessConfig) -> Self {
        self.headless_config = config;
        self
    }

    /// Renders pages through `browser`
    pub fn with_browser(mut self, browser: Box<dyn BrowserDriver>) -> Self {
        self.browser = Some(browser);
        self
    }

    /// Hash of the configuration file, stored with the scan
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    pub fn job(&self) -> &CrawlJob {
        &self.job
    }

    /// Runs the crawl to completion or deadline
    ///
    /// Errors only when the crawl cannot start (invalid options or seed);
    /// the failure is reported to the recorder first. A crawl that hits its
    /// deadline returns what it collected with [`CrawlPhase::TimedOut`].
    pub async fn run(mut self) -> Result<CrawlOutcome> {
        let started = Instant::now();
        let scan_id = self.job.scan_id.clone();
        let browser = self.browser.take();

        let ctx = match self.seed(started, browser).await {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::error!("Scan {} failed to start: {}", scan_id, e);
                if let Err(record_err) = self.recorder.record_scan_failed(&scan_id, &e.to_string()).await {
                    tracing::warn!("Failed to record scan failure: {}", record_err);
                }
                return Err(e);
            }
        };
        let ctx = Arc::new(ctx);

        tracing::info!(
            "{} scan {}: {} URL(s) queued, {} worker(s)",
            CrawlPhase::Running,
            scan_id,
            ctx.queue.len(),
            ctx.options.concurrent_requests
        );

        let mut handles = Vec::with_capacity(ctx.options.concurrent_requests);
        for id in 0..ctx.options.concurrent_requests {
            handles.push(tokio::spawn(run_worker(Arc::clone(&ctx), id)));
        }
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Worker task failed: {}", e);
            }
        }

        let phase = if ctx.timed_out.load(std::sync::atomic::Ordering::SeqCst) {
            CrawlPhase::TimedOut
        } else {
            CrawlPhase::Completed
        };

        if let Err(e) = ctx.state.update_progress(true).await {
            tracing::warn!("Final progress update failed: {}", e);
        }
        if let Some(headless) = &ctx.headless {
            if let Err(e) = headless.shutdown().await {
                tracing::warn!("Failed to close browser session: {}", e);
            }
        }

        let results = ctx.state.get_pages_scanned().await?;
        if let Err(e) = self
            .recorder
            .record_scan_finished(&scan_id, phase.to_db_string())
            .await
        {
            tracing::warn!("Failed to record scan status: {}", e);
        }

        let stats = CrawlStatistics::from_results(&results, started.elapsed());
        tracing::info!(
            "Scan {} {}: {} page(s), {} link(s) in {:.1}s",
            scan_id,
            phase,
            results.len(),
            ctx.state.links_scanned(),
            stats.duration.as_secs_f64()
        );

        Ok(CrawlOutcome {
            results,
            phase,
            stats,
        })
    }

    async fn seed(&self, started: Instant, browser: Option<Box<dyn BrowserDriver>>) -> Result<CrawlContext> {
        let options = self.job.options.clone();
        tracing::info!("{} scan {} from {}", CrawlPhase::Seeding, self.job.scan_id, self.job.seed_url);

        validate_crawl_options(&options)?;

        let processor = UrlProcessor::new(&self.job.seed_url, &options.exclude_patterns).map_err(|e| {
            SeoscanError::InvalidSeed {
                url: self.job.seed_url.clone(),
                reason: e.to_string(),
            }
        })?;
        let processor = Arc::new(processor);

        if let Err(e) = self
            .recorder
            .record_scan_started(&self.job, self.config_hash.as_deref())
            .await
        {
            tracing::warn!("Failed to record scan start: {}", e);
        }

        let client = build_http_client(&options)?;

        let preference = probe_www_preference(processor.base_url(), &options.user_agent).await;
        if preference != WwwPreference::Unknown {
            tracing::info!("Host redirects indicate preferred form: {}", preference);
            processor.set_preferred_www_format(preference);
        }
        let tally = WwwTally::new(
            processor.base_host(),
            options.www_sample_pages,
            preference != WwwPreference::Unknown,
        );

        let seed = processor.normalize(&self.job.seed_url)?;
        let queue = QueueManager::new(options.per_domain_delay());

        let robots = RobotsCache::new(client.clone(), options.user_agent.clone(), options.respect_robots_txt);
        let (robots_data, _) = robots.get_or_fetch(&seed).await;
        if let (Some(delay), Some(domain)) = (robots_data.crawl_delay_ms, extract_domain(&seed)) {
            tracing::info!("Honouring crawl-delay of {} ms for {}", delay, domain);
            queue.set_crawl_delay(&domain, delay);
        }

        queue.add_to_queue(QueueItem::new(seed.clone(), 0, SEED_PRIORITY));

        if options.check_sitemaps {
            let origin = seed.join("/")?;
            let sitemaps = SitemapProcessor::new(client.clone(), options.user_agent.clone());
            let mut queued = 0;
            for url in sitemaps.discover(&origin, &robots_data.sitemaps).await {
                if self.enqueue_sitemap_url(&processor, &queue, &url) {
                    queued += 1;
                }
            }
            tracing::info!("Queued {} URL(s) from sitemaps", queued);
        }

        let store = self
            .store
            .clone()
            .unwrap_or_else(|| Arc::new(LocalStateStore::new()) as Arc<dyn StateStore>);
        let state = CrawlStateManager::new(
            self.job.scan_id.clone(),
            store,
            Arc::clone(&self.recorder),
            options.progress_interval(),
        );

        let http: Arc<dyn Scanner> = Arc::new(HttpScanner::with_client(client, Arc::clone(&processor), &options));
        let headless = self.open_headless(&processor, browser).await;

        Ok(CrawlContext {
            deadline: started + options.timeout(),
            options,
            processor,
            queue,
            state,
            robots,
            http,
            headless,
            www: Mutex::new(tally),
            active: AtomicUsize::new(0),
            reserved: AtomicUsize::new(0),
            timed_out: AtomicBool::new(false),
        })
    }

    fn enqueue_sitemap_url(&self, processor: &UrlProcessor, queue: &QueueManager, url: &Url) -> bool {
        let Ok(url) = processor.normalize(url.as_str()) else {
            return false;
        };
        if !processor.is_internal(&url) || processor.should_exclude(&url) {
            return false;
        }
        queue.add_to_queue(QueueItem::new(url, 1, SITEMAP_PRIORITY))
    }

    /// Builds the headless scanner from a supplied browser, or from the
    /// configured WebDriver endpoint when headless rendering can be needed
    async fn open_headless(
        &self,
        processor: &Arc<UrlProcessor>,
        browser: Option<Box<dyn BrowserDriver>>,
    ) -> Option<Arc<HeadlessScanner>> {
        let options = &self.job.options;

        let driver: Box<dyn BrowserDriver> = match browser {
            Some(driver) => driver,
            None => {
                let wanted = options.use_headless_browser
                    || options.allow_escalation
                    || !options.js_heavy_hosts.is_empty();
                let webdriver_url = self.headless_config.webdriver_url.as_deref()?;
                if !wanted {
                    return None;
                }
                match WebDriverBrowser::connect(webdriver_url, &options.user_agent).await {
                    Ok(browser) => Box::new(browser),
                    Err(e) => {
                        tracing::warn!("Headless rendering unavailable: {}", e);
                        return None;
                    }
                }
            }
        };

        Some(Arc::new(HeadlessScanner::new(
            driver,
            Arc::clone(processor),
            self.headless_config.clone(),
            options.request_timeout(),
        )))
    }
}
