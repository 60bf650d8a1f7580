//! Headless browser scanner
//!
//! Renders a page through a [`BrowserDriver`], waits for the network to go
//! quiet, nudges lazy content into view (scroll, menu toggles) and then runs
//! the same extraction as the HTTP scanner on the rendered DOM. Client-side
//! router paths discovered by in-page evaluation are added as internal links.

use crate::config::HeadlessConfig;
use crate::scanner::extract::{extract_html, LinkCollector};
use crate::scanner::http::elapsed_ms;
use crate::scanner::result::{Link, ScanMethod, ScanResult};
use crate::scanner::{BrowserError, Scanner};
use crate::url::UrlProcessor;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use url::Url;

const READY_STATE_SCRIPT: &str =
    "return [document.readyState, performance.getEntriesByType('resource').length];";

const SCROLL_SCRIPT: &str =
    "window.scrollTo(0, document.body ? document.body.scrollHeight : 0); return true;";

const MENU_TOGGLE_SCRIPT: &str = r#"
const selectors = ['[aria-expanded="false"]', '.menu-toggle', '.navbar-toggler', '.hamburger', 'button[aria-controls]'];
let clicked = 0;
for (const sel of selectors) {
  for (const el of document.querySelectorAll(sel)) {
    try { el.click(); clicked++; } catch (e) {}
    if (clicked >= 10) return clicked;
  }
}
return clicked;
"#;

const STATUS_SCRIPT: &str = r#"
const nav = performance.getEntriesByType('navigation')[0];
return nav && nav.responseStatus ? nav.responseStatus : 0;
"#;

const LOCATION_SCRIPT: &str = "return window.location.href;";

const ROUTER_SCRIPT: &str = r#"
const paths = new Set();
const add = (p) => {
  if (typeof p === 'string' && p.startsWith('/') && !p.startsWith('//')) paths.add(p.split('?')[0]);
};
try {
  if (window.__BUILD_MANIFEST) Object.keys(window.__BUILD_MANIFEST).forEach(add);
  if (window.__NEXT_DATA__) add(window.__NEXT_DATA__.page);
} catch (e) {}
try {
  const root = document.querySelector('#app') || document.querySelector('[data-v-app]');
  const vue3 = root && root.__vue_app__;
  if (vue3 && vue3.config.globalProperties.$router) vue3.config.globalProperties.$router.getRoutes().forEach(r => add(r.path));
  const vue2 = root && root.__vue__;
  if (vue2 && vue2.$router && vue2.$router.options.routes) vue2.$router.options.routes.forEach(r => add(r.path));
} catch (e) {}
try {
  document.querySelectorAll('[routerlink],[ng-reflect-router-link]').forEach(el =>
    add(el.getAttribute('routerlink') || el.getAttribute('ng-reflect-router-link')));
} catch (e) {}
try {
  document.querySelectorAll('[data-href],[data-to]').forEach(el =>
    add(el.getAttribute('data-href') || el.getAttribute('data-to')));
} catch (e) {}
return Array.from(paths).filter(p => !p.includes(':') && !p.includes('*') && !p.includes('['));
"#;

/// Minimal browser automation surface used by [`HeadlessScanner`]
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Loads `url`, giving up after `timeout`
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Runs a script in the current page and returns its JSON result
    async fn evaluate(&self, script: &str) -> Result<Value, BrowserError>;

    /// Serialized DOM of the current page
    async fn content(&self) -> Result<String, BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}

/// Scanner that renders pages in a browser session
///
/// One session is shared by all workers; scans are serialized on it. A scan
/// never takes longer than the render budget, including the time spent
/// waiting for the session.
pub struct HeadlessScanner {
    driver: Box<dyn BrowserDriver>,
    session: Mutex<()>,
    processor: Arc<UrlProcessor>,
    config: HeadlessConfig,
    request_timeout: Duration,
}

impl HeadlessScanner {
    pub fn new(
        driver: Box<dyn BrowserDriver>,
        processor: Arc<UrlProcessor>,
        config: HeadlessConfig,
        request_timeout: Duration,
    ) -> Self {
        Self {
            driver,
            session: Mutex::new(()),
            processor,
            config,
            request_timeout,
        }
    }

    /// Upper bound for one complete render
    fn render_budget(&self) -> Duration {
        self.request_timeout
            + Duration::from_millis(self.config.network_idle_timeout_ms)
            + Duration::from_millis(self.config.settle_delay_ms)
    }

    /// Closes the browser session
    pub async fn shutdown(&self) -> Result<(), BrowserError> {
        let _session = self.session.lock().await;
        self.driver.close().await
    }

    async fn render(&self, url: &Url, depth: u32, started: Instant) -> Result<ScanResult, BrowserError> {
        self.driver.navigate(url.as_str(), self.request_timeout).await?;

        let mut result = ScanResult::new(url, depth, ScanMethod::Headless);
        result.first_byte_ms = elapsed_ms(started);

        if !self.wait_for_network_idle().await? {
            result
                .warnings
                .push("Network did not become idle before extraction".to_string());
        }

        if self.config.settle_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;
        }

        self.run_optional(SCROLL_SCRIPT, "scroll").await;
        if let Some(clicked) = self.run_optional(MENU_TOGGLE_SCRIPT, "menu toggles").await {
            if clicked.as_u64().unwrap_or(0) > 0 {
                // Give opened menus a moment to render
                tokio::time::sleep(Duration::from_millis(self.config.network_idle_ms.min(500))).await;
            }
        }

        result.status = match self.driver.evaluate(STATUS_SCRIPT).await {
            Ok(v) => v
                .as_u64()
                .and_then(|s| u16::try_from(s).ok())
                .filter(|s| *s > 0)
                .unwrap_or(200),
            Err(_) => 200,
        };

        let final_url = match self.driver.evaluate(LOCATION_SCRIPT).await {
            Ok(Value::String(href)) => Url::parse(&href).unwrap_or_else(|_| url.clone()),
            _ => url.clone(),
        };
        result.final_url = final_url.to_string();

        let html = self.driver.content().await?;
        result.content_type = Some("text/html".to_string());
        result.content_length = html.len();
        extract_html(&html, &final_url, &self.processor).apply(&mut result);

        if let Some(routes) = self.run_optional(ROUTER_SCRIPT, "router discovery").await {
            let added = self.add_router_links(&mut result, &final_url, &routes);
            if added > 0 {
                tracing::debug!("Found {} client-side routes on {}", added, url);
            }
        }

        result.load_time_ms = elapsed_ms(started);
        Ok(result)
    }

    /// Polls ready state and resource count until both have been stable for
    /// the configured quiet period; false when the idle timeout ran out first
    async fn wait_for_network_idle(&self) -> Result<bool, BrowserError> {
        let quiet = Duration::from_millis(self.config.network_idle_ms);
        let poll = quiet.clamp(Duration::from_millis(10), Duration::from_millis(100));
        let deadline = Instant::now() + Duration::from_millis(self.config.network_idle_timeout_ms);

        let mut last_count = None;
        let mut stable_since = Instant::now();

        loop {
            let (ready, count) = parse_ready_state(&self.driver.evaluate(READY_STATE_SCRIPT).await?);

            if last_count != Some(count) {
                last_count = Some(count);
                stable_since = Instant::now();
            }
            if ready && stable_since.elapsed() >= quiet {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(poll).await;
        }
    }

    async fn run_optional(&self, script: &str, what: &str) -> Option<Value> {
        match self.driver.evaluate(script).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("Skipping {}: {}", what, e);
                None
            }
        }
    }

    fn add_router_links(&self, result: &mut ScanResult, base: &Url, routes: &Value) -> usize {
        let Some(routes) = routes.as_array() else {
            return 0;
        };

        let mut collector = LinkCollector::new(&self.processor, base);
        for route in routes.iter().filter_map(Value::as_str) {
            collector.push(route, "", None);
        }

        let existing: HashSet<String> = result.internal_links.iter().map(|l| l.url.clone()).collect();
        let new_links: Vec<Link> = collector
            .internal
            .into_iter()
            .filter(|l| !existing.contains(&l.url))
            .collect();

        let added = new_links.len();
        result.internal_links.extend(new_links);
        added
    }
}

fn parse_ready_state(value: &Value) -> (bool, u64) {
    match value {
        Value::Array(items) => {
            let ready = items
                .first()
                .and_then(Value::as_str)
                .map_or(true, |s| s == "complete");
            let count = items.get(1).and_then(Value::as_u64).unwrap_or(0);
            (ready, count)
        }
        Value::String(s) => (s == "complete", 0),
        _ => (true, 0),
    }
}

#[async_trait]
impl Scanner for HeadlessScanner {
    async fn scan(&self, url: &Url, depth: u32) -> ScanResult {
        let started = Instant::now();

        // Waiting for the shared session counts against the render budget
        let render = async {
            let _session = self.session.lock().await;
            self.render(url, depth, Instant::now()).await
        };
        let outcome = tokio::time::timeout(self.render_budget(), render).await;
        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::debug!("Headless scan of {} failed: {}", url, e);
                let mut result = ScanResult::failed(url, depth, ScanMethod::Headless, e.to_string());
                result.load_time_ms = elapsed_ms(started);
                result
            }
            Err(_) => {
                let mut result = ScanResult::failed(
                    url,
                    depth,
                    ScanMethod::Headless,
                    BrowserError::Timeout.to_string(),
                );
                result.load_time_ms = elapsed_ms(started);
                result
            }
        }
    }

    fn method(&self) -> ScanMethod {
        ScanMethod::Headless
    }
}
