use async_trait::async_trait;
use seoscan::config::{CrawlOptions, HeadlessConfig};
use seoscan::scanner::{BrowserDriver, BrowserError};
use seoscan::ScanResult;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::ResponseTemplate;

/// Options tuned for a local mock server
pub fn create_test_options() -> CrawlOptions {
    CrawlOptions {
        max_depth: 2,
        max_pages: 50,
        concurrent_requests: 3,
        timeout_ms: 20_000,
        request_timeout_ms: 2_000,
        check_sitemaps: false,
        allow_escalation: false,
        per_domain_delay_ms: 5,
        progress_interval_ms: 0,
        ..CrawlOptions::default()
    }
}

pub fn create_test_headless_config() -> HeadlessConfig {
    HeadlessConfig {
        webdriver_url: None,
        network_idle_ms: 10,
        network_idle_timeout_ms: 200,
        settle_delay_ms: 0,
    }
}

/// HTML response with the given title and body
pub fn html_page(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(
            format!(
                "<!DOCTYPE html><html><head><title>{}</title></head><body>{}</body></html>",
                title, body
            ),
            "text/html; charset=utf-8",
        )
}

/// Paths of the recorded results, sorted
pub fn result_paths(results: &[ScanResult]) -> Vec<String> {
    let mut paths: Vec<String> = results
        .iter()
        .map(|r| {
            url::Url::parse(&r.url)
                .map(|u| u.path().to_string())
                .unwrap_or_else(|_| r.url.clone())
        })
        .collect();
    paths.sort();
    paths
}

/// Browser stand-in serving one rendered document for every URL
pub struct FakeBrowser {
    html: String,
    fail_navigation: bool,
    navigate_delay: Duration,
    navigations: Arc<AtomicUsize>,
}

impl FakeBrowser {
    pub fn new(html: &str) -> Self {
        Self {
            html: html.to_string(),
            fail_navigation: false,
            navigate_delay: Duration::ZERO,
            navigations: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_navigation: true,
            ..Self::new("")
        }
    }

    /// Browser whose page loads take `delay`
    pub fn slow(html: &str, delay: Duration) -> Self {
        Self {
            navigate_delay: delay,
            ..Self::new(html)
        }
    }

    /// Counter of navigations, readable after the browser is moved
    pub fn navigations(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.navigations)
    }
}

#[async_trait]
impl BrowserDriver for FakeBrowser {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), BrowserError> {
        self.navigations.fetch_add(1, Ordering::SeqCst);
        if !self.navigate_delay.is_zero() {
            tokio::time::sleep(self.navigate_delay).await;
        }
        if self.fail_navigation {
            return Err(BrowserError::Navigation(format!("{}: net::ERR_CONNECTION_RESET", url)));
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, BrowserError> {
        if script.contains("document.readyState") {
            Ok(json!(["complete", 3]))
        } else if script.contains("responseStatus") {
            Ok(json!(200))
        } else if script.contains("__BUILD_MANIFEST") {
            Ok(json!([]))
        } else {
            Ok(Value::Null)
        }
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.html.clone())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        Ok(())
    }
}
