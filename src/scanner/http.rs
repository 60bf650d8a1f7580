//! Static HTTP scanner
//!
//! One GET per URL with browser-like headers. Redirects are followed up to
//! [`MAX_REDIRECTS`] hops, HTML bodies are parsed with `scraper` (falling back
//! to regex extraction for broken markup) and JavaScript bodies are mined for
//! candidate links.

use crate::config::CrawlOptions;
use crate::scanner::extract::{extract_html, parse_robots_directives};
use crate::scanner::fallback::{extract_script_links, extract_with_regex, needs_regex_fallback};
use crate::scanner::result::{is_html_content_type, is_script_content_type, ScanMethod, ScanResult};
use crate::scanner::Scanner;
use crate::url::UrlProcessor;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use reqwest::{redirect::Policy, Client};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Maximum redirect hops followed for one request
pub const MAX_REDIRECTS: usize = 10;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANG: &str = "en-US,en;q=0.9";

/// Desktop browser user agents picked from when rotation is on
const BROWSER_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
];

/// Builds the HTTP client used for page scans
///
/// The per-request timeout bounds every scan so in-flight work ends on its
/// own once the crawl deadline passes.
pub fn build_http_client(options: &CrawlOptions) -> Result<Client, reqwest::Error> {
    let request_timeout = options.request_timeout();

    Client::builder()
        .user_agent(options.user_agent.clone())
        .timeout(request_timeout)
        .connect_timeout(request_timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Scanner that fetches pages without running JavaScript
pub struct HttpScanner {
    client: Client,
    processor: Arc<UrlProcessor>,
    user_agent: String,
    rotate_user_agent: bool,
}

impl HttpScanner {
    pub fn new(processor: Arc<UrlProcessor>, options: &CrawlOptions) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(options)?, processor, options))
    }

    /// Creates a scanner around an existing client
    pub fn with_client(client: Client, processor: Arc<UrlProcessor>, options: &CrawlOptions) -> Self {
        Self {
            client,
            processor,
            user_agent: options.user_agent.clone(),
            rotate_user_agent: options.rotate_user_agent,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn pick_user_agent(&self) -> &str {
        if !self.rotate_user_agent {
            return &self.user_agent;
        }
        BROWSER_USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(&self.user_agent)
    }

    fn describe_error(error: &reqwest::Error) -> String {
        if error.is_timeout() {
            "Request timeout".to_string()
        } else if error.is_redirect() {
            format!("Too many redirects (limit {})", MAX_REDIRECTS)
        } else if error.is_connect() {
            format!("Connection failed: {}", error)
        } else {
            error.to_string()
        }
    }
}

#[async_trait]
impl Scanner for HttpScanner {
    async fn scan(&self, url: &Url, depth: u32) -> ScanResult {
        let started = Instant::now();
        let user_agent = self.pick_user_agent().to_string();

        let response = match self
            .client
            .get(url.clone())
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANG)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let mut result =
                    ScanResult::failed(url, depth, ScanMethod::Http, Self::describe_error(&e));
                result.load_time_ms = elapsed_ms(started);
                tracing::debug!("GET {} failed: {}", url, e);
                return result;
            }
        };

        let mut result = ScanResult::new(url, depth, ScanMethod::Http);
        result.first_byte_ms = elapsed_ms(started);
        result.status = response.status().as_u16();
        result.final_url = response.url().to_string();

        let headers = response.headers().clone();
        let final_url = response.url().clone();
        result.content_type = header_str(&headers, CONTENT_TYPE.as_str());

        if let Some(tag) = header_str(&headers, "x-robots-tag") {
            let (noindex, nofollow) = parse_robots_directives(&tag);
            result.noindex |= noindex;
            result.nofollow |= nofollow;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                // Headers arrived but the body did not; treat as a network failure
                result.status = 0;
                result.errors.push(format!("Failed to read body: {}", Self::describe_error(&e)));
                result.load_time_ms = elapsed_ms(started);
                return result;
            }
        };
        result.load_time_ms = elapsed_ms(started);

        let content_type = result.content_type.clone().unwrap_or_default();
        let looks_like_html = content_type.is_empty() && sniff_html(&body);
        if looks_like_html {
            result.content_type = Some("text/html".to_string());
        }

        if is_html_content_type(&content_type) || looks_like_html {
            result.content_length = body.len();

            let data = extract_html(&body, &final_url, &self.processor);
            if needs_regex_fallback(&data, &body) {
                tracing::debug!("DOM extraction empty for {}, using regex fallback", url);
                result
                    .warnings
                    .push("Markup could not be parsed as a DOM; used regex extraction".to_string());
                extract_with_regex(&body, &final_url, &self.processor).apply(&mut result);
            } else {
                data.apply(&mut result);
            }
        } else if is_script_content_type(&content_type) {
            result.content_length = body.len();
            extract_script_links(&body, &final_url, &self.processor).apply(&mut result);
        }

        if !result.is_success() && !(300..400).contains(&result.status) {
            result.errors.push(format!("HTTP {}", result.status));
        }

        result
    }

    fn method(&self) -> ScanMethod {
        ScanMethod::Http
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn sniff_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(64).collect::<String>().to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
