//! Page scanners
//!
//! A [`Scanner`] turns one URL into one [`ScanResult`]. Two implementations
//! exist: [`HttpScanner`] (plain fetch, no JavaScript) and
//! [`HeadlessScanner`] (rendered through a [`BrowserDriver`]).
//! Scanners never fail outright; network problems end up in
//! `ScanResult::errors` with status 0.

mod browser;
mod escalation;
mod extract;
mod fallback;
mod headless;
mod http;
mod result;
mod structured;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

pub use browser::WebDriverBrowser;
pub use escalation::{initial_method, needs_headless_verification};
pub use extract::{extract_html, parse_robots_directives, rank_keywords, PageData};
pub use fallback::{extract_script_links, extract_with_regex, needs_regex_fallback};
pub use headless::{BrowserDriver, HeadlessScanner};
pub use http::{build_http_client, HttpScanner};
pub use result::{Headings, Image, Link, ScanMethod, ScanResult};
pub use structured::{extract_structured_data, StructuredData};

/// Scans a single URL
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Fetches and analyzes `url`, found at `depth`
    async fn scan(&self, url: &Url, depth: u32) -> ScanResult;

    /// Which kind of scan this scanner performs
    fn method(&self) -> ScanMethod;
}

/// Errors from the browser automation layer
#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("WebDriver error: {0}")]
    WebDriver(#[from] thirtyfour::prelude::WebDriverError),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Browser operation timed out")]
    Timeout,

    #[error("Browser session is closed")]
    Closed,
}
