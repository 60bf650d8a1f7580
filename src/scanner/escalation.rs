//! Scanner selection and static-to-headless escalation

use crate::config::CrawlOptions;
use crate::scanner::result::{ScanMethod, ScanResult};
use crate::url::matches_wildcard;
use url::Url;

/// Titles shorter than this look unrendered
pub const MIN_TITLE_CHARS: usize = 3;

/// HTML bodies smaller than this (bytes) look unrendered
pub const MIN_CONTENT_BYTES: usize = 1000;

/// Pages with fewer internal links than this look unrendered
pub const MIN_INTERNAL_LINKS: usize = 2;

/// Decides whether a static scan should be repeated in a headless browser
///
/// Only successful or redirected HTML pages qualify; among those, a page is
/// escalated when any of these holds:
/// - the title is missing or shorter than [`MIN_TITLE_CHARS`]
/// - the body is smaller than [`MIN_CONTENT_BYTES`]
/// - there are no headings at all
/// - there are fewer than [`MIN_INTERNAL_LINKS`] internal links
pub fn needs_headless_verification(result: &ScanResult) -> bool {
    if result.scan_method != ScanMethod::Http {
        return false;
    }
    if !(200..400).contains(&result.status) || !result.is_html() {
        return false;
    }

    let title_chars = result
        .title
        .as_deref()
        .map(|t| t.trim().chars().count())
        .unwrap_or(0);

    title_chars < MIN_TITLE_CHARS
        || result.content_length < MIN_CONTENT_BYTES
        || result.headings.is_empty()
        || result.internal_links.len() < MIN_INTERNAL_LINKS
}

/// Picks the scanner for the first attempt at a URL
///
/// Headless when the crawl renders everything or when the host matches one
/// of the configured JavaScript-heavy host patterns.
pub fn initial_method(options: &CrawlOptions, url: &Url) -> ScanMethod {
    if options.use_headless_browser || is_js_heavy_host(options, url) {
        ScanMethod::Headless
    } else {
        ScanMethod::Http
    }
}

fn is_js_heavy_host(options: &CrawlOptions, url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_lowercase();
    options
        .js_heavy_hosts
        .iter()
        .any(|pattern| matches_wildcard(&pattern.to_lowercase(), &host))
}
