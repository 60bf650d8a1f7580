use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// How a page was scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMethod {
    /// Plain HTTP fetch, no JavaScript
    Http,
    /// Rendered in a headless browser
    Headless,
}

impl ScanMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Headless => "headless",
        }
    }
}

impl std::fmt::Display for ScanMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hyperlink found on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub anchor_text: String,
    pub rel_attributes: Vec<String>,
}

impl Link {
    pub fn is_nofollow(&self) -> bool {
        self.rel_attributes.iter().any(|r| r == "nofollow")
    }
}

/// An image found on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub src: String,
    pub alt: Option<String>,
}

/// Heading texts by level
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headings {
    pub h1: Vec<String>,
    pub h2: Vec<String>,
    pub h3: Vec<String>,
    pub h4: Vec<String>,
    pub h5: Vec<String>,
    pub h6: Vec<String>,
}

impl Headings {
    /// Mutable access to the list for level 1-6
    pub fn level_mut(&mut self, level: u8) -> Option<&mut Vec<String>> {
        match level {
            1 => Some(&mut self.h1),
            2 => Some(&mut self.h2),
            3 => Some(&mut self.h3),
            4 => Some(&mut self.h4),
            5 => Some(&mut self.h5),
            6 => Some(&mut self.h6),
            _ => None,
        }
    }

    pub fn total(&self) -> usize {
        self.h1.len() + self.h2.len() + self.h3.len() + self.h4.len() + self.h5.len() + self.h6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Everything recorded about one scanned URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// URL as dequeued (normalized)
    pub url: String,
    /// URL after redirects
    pub final_url: String,
    /// HTTP status; 0 when no response was received
    pub status: u16,
    pub content_type: Option<String>,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub headings: Headings,
    /// Body size in bytes; 0 for non-HTML, non-script responses
    pub content_length: usize,
    pub word_count: usize,
    pub canonical_url: Option<String>,
    pub noindex: bool,
    pub nofollow: bool,
    pub internal_links: Vec<Link>,
    pub external_links: Vec<Link>,
    pub images: Vec<Image>,
    pub structured_data: Vec<serde_json::Value>,
    pub schema_types: Vec<String>,
    pub js_count: usize,
    pub css_count: usize,
    pub keywords: Vec<String>,
    pub load_time_ms: u64,
    pub first_byte_ms: u64,
    pub depth: u32,
    pub scan_method: ScanMethod,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub scanned_at: DateTime<Utc>,
}

impl ScanResult {
    /// Creates an empty result for `url`
    pub fn new(url: &Url, depth: u32, scan_method: ScanMethod) -> Self {
        Self {
            url: url.to_string(),
            final_url: url.to_string(),
            status: 0,
            content_type: None,
            title: None,
            meta_description: None,
            headings: Headings::default(),
            content_length: 0,
            word_count: 0,
            canonical_url: None,
            noindex: false,
            nofollow: false,
            internal_links: Vec::new(),
            external_links: Vec::new(),
            images: Vec::new(),
            structured_data: Vec::new(),
            schema_types: Vec::new(),
            js_count: 0,
            css_count: 0,
            keywords: Vec::new(),
            load_time_ms: 0,
            first_byte_ms: 0,
            depth,
            scan_method,
            errors: Vec::new(),
            warnings: Vec::new(),
            scanned_at: Utc::now(),
        }
    }

    /// Creates a result for a scan that produced no response
    pub fn failed(url: &Url, depth: u32, scan_method: ScanMethod, error: impl Into<String>) -> Self {
        let mut result = Self::new(url, depth, scan_method);
        result.errors.push(error.into());
        result
    }

    /// True for `text/html` and XHTML responses
    pub fn is_html(&self) -> bool {
        self.content_type.as_deref().is_some_and(is_html_content_type)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Network errors, timeouts, 408, 429 and 5xx are worth retrying; any
    /// other status is a real answer from the site
    pub fn is_transient_failure(&self) -> bool {
        matches!(self.status, 0 | 408 | 429) || (500..600).contains(&self.status)
    }

    pub fn link_count(&self) -> usize {
        self.internal_links.len() + self.external_links.len()
    }
}

pub(crate) fn is_html_content_type(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.contains("text/html") || ct.contains("application/xhtml")
}

pub(crate) fn is_script_content_type(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.contains("javascript") || ct.contains("ecmascript")
}
