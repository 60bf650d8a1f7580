//! HTML extraction for scanned pages
//!
//! This module parses a page with `scraper` and pulls out every SEO signal
//! recorded in a [`ScanResult`]:
//! - title, meta description, meta keywords and meta robots
//! - H1-H6 headings
//! - links (split into internal and external), images, canonical URL
//! - structured data, script and stylesheet counts
//! - visible word count and body keywords

use crate::scanner::result::{Headings, Image, Link, ScanResult};
use crate::scanner::structured::extract_structured_data;
use crate::url::{LinkTarget, UrlProcessor};
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};
use url::Url;

/// Number of body keywords kept after frequency ranking
pub const MAX_BODY_KEYWORDS: usize = 10;

const MIN_KEYWORD_LEN: usize = 3;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "his", "how", "its", "may", "new", "now", "old", "see", "two",
    "who", "did", "get", "let", "put", "say", "she", "too", "use", "that", "with", "have",
    "this", "will", "your", "from", "they", "been", "more", "when", "what", "were", "than",
    "them", "then", "into", "also", "just", "some", "only", "over", "such", "very", "about",
    "there", "their", "which", "would", "could", "should", "these", "those", "other", "after",
    "where", "while", "being", "each", "here", "most", "much", "many", "both", "same", "does",
];

const HIDDEN_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// SEO signals extracted from one HTML document
#[derive(Debug, Clone, Default)]
pub struct PageData {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub headings: Headings,
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
    pub word_count: usize,
}

impl PageData {
    /// Copies the extracted fields into a scan result
    pub fn apply(self, result: &mut ScanResult) {
        result.title = self.title;
        result.meta_description = self.meta_description;
        result.headings = self.headings;
        result.canonical_url = self.canonical_url;
        result.noindex |= self.noindex;
        result.nofollow |= self.nofollow;
        result.internal_links = self.internal_links;
        result.external_links = self.external_links;
        result.images = self.images;
        result.structured_data = self.structured_data;
        result.schema_types = self.schema_types;
        result.js_count = self.js_count;
        result.css_count = self.css_count;
        result.keywords = self.keywords;
        result.word_count = self.word_count;
    }

    /// True when DOM parsing produced nothing usable
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.internal_links.is_empty() && self.external_links.is_empty()
    }
}

/// Collects links, resolving and classifying them through the
/// [`UrlProcessor`] and dropping duplicates
pub struct LinkCollector<'a> {
    processor: &'a UrlProcessor,
    base: &'a Url,
    seen: HashSet<String>,
    pub internal: Vec<Link>,
    pub external: Vec<Link>,
}

impl<'a> LinkCollector<'a> {
    pub fn new(processor: &'a UrlProcessor, base: &'a Url) -> Self {
        Self {
            processor,
            base,
            seen: HashSet::new(),
            internal: Vec::new(),
            external: Vec::new(),
        }
    }

    /// Adds an href; returns true when it produced a new link
    pub fn push(&mut self, href: &str, anchor_text: &str, rel: Option<&str>) -> bool {
        let (url, internal) = match self.processor.classify(self.base, href) {
            LinkTarget::Internal(url) => (url, true),
            LinkTarget::External(url) => (url, false),
            LinkTarget::Skipped => return false,
        };

        if !self.seen.insert(url.to_string()) {
            return false;
        }

        let link = Link {
            url: url.to_string(),
            anchor_text: collapse_whitespace(anchor_text),
            rel_attributes: rel
                .map(|r| r.split_whitespace().map(|s| s.to_ascii_lowercase()).collect())
                .unwrap_or_default(),
        };

        if internal {
            self.internal.push(link);
        } else {
            self.external.push(link);
        }
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }
}

/// Parses an HTML document and extracts its SEO signals
///
/// `page_url` is the final URL of the page; relative hrefs resolve against it.
pub fn extract_html(html: &str, page_url: &Url, processor: &UrlProcessor) -> PageData {
    let document = Html::parse_document(html);

    let mut data = PageData {
        title: extract_title(&document),
        meta_description: meta_content(&document, "description"),
        headings: extract_headings(&document),
        ..PageData::default()
    };

    if let Some(robots) = meta_content(&document, "robots") {
        let (noindex, nofollow) = parse_robots_directives(&robots);
        data.noindex = noindex;
        data.nofollow = nofollow;
    }

    let mut links = LinkCollector::new(processor, page_url);
    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                let text: String = element.text().collect();
                links.push(href, &text, element.value().attr("rel"));
            }
        }
    }
    data.internal_links = links.internal;
    data.external_links = links.external;

    data.images = extract_images(&document, page_url, processor);
    data.canonical_url = extract_canonical(&document, page_url, processor);

    if let Ok(selector) = Selector::parse("script[src]") {
        data.js_count = document.select(&selector).count();
    }
    data.css_count = count_stylesheets(&document);

    let structured = extract_structured_data(&document, html);
    data.structured_data = structured.blobs;
    data.schema_types = structured.schema_types;

    let text = visible_text(&document);
    data.word_count = text.split_whitespace().count();
    data.keywords = rank_keywords(meta_content(&document, "keywords").as_deref(), &text);

    data
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Content of `<meta name="...">`, matching the name case-insensitively
fn meta_content(document: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse("meta[name][content]").ok()?;

    document
        .select(&selector)
        .find(|el| {
            el.value()
                .attr("name")
                .is_some_and(|n| n.trim().eq_ignore_ascii_case(name))
        })
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

fn extract_headings(document: &Html) -> Headings {
    let mut headings = Headings::default();

    for level in 1..=6u8 {
        let Ok(selector) = Selector::parse(&format!("h{}", level)) else {
            continue;
        };
        let Some(bucket) = headings.level_mut(level) else {
            continue;
        };
        for element in document.select(&selector) {
            let text = collapse_whitespace(&element.text().collect::<String>());
            if !text.is_empty() {
                bucket.push(text);
            }
        }
    }

    headings
}

fn extract_images(document: &Html, page_url: &Url, processor: &UrlProcessor) -> Vec<Image> {
    let Ok(selector) = Selector::parse("img") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let src = element
                .value()
                .attr("src")
                .or_else(|| element.value().attr("data-src"))?;
            let resolved = processor.resolve(page_url, src)?;
            if processor.should_exclude(&resolved) {
                return None;
            }
            Some(Image {
                src: resolved.to_string(),
                alt: element.value().attr("alt").map(|a| a.trim().to_string()),
            })
        })
        .collect()
}

fn extract_canonical(document: &Html, page_url: &Url, processor: &UrlProcessor) -> Option<String> {
    let selector = Selector::parse("link[rel][href]").ok()?;

    document
        .select(&selector)
        .find(|el| has_rel(el, "canonical"))
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| processor.resolve(page_url, href))
        .map(|url| url.to_string())
}

fn count_stylesheets(document: &Html) -> usize {
    let Ok(selector) = Selector::parse("link[rel]") else {
        return 0;
    };
    document
        .select(&selector)
        .filter(|el| has_rel(el, "stylesheet"))
        .count()
}

fn has_rel(element: &ElementRef<'_>, rel: &str) -> bool {
    element
        .value()
        .attr("rel")
        .is_some_and(|r| r.split_whitespace().any(|v| v.eq_ignore_ascii_case(rel)))
}

/// Reads `noindex`/`nofollow` from a meta robots or X-Robots-Tag value
pub fn parse_robots_directives(value: &str) -> (bool, bool) {
    let mut noindex = false;
    let mut nofollow = false;

    for directive in value.split(',').map(|d| d.trim().to_ascii_lowercase()) {
        // X-Robots-Tag may carry a "botname:" prefix
        let directive = directive.rsplit(':').next().unwrap_or_default().trim();
        match directive {
            "noindex" => noindex = true,
            "nofollow" => nofollow = true,
            "none" => {
                noindex = true;
                nofollow = true;
            }
            _ => {}
        }
    }

    (noindex, nofollow)
}

/// Text a visitor would see: body text without scripts, styles and templates
fn visible_text(document: &Html) -> String {
    let root = Selector::parse("body")
        .ok()
        .and_then(|s| document.select(&s).next())
        .unwrap_or_else(|| document.root_element());

    let mut out = String::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_TEXT_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }

    out
}

/// Meta keywords first, then the most frequent body words
pub fn rank_keywords(meta_keywords: Option<&str>, text: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();

    if let Some(meta) = meta_keywords {
        for keyword in meta.split(',').map(|k| k.trim().to_lowercase()) {
            if !keyword.is_empty() && !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut first_seen: HashMap<String, usize> = HashMap::new();
    for (idx, word) in text
        .split(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-')
        .map(|w| w.trim_matches(|c: char| c == '\'' || c == '-').to_lowercase())
        .filter(|w| w.chars().count() >= MIN_KEYWORD_LEN)
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .enumerate()
    {
        first_seen.entry(word.clone()).or_insert(idx);
        *counts.entry(word).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|(a_word, a_count), (b_word, b_count)| {
        b_count
            .cmp(a_count)
            .then_with(|| first_seen.get(a_word).cmp(&first_seen.get(b_word)))
    });

    for (word, _) in ranked.into_iter().take(MAX_BODY_KEYWORDS) {
        if !keywords.contains(&word) {
            keywords.push(word);
        }
    }

    keywords
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
