//! Regex extraction for markup the DOM pass cannot make sense of, and link
//! discovery inside JavaScript bodies

use crate::scanner::extract::{
    collapse_whitespace, parse_robots_directives, LinkCollector, PageData,
};
use crate::scanner::result::Image;
use crate::url::UrlProcessor;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static TITLE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").ok());

static META: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?is)<meta\s[^>]*>").ok());

static HEADING: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<h([1-6])[^>]*>(.*?)</h[1-6]\s*>").ok());

static ANCHOR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<a\s([^>]*)>(.*?)</a\s*>").ok());

static IMG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?is)<img\s[^>]*>").ok());

static LINK_TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?is)<link\s[^>]*>").ok());

static TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").ok());

static ANCHOR_OPEN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)<a\s[^>]*href").ok());

static ABSOLUTE_URL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'`<>()\\]+"#).ok());

static ROUTE_LITERAL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"["'`](/[A-Za-z0-9][A-Za-z0-9_\-/]*)["'`]"#).ok());

/// Asset extensions never treated as routes when found in scripts
const ASSET_EXTENSIONS: &[&str] = &[
    ".js", ".css", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".woff", ".woff2",
    ".ttf", ".map", ".json",
];

/// True when the DOM pass came back empty although the raw markup has anchors
pub fn needs_regex_fallback(dom: &PageData, html: &str) -> bool {
    dom.is_empty()
        && ANCHOR_OPEN
            .as_ref()
            .is_some_and(|re| re.is_match(html))
}

/// Extracts the core SEO fields with regular expressions
pub fn extract_with_regex(html: &str, page_url: &Url, processor: &UrlProcessor) -> PageData {
    let mut data = PageData::default();

    if let Some(re) = TITLE.as_ref() {
        data.title = re
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| collapse_whitespace(&strip_tags(m.as_str())))
            .filter(|t| !t.is_empty());
    }

    if let Some(re) = META.as_ref() {
        for tag in re.find_iter(html) {
            let tag = tag.as_str();
            let name = attr(tag, "name").map(|n| n.to_ascii_lowercase());
            let Some(content) = attr(tag, "content") else {
                continue;
            };
            match name.as_deref() {
                Some("description") if data.meta_description.is_none() => {
                    data.meta_description = Some(content.trim().to_string());
                }
                Some("robots") => {
                    let (noindex, nofollow) = parse_robots_directives(&content);
                    data.noindex |= noindex;
                    data.nofollow |= nofollow;
                }
                _ => {}
            }
        }
    }

    if let Some(re) = HEADING.as_ref() {
        for cap in re.captures_iter(html) {
            let level = cap
                .get(1)
                .and_then(|m| m.as_str().parse::<u8>().ok())
                .unwrap_or(0);
            let text = cap
                .get(2)
                .map(|m| collapse_whitespace(&strip_tags(m.as_str())))
                .unwrap_or_default();
            if text.is_empty() {
                continue;
            }
            if let Some(bucket) = data.headings.level_mut(level) {
                bucket.push(text);
            }
        }
    }

    let mut links = LinkCollector::new(processor, page_url);
    if let Some(re) = ANCHOR.as_ref() {
        for cap in re.captures_iter(html) {
            let attrs = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
            let Some(href) = attr(attrs, "href") else {
                continue;
            };
            let text = cap
                .get(2)
                .map(|m| strip_tags(m.as_str()))
                .unwrap_or_default();
            let rel = attr(attrs, "rel");
            links.push(&href, &text, rel.as_deref());
        }
    }
    data.internal_links = links.internal;
    data.external_links = links.external;

    if let Some(re) = IMG.as_ref() {
        data.images = re
            .find_iter(html)
            .filter_map(|tag| {
                let tag = tag.as_str();
                let src = attr(tag, "src")?;
                let resolved = processor.resolve(page_url, &src)?;
                Some(Image {
                    src: resolved.to_string(),
                    alt: attr(tag, "alt").map(|a| a.trim().to_string()),
                })
            })
            .collect();
    }

    if let Some(re) = LINK_TAG.as_ref() {
        data.canonical_url = re
            .find_iter(html)
            .map(|m| m.as_str())
            .find(|tag| {
                attr(tag, "rel").is_some_and(|r| {
                    r.split_whitespace()
                        .any(|v| v.eq_ignore_ascii_case("canonical"))
                })
            })
            .and_then(|tag| attr(tag, "href"))
            .and_then(|href| processor.resolve(page_url, &href))
            .map(|u| u.to_string());
    }

    data.word_count = strip_tags(html).split_whitespace().count();
    data
}

/// Finds candidate links inside a JavaScript body: absolute URLs and
/// route-like string literals such as `"/pricing"`
pub fn extract_script_links(script: &str, page_url: &Url, processor: &UrlProcessor) -> PageData {
    let mut links = LinkCollector::new(processor, page_url);

    if let Some(re) = ABSOLUTE_URL.as_ref() {
        for m in re.find_iter(script) {
            let candidate = m.as_str().trim_end_matches(['.', ',', ';']);
            if !is_asset(candidate) {
                links.push(candidate, "", None);
            }
        }
    }

    if let Some(re) = ROUTE_LITERAL.as_ref() {
        for cap in re.captures_iter(script) {
            if let Some(route) = cap.get(1) {
                if !is_asset(route.as_str()) {
                    links.push(route.as_str(), "", None);
                }
            }
        }
    }

    PageData {
        internal_links: links.internal,
        external_links: links.external,
        ..PageData::default()
    }
}

fn is_asset(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    ASSET_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Value of an attribute inside a raw tag, quoted or not
fn attr(tag: &str, name: &str) -> Option<String> {
    let pattern = format!(
        r#"(?is)(?:^|[\s<]){}\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#,
        regex::escape(name)
    );
    let re = Regex::new(&pattern).ok()?;
    let cap = re.captures(tag)?;
    cap.get(1)
        .or_else(|| cap.get(2))
        .or_else(|| cap.get(3))
        .map(|m| decode_entities(m.as_str()))
}

fn strip_tags(html: &str) -> String {
    match TAG.as_ref() {
        Some(re) => decode_entities(&re.replace_all(html, " ")),
        None => html.to_string(),
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
}
