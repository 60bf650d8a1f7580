//! URL handling for seoscan
//!
//! This module provides URL normalization, site classification, link
//! resolution, exclusion matching and queue priority scoring. The
//! [`UrlProcessor`] ties these together for one crawl and carries the
//! learned `www.` preference of the crawled site.

mod domain;
mod matcher;
mod normalize;
mod priority;

use crate::{UrlError, UrlResult};
use std::sync::{PoisonError, RwLock};
use url::Url;

// Re-export main functions
pub use domain::{dedup_key, extract_domain, has_www, is_ip_or_local, is_same_site, strip_www};
pub use matcher::{matches_wildcard, should_exclude, ExcludePatterns};
pub use normalize::{normalize_url, normalize_url_with, WwwRule};
pub use priority::{
    demote, is_pagination, score_priority, MAX_PRIORITY, MIN_PRIORITY, SEED_PRIORITY,
    SITEMAP_PRIORITY,
};

/// Preferred host form of the crawled site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WwwPreference {
    /// Hosts are rewritten to `www.<domain>`
    Www,
    /// Hosts are rewritten to `<domain>`
    NonWww,
    /// Hosts are left as they are
    #[default]
    Unknown,
}

impl WwwPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Www => "www",
            Self::NonWww => "non-www",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for WwwPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a discovered href points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Same site as the crawl base
    Internal(Url),
    /// Any other http(s) site
    External(Url),
    /// Not a crawlable link (javascript:, mailto:, tel:, data:, fragment
    /// only, unparsable or excluded)
    Skipped,
}

/// Per-crawl URL processor
///
/// Shared between workers behind an `Arc`; the only mutable part is the
/// `www.` preference, which is learned once and then read on every
/// normalization.
#[derive(Debug)]
pub struct UrlProcessor {
    base_url: Url,
    base_host: String,
    base_domain: String,
    scheme: String,
    www: RwLock<WwwPreference>,
    excludes: ExcludePatterns,
}

impl UrlProcessor {
    /// Creates a processor for the given seed
    ///
    /// The seed is normalized without any www rewrite; its host becomes the
    /// base for internal/external classification.
    pub fn new(seed: &str, exclude_patterns: &[String]) -> UrlResult<Self> {
        let declared = normalize::parse_with_default_scheme(seed)?;
        let seed_host = declared
            .host_str()
            .map(str::to_lowercase)
            .filter(|h| !h.is_empty())
            .ok_or(UrlError::MissingDomain)?;
        let rule = WwwRule {
            base_domain: strip_www(&seed_host).to_string(),
            preference: WwwPreference::Unknown,
            scheme: Some(declared.scheme().to_string()),
        };

        let base_url = normalize_url_with(seed, Some(&rule))?;
        let base_host = extract_domain(&base_url).ok_or(UrlError::MissingDomain)?;
        let base_domain = strip_www(&base_host).to_string();

        Ok(Self {
            scheme: base_url.scheme().to_string(),
            base_url,
            base_host,
            base_domain,
            www: RwLock::new(WwwPreference::Unknown),
            excludes: ExcludePatterns::compile(exclude_patterns),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Lowercase host of the seed, as given
    pub fn base_host(&self) -> &str {
        &self.base_host
    }

    /// Lowercase host of the seed without `www.`
    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    pub fn preferred_www_format(&self) -> WwwPreference {
        *self.www.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_preferred_www_format(&self, preference: WwwPreference) {
        let mut guard = self.www.write().unwrap_or_else(PoisonError::into_inner);
        if *guard != preference {
            tracing::debug!(
                "www preference for {} set to {}",
                self.base_domain,
                preference
            );
            *guard = preference;
        }
    }

    /// Normalizes a URL, applying the learned www preference and the seed's
    /// scheme to hosts of the crawled site
    pub fn normalize(&self, url: &str) -> UrlResult<Url> {
        let rule = WwwRule {
            base_domain: self.base_domain.clone(),
            preference: self.preferred_www_format(),
            scheme: Some(self.scheme.clone()),
        };
        normalize_url_with(url, Some(&rule))
    }

    /// Returns true when the URL belongs to the crawled site
    pub fn is_internal(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }

        url.host_str()
            .map(|host| is_same_site(&host.to_lowercase(), &self.base_host))
            .unwrap_or(false)
    }

    /// Like [`is_internal`](Self::is_internal) for raw strings
    ///
    /// `mailto:` and `tel:` strings are never internal.
    pub fn is_internal_str(&self, url: &str) -> bool {
        let lower = url.trim().to_ascii_lowercase();
        if lower.starts_with("mailto:") || lower.starts_with("tel:") {
            return false;
        }

        self.normalize(url)
            .map(|u| self.is_internal(&u))
            .unwrap_or(false)
    }

    /// Resolves an href against the page it was found on and normalizes it
    ///
    /// Returns `None` for javascript:, mailto:, tel:, data: and fragment-only
    /// hrefs and for anything that does not resolve to an http(s) URL.
    pub fn resolve(&self, base: &Url, relative: &str) -> Option<Url> {
        let href = relative.trim();

        if href.is_empty() || href.starts_with('#') {
            return None;
        }

        let lower = href.to_ascii_lowercase();
        if lower.starts_with("javascript:")
            || lower.starts_with("mailto:")
            || lower.starts_with("tel:")
            || lower.starts_with("data:")
        {
            return None;
        }

        let joined = base.join(href).ok()?;
        self.normalize(joined.as_str()).ok()
    }

    /// Returns true when the URL matches one of the crawl's exclude patterns
    pub fn should_exclude(&self, url: &Url) -> bool {
        self.excludes.matches(url.as_str())
    }

    /// Queue priority for a URL discovered at `depth`
    pub fn priority(&self, url: &Url, depth: u32) -> u8 {
        score_priority(url, depth)
    }

    /// Resolves and classifies an href in one step
    pub fn classify(&self, base: &Url, href: &str) -> LinkTarget {
        match self.resolve(base, href) {
            Some(url) if self.should_exclude(&url) => LinkTarget::Skipped,
            Some(url) if self.is_internal(&url) => LinkTarget::Internal(url),
            Some(url) => LinkTarget::External(url),
            None => LinkTarget::Skipped,
        }
    }
}
