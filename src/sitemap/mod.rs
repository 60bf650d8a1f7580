//! Sitemap discovery and expansion
//!
//! Sitemaps come from robots.txt `Sitemap:` lines or, when none are
//! declared, from a fixed list of well-known locations. Sitemap indexes are
//! expanded to a bounded depth and fan-out. Every failure yields no URLs.

use crate::robots::FETCH_TIMEOUT;
use ::sitemap::reader::{SiteMapEntity, SiteMapReader};
use std::collections::HashSet;
use std::io::Cursor;
use url::Url;

/// Locations probed when robots.txt declares no sitemap
pub const FALLBACK_PATHS: &[&str] = &[
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/wp-sitemap.xml",
    "/sitemap-index.xml",
    "/sitemap/sitemap.xml",
];

/// Deepest sitemap index level whose children are still followed
pub const MAX_INDEX_DEPTH: u32 = 2;

/// Child sitemaps followed per index
pub const MAX_CHILD_SITEMAPS: usize = 10;

/// Entries of a single sitemap document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSitemap {
    /// Page URLs (`<urlset>` entries)
    pub urls: Vec<String>,
    /// Child sitemaps (`<sitemapindex>` entries)
    pub sitemaps: Vec<String>,
}

impl ParsedSitemap {
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty() && self.sitemaps.is_empty()
    }
}

/// Parses sitemap XML into page and child-sitemap URLs
pub fn parse_sitemap(xml: &[u8]) -> ParsedSitemap {
    let mut parsed = ParsedSitemap::default();

    for entity in SiteMapReader::new(Cursor::new(xml)) {
        match entity {
            SiteMapEntity::Url(entry) => {
                if let Some(url) = entry.loc.get_url() {
                    parsed.urls.push(url.to_string());
                }
            }
            SiteMapEntity::SiteMap(entry) => {
                if let Some(url) = entry.loc.get_url() {
                    parsed.sitemaps.push(url.to_string());
                }
            }
            _ => {}
        }
    }

    parsed
}

/// Fetches sitemaps and flattens them into page URLs
#[derive(Debug, Clone)]
pub struct SitemapProcessor {
    client: reqwest::Client,
    user_agent: String,
    max_depth: u32,
    max_children: usize,
}

impl SitemapProcessor {
    pub fn new(client: reqwest::Client, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            max_depth: MAX_INDEX_DEPTH,
            max_children: MAX_CHILD_SITEMAPS,
        }
    }

    /// Finds the site's sitemaps and returns every page URL they list
    ///
    /// `declared` holds the robots.txt `Sitemap:` values; relative values are
    /// resolved against `origin`. When nothing is declared the fallback
    /// locations are probed in order and the first one that lists at least one
    /// entry is used.
    pub async fn discover(&self, origin: &Url, declared: &[String]) -> Vec<Url> {
        let declared: Vec<Url> = declared
            .iter()
            .filter_map(|s| origin.join(s.trim()).ok())
            .collect();

        if !declared.is_empty() {
            tracing::info!("Expanding {} declared sitemap(s)", declared.len());
            let mut all = Vec::new();
            for sitemap_url in &declared {
                all.extend(self.fetch_sitemap_urls(sitemap_url).await);
            }
            return dedup(all);
        }

        for path in FALLBACK_PATHS {
            let Ok(candidate) = origin.join(path) else {
                continue;
            };

            let Some(xml) = self.fetch_xml(&candidate).await else {
                continue;
            };
            // Soft 404s answer 200 with an HTML page
            if parse_sitemap(&xml).is_empty() {
                tracing::debug!("Ignoring {}: no sitemap entries", candidate);
                continue;
            }
            tracing::info!("Found sitemap at {}", candidate);
            return self.expand(candidate, xml).await;
        }

        tracing::debug!("No sitemap found for {}", origin);
        Vec::new()
    }

    /// Fetches one sitemap and recursively flattens any index it contains
    pub async fn fetch_sitemap_urls(&self, sitemap_url: &Url) -> Vec<Url> {
        match self.fetch_xml(sitemap_url).await {
            Some(xml) => self.expand(sitemap_url.clone(), xml).await,
            None => Vec::new(),
        }
    }

    async fn expand(&self, root: Url, root_xml: Vec<u8>) -> Vec<Url> {
        let mut urls = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(root.to_string());

        let mut pending: Vec<(Url, u32, Option<Vec<u8>>)> = vec![(root, 0, Some(root_xml))];

        while let Some((sitemap_url, depth, prefetched)) = pending.pop() {
            let xml = match prefetched {
                Some(xml) => xml,
                None => match self.fetch_xml(&sitemap_url).await {
                    Some(xml) => xml,
                    None => continue,
                },
            };

            let parsed = parse_sitemap(&xml);
            tracing::debug!(
                "Sitemap {} (depth {}): {} url(s), {} child sitemap(s)",
                sitemap_url,
                depth,
                parsed.urls.len(),
                parsed.sitemaps.len()
            );

            urls.extend(parsed.urls.iter().filter_map(|u| Url::parse(u).ok()));

            if depth >= self.max_depth {
                continue;
            }

            for child in parsed.sitemaps.iter().take(self.max_children) {
                let Ok(child_url) = Url::parse(child) else {
                    continue;
                };
                if seen.insert(child_url.to_string()) {
                    pending.push((child_url, depth + 1, None));
                }
            }
        }

        dedup(urls)
    }

    async fn fetch_xml(&self, url: &Url) -> Option<Vec<u8>> {
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| tracing::debug!("Sitemap fetch failed for {}: {}", url, e))
            .ok()?;

        if !response.status().is_success() {
            tracing::debug!("Sitemap {} returned {}", url, response.status());
            return None;
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| tracing::debug!("Failed to read sitemap {}: {}", url, e))
            .ok()
    }
}

fn dedup(urls: Vec<Url>) -> Vec<Url> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|u| seen.insert(u.to_string()))
        .collect()
}
