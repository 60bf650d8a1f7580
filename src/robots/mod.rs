//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching
//! robots.txt files. Fetch failures never abort a crawl: they degrade to
//! allow-all.

mod cache;
mod parser;

pub use cache::{path_and_query, CachedRobots, RobotsCache};
pub use parser::{is_path_allowed, parse, RobotsData};

use std::time::Duration;
use url::Url;

/// Timeout for robots.txt and sitemap requests
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches and parses robots.txt for the origin of `url`
///
/// Network errors and non-2xx responses yield [`RobotsData::allow_all`].
pub async fn fetch_robots(client: &reqwest::Client, url: &Url, user_agent: &str) -> RobotsData {
    let robots_url = match url.join("/robots.txt") {
        Ok(u) => u,
        Err(e) => {
            tracing::warn!("Cannot build robots.txt URL for {}: {}", url, e);
            return RobotsData::allow_all();
        }
    };

    let response = match client
        .get(robots_url.clone())
        .header(reqwest::header::USER_AGENT, user_agent)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Failed to fetch {}: {}", robots_url, e);
            return RobotsData::allow_all();
        }
    };

    if !response.status().is_success() {
        tracing::debug!(
            "{} returned {}, allowing all",
            robots_url,
            response.status()
        );
        return RobotsData::allow_all();
    }

    match response.text().await {
        Ok(body) => {
            let data = parse(&body, user_agent);
            tracing::info!(
                "Loaded {}: {} disallow, {} allow, {} sitemap(s)",
                robots_url,
                data.disallowed_paths.len(),
                data.allowed_paths.len(),
                data.sitemaps.len()
            );
            data
        }
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", robots_url, e);
            RobotsData::allow_all()
        }
    }
}
