//! Per-crawl robots.txt cache
//!
//! Robots data is fetched at most once per host for the lifetime of a crawl.

use crate::robots::{fetch_robots, RobotsData};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use url::Url;

/// Robots data for a host along with when it was fetched
#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub data: Arc<RobotsData>,
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(data: RobotsData) -> Self {
        Self {
            data: Arc::new(data),
            fetched_at: Utc::now(),
        }
    }
}

/// Host-keyed robots.txt cache shared by all workers of a crawl
#[derive(Debug)]
pub struct RobotsCache {
    client: reqwest::Client,
    user_agent: String,
    enabled: bool,
    /// One cell per host; the map lock is only held to find the cell
    entries: Mutex<HashMap<String, Arc<OnceCell<CachedRobots>>>>,
}

impl RobotsCache {
    /// Creates a cache; when `enabled` is false every lookup is allow-all
    /// and nothing is fetched
    pub fn new(client: reqwest::Client, user_agent: impl Into<String>, enabled: bool) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            enabled,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the robots data for the URL's host, fetching it on first use
    ///
    /// The second value is true when this call performed the fetch, so the
    /// caller can register the host's crawl delay exactly once.
    pub async fn get_or_fetch(&self, url: &Url) -> (Arc<RobotsData>, bool) {
        if !self.enabled {
            return (Arc::new(RobotsData::allow_all()), false);
        }

        let key = host_key(url);
        let cell = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(key).or_default())
        };

        // Concurrent lookups for the same host wait on its cell; other hosts
        // are not blocked by the fetch
        let fetched = AtomicBool::new(false);
        let fetched_flag = &fetched;
        let client = &self.client;
        let user_agent = self.user_agent.as_str();
        let cached = cell
            .get_or_init(|| async move {
                fetched_flag.store(true, Ordering::SeqCst);
                CachedRobots::new(fetch_robots(client, url, user_agent).await)
            })
            .await;

        (Arc::clone(&cached.data), fetched.load(Ordering::SeqCst))
    }

    /// Checks a URL against its host's robots.txt
    pub async fn is_allowed(&self, url: &Url) -> bool {
        if !self.enabled {
            return true;
        }

        let (data, _) = self.get_or_fetch(url).await;
        data.is_allowed(&path_and_query(url))
    }

    /// Number of hosts whose robots.txt has been fetched
    pub async fn len(&self) -> usize {
        self.entries
            .lock()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn host_key(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host.to_lowercase(), port),
        (Some(host), None) => host.to_lowercase(),
        (None, _) => String::new(),
    }
}

/// Path plus query, the part robots.txt rules match against
pub fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetched_once_per_host() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private/"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let cache = RobotsCache::new(reqwest::Client::new(), "seoscan/1.0", true);
        let page = Url::parse(&format!("{}/page", mock_server.uri())).unwrap();
        let private = Url::parse(&format!("{}/private/x?y=1", mock_server.uri())).unwrap();

        let (_, fetched) = cache.get_or_fetch(&page).await;
        assert!(fetched);
        let (_, fetched) = cache.get_or_fetch(&page).await;
        assert!(!fetched);

        assert!(cache.is_allowed(&page).await);
        assert!(!cache.is_allowed(&private).await);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_slow_host_does_not_block_other_hosts() {
        let slow_server = MockServer::start().await;
        let fast_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("User-agent: *\nAllow: /")
                    .set_delay(std::time::Duration::from_secs(2)),
            )
            .mount(&slow_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
            .mount(&fast_server)
            .await;

        let cache = Arc::new(RobotsCache::new(reqwest::Client::new(), "seoscan/1.0", true));
        let slow_url = Url::parse(&format!("{}/", slow_server.uri())).unwrap();
        let fast_url = Url::parse(&format!("{}/", fast_server.uri())).unwrap();

        let slow_lookup = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get_or_fetch(&slow_url).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let started = std::time::Instant::now();
        let (_, fetched) = cache.get_or_fetch(&fast_url).await;
        assert!(fetched);
        assert!(started.elapsed() < std::time::Duration::from_secs(1));

        let (_, fetched) = slow_lookup.await.unwrap();
        assert!(fetched);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_fetch_once() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("User-agent: *\nDisallow: /private/")
                    .set_delay(std::time::Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let cache = RobotsCache::new(reqwest::Client::new(), "seoscan/1.0", true);
        let a = Url::parse(&format!("{}/a", mock_server.uri())).unwrap();
        let b = Url::parse(&format!("{}/b", mock_server.uri())).unwrap();

        let ((_, first), (_, second)) = tokio::join!(cache.get_or_fetch(&a), cache.get_or_fetch(&b));
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_disabled_cache_allows_everything() {
        let cache = RobotsCache::new(reqwest::Client::new(), "seoscan/1.0", false);
        let url = Url::parse("http://127.0.0.1:1/private").unwrap();
        assert!(cache.is_allowed(&url).await);
        assert!(cache.is_empty().await);
    }

    #[test]
    fn test_path_and_query() {
        let url = Url::parse("https://example.com/a/b?x=1").unwrap();
        assert_eq!(path_and_query(&url), "/a/b?x=1");
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(path_and_query(&url), "/");
    }

    #[test]
    fn test_host_key_includes_port() {
        let a = Url::parse("http://127.0.0.1:8080/").unwrap();
        let b = Url::parse("http://127.0.0.1:9090/").unwrap();
        assert_ne!(host_key(&a), host_key(&b));
    }
}
