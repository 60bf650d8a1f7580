use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "seoscan/1.0 (+https://github.com/seoscan/seoscan)";

/// Site builders whose pages are rendered client-side
pub const DEFAULT_JS_HEAVY_HOSTS: &[&str] = &[
    "*.wixsite.com",
    "*.webflow.io",
    "*.squarespace.com",
    "*.framer.website",
    "*.framer.app",
    "*.bubbleapps.io",
];

/// Main configuration structure for seoscan
///
/// Every section is optional in the TOML file; missing sections and keys
/// fall back to their defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub crawl: CrawlOptions,
    pub headless: HeadlessConfig,
    pub state: StateConfig,
    pub output: OutputConfig,
}

/// Options controlling a single crawl
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CrawlOptions {
    /// Maximum link depth from the seed
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Page budget; no more results than this are ever recorded
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Number of crawl workers
    #[serde(rename = "concurrent-requests")]
    pub concurrent_requests: usize,

    /// Overall crawl deadline (milliseconds)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Per-request scanner timeout (milliseconds), below `timeout_ms`
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    /// Regular expressions (or plain substrings) of URLs to skip
    #[serde(rename = "exclude-patterns")]
    pub exclude_patterns: Vec<String>,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Pick a browser user agent per request instead of `user_agent`
    #[serde(rename = "rotate-user-agent")]
    pub rotate_user_agent: bool,

    /// Render every page in the headless browser
    #[serde(rename = "use-headless-browser")]
    pub use_headless_browser: bool,

    /// Re-scan thin static pages in the headless browser
    #[serde(rename = "allow-escalation")]
    pub allow_escalation: bool,

    /// Host patterns ("example.com", "*.example.com") always rendered headless;
    /// defaults to [`DEFAULT_JS_HEAVY_HOSTS`], an empty list turns it off
    #[serde(rename = "js-heavy-hosts")]
    pub js_heavy_hosts: Vec<String>,

    #[serde(rename = "check-sitemaps")]
    pub check_sitemaps: bool,

    #[serde(rename = "respect-robots-txt")]
    pub respect_robots_txt: bool,

    /// Minimum time between two requests to one domain (milliseconds)
    #[serde(rename = "per-domain-delay-ms")]
    pub per_domain_delay_ms: u64,

    /// Minimum time between two progress flushes (milliseconds)
    #[serde(rename = "progress-interval-ms")]
    pub progress_interval_ms: u64,

    /// Attempts after the first one for transient failures
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Pages scanned before the www preference is inferred from links
    #[serde(rename = "www-sample-pages")]
    pub www_sample_pages: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages: 100,
            concurrent_requests: 5,
            timeout_ms: 300_000,
            request_timeout_ms: 30_000,
            exclude_patterns: Vec::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            rotate_user_agent: true,
            use_headless_browser: false,
            allow_escalation: true,
            js_heavy_hosts: DEFAULT_JS_HEAVY_HOSTS.iter().map(|h| h.to_string()).collect(),
            check_sitemaps: true,
            respect_robots_txt: true,
            per_domain_delay_ms: 1000,
            progress_interval_ms: 1500,
            max_retries: 3,
            www_sample_pages: 5,
        }
    }
}

impl CrawlOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn per_domain_delay(&self) -> Duration {
        Duration::from_millis(self.per_domain_delay_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

/// Headless browser configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeadlessConfig {
    /// WebDriver endpoint, e.g. "http://localhost:9515"
    #[serde(rename = "webdriver-url")]
    pub webdriver_url: Option<String>,

    /// Quiet period that counts as network idle (milliseconds)
    #[serde(rename = "network-idle-ms")]
    pub network_idle_ms: u64,

    /// Upper bound on waiting for network idle (milliseconds)
    #[serde(rename = "network-idle-timeout-ms")]
    pub network_idle_timeout_ms: u64,

    /// Extra wait after network idle before extraction (milliseconds)
    #[serde(rename = "settle-delay-ms")]
    pub settle_delay_ms: u64,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            webdriver_url: None,
            network_idle_ms: 500,
            network_idle_timeout_ms: 10_000,
            settle_delay_ms: 1000,
        }
    }
}

/// Crawl state backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    #[default]
    Local,
    Redis,
}

/// Crawl state configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StateConfig {
    pub backend: StateBackend,

    #[serde(rename = "redis-url")]
    pub redis_url: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database file; results are not persisted when unset
    #[serde(rename = "database-path")]
    pub database_path: Option<String>,
}

/// One crawl request
#[derive(Debug, Clone)]
pub struct CrawlJob {
    pub scan_id: String,
    pub project_id: Option<String>,
    pub seed_url: String,
    pub options: CrawlOptions,
}

impl CrawlJob {
    /// Creates a job with a fresh random scan id
    pub fn new(seed_url: impl Into<String>, options: CrawlOptions) -> Self {
        Self {
            scan_id: uuid::Uuid::new_v4().to_string(),
            project_id: None,
            seed_url: seed_url.into(),
            options,
        }
    }

    pub fn with_scan_id(mut self, scan_id: impl Into<String>) -> Self {
        self.scan_id = scan_id.into();
        self
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }
}
