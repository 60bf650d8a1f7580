//! seoscan: an SEO crawl engine
//!
//! This crate crawls a website in priority order, respecting robots.txt,
//! sitemaps and per-domain politeness, and extracts SEO signals from every
//! page with a static HTTP scanner that escalates to a headless browser when
//! a page looks client-side rendered.

pub mod config;
pub mod crawler;
pub mod output;
pub mod persistence;
pub mod queue;
pub mod robots;
pub mod scanner;
pub mod sitemap;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for seoscan operations
#[derive(Debug, Error)]
pub enum SeoscanError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid seed URL {url}: {reason}")]
    InvalidSeed { url: String, reason: String },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("State error: {0}")]
    State(#[from] state::StateError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] persistence::PersistenceError),

    #[error("Browser error: {0}")]
    Browser(#[from] scanner::BrowserError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for seoscan operations
pub type Result<T> = std::result::Result<T, SeoscanError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, CrawlJob, CrawlOptions};
pub use crawler::{crawl_website, CrawlOutcome, CrawlPhase, Crawler};
pub use scanner::{ScanMethod, ScanResult, Scanner};
pub use url::{normalize_url, UrlProcessor, WwwPreference};
