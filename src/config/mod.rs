//! Configuration module for seoscan
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and defines the per-crawl [`CrawlJob`].
//!
//! # Example
//!
//! ```no_run
//! use seoscan::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("seoscan.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawl.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlJob, CrawlOptions, HeadlessConfig, OutputConfig, StateBackend, StateConfig,
    DEFAULT_JS_HEAVY_HOSTS, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, hash_content, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, validate_crawl_options};
