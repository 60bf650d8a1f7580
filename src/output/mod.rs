//! Output module for end-of-crawl summaries
//!
//! This module turns the results of a crawl into [`CrawlStatistics`] and
//! prints them for the command line.

pub mod stats;

pub use stats::{print_statistics, CrawlStatistics};
