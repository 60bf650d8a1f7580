//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run complete
//! crawls against them end-to-end.

mod common;
mod crawl_tests;
mod escalation_tests;
mod limits_tests;
