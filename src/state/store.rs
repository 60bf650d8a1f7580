//! Crawl state storage interface

use crate::scanner::ScanResult;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from a crawl state backend
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for state operations
pub type StateResult<T> = Result<T, StateError>;

/// Backend holding the visited set, the in-flight set and the result list of
/// one crawl
///
/// `try_mark_visited` must be an atomic insert-if-absent: when several
/// workers race on the same URL exactly one of them gets `true`.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Inserts `url` into the visited set; true only for the caller that
    /// inserted it
    async fn try_mark_visited(&self, url: &str) -> StateResult<bool>;

    async fn is_visited(&self, url: &str) -> StateResult<bool>;

    /// Removes `url` from the visited set so it can be claimed again
    async fn release_visited(&self, url: &str) -> StateResult<()>;

    async fn visited_count(&self) -> StateResult<usize>;

    async fn add_processing(&self, url: &str) -> StateResult<()>;

    async fn remove_processing(&self, url: &str) -> StateResult<()>;

    async fn processing_count(&self) -> StateResult<usize>;

    /// Appends a finished scan result
    async fn push_result(&self, result: &ScanResult) -> StateResult<()>;

    async fn result_count(&self) -> StateResult<usize>;

    /// All results in the order they were pushed
    async fn results(&self) -> StateResult<Vec<ScanResult>>;
}
