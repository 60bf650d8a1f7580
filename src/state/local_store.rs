use crate::scanner::ScanResult;
use crate::state::store::{StateResult, StateStore};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct LocalState {
    visited: HashSet<String>,
    processing: HashSet<String>,
    results: Vec<ScanResult>,
}

/// In-process crawl state
#[derive(Debug, Default)]
pub struct LocalStateStore {
    inner: Mutex<LocalState>,
}

impl LocalStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LocalState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StateStore for LocalStateStore {
    async fn try_mark_visited(&self, url: &str) -> StateResult<bool> {
        Ok(self.lock().visited.insert(url.to_string()))
    }

    async fn is_visited(&self, url: &str) -> StateResult<bool> {
        Ok(self.lock().visited.contains(url))
    }

    async fn release_visited(&self, url: &str) -> StateResult<()> {
        self.lock().visited.remove(url);
        Ok(())
    }

    async fn visited_count(&self) -> StateResult<usize> {
        Ok(self.lock().visited.len())
    }

    async fn add_processing(&self, url: &str) -> StateResult<()> {
        self.lock().processing.insert(url.to_string());
        Ok(())
    }

    async fn remove_processing(&self, url: &str) -> StateResult<()> {
        self.lock().processing.remove(url);
        Ok(())
    }

    async fn processing_count(&self) -> StateResult<usize> {
        Ok(self.lock().processing.len())
    }

    async fn push_result(&self, result: &ScanResult) -> StateResult<()> {
        self.lock().results.push(result.clone());
        Ok(())
    }

    async fn result_count(&self) -> StateResult<usize> {
        Ok(self.lock().results.len())
    }

    async fn results(&self) -> StateResult<Vec<ScanResult>> {
        Ok(self.lock().results.clone())
    }
}
