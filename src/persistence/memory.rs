use crate::config::CrawlJob;
use crate::persistence::{PersistenceResult, ScanRecorder};
use crate::scanner::ScanResult;
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One progress flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressRecord {
    pub pages_scanned: usize,
    pub links_scanned: usize,
}

#[derive(Debug, Default)]
struct MemoryLog {
    started: Vec<String>,
    results: Vec<ScanResult>,
    progress: Vec<ProgressRecord>,
    failures: Vec<String>,
    finished: Option<String>,
}

/// Recorder that keeps everything in memory
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    log: Mutex<MemoryLog>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn results(&self) -> Vec<ScanResult> {
        self.lock().results.clone()
    }

    pub fn progress(&self) -> Vec<ProgressRecord> {
        self.lock().progress.clone()
    }

    pub fn failures(&self) -> Vec<String> {
        self.lock().failures.clone()
    }

    /// Scan ids seen by `record_scan_started`
    pub fn started(&self) -> Vec<String> {
        self.lock().started.clone()
    }

    /// Final status, once the scan has finished
    pub fn finished_status(&self) -> Option<String> {
        self.lock().finished.clone()
    }
}

#[async_trait]
impl ScanRecorder for MemoryRecorder {
    async fn record_scan_result(&self, _scan_id: &str, result: &ScanResult) -> PersistenceResult<()> {
        self.lock().results.push(result.clone());
        Ok(())
    }

    async fn record_progress(
        &self,
        _scan_id: &str,
        pages_scanned: usize,
        links_scanned: usize,
    ) -> PersistenceResult<()> {
        self.lock().progress.push(ProgressRecord {
            pages_scanned,
            links_scanned,
        });
        Ok(())
    }

    async fn record_scan_failed(&self, _scan_id: &str, reason: &str) -> PersistenceResult<()> {
        self.lock().failures.push(reason.to_string());
        Ok(())
    }

    async fn record_scan_started(&self, job: &CrawlJob, _config_hash: Option<&str>) -> PersistenceResult<()> {
        self.lock().started.push(job.scan_id.clone());
        Ok(())
    }

    async fn record_scan_finished(&self, _scan_id: &str, status: &str) -> PersistenceResult<()> {
        self.lock().finished = Some(status.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ScanMethod;
    use url::Url;

    #[tokio::test]
    async fn test_memory_recorder_keeps_everything() {
        let recorder = MemoryRecorder::new();
        let url = Url::parse("https://example.com/").unwrap();

        recorder
            .record_scan_result("s1", &ScanResult::new(&url, 0, ScanMethod::Http))
            .await
            .unwrap();
        recorder.record_progress("s1", 1, 12).await.unwrap();
        recorder.record_scan_failed("s1", "boom").await.unwrap();
        recorder.record_scan_finished("s1", "completed").await.unwrap();

        assert_eq!(recorder.results().len(), 1);
        assert_eq!(
            recorder.progress(),
            vec![ProgressRecord {
                pages_scanned: 1,
                links_scanned: 12
            }]
        );
        assert_eq!(recorder.failures(), vec!["boom".to_string()]);
        assert_eq!(recorder.finished_status().as_deref(), Some("completed"));
    }
}
