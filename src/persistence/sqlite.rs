//! SQLite recorder
//!
//! Pages go into `pages`, their outgoing links and images into `links` and
//! `images`. List-valued fields (headings, structured data, keywords, errors,
//! warnings) are stored as JSON text.
//!
//! Writes run on tokio's blocking pool so disk I/O never stalls the crawl
//! workers.

use crate::config::CrawlJob;
use crate::persistence::schema::initialize_schema;
use crate::persistence::{PersistenceResult, ScanRecorder};
use crate::scanner::{Link, ScanResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Row of the `scans` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRecord {
    pub scan_id: String,
    pub project_id: Option<String>,
    pub seed_url: Option<String>,
    pub config_hash: Option<String>,
    pub status: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub pages_scanned: i64,
    pub links_scanned: i64,
    pub failure_reason: Option<String>,
}

/// Recorder writing to a SQLite database
pub struct SqliteRecorder {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecorder {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> PersistenceResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        initialize_schema(&conn)?;

        tracing::debug!("Opened results database at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> PersistenceResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `write` against the connection on the blocking pool
    async fn write<F>(&self, write: F) -> PersistenceResult<()>
    where
        F: FnOnce(&mut Connection) -> PersistenceResult<()> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            write(&mut conn)
        })
        .await?
    }

    /// Loads the row of one scan
    pub fn get_scan(&self, scan_id: &str) -> PersistenceResult<Option<ScanRecord>> {
        let conn = self.lock();
        let record = conn
            .query_row(
                "SELECT scan_id, project_id, seed_url, config_hash, status, started_at,
                        finished_at, pages_scanned, links_scanned, failure_reason
                 FROM scans WHERE scan_id = ?1",
                params![scan_id],
                |row| {
                    Ok(ScanRecord {
                        scan_id: row.get(0)?,
                        project_id: row.get(1)?,
                        seed_url: row.get(2)?,
                        config_hash: row.get(3)?,
                        status: row.get(4)?,
                        started_at: row.get(5)?,
                        finished_at: row.get(6)?,
                        pages_scanned: row.get(7)?,
                        links_scanned: row.get(8)?,
                        failure_reason: row.get(9)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    pub fn count_pages(&self, scan_id: &str) -> PersistenceResult<u64> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE scan_id = ?1",
            params![scan_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    pub fn count_links(&self, scan_id: &str) -> PersistenceResult<u64> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM links l JOIN pages p ON p.id = l.page_id WHERE p.scan_id = ?1",
            params![scan_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Titles of the recorded pages, keyed by URL
    pub fn page_titles(&self, scan_id: &str) -> PersistenceResult<Vec<(String, Option<String>)>> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare("SELECT url, title FROM pages WHERE scan_id = ?1 ORDER BY id")?;
        let rows = stmt
            .query_map(params![scan_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Makes sure a `scans` row exists so pages can reference it
fn ensure_scan_row(tx: &Transaction<'_>, scan_id: &str) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT OR IGNORE INTO scans (scan_id, status, started_at) VALUES (?1, 'running', ?2)",
        params![scan_id, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn insert_links(
    tx: &Transaction<'_>,
    page_id: i64,
    links: &[Link],
    is_internal: bool,
) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO links (page_id, url, anchor_text, rel, is_internal) VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for link in links {
        stmt.execute(params![
            page_id,
            link.url,
            link.anchor_text,
            link.rel_attributes.join(" "),
            is_internal
        ])?;
    }
    Ok(())
}

/// Replaces the page row of `result` together with its links and images
fn insert_page(conn: &mut Connection, scan_id: &str, result: &ScanResult) -> PersistenceResult<()> {
    let headings = serde_json::to_string(&result.headings)?;
    let structured_data = serde_json::to_string(&result.structured_data)?;
    let schema_types = serde_json::to_string(&result.schema_types)?;
    let keywords = serde_json::to_string(&result.keywords)?;
    let errors = serde_json::to_string(&result.errors)?;
    let warnings = serde_json::to_string(&result.warnings)?;

    let tx = conn.transaction()?;
    ensure_scan_row(&tx, scan_id)?;

    // A re-recorded URL replaces its earlier row, links and images
    tx.execute(
        "DELETE FROM pages WHERE scan_id = ?1 AND url = ?2",
        params![scan_id, result.url],
    )?;

    tx.execute(
        "INSERT INTO pages (
            scan_id, url, final_url, status_code, content_type, title, meta_description,
            canonical_url, noindex, nofollow, content_length, word_count, js_count, css_count,
            load_time_ms, first_byte_ms, depth, scan_method, headings, structured_data,
            schema_types, keywords, errors, warnings, scanned_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                   ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25)",
        params![
            scan_id,
            result.url,
            result.final_url,
            result.status,
            result.content_type,
            result.title,
            result.meta_description,
            result.canonical_url,
            result.noindex,
            result.nofollow,
            result.content_length as i64,
            result.word_count as i64,
            result.js_count as i64,
            result.css_count as i64,
            result.load_time_ms as i64,
            result.first_byte_ms as i64,
            result.depth,
            result.scan_method.as_str(),
            headings,
            structured_data,
            schema_types,
            keywords,
            errors,
            warnings,
            result.scanned_at.to_rfc3339(),
        ],
    )?;
    let page_id = tx.last_insert_rowid();

    insert_links(&tx, page_id, &result.internal_links, true)?;
    insert_links(&tx, page_id, &result.external_links, false)?;

    {
        let mut stmt =
            tx.prepare_cached("INSERT INTO images (page_id, src, alt) VALUES (?1, ?2, ?3)")?;
        for image in &result.images {
            stmt.execute(params![page_id, image.src, image.alt])?;
        }
    }

    tx.commit()?;
    Ok(())
}

#[async_trait]
impl ScanRecorder for SqliteRecorder {
    async fn record_scan_result(&self, scan_id: &str, result: &ScanResult) -> PersistenceResult<()> {
        let scan_id = scan_id.to_string();
        let result = result.clone();
        self.write(move |conn| insert_page(conn, &scan_id, &result)).await
    }

    async fn record_progress(
        &self,
        scan_id: &str,
        pages_scanned: usize,
        links_scanned: usize,
    ) -> PersistenceResult<()> {
        let scan_id = scan_id.to_string();
        self.write(move |conn| {
            conn.execute(
                "INSERT INTO scans (scan_id, status, started_at, pages_scanned, links_scanned)
                 VALUES (?1, 'running', ?2, ?3, ?4)
                 ON CONFLICT(scan_id) DO UPDATE SET
                    pages_scanned = excluded.pages_scanned,
                    links_scanned = excluded.links_scanned",
                params![
                    scan_id,
                    Utc::now().to_rfc3339(),
                    pages_scanned as i64,
                    links_scanned as i64
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn record_scan_failed(&self, scan_id: &str, reason: &str) -> PersistenceResult<()> {
        let scan_id = scan_id.to_string();
        let reason = reason.to_string();
        self.write(move |conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO scans (scan_id, status, started_at, finished_at, failure_reason)
                 VALUES (?1, 'failed', ?2, ?2, ?3)
                 ON CONFLICT(scan_id) DO UPDATE SET
                    status = 'failed',
                    finished_at = excluded.finished_at,
                    failure_reason = excluded.failure_reason",
                params![scan_id, now, reason],
            )?;
            Ok(())
        })
        .await
    }

    async fn record_scan_started(&self, job: &CrawlJob, config_hash: Option<&str>) -> PersistenceResult<()> {
        let job = job.clone();
        let config_hash = config_hash.map(str::to_string);
        self.write(move |conn| {
            conn.execute(
                "INSERT INTO scans (scan_id, project_id, seed_url, config_hash, status, started_at)
                 VALUES (?1, ?2, ?3, ?4, 'running', ?5)
                 ON CONFLICT(scan_id) DO UPDATE SET
                    project_id = excluded.project_id,
                    seed_url = excluded.seed_url,
                    config_hash = excluded.config_hash,
                    status = 'running'",
                params![
                    job.scan_id,
                    job.project_id,
                    job.seed_url,
                    config_hash,
                    Utc::now().to_rfc3339()
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn record_scan_finished(&self, scan_id: &str, status: &str) -> PersistenceResult<()> {
        let scan_id = scan_id.to_string();
        let status = status.to_string();
        self.write(move |conn| {
            conn.execute(
                "UPDATE scans SET status = ?1, finished_at = ?2 WHERE scan_id = ?3",
                params![status, Utc::now().to_rfc3339(), scan_id],
            )?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlOptions;
    use crate::scanner::{Image, ScanMethod};
    use tempfile::TempDir;
    use url::Url;

    fn create_test_result(path: &str) -> ScanResult {
        let url = Url::parse(&format!("https://example.com{}", path)).unwrap();
        let mut result = ScanResult::new(&url, 1, ScanMethod::Http);
        result.status = 200;
        result.title = Some(format!("Page {}", path));
        result.headings.h1.push("Heading".to_string());
        result.internal_links.push(Link {
            url: "https://example.com/other".to_string(),
            anchor_text: "Other".to_string(),
            rel_attributes: vec![],
        });
        result.external_links.push(Link {
            url: "https://rust-lang.org".to_string(),
            anchor_text: "Rust".to_string(),
            rel_attributes: vec!["nofollow".to_string(), "noopener".to_string()],
        });
        result.images.push(Image {
            src: "https://example.com/logo.png".to_string(),
            alt: None,
        });
        result
    }

    #[test]
    fn test_create_in_memory() {
        assert!(SqliteRecorder::new_in_memory().is_ok());
    }

    #[test]
    fn test_create_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.db");
        assert!(SqliteRecorder::new(&path).is_ok());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_record_scan_result() {
        let recorder = SqliteRecorder::new_in_memory().unwrap();
        recorder
            .record_scan_result("scan-1", &create_test_result("/a"))
            .await
            .unwrap();

        assert_eq!(recorder.count_pages("scan-1").unwrap(), 1);
        assert_eq!(recorder.count_links("scan-1").unwrap(), 2);
        let scan = recorder.get_scan("scan-1").unwrap().unwrap();
        assert_eq!(scan.status, "running");
    }

    #[tokio::test]
    async fn test_re_recording_replaces_page() {
        let recorder = SqliteRecorder::new_in_memory().unwrap();
        let mut result = create_test_result("/a");
        recorder.record_scan_result("scan-1", &result).await.unwrap();

        result.title = Some("Updated".to_string());
        result.external_links.clear();
        recorder.record_scan_result("scan-1", &result).await.unwrap();

        assert_eq!(recorder.count_pages("scan-1").unwrap(), 1);
        assert_eq!(recorder.count_links("scan-1").unwrap(), 1);
        assert_eq!(
            recorder.page_titles("scan-1").unwrap(),
            vec![("https://example.com/a".to_string(), Some("Updated".to_string()))]
        );
    }

    #[tokio::test]
    async fn test_scan_lifecycle() {
        let recorder = SqliteRecorder::new_in_memory().unwrap();
        let job = CrawlJob::new("https://example.com", CrawlOptions::default())
            .with_scan_id("scan-2")
            .with_project_id("project-9");

        recorder.record_scan_started(&job, Some("abc123")).await.unwrap();
        recorder.record_progress("scan-2", 4, 40).await.unwrap();
        recorder.record_scan_finished("scan-2", "completed").await.unwrap();

        let scan = recorder.get_scan("scan-2").unwrap().unwrap();
        assert_eq!(scan.project_id.as_deref(), Some("project-9"));
        assert_eq!(scan.config_hash.as_deref(), Some("abc123"));
        assert_eq!(scan.pages_scanned, 4);
        assert_eq!(scan.links_scanned, 40);
        assert_eq!(scan.status, "completed");
        assert!(scan.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_record_scan_failed() {
        let recorder = SqliteRecorder::new_in_memory().unwrap();
        recorder
            .record_scan_failed("scan-3", "Invalid seed URL")
            .await
            .unwrap();

        let scan = recorder.get_scan("scan-3").unwrap().unwrap();
        assert_eq!(scan.status, "failed");
        assert_eq!(scan.failure_reason.as_deref(), Some("Invalid seed URL"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_writes_leave_runtime_responsive() {
        let recorder = Arc::new(SqliteRecorder::new_in_memory().unwrap());

        // Hold the connection so the next write has to wait for it
        let guard = recorder.lock();
        let write = {
            let recorder = Arc::clone(&recorder);
            tokio::spawn(async move {
                recorder
                    .record_scan_result("scan-4", &create_test_result("/slow"))
                    .await
            })
        };

        // The single runtime thread is still free while the write is blocked
        let ticked = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            tokio::time::sleep(std::time::Duration::from_millis(50)),
        )
        .await;
        assert!(ticked.is_ok());

        drop(guard);
        write.await.unwrap().unwrap();
        assert_eq!(recorder.count_pages("scan-4").unwrap(), 1);
    }

    #[test]
    fn test_unknown_scan() {
        let recorder = SqliteRecorder::new_in_memory().unwrap();
        assert!(recorder.get_scan("missing").unwrap().is_none());
    }
}
