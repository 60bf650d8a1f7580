//! SQLite schema for recorded scans

/// SQL schema for the results database
pub const SCHEMA_SQL: &str = r#"
-- One row per crawl
CREATE TABLE IF NOT EXISTS scans (
    scan_id TEXT PRIMARY KEY,
    project_id TEXT,
    seed_url TEXT,
    config_hash TEXT,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    pages_scanned INTEGER NOT NULL DEFAULT 0,
    links_scanned INTEGER NOT NULL DEFAULT 0,
    failure_reason TEXT
);

-- One row per scanned URL
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scan_id TEXT NOT NULL REFERENCES scans(scan_id),
    url TEXT NOT NULL,
    final_url TEXT NOT NULL,
    status_code INTEGER NOT NULL,
    content_type TEXT,
    title TEXT,
    meta_description TEXT,
    canonical_url TEXT,
    noindex INTEGER NOT NULL DEFAULT 0,
    nofollow INTEGER NOT NULL DEFAULT 0,
    content_length INTEGER NOT NULL DEFAULT 0,
    word_count INTEGER NOT NULL DEFAULT 0,
    js_count INTEGER NOT NULL DEFAULT 0,
    css_count INTEGER NOT NULL DEFAULT 0,
    load_time_ms INTEGER NOT NULL DEFAULT 0,
    first_byte_ms INTEGER NOT NULL DEFAULT 0,
    depth INTEGER NOT NULL,
    scan_method TEXT NOT NULL,
    headings TEXT NOT NULL,
    structured_data TEXT NOT NULL,
    schema_types TEXT NOT NULL,
    keywords TEXT NOT NULL,
    errors TEXT NOT NULL,
    warnings TEXT NOT NULL,
    scanned_at TEXT NOT NULL,
    UNIQUE(scan_id, url)
);

CREATE INDEX IF NOT EXISTS idx_pages_scan ON pages(scan_id);
CREATE INDEX IF NOT EXISTS idx_pages_status ON pages(status_code);

-- Outgoing links per page
CREATE TABLE IF NOT EXISTS links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    anchor_text TEXT NOT NULL,
    rel TEXT NOT NULL,
    is_internal INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_links_page ON links(page_id);
CREATE INDEX IF NOT EXISTS idx_links_url ON links(url);

-- Images per page
CREATE TABLE IF NOT EXISTS images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
    src TEXT NOT NULL,
    alt TEXT
);

CREATE INDEX IF NOT EXISTS idx_images_page ON images(page_id);
"#;

/// Creates all tables and indexes if they do not exist yet
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
