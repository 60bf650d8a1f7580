use crate::common::{create_test_options, html_page, result_paths};
use seoscan::persistence::{MemoryRecorder, SqliteRecorder};
use seoscan::{crawl_website, CrawlJob, CrawlPhase, Crawler};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_full_crawl_depth_one() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            r#"<h1>Home</h1><a href="/about">About</a><a href="/contact">Contact</a>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html_page("About us", r#"<h1>About</h1><a href="/team">Team</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/contact"))
        .respond_with(html_page("Contact", "<h1>Contact</h1>"))
        .mount(&mock_server)
        .await;

    // Depth 2, never reached
    Mock::given(method("GET"))
        .and(path("/team"))
        .respond_with(html_page("Team", "<h1>Team</h1>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut options = create_test_options();
    options.max_depth = 1;
    options.max_pages = 10;

    let results = crawl_website(&format!("{}/", mock_server.uri()), options, None, None)
        .await
        .unwrap();

    assert_eq!(result_paths(&results), vec!["/", "/about", "/contact"]);
    assert!(results.iter().all(|r| r.depth <= 1));
    assert!(results.iter().all(|r| r.status == 200));

    let home = results.iter().find(|r| r.depth == 0).unwrap();
    assert_eq!(home.title.as_deref(), Some("Home"));
    assert_eq!(home.internal_links.len(), 2);
}

#[tokio::test]
async fn test_variant_links_are_scanned_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            r#"<a href="/about">a</a>
               <a href="/about/">b</a>
               <a href="/about#team">c</a>
               <a href="/about?utm_source=newsletter">d</a>
               <a href="/./about">e</a>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html_page("About", r#"<a href="/">Home</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let results = crawl_website(&format!("{}/", mock_server.uri()), create_test_options(), None, None)
        .await
        .unwrap();

    assert_eq!(result_paths(&results), vec!["/", "/about"]);
}

#[tokio::test]
async fn test_robots_disallowed_paths_are_not_fetched() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private/\n"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            r#"<a href="/public/page">Public</a><a href="/private/page">Private</a>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/public/page"))
        .respond_with(html_page("Public", "<h1>Public</h1>"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/private/page"))
        .respond_with(html_page("Private", "<h1>Private</h1>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let results = crawl_website(&format!("{}/", mock_server.uri()), create_test_options(), None, None)
        .await
        .unwrap();

    assert_eq!(result_paths(&results), vec!["/", "/public/page"]);
}

#[tokio::test]
async fn test_robots_ignored_when_disabled() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", "<h1>Home</h1>"))
        .mount(&mock_server)
        .await;

    let mut options = create_test_options();
    options.respect_robots_txt = false;

    let results = crawl_website(&format!("{}/", mock_server.uri()), options, None, None)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn test_sitemap_urls_are_seeded() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("User-agent: *\nAllow: /\nSitemap: {}/sitemap.xml\n", base)),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(
                    format!(
                        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{base}/orphan</loc></url>
  <url><loc>https://elsewhere.example/page</loc></url>
</urlset>"#,
                        base = base
                    ),
                    "application/xml",
                ),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", "<h1>Home</h1>"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/orphan"))
        .respond_with(html_page("Orphan", "<h1>Not linked anywhere</h1>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut options = create_test_options();
    options.check_sitemaps = true;

    let results = crawl_website(&format!("{}/", base), options, None, None)
        .await
        .unwrap();

    assert_eq!(result_paths(&results), vec!["/", "/orphan"]);
    let orphan = results.iter().find(|r| r.url.ends_with("/orphan")).unwrap();
    assert_eq!(orphan.depth, 1);
}

#[tokio::test]
async fn test_pdf_is_recorded_without_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.4 binary".to_vec()),
        )
        .mount(&mock_server)
        .await;

    let results = crawl_website(
        &format!("{}/report.pdf", mock_server.uri()),
        create_test_options(),
        None,
        None,
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 1);
    let pdf = &results[0];
    assert_eq!(pdf.status, 200);
    assert_eq!(pdf.content_length, 0);
    assert!(pdf.internal_links.is_empty());
    assert!(pdf.external_links.is_empty());
    assert!(pdf.title.is_none());
}

#[tokio::test]
async fn test_excluded_paths_are_skipped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            r#"<a href="/blog/post">Post</a><a href="/admin/login">Admin</a>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/blog/post"))
        .respond_with(html_page("Post", "<h1>Post</h1>"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/login"))
        .respond_with(html_page("Admin", "<h1>Admin</h1>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut options = create_test_options();
    options.exclude_patterns = vec!["/admin".to_string()];

    let results = crawl_website(&format!("{}/", mock_server.uri()), options, None, None)
        .await
        .unwrap();

    assert_eq!(result_paths(&results), vec!["/", "/blog/post"]);
}

#[tokio::test]
async fn test_recorder_sees_lifecycle() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", r#"<a href="/a">A</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_page("Page A", "<h1>A</h1>"))
        .mount(&mock_server)
        .await;

    let recorder = Arc::new(MemoryRecorder::new());
    let job = CrawlJob::new(format!("{}/", mock_server.uri()), create_test_options())
        .with_scan_id("scan-lifecycle");

    let outcome = Crawler::new(job)
        .with_recorder(recorder.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.phase, CrawlPhase::Completed);
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.stats.pages_scanned, 2);

    assert_eq!(recorder.started(), vec!["scan-lifecycle".to_string()]);
    assert_eq!(recorder.results().len(), 2);
    assert_eq!(recorder.finished_status().as_deref(), Some("completed"));
    assert!(recorder.failures().is_empty());

    let last = recorder.progress().last().cloned().unwrap();
    assert_eq!(last.pages_scanned, 2);
}

#[tokio::test]
async fn test_invalid_options_are_reported() {
    let recorder = Arc::new(MemoryRecorder::new());
    let mut options = create_test_options();
    options.concurrent_requests = 0;

    let job = CrawlJob::new("https://example.com/", options).with_scan_id("scan-invalid");
    let result = Crawler::new(job).with_recorder(recorder.clone()).run().await;

    assert!(matches!(result, Err(seoscan::SeoscanError::Config(_))));
    assert_eq!(recorder.failures().len(), 1);
    assert!(recorder.started().is_empty());
}

#[tokio::test]
async fn test_sqlite_recorder_end_to_end() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            r#"<a href="/a">A</a><a href="https://www.rust-lang.org/">Rust</a><img src="/logo.png" alt="Logo">"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_page("Page A", "<h1>A</h1>"))
        .mount(&mock_server)
        .await;

    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("scans.db");
    let recorder = Arc::new(SqliteRecorder::new(&db_path).unwrap());

    let job = CrawlJob::new(format!("{}/", mock_server.uri()), create_test_options())
        .with_scan_id("scan-sqlite")
        .with_project_id("project-1");

    Crawler::new(job)
        .with_recorder(recorder.clone())
        .with_config_hash("abc123")
        .run()
        .await
        .unwrap();

    assert_eq!(recorder.count_pages("scan-sqlite").unwrap(), 2);
    assert!(recorder.count_links("scan-sqlite").unwrap() >= 2);

    let scan = recorder.get_scan("scan-sqlite").unwrap().unwrap();
    assert_eq!(scan.status, "completed");
    assert_eq!(scan.project_id.as_deref(), Some("project-1"));
    assert_eq!(scan.config_hash.as_deref(), Some("abc123"));
    assert_eq!(scan.pages_scanned, 2);
}
