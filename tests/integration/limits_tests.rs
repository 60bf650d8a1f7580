use crate::common::{create_test_headless_config, create_test_options, html_page, result_paths, FakeBrowser};
use seoscan::persistence::MemoryRecorder;
use seoscan::{crawl_website, CrawlJob, CrawlPhase, Crawler};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn links_to(count: usize, prefix: &str) -> String {
    (0..count)
        .map(|i| format!(r#"<a href="{}{}">Page {}</a>"#, prefix, i, i))
        .collect()
}

#[tokio::test]
async fn test_page_budget_is_exact() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", &links_to(10, "/p")))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/p\d+$"))
        .respond_with(html_page("Page", "<h1>Page</h1>"))
        .mount(&mock_server)
        .await;

    let mut options = create_test_options();
    options.max_pages = 4;
    options.concurrent_requests = 3;

    let results = crawl_website(&format!("{}/", mock_server.uri()), options, None, None)
        .await
        .unwrap();

    assert_eq!(results.len(), 4);
    assert!(result_paths(&results).contains(&"/".to_string()));
}

#[tokio::test]
async fn test_deadline_stops_crawl() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", &links_to(20, "/slow")))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/slow\d+$"))
        .respond_with(html_page("Slow", "<h1>Slow</h1>").set_delay(Duration::from_millis(700)))
        .mount(&mock_server)
        .await;

    let mut options = create_test_options();
    options.timeout_ms = 1_500;
    options.request_timeout_ms = 1_000;
    options.concurrent_requests = 1;

    let recorder = Arc::new(MemoryRecorder::new());
    let job = CrawlJob::new(format!("{}/", mock_server.uri()), options);

    let started = Instant::now();
    let outcome = Crawler::new(job)
        .with_recorder(recorder.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.phase, CrawlPhase::TimedOut);
    assert!(outcome.timed_out());
    assert!(!outcome.results.is_empty());
    assert!(outcome.results.len() < 21);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(recorder.finished_status().as_deref(), Some("timed_out"));
}

#[tokio::test]
async fn test_deadline_bounds_headless_scans() {
    let mock_server = MockServer::start().await;

    let mut options = create_test_options();
    options.use_headless_browser = true;
    options.concurrent_requests = 8;
    options.timeout_ms = 1_500;
    options.request_timeout_ms = 1_000;

    // Every rendered page links to 20 more; the shared session is the bottleneck
    let rendered = format!(
        "<html><head><title>App</title></head><body>{}</body></html>",
        links_to(20, "/r")
    );
    let browser = FakeBrowser::slow(&rendered, Duration::from_millis(900));
    let job = CrawlJob::new(format!("{}/", mock_server.uri()), options);

    let started = Instant::now();
    let outcome = Crawler::new(job)
        .with_headless_config(create_test_headless_config())
        .with_browser(Box::new(browser))
        .run()
        .await
        .unwrap();
    let elapsed = started.elapsed();

    // Deadline (1.5 s) plus one render budget (1.2 s), with slack
    assert!(elapsed < Duration::from_millis(3_500), "crawl took {:?}", elapsed);
    assert_eq!(outcome.phase, CrawlPhase::TimedOut);
    assert!(!outcome.results.is_empty());
}

#[tokio::test]
async fn test_transient_failure_retry_cap() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&mock_server)
        .await;

    let results = crawl_website(
        &format!("{}/flaky", mock_server.uri()),
        create_test_options(),
        None,
        None,
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, 503);
    assert!(results[0].errors.iter().any(|e| e == "HTTP 503"));
}

#[tokio::test]
async fn test_transient_failure_then_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", "<h1>Home</h1>"))
        .mount(&mock_server)
        .await;

    let results = crawl_website(&format!("{}/", mock_server.uri()), create_test_options(), None, None)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, 200);
    assert_eq!(results[0].title.as_deref(), Some("Home"));
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", r#"<a href="/gone">Gone</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let results = crawl_website(&format!("{}/", mock_server.uri()), create_test_options(), None, None)
        .await
        .unwrap();

    let gone = results.iter().find(|r| r.url.ends_with("/gone")).unwrap();
    assert_eq!(gone.status, 404);
    assert!(gone.errors.iter().any(|e| e == "HTTP 404"));
}
