use crate::common::{create_test_headless_config, create_test_options, html_page, FakeBrowser};
use seoscan::{CrawlJob, Crawler, ScanMethod};
use std::sync::atomic::Ordering;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RENDERED_HOME: &str = r#"<!DOCTYPE html><html><head><title>Rendered Home</title>
<meta name="description" content="Rendered by the client"></head>
<body><h1>Welcome</h1><h2>Products</h2><a href="/products">Products</a><a href="/pricing">Pricing</a></body></html>"#;

async fn mount_app_shell(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("A", r#"<div id="root"></div><script src="/app.js"></script>"#))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_app_shell_is_escalated() {
    let mock_server = MockServer::start().await;
    mount_app_shell(&mock_server).await;

    let mut options = create_test_options();
    options.allow_escalation = true;
    options.max_depth = 0;

    let browser = FakeBrowser::new(RENDERED_HOME);
    let navigations = browser.navigations();

    let job = CrawlJob::new(format!("{}/", mock_server.uri()), options);
    let outcome = Crawler::new(job)
        .with_headless_config(create_test_headless_config())
        .with_browser(Box::new(browser))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    let page = &outcome.results[0];
    assert_eq!(page.scan_method, ScanMethod::Headless);
    assert_eq!(page.status, 200);
    assert_eq!(page.title.as_deref(), Some("Rendered Home"));
    assert_eq!(page.headings.h1, vec!["Welcome"]);
    assert_eq!(page.internal_links.len(), 2);
    assert_eq!(navigations.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.stats.headless_scans, 1);
}

#[tokio::test]
async fn test_failed_escalation_keeps_static_result() {
    let mock_server = MockServer::start().await;
    mount_app_shell(&mock_server).await;

    let mut options = create_test_options();
    options.allow_escalation = true;
    options.max_depth = 0;

    let job = CrawlJob::new(format!("{}/", mock_server.uri()), options);
    let outcome = Crawler::new(job)
        .with_headless_config(create_test_headless_config())
        .with_browser(Box::new(FakeBrowser::failing()))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    let page = &outcome.results[0];
    assert_eq!(page.scan_method, ScanMethod::Http);
    assert_eq!(page.status, 200);
    assert_eq!(page.title.as_deref(), Some("A"));
    assert!(page
        .warnings
        .iter()
        .any(|w| w.starts_with("Headless verification failed")));
}

#[tokio::test]
async fn test_no_escalation_without_browser() {
    let mock_server = MockServer::start().await;
    mount_app_shell(&mock_server).await;

    let mut options = create_test_options();
    options.allow_escalation = true;
    options.max_depth = 0;

    let job = CrawlJob::new(format!("{}/", mock_server.uri()), options);
    let outcome = Crawler::new(job).run().await.unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].scan_method, ScanMethod::Http);
}

#[tokio::test]
async fn test_pdf_is_never_escalated() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/brochure.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.7".to_vec()),
        )
        .mount(&mock_server)
        .await;

    let mut options = create_test_options();
    options.allow_escalation = true;

    let browser = FakeBrowser::new(RENDERED_HOME);
    let navigations = browser.navigations();

    let job = CrawlJob::new(format!("{}/brochure.pdf", mock_server.uri()), options);
    let outcome = Crawler::new(job)
        .with_headless_config(create_test_headless_config())
        .with_browser(Box::new(browser))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].content_length, 0);
    assert_eq!(outcome.results[0].scan_method, ScanMethod::Http);
    assert_eq!(navigations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_js_heavy_host_goes_straight_to_browser() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Static", "<h1>Static</h1>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut options = create_test_options();
    options.js_heavy_hosts = vec!["127.0.0.1".to_string()];
    options.max_depth = 0;

    let job = CrawlJob::new(format!("{}/", mock_server.uri()), options);
    let outcome = Crawler::new(job)
        .with_headless_config(create_test_headless_config())
        .with_browser(Box::new(FakeBrowser::new(RENDERED_HOME)))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].scan_method, ScanMethod::Headless);
    assert_eq!(outcome.results[0].title.as_deref(), Some("Rendered Home"));
}
