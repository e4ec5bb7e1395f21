//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use site_harvest::config::Config;
use site_harvest::output::{build_bundle, DATA_FILE, LINKS_FILE};
use site_harvest::storage::{SqliteStorage, Storage};
use site_harvest::{crawl, CrawlError, Crawler};
use std::io::{Cursor, Read};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with no delay and short timeouts
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.crawler.request_delay_ms = 0;
    config.fetch.page_timeout_ms = 2_000;
    config.fetch.image_timeout_ms = 300;
    config.fetch.identity_seed = Some(7);
    config
}

async fn mount_page(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html)
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(server)
        .await;
}

fn url_of(server: &MockServer, route: &str) -> String {
    format!("{}{}", server.uri(), route)
}

#[tokio::test]
async fn test_single_page_without_links() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><head><title>Only</title><meta name="description" content="Lonely page"></head>
        <body><h1>Hello</h1><p>Just one page.</p><a href="mailto:me@example.com">Mail</a></body></html>"#,
    )
    .await;

    let results = crawl(&server.uri(), &create_test_config(), |_, _| {})
        .await
        .expect("crawl should succeed");

    assert_eq!(results.page_count(), 1);
    let page = &results.pages[&url_of(&server, "/")];
    assert_eq!(page.title, "Only");
    assert_eq!(page.meta_description, "Lonely page");
    assert_eq!(page.paragraphs, vec!["Just one page."]);
    assert!(page.links.is_empty());
    assert!(!results.cancelled);
    assert_eq!(
        results.base_domain,
        format!("127.0.0.1:{}", server.address().port())
    );
}

#[tokio::test]
async fn test_other_domain_never_fetched() {
    let server = MockServer::start().await;
    let other = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>elsewhere</p>"))
        .expect(0)
        .mount(&other)
        .await;

    // "localhost" is a different host than "127.0.0.1"
    let other_url = format!("http://localhost:{}/c", other.address().port());
    mount_page(
        &server,
        "/",
        &format!(
            r#"<body><a href="/b">Same site</a><a href="{}">Other site</a></body>"#,
            other_url
        ),
    )
    .await;
    mount_page(&server, "/b", "<body><p>B</p></body>").await;

    let results = crawl(&server.uri(), &create_test_config(), |_, _| {})
        .await
        .unwrap();

    let urls: Vec<_> = results.pages.keys().cloned().collect();
    assert_eq!(urls, vec![url_of(&server, "/"), url_of(&server, "/b")]);
    assert!(!results.fetch_order.contains(&other_url));
}

#[tokio::test]
async fn test_other_port_on_same_host_never_fetched() {
    let server = MockServer::start().await;
    let other = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>other port</p>"))
        .expect(0)
        .mount(&other)
        .await;

    // Both servers listen on 127.0.0.1
    let other_url = format!("{}/x", other.uri());
    mount_page(
        &server,
        "/",
        &format!(r#"<body><a href="{}">Other port</a></body>"#, other_url),
    )
    .await;

    let results = crawl(&server.uri(), &create_test_config(), |_, _| {})
        .await
        .unwrap();

    assert_eq!(results.fetch_order, vec![url_of(&server, "/")]);
    assert!(!results.pages.contains_key(&other_url));
    assert_eq!(results.pages[&url_of(&server, "/")].links.len(), 1);
}

#[tokio::test]
async fn test_not_found_is_recorded_and_crawl_continues() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<body><a href="/missing">Missing</a><a href="/present">Present</a></body>"#,
    )
    .await;
    mount_page(&server, "/present", "<body><p>Here</p></body>").await;
    // /missing falls through to wiremock's default 404

    let results = crawl(&server.uri(), &create_test_config(), |_, _| {})
        .await
        .unwrap();

    let missing = url_of(&server, "/missing");
    assert!(results.fetch_order.contains(&missing));
    assert!(!results.pages.contains_key(&missing));
    assert!(results.pages.contains_key(&url_of(&server, "/present")));
    assert_eq!(results.failures.len(), 1);
    assert_eq!(results.failures[0].url, missing);
    assert!(results.failures[0].error.contains("404"));
}

#[tokio::test]
async fn test_image_timeout_omits_only_that_image() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<body><h2>Gallery</h2><p>Pictures below.</p>
        <img src="/slow.png" alt="slow"><img src="/fast.jpg" alt="fast"></body>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/slow.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![1u8; 8])
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fast.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![2u8; 4]))
        .mount(&server)
        .await;

    let results = crawl(&server.uri(), &create_test_config(), |_, _| {})
        .await
        .unwrap();

    let page = &results.pages[&url_of(&server, "/")];
    assert_eq!(page.images.len(), 1);
    assert_eq!(page.images[0].alt, "fast");
    assert_eq!(page.images[0].data, vec![2u8; 4]);
    assert_eq!(page.headings.len(), 1);
    assert_eq!(page.paragraphs, vec!["Pictures below."]);
}

#[tokio::test]
async fn test_duplicate_links_fetched_once() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r##"<body><a href="/dup">First</a><a href="/dup#section">Second</a><a href="dup">Third</a></body>"##,
    )
    .await;
    // Links back to the seed must not cause a refetch either
    mount_page(&server, "/dup", r#"<body><a href="/">Home</a></body>"#).await;

    let results = crawl(&server.uri(), &create_test_config(), |_, _| {})
        .await
        .unwrap();

    assert_eq!(results.fetch_order.len(), 2);
    assert_eq!(results.pages[&url_of(&server, "/")].links.len(), 3);
}

#[tokio::test]
async fn test_breadth_first_order() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="/a">A</a><a href="/b">B</a>"#).await;
    mount_page(&server, "/a", r#"<a href="/a/deep">Deep A</a>"#).await;
    mount_page(&server, "/b", r#"<a href="/b/deep">Deep B</a><a href="/a">A</a>"#).await;
    mount_page(&server, "/a/deep", "<p>leaf</p>").await;
    mount_page(&server, "/b/deep", "<p>leaf</p>").await;

    let results = crawl(&server.uri(), &create_test_config(), |_, _| {})
        .await
        .unwrap();

    let expected: Vec<String> = ["/", "/a", "/b", "/a/deep", "/b/deep"]
        .iter()
        .map(|route| url_of(&server, route))
        .collect();
    assert_eq!(results.fetch_order, expected);
}

#[tokio::test]
async fn test_progress_reported_for_every_url() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="/ok">Ok</a><a href="/gone">Gone</a>"#).await;
    mount_page(&server, "/ok", "<p>fine</p>").await;

    let mut reports = Vec::new();
    let results = crawl(&server.uri(), &create_test_config(), |processed, url| {
        reports.push((processed, url.to_string()))
    })
    .await
    .unwrap();

    assert_eq!(
        reports,
        vec![
            (1, url_of(&server, "/")),
            (2, url_of(&server, "/ok")),
            (3, url_of(&server, "/gone")),
        ]
    );
    assert_eq!(results.page_count(), 2);
}

#[tokio::test]
async fn test_max_pages_stops_after_seed() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="/next">Next</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>next</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.crawler.max_pages = Some(1);

    let results = crawl(&server.uri(), &config, |_, _| {}).await.unwrap();

    assert_eq!(results.fetch_order, vec![url_of(&server, "/")]);
    assert!(results.cancelled);
}

#[tokio::test]
async fn test_page_limit_reached_with_only_visited_duplicates_left() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="/a">A1</a><a href="/a">A2</a>"#).await;
    mount_page(&server, "/a", "<p>a</p>").await;

    let mut config = create_test_config();
    config.crawler.max_pages = Some(2);

    let results = crawl(&server.uri(), &config, |_, _| {}).await.unwrap();

    assert_eq!(results.fetch_order, vec![url_of(&server, "/"), url_of(&server, "/a")]);
    assert!(!results.cancelled);
}

#[tokio::test]
async fn test_cancel_from_progress_callback() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="/a">A</a><a href="/b">B</a>"#).await;
    mount_page(&server, "/a", "<p>a</p>").await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>b</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let mut crawler = Crawler::new(&create_test_config()).unwrap();
    let cancel = crawler.cancel_flag();

    let results = crawler
        .crawl(&server.uri(), |processed, _| {
            if processed == 2 {
                cancel.cancel();
            }
        })
        .await
        .unwrap();

    assert!(results.cancelled);
    assert_eq!(results.fetch_order.len(), 2);
}

#[tokio::test]
async fn test_unreachable_seed_yields_empty_results() {
    // Nothing listens on the discard port
    let results = crawl("http://127.0.0.1:9/", &create_test_config(), |_, _| {})
        .await
        .unwrap();

    assert!(results.pages.is_empty());
    assert_eq!(results.failures.len(), 1);
    assert!(!results.cancelled);
}

#[tokio::test]
async fn test_invalid_seed_is_rejected() {
    let result = crawl("example.com/no-scheme", &create_test_config(), |_, _| {}).await;
    assert!(matches!(result, Err(CrawlError::InvalidSeedUrl(_))));
}

#[tokio::test]
async fn test_crawl_export_and_storage_end_to_end() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><head><title>Home</title></head><body>
        <h1>Welcome</h1><p>Intro text.</p>
        <a href="/about">About us</a><img src="/logo.png" alt="Logo"></body></html>"#,
    )
    .await;
    mount_page(&server, "/about", "<title>About</title><p>Team.</p>").await;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x89PNG".to_vec()))
        .mount(&server)
        .await;

    let results = crawl(&server.uri(), &create_test_config(), |_, _| {})
        .await
        .unwrap();
    assert_eq!(results.page_count(), 2);
    assert_eq!(results.image_count(), 1);

    // Bundle
    let bytes = build_bundle(&results).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["images/127.0.0.1_0_0.png", LINKS_FILE, DATA_FILE]);

    let mut json = String::new();
    archive
        .by_name(DATA_FILE)
        .unwrap()
        .read_to_string(&mut json)
        .unwrap();
    let data: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(data[url_of(&server, "/")]["title"], "Home");
    assert_eq!(data[url_of(&server, "/about")]["paragraphs"][0], "Team.");

    // Storage
    let dir = tempfile::tempdir().unwrap();
    let mut storage = SqliteStorage::new(&dir.path().join("crawl.db")).unwrap();
    let run_id = storage.create_run(&results.seed_url, "test-hash").unwrap();
    storage.save_results(run_id, &results).unwrap();

    let loaded = storage.load_results(run_id).unwrap();
    assert_eq!(loaded.pages, results.pages);
    assert_eq!(loaded.fetch_order, results.fetch_order);
}
