//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use sitegraph::config::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use sitegraph::crawler::{
    run_crawl, Coordinator, CrawlObserver, CrawlOutcome, FetchEvent, FetchOutcome,
};
use sitegraph::graph::CrawlGraph;
use sitegraph::output::write_outputs;
use sitegraph::state::{CrawlPhase, PageState};
use sitegraph::url::CanonicalUrl;
use sitegraph::{GraphError, SitegraphError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fast test configuration: no pacing, no backoff
fn create_test_config(max_workers: usize, max_retries: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_workers,
            rate_limit: 0.0,
            max_retries,
            request_timeout: 5,
            backoff_base: 0.0,
            crawl_timeout: 0,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: Some("https://example.com/contact".to_string()),
        },
        output: OutputConfig::default(),
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><head><title>Test</title></head><body>{}</body></html>", body),
        "text/html",
    )
}

async fn mount_page(server: &MockServer, page: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(body))
        .expect(1)
        .mount(server)
        .await;
}

fn url(s: &str) -> CanonicalUrl {
    s.parse().unwrap()
}

fn status_of(graph: &CrawlGraph, target: &str) -> PageState {
    graph.node(&url(target)).unwrap().status
}

/// Records every fetch attempt
#[derive(Default)]
struct CollectingObserver {
    attempts: Mutex<Vec<FetchEvent>>,
    queued: Mutex<Vec<CanonicalUrl>>,
}

impl CrawlObserver for CollectingObserver {
    fn on_url_queued(&self, url: &CanonicalUrl) {
        self.queued.lock().unwrap().push(url.clone());
    }

    fn on_fetch_attempt(&self, event: &FetchEvent) {
        self.attempts.lock().unwrap().push(event.clone());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_crawl_records_internal_and_external_edges() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<a href="/a">A</a> <a href="https://other.com/x">Elsewhere</a>"#,
    )
    .await;
    mount_page(&server, "/a", r#"<a href="/">Home</a>"#).await;

    let report = run_crawl(&create_test_config(3, 0), &base).await.unwrap();
    let graph = &report.graph;

    let root = format!("{}/", base);
    let a = format!("{}/a", base);

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 3);
    assert!(graph.has_edge(&url(&root), &url(&a)));
    assert!(graph.has_edge(&url(&root), &url("https://other.com/x")));
    assert!(graph.has_edge(&url(&a), &url(&root)));

    // The external target is recorded, never fetched
    let external = graph.node(&url("https://other.com/x")).unwrap();
    assert_eq!(external.status, PageState::Discovered);
    assert_eq!(external.out_degree, 0);
    assert_eq!(external.in_degree, 1);

    assert_eq!(status_of(graph, &root), PageState::Fetched);
    assert_eq!(status_of(graph, &a), PageState::Fetched);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.pages_failed, 0);
    assert!(graph.degrees_consistent());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_densely_linked_site_fetches_each_page_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    let pages = ["/", "/p1", "/p2", "/p3", "/p4", "/p5"];
    let links: String = pages
        .iter()
        .map(|p| format!(r#"<a href="{p}">{p}</a> <a href="{p}#top">top</a>"#))
        .chain(std::iter::once(r#"<a href="/p1/">p1 again</a>"#.to_string()))
        .collect();

    // `expect(1)` on each page makes the server fail the test on a refetch
    for page in pages {
        mount_page(&server, page, &links).await;
    }

    let report = run_crawl(&create_test_config(8, 0), &base).await.unwrap();
    let graph = &report.graph;

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(graph.node_count(), pages.len());
    // Every page links to every page, itself included, once
    assert_eq!(graph.edge_count(), pages.len() * pages.len());
    for node in graph.nodes() {
        assert_eq!(node.out_degree, pages.len());
        assert_eq!(node.in_degree, pages.len());
        assert_eq!(node.status, PageState::Fetched);
    }
    assert!(graph.degrees_consistent());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_server_errors_exhaust_retries() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", r#"<a href="/broken">Broken</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let observer = Arc::new(CollectingObserver::default());
    let coordinator =
        Coordinator::with_observer(&create_test_config(2, 2), &base, observer.clone()).unwrap();
    let report = coordinator.run().await.unwrap();

    let broken = format!("{}/broken", base);
    let node = report.graph.node(&url(&broken)).unwrap();
    assert_eq!(node.status, PageState::Unreachable);
    assert_eq!(node.out_degree, 0);
    assert_eq!(node.in_degree, 1);
    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(report.pages_failed, 1);

    let attempts = observer.attempts.lock().unwrap();
    let broken_attempts: Vec<&FetchEvent> = attempts
        .iter()
        .filter(|e| e.url.as_str() == broken)
        .collect();
    assert_eq!(broken_attempts.len(), 3);
    assert_eq!(
        broken_attempts.iter().map(|e| e.attempt_count).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(broken_attempts[..2].iter().all(|e| e.will_retry));
    let last = broken_attempts[2];
    assert_eq!(last.outcome, FetchOutcome::Unreachable);
    assert!(!last.will_retry);
    assert_eq!(last.status_code, Some(500));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_transient_failure_then_success() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", r#"<a href="/flaky">Flaky</a>"#).await;
    // Mounted first, so it answers until its single use is spent
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/flaky", "recovered").await;

    let observer = Arc::new(CollectingObserver::default());
    let coordinator =
        Coordinator::with_observer(&create_test_config(2, 3), &base, observer.clone()).unwrap();
    let report = coordinator.run().await.unwrap();

    let flaky = format!("{}/flaky", base);
    assert_eq!(status_of(&report.graph, &flaky), PageState::Fetched);

    let attempts = observer.attempts.lock().unwrap();
    let last = attempts
        .iter()
        .filter(|e| e.url.as_str() == flaky)
        .last()
        .unwrap();
    assert_eq!(last.outcome, FetchOutcome::Success);
    assert_eq!(last.attempt_count, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_client_errors_and_non_html_are_rejected() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<a href="/missing">Missing</a> <a href="/report.pdf">PDF</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.4", "application/pdf"))
        .expect(1)
        .mount(&server)
        .await;

    // Retries are allowed but rejections must not use them
    let report = run_crawl(&create_test_config(2, 3), &base).await.unwrap();

    assert_eq!(
        status_of(&report.graph, &format!("{}/missing", base)),
        PageState::Rejected
    );
    assert_eq!(
        status_of(&report.graph, &format!("{}/report.pdf", base)),
        PageState::Rejected
    );
    assert_eq!(report.pages_failed, 2);
    assert_eq!(report.graph.edge_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_links_resolve_against_final_url() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/docs/"))
        .mount(&server)
        .await;
    mount_page(&server, "/docs/", r#"<a href="intro">Intro</a>"#).await;
    mount_page(&server, "/docs/intro", r#"<a href="./">Up</a>"#).await;

    let report = run_crawl(&create_test_config(2, 0), &base).await.unwrap();
    let graph = &report.graph;

    let root = format!("{}/", base);
    let docs = format!("{}/docs", base);
    let intro = format!("{}/docs/intro", base);

    // The seed's links come from the redirected page
    assert!(graph.has_edge(&url(&root), &url(&intro)));
    assert!(graph.has_edge(&url(&intro), &url(&docs)));
    assert_eq!(status_of(graph, &intro), PageState::Fetched);
    assert!(graph.degrees_consistent());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_redirect_hops_are_paced() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/step"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/step"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/home"))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/home", "").await;

    let mut config = create_test_config(1, 0);
    config.crawler.rate_limit = 0.5;

    let started = Instant::now();
    let report = run_crawl(&config, &base).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.pages_fetched, 1);
    assert_eq!(status_of(&report.graph, &format!("{}/", base)), PageState::Fetched);
    assert!(
        elapsed >= Duration::from_secs(1),
        "three paced requests finished in {:?}",
        elapsed
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_redirect_loop_is_rejected() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/"))
        .mount(&server)
        .await;

    let observer = Arc::new(CollectingObserver::default());
    let coordinator =
        Coordinator::with_observer(&create_test_config(1, 2), &base, observer.clone()).unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(status_of(&report.graph, &format!("{}/", base)), PageState::Rejected);
    assert_eq!(report.pages_failed, 1);

    // A loop is not transient, so the retry budget is not spent on it
    let attempts = observer.attempts.lock().unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].outcome, FetchOutcome::Rejected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pacing_is_crawl_wide() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<a href="/p1"></a><a href="/p2"></a><a href="/p3"></a><a href="/p4"></a>"#,
    )
    .await;
    for page in ["/p1", "/p2", "/p3", "/p4"] {
        mount_page(&server, page, "").await;
    }

    let mut config = create_test_config(2, 0);
    config.crawler.rate_limit = 0.5;

    let started = Instant::now();
    let report = run_crawl(&config, &base).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.pages_fetched, 5);
    assert!(
        elapsed >= Duration::from_secs(2),
        "five paced fetches finished in {:?}",
        elapsed
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancellation_leaves_consistent_partial_graph() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", r#"<a href="/slow">Slow</a> <a href="/a">A</a>"#).await;
    mount_page(&server, "/a", "").await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("late").set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(&create_test_config(2, 0), &base).unwrap();
    let cancel = coordinator.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    let report = coordinator.run().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(report.outcome, CrawlOutcome::Cancelled);
    assert!(!report.is_complete());
    assert_eq!(coordinator.phase(), CrawlPhase::Terminated);

    let graph = &report.graph;
    assert_eq!(status_of(graph, &format!("{}/", base)), PageState::Fetched);
    assert_eq!(status_of(graph, &format!("{}/a", base)), PageState::Fetched);
    // The interrupted fetch left no trace beyond its incoming edge
    let slow = graph.node(&url(&format!("{}/slow", base))).unwrap();
    assert_eq!(slow.status, PageState::Discovered);
    assert_eq!(slow.out_degree, 0);
    assert!(graph.degrees_consistent());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_crawl_timeout_cancels() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("slow").set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let mut config = create_test_config(1, 0);
    config.crawler.crawl_timeout = 1;

    let started = Instant::now();
    let report = run_crawl(&config, &base).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(report.outcome, CrawlOutcome::Cancelled);
    assert_eq!(report.graph.node_count(), 1);
    assert_eq!(report.pages_fetched, 0);
}

#[tokio::test]
async fn test_invalid_seed_fails_immediately() {
    let config = create_test_config(1, 0);

    for seed in ["ftp://example.com/", "javascript:void(0)", "#top", "   "] {
        let result = run_crawl(&config, seed).await;
        assert!(
            matches!(result, Err(SitegraphError::InvalidSeed { .. })),
            "seed {:?} should be rejected",
            seed
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_snapshot_only_after_termination() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/", "").await;

    let observer = Arc::new(CollectingObserver::default());
    let coordinator =
        Coordinator::with_observer(&create_test_config(1, 0), &base, observer.clone()).unwrap();

    assert_eq!(coordinator.snapshot().unwrap_err(), GraphError::NotTerminated);

    let report = coordinator.run().await.unwrap();
    let snapshot = coordinator.snapshot().unwrap();

    assert_eq!(snapshot.node_count(), report.graph.node_count());
    assert_eq!(observer.queued.lock().unwrap().len(), 1);
    assert!(coordinator.run().await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_outputs_written_for_finished_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", r#"<a href="/a">A</a>"#).await;
    mount_page(&server, "/a", "").await;

    let dir = tempfile::TempDir::new().unwrap();
    let mut config = create_test_config(2, 0);
    config.output.directory = dir.path().to_string_lossy().into_owned();
    config.output.database = true;

    let report = run_crawl(&config, &base).await.unwrap();
    let written = write_outputs(&report, &config.output, Some("cafebabe")).unwrap();

    assert_eq!(written.len(), 4);
    let stats_path = written
        .iter()
        .find(|p| p.to_string_lossy().ends_with("_stats.json"))
        .unwrap();
    assert!(stats_path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("127_0_0_1"));

    let stats: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(stats_path).unwrap()).unwrap();
    assert_eq!(stats["nodes"], 2);
    assert_eq!(stats["edges"], 1);
    assert_eq!(stats["outcome"], "completed");
    assert_eq!(stats["config_hash"], "cafebabe");
}
