//! Integration tests for the crawl driver
//!
//! These tests run whole checks against a wiremock site and verify what gets
//! fetched, reported and stored.

use std::sync::{Arc, Mutex};
use sumi_check::check::CheckContext;
use sumi_check::config::{Config, LinkPatternConfig};
use sumi_check::crawler::{run_check, Checker};
use sumi_check::output::{CrawlSummary, OutputResult, Reporter};
use sumi_check::storage::{MemoryCache, ResultCache, RunLog, RunStatus, SqliteStorage};
use sumi_check::CompactSnapshot;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Keeps every reported snapshot
#[derive(Clone, Default)]
struct CollectingReporter {
    snapshots: Arc<Mutex<Vec<CompactSnapshot>>>,
}

impl Reporter for CollectingReporter {
    fn log_url(&mut self, snapshot: &CompactSnapshot) -> OutputResult<()> {
        self.snapshots.lock().unwrap().push(snapshot.clone());
        Ok(())
    }

    fn finish(&mut self, _summary: &CrawlSummary) -> OutputResult<()> {
        Ok(())
    }
}

/// Mounts a small site; every page expects to be fetched exactly once
async fn mount_site(server: &MockServer) {
    let home = "<html><head><title>Home</title></head><body>\n\
        <a href=\"/a.html\">A</a>\n\
        <a href=\"/a.html#top\">A top</a>\n\
        <a href=\"/missing.html\">Missing</a>\n\
        <a href=\"http://ads.test/banner\">Ad</a>\n\
        </body></html>";
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(home, "text/html"))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a.html"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<p>leaf <a href=\"/\">home</a></p>", "text/html"),
        )
        .expect(1)
        .mount(server)
        .await;
}

fn create_test_config() -> Config {
    let mut config = Config::default();
    config.checking.threads = 4;
    config.externlinks = vec![LinkPatternConfig {
        pattern: r"^http://ads\.".to_string(),
        negate: false,
        strict: true,
    }];
    config
}

fn find<'a>(snapshots: &'a [CompactSnapshot], url: &str) -> Vec<&'a CompactSnapshot> {
    snapshots.iter().filter(|s| s.url() == Some(url)).collect()
}

#[tokio::test]
async fn test_full_check_of_site() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let base = server.uri();

    let reporter = CollectingReporter::default();
    let ctx = Arc::new(CheckContext::new(create_test_config()).unwrap());
    let mut checker = Checker::new(
        ctx,
        &[format!("{}/", base)],
        Box::new(MemoryCache::new()),
        vec![Box::new(reporter.clone())],
    );
    checker.run().await.unwrap();
    let summary = checker.finish(RunStatus::Completed).unwrap();

    let snapshots = reporter.snapshots.lock().unwrap().clone();
    // seed, a.html twice, missing, ad, and home again from a.html
    assert_eq!(snapshots.len(), 6);
    assert_eq!(summary.total_urls, 6);
    assert_eq!(summary.invalid_urls, 1);

    let home = find(&snapshots, &format!("{}/", base));
    assert_eq!(home.len(), 2);
    assert_eq!(home[0].title(), "Home");
    assert_eq!(home[0].level(), 0);
    assert_eq!(home[1].level(), 2);
    assert_eq!(home[1].parent_url(), Some(format!("{}/a.html", base).as_str()));

    let missing = find(&snapshots, &format!("{}/missing.html", base));
    assert_eq!(missing.len(), 1);
    assert!(!missing[0].is_valid());
    assert_eq!(missing[0].result(), "404 Not Found");

    let ad = find(&snapshots, "http://ads.test/banner");
    assert_eq!(ad.len(), 1);
    assert!(ad[0].is_valid());
    assert!(ad[0].is_extern());
    assert_eq!(ad[0].result(), "filtered");
}

#[tokio::test]
async fn test_recursion_level_limits_crawl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<a href=\"/deep.html\">deep</a>", "text/html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/deep.html"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>deep</p>", "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.checking.recursion_level = 0;
    let reporter = CollectingReporter::default();
    let ctx = Arc::new(CheckContext::new(config).unwrap());
    let mut checker = Checker::new(
        ctx,
        &[format!("{}/", server.uri())],
        Box::new(MemoryCache::new()),
        vec![Box::new(reporter.clone())],
    );
    checker.run().await.unwrap();

    assert_eq!(reporter.snapshots.lock().unwrap().len(), 1);
    assert_eq!(checker.summary().valid_urls, 1);
}

#[tokio::test]
async fn test_run_check_writes_reports() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("linkcheck.db");
    let summary_path = dir.path().join("linkcheck.md");
    let mut config = create_test_config();
    config.output.cache_path = Some(db_path.to_string_lossy().to_string());
    config.output.summary_path = Some(summary_path.to_string_lossy().to_string());

    let seeds = vec![format!("{}/", server.uri())];
    let summary = run_check(config, "abc123", &seeds, true, std::future::pending())
        .await
        .unwrap();
    assert!(summary.has_errors());
    assert_eq!(summary.config_hash, "abc123");
    assert_eq!(summary.status, "completed");

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_invalid().unwrap(), 1);
    assert!(storage.len().unwrap() >= 3);
    let run = storage.get_run(1).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "abc123");

    let report = std::fs::read_to_string(&summary_path).unwrap();
    assert!(report.contains("## Invalid Links"));
    assert!(report.contains("404 Not Found"));
}
