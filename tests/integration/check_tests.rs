//! Single-URL checks against mock servers and local files

use std::sync::Arc;
use sumi_check::check::{CheckContext, Discovery, UrlRecord, WarningTag};
use sumi_check::config::Config;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOME_PAGE: &str = "<html><head><title>Home</title></head>\n\
<body>\n\
<a href=\"/a.html\">A</a>\n\
<img src=\"logo.png\" alt=\"Logo\">\n\
</body></html>";

fn create_test_context(config: Config) -> Arc<CheckContext> {
    Arc::new(CheckContext::new(config).expect("Failed to build check context"))
}

async fn check_url(ctx: &Arc<CheckContext>, url: &str) -> (UrlRecord, Vec<Discovery>) {
    let mut record = UrlRecord::new(Arc::clone(ctx), Discovery::seed(url));
    let children = record.check().await.expect("Check failed");
    (record, children)
}

async fn mount_html(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_page_links_are_discovered() {
    let server = MockServer::start().await;
    mount_html(&server, "/", HOME_PAGE).await;

    let ctx = create_test_context(Config::default());
    let seed = format!("{}/", server.uri());
    let (record, children) = check_url(&ctx, &seed).await;

    assert!(record.is_valid());
    assert_eq!(record.diagnostics().result(), "200 OK");
    assert_eq!(record.title(), "Home");
    assert_eq!(record.content_type(), "text/html");
    assert_eq!(record.size(), HOME_PAGE.len() as i64);

    assert_eq!(children.len(), 2);
    assert_eq!(children[0].reference, "/a.html");
    assert_eq!(children[0].name, "A");
    assert_eq!(children[0].line, Some(3));
    assert_eq!(children[0].level, 1);
    assert_eq!(children[0].parent_url.as_deref(), Some(seed.as_str()));
    assert_eq!(children[0].encoding.as_deref(), Some("UTF-8"));
    assert_eq!(children[1].reference, "logo.png");
    assert_eq!(children[1].name, "Logo");
}

#[tokio::test]
async fn test_not_found_is_invalid() {
    let server = MockServer::start().await;

    let ctx = create_test_context(Config::default());
    let (record, children) = check_url(&ctx, &format!("{}/missing.html", server.uri())).await;

    assert!(!record.is_valid());
    assert_eq!(record.diagnostics().result(), "404 Not Found");
    assert!(record.is_cacheable());
    assert!(children.is_empty());
}

#[tokio::test]
async fn test_declared_size_over_download_limit() {
    let server = MockServer::start().await;
    let body = format!("<a href=\"x.html\">x</a>{}", " ".repeat(5000));
    mount_html(&server, "/big.html", &body).await;

    let mut config = Config::default();
    config.checking.max_file_size_download = 1000;
    config.checking.max_file_size_parse = 1000;
    let ctx = create_test_context(config);
    let (record, children) = check_url(&ctx, &format!("{}/big.html", server.uri())).await;

    assert!(record.is_valid());
    assert_eq!(record.size(), body.len() as i64);
    assert!(record
        .diagnostics()
        .has_warning(WarningTag::UrlContentTooLarge));
    assert!(children.is_empty());
    assert_eq!(ctx.downloaded_bytes(), 0);
}

#[tokio::test]
async fn test_robots_disallow_stops_recursion() {
    let server = MockServer::start().await;
    mount_html(&server, "/", HOME_PAGE).await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .mount(&server)
        .await;

    let ctx = create_test_context(Config::default());
    let (record, children) = check_url(&ctx, &format!("{}/", server.uri())).await;

    assert!(record.is_valid());
    assert!(children.is_empty());
}

#[tokio::test]
async fn test_anchor_check() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/doc.html",
        "<html><body><h1 id=\"intro\">Intro</h1><a name=\"usage\"></a></body></html>",
    )
    .await;

    let mut config = Config::default();
    config.checking.enabled_plugins = vec!["AnchorCheck".to_string()];
    let ctx = create_test_context(config);

    let missing = format!("{}/doc.html#missing", server.uri());
    let (record, _) = check_url(&ctx, &missing).await;
    assert!(record.is_valid());
    assert_eq!(record.cache_key(), missing);
    let warning = record
        .diagnostics()
        .warnings()
        .iter()
        .find(|w| w.tag == WarningTag::UrlAnchorNotFound)
        .expect("anchor warning");
    assert_eq!(
        warning.message,
        "Anchor `missing' not found. Available anchors: `intro, usage'."
    );

    let (record, _) = check_url(&ctx, &format!("{}/doc.html#intro", server.uri())).await;
    assert!(!record
        .diagnostics()
        .has_warning(WarningTag::UrlAnchorNotFound));
}

#[tokio::test]
async fn test_local_file_tree() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("index.html"),
        "<html><body><a href=\"other.html\">other</a> <a href=\"gone.html\">gone</a></body></html>",
    )
    .unwrap();
    std::fs::write(dir.path().join("other.html"), "<p>other</p>").unwrap();

    let ctx = create_test_context(Config::default());
    let seed = url::Url::from_file_path(dir.path().join("index.html")).unwrap();
    let (record, children) = check_url(&ctx, seed.as_str()).await;

    assert!(record.is_valid());
    assert_eq!(record.diagnostics().result(), "Valid");
    assert_eq!(children.len(), 2);

    let mut other = UrlRecord::new(Arc::clone(&ctx), children[0].clone());
    other.check().await.unwrap();
    assert!(other.is_valid());
    assert!(!other.scope().is_extern);

    let mut gone = UrlRecord::new(Arc::clone(&ctx), children[1].clone());
    gone.check().await.unwrap();
    assert!(!gone.is_valid());
}
