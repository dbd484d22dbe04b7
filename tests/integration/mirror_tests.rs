//! End-to-end mirroring tests
//!
//! These tests use wiremock to create mock HTTP servers and run the HTTP
//! page driver and the filesystem store through a full crawl.

use crate::support::collecting_reporter;
use std::sync::{Arc, Mutex};
use sumi_mirror::config::{parse_config, UserAgentConfig};
use sumi_mirror::crawler::{coordinator_from_config, PageProcessor};
use sumi_mirror::driver::{build_http_client, HttpDriver};
use sumi_mirror::output::CrawlEvent;
use sumi_mirror::storage::{page_path, partial_path, DocumentKind, FsContentStore, Manifest};
use sumi_mirror::url::LinkScope;
use sumi_mirror::{Coordinator, CrawlBudget, SessionState};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html")
        .set_body_string(body.to_string())
}

fn http_driver() -> HttpDriver {
    let user_agent = UserAgentConfig {
        crawler_name: "TestMirror".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/about".to_string(),
    };
    HttpDriver::new(build_http_client(&user_agent, 5, None).unwrap())
}

fn test_config_toml(seed: &str, downloads: &str, manifest: &str) -> String {
    format!(
        r#"
[crawler]
seed-url = "{seed}"
max-depth = 2
max-pages = 10
settle-time = 0
capture-interactive = true

[user-agent]
crawler-name = "TestMirror"
crawler-version = "1.0.0"
contact-url = "https://example.com/about"

[output]
downloads-dir = "{downloads}"
manifest-path = "{manifest}"
download-resources = false

[scope]
allow = ["127.0.0.1"]
"#
    )
}

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body>
                <a href="/about">About</a>
                <a href="contact">Contact</a>
                <a href="https://elsewhere.test/">Elsewhere</a>
                <a href="mailto:me@example.com">Mail</a>
            </body></html>"#,
        ))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html(r#"<html><body><a href="/">Home</a></body></html>"#))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/contact"))
        .respond_with(html(
            r#"<html><body><form id="msg"><input name="email"></form></body></html>"#,
        ))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_mirror_small_site() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let downloads = TempDir::new().unwrap();

    let store = Arc::new(FsContentStore::new(downloads.path()));
    let (reporter, observer) = collecting_reporter();
    let seed = Url::parse(&format!("{}/", server.uri())).unwrap();

    let processor = PageProcessor::default()
        .with_scope(LinkScope::new(vec!["127.0.0.1".to_string()], vec![]));
    let report = Coordinator::new(
        seed.clone(),
        CrawlBudget::new(2, 10),
        Box::new(http_driver()),
        store,
        reporter,
    )
    .with_processor(processor)
    .run()
    .await;

    assert_eq!(report.state, SessionState::Completed);
    assert_eq!(report.counters.successful_pages, 3);
    assert_eq!(report.counters.failed_pages, 0);

    for page in ["/", "/about", "/contact"] {
        let url = seed.join(page).unwrap();
        let file = page_path(downloads.path(), &url).unwrap();
        assert!(file.exists(), "{} was not written to {:?}", url, file);
    }

    // Relative references are rewritten to absolute URLs
    let home = std::fs::read_to_string(page_path(downloads.path(), &seed).unwrap()).unwrap();
    assert!(home.contains(&format!(r#"href="{}/about""#, server.uri())));

    let events = observer.events();
    assert!(matches!(events.last(), Some(CrawlEvent::Complete(_))));
}

#[tokio::test]
async fn test_error_page_is_kept_as_partial() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/gone">Gone</a>"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<h1>Server error</h1>"))
        .mount(&server)
        .await;

    let downloads = TempDir::new().unwrap();
    let store = Arc::new(FsContentStore::new(downloads.path()));
    let (reporter, observer) = collecting_reporter();
    let seed = Url::parse(&format!("{}/", server.uri())).unwrap();

    let report = Coordinator::new(
        seed.clone(),
        CrawlBudget::new(1, 10),
        Box::new(http_driver()),
        store,
        reporter,
    )
    .run()
    .await;

    assert_eq!(report.state, SessionState::Completed);
    assert_eq!(report.counters.successful_pages, 1);
    assert_eq!(report.counters.failed_pages, 1);

    let gone = seed.join("/gone").unwrap();
    let partial = std::fs::read_to_string(partial_path(downloads.path(), &gone).unwrap()).unwrap();
    assert_eq!(partial, "<h1>Server error</h1>");

    let errors: Vec<_> = observer
        .events()
        .into_iter()
        .filter_map(|event| match event {
            CrawlEvent::Error(notice) => Some(notice),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("500"));
}

#[tokio::test]
async fn test_crawl_from_config_records_manifest() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let workdir = TempDir::new().unwrap();
    let downloads = workdir.path().join("mirror");
    let manifest_path = workdir.path().join("manifest.db");
    let seed = format!("{}/", server.uri());
    let config = parse_config(&test_config_toml(
        &seed,
        &downloads.to_string_lossy(),
        &manifest_path.to_string_lossy(),
    ))
    .unwrap();

    let mut manifest = Manifest::new(&manifest_path).unwrap();
    let run_id = manifest.create_run("test-hash", &seed).unwrap();
    let manifest = Arc::new(Mutex::new(manifest));

    let store = FsContentStore::new(&config.output.downloads_dir)
        .with_manifest(Arc::clone(&manifest), run_id);
    let (reporter, _observer) = collecting_reporter();

    let coordinator = coordinator_from_config(
        &config,
        Url::parse(&seed).unwrap(),
        CrawlBudget::new(config.crawler.max_depth, config.crawler.max_pages),
        Arc::new(store),
        reporter,
    )
    .unwrap();
    let report = coordinator.run().await;

    assert_eq!(report.state, SessionState::Completed);
    assert_eq!(report.counters.successful_pages, 3);

    let mut manifest = manifest.lock().unwrap();
    manifest
        .finish_run(run_id, report.state, &report.counters)
        .unwrap();

    let run = manifest.get_run(run_id).unwrap();
    assert_eq!(run.status, SessionState::Completed);
    assert_eq!(run.counters, report.counters);
    assert!(run.finished_at.is_some());

    assert_eq!(manifest.count_documents(Some(DocumentKind::Page)).unwrap(), 3);
    // The contact page carries a form, so its interactive elements are dumped
    assert_eq!(
        manifest
            .count_documents(Some(DocumentKind::InteractiveElements))
            .unwrap(),
        1
    );
}
