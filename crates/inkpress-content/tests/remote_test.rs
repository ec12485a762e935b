//! Remote content host behaviour against a mock server

use inkpress_content::prelude::*;
use inkpress_content::RemoteSource;
use inkpress_core::{ManualClock, MemoryStore, RemoteConfig, SessionCache};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn remote_config(server: &MockServer, categories: &[&str]) -> RemoteConfig {
    RemoteConfig {
        api_base: format!("{}/contents", server.uri()),
        raw_base: Some(format!("{}/raw", server.uri())),
        manifest_url: None,
        categories: categories.iter().map(|c| c.to_string()).collect(),
    }
}

async fn mount_listing(server: &MockServer, category: &str, files: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/contents/{}", category)))
        .respond_with(ResponseTemplate::new(200).set_body_json(files))
        .mount(server)
        .await;
}

async fn mount_raw(server: &MockServer, file_path: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/raw/{}", file_path)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Host with a `rust` category holding two posts and a non-post file
async fn setup_host() -> MockServer {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "rust",
        json!([
            {"name": "ownership.md", "path": "rust/ownership.md", "type": "file", "download_url": null},
            {"name": "async.md", "path": "rust/async.md", "type": "file",
             "download_url": format!("{}/dl/async.md", server.uri())},
            {"name": "cover.png", "path": "rust/cover.png", "type": "file", "download_url": null},
            {"name": "drafts", "path": "rust/drafts", "type": "dir", "download_url": null}
        ]),
    )
    .await;
    mount_raw(
        &server,
        "rust/ownership.md",
        "---\ntitle: Ownership\ndate: 2024-02-01\ntags: [memory]\n---\n# Ownership",
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/dl/async.md"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("---\ntitle: Async\ndate: 2024-03-01\n---\n# Async"),
        )
        .mount(&server)
        .await;
    server
}

fn local_fallback() -> Arc<dyn ContentSource> {
    Arc::new(LocalSource::bundled(vec![BundledPost::new(
        "notes",
        "offline",
        "---\ntitle: Offline copy\n---\nLocal",
    )]))
}

#[tokio::test]
async fn test_remote_listing_filters_and_fetches() {
    let server = setup_host().await;
    let source = RemoteSource::new(remote_config(&server, &["rust"])).expect("client");

    let posts = source.load_all().await.expect("load");
    let mut titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
    titles.sort();
    assert_eq!(titles, vec!["Async", "Ownership"]);
    assert!(posts.iter().all(|p| p.category == "rust"));
}

#[tokio::test]
async fn test_one_failing_category_does_not_abort_siblings() {
    let server = setup_host().await;
    Mock::given(method("GET"))
        .and(path("/contents/web"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let source = RemoteSource::new(remote_config(&server, &["web", "rust"])).expect("client");
    assert_eq!(source.load_all().await.expect("partial load").len(), 2);
}

#[tokio::test]
async fn test_all_categories_failing_is_network_error() {
    let server = MockServer::start().await;
    let source = RemoteSource::new(remote_config(&server, &["a", "b"])).expect("client");
    let err = source.load_all().await.unwrap_err();
    assert!(matches!(err, Error::Network { .. }));
}

#[tokio::test]
async fn test_manifest_replaces_configured_categories() {
    let server = setup_host().await;
    Mock::given(method("GET"))
        .and(path("/manifest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"categories": ["rust"]})))
        .mount(&server)
        .await;

    let mut config = remote_config(&server, &["missing"]);
    config.manifest_url = Some(format!("{}/manifest.json", server.uri()));
    let source = RemoteSource::new(config).expect("client");

    assert_eq!(source.categories().await.expect("categories"), vec!["rust"]);
    assert_eq!(source.load_all().await.expect("load").len(), 2);
}

#[tokio::test]
async fn test_load_one() {
    let server = setup_host().await;
    let source = RemoteSource::new(remote_config(&server, &["rust"])).expect("client");

    let post = source.load_one("rust", "ownership").await.expect("post");
    assert_eq!(post.tags, vec!["memory"]);
    assert!(source.load_one("rust", "cover").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_repository_caches_remote_listing() {
    let server = setup_host().await;
    let source: Arc<dyn ContentSource> =
        Arc::new(RemoteSource::new(remote_config(&server, &["rust"])).expect("client"));
    let clock = Arc::new(ManualClock::new(0));
    let cache = SessionCache::new(
        Arc::new(MemoryStore::new()),
        clock.clone(),
        "inkpress:posts",
        Duration::from_secs(300),
    );
    let repo = PostRepository::remote(source, local_fallback(), Some(cache));

    let posts = repo.list_posts().await.expect("list");
    assert_eq!(posts[0].title, "Async");
    assert_eq!(repo.served_from(), Some(ServedFrom::Remote));

    server.reset().await;
    clock.advance(Duration::from_secs(10));
    assert_eq!(repo.list_posts().await.expect("cached").len(), 2);
    assert_eq!(repo.served_from(), Some(ServedFrom::Cache));
    assert_eq!(
        repo.get_post_by_slug("ownership").await.expect("from cache").title,
        "Ownership"
    );

    // Expired with the host gone: fall back to local content
    clock.advance(Duration::from_secs(300));
    let posts = repo.list_posts().await.expect("fallback");
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].slug, "offline");
    assert_eq!(repo.served_from(), Some(ServedFrom::Local));
}

#[tokio::test]
async fn test_repository_from_config_local_directory() {
    let temp = TempDir::new().expect("temp dir");
    let dir = temp.path().join("guides");
    std::fs::create_dir_all(&dir).expect("mkdir");
    std::fs::write(
        dir.join("setup.md"),
        "---\ntitle: Setup guide\nsummary: Installing the toolchain\n---\nSteps",
    )
    .expect("write");

    let config = SiteConfig::builder(temp.path()).build().expect("config");
    let repo = PostRepository::from_config(&config).expect("repo");
    let posts = repo.list_posts().await.expect("list");

    let mut index = SearchIndex::new(config.search.threshold);
    index.sync(&posts);
    let hits = index.search(&SearchQuery::new("toolchian"));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].post.slug, "setup");
}
