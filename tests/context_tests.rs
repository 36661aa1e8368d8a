// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! End-to-end tests for the web-context engine
//!
//! A minimal canned-response TCP server stands in for the network so the
//! full prompt → contexts pipeline runs without external connectivity.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use web_context::{
    ContextError, DomainRateLimiter, FileCache, WebContextConfig, WebContextService, WebFetcher,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Canned HTTP server: answers every request with the same status and body
struct TestServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
}

impl TestServer {
    async fn spawn(status: u16, body: String) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_counter = Arc::clone(&hits);

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                hits_counter.fetch_add(1, Ordering::SeqCst);
                let body = body.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 2048];
                    let _ = stream.read(&mut buf).await;
                    let reason = if status == 200 { "OK" } else { "Error" };
                    let response = format!(
                        "HTTP/1.1 {} {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        reason,
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            hits,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

fn write_sets_file(dir: &TempDir, json: &str) -> std::path::PathBuf {
    let path = dir.path().join("context_sets.json");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(json.as_bytes()).unwrap();
    path
}

fn test_config(dir: &TempDir, sets_file: std::path::PathBuf) -> WebContextConfig {
    WebContextConfig {
        cache_dir: dir.path().join("cache"),
        sets_file,
        rate_limit_backoff_secs: 0,
        ..WebContextConfig::default()
    }
}

#[tokio::test]
async fn test_prompt_resolves_and_fetches_referenced_sets() {
    init_tracing();
    let alpha = TestServer::spawn(
        200,
        "<html><body><p>Alpha page content</p></body></html>".to_string(),
    )
    .await;
    let beta = TestServer::spawn(
        200,
        "<html><body><p>Beta page content</p></body></html>".to_string(),
    )
    .await;

    let alpha_url = alpha.url("/1");
    let beta_url = beta.url("/2");

    let dir = TempDir::new().unwrap();
    let sets_file = write_sets_file(
        &dir,
        &format!(
            r#"{{
                "@alpha": ["{}"],
                "@beta": ["@alpha", "{}"]
            }}"#,
            alpha_url, beta_url
        ),
    );
    let service = WebContextService::new(test_config(&dir, sets_file)).unwrap();

    let contexts = service
        .fetch_contexts_for_prompt("Check @alpha and @beta please")
        .await;

    assert_eq!(contexts.len(), 2);
    assert!(contexts[&alpha_url].contains("Alpha page content"));
    assert!(contexts[&beta_url].contains("Beta page content"));
    // alpha is referenced directly and via @beta but deduplicated before fetching
    assert_eq!(alpha.hits(), 1);
    assert_eq!(beta.hits(), 1);
}

#[tokio::test]
async fn test_unreachable_url_skipped_without_failing_the_rest() {
    init_tracing();
    let good = TestServer::spawn(
        200,
        "<html><body>Reachable content here</body></html>".to_string(),
    )
    .await;
    let bad = TestServer::spawn(500, "<html><body>boom</body></html>".to_string()).await;

    let good_url = good.url("/ok");
    let bad_url = bad.url("/broken");

    let dir = TempDir::new().unwrap();
    let sets_file = write_sets_file(
        &dir,
        &format!(r#"{{"@mixed": ["{}", "{}"]}}"#, bad_url, good_url),
    );
    let service = WebContextService::new(test_config(&dir, sets_file)).unwrap();

    let contexts = service.fetch_contexts_for_prompt("use @mixed").await;

    assert_eq!(contexts.len(), 1);
    assert!(contexts.contains_key(&good_url));
    assert!(!contexts.contains_key(&bad_url));
}

#[tokio::test]
async fn test_live_cache_entry_served_without_network() {
    init_tracing();
    let server = TestServer::spawn(
        200,
        "<html><body>Cached once fetched once</body></html>".to_string(),
    )
    .await;
    let url = server.url("/page");

    let dir = TempDir::new().unwrap();
    let sets_file = write_sets_file(&dir, &format!(r#"{{"@docs": ["{}"]}}"#, url));
    let service = WebContextService::new(test_config(&dir, sets_file)).unwrap();

    let first = service.fetch_contexts_for_prompt("read @docs").await;
    assert_eq!(first.len(), 1);
    assert_eq!(server.hits(), 1);

    let second = service.fetch_contexts_for_prompt("read @docs").await;
    assert_eq!(second.len(), 1);
    assert_eq!(server.hits(), 1, "second call must be served from cache");
    assert_eq!(first[&url], second[&url]);
}

#[tokio::test]
async fn test_stale_cache_entry_triggers_refetch_and_overwrite() {
    init_tracing();
    let server = TestServer::spawn(
        200,
        "<html><body>Fresh version of the page</body></html>".to_string(),
    )
    .await;
    let url = server.url("/page");

    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, dir.path().join("unused.json"));
    // Zero TTL: every record is stale the moment it lands on disk
    let cache = Arc::new(FileCache::new(dir.path().join("cache"), 0).unwrap());
    cache.put(&url, "stale text").unwrap();
    let limiter = Arc::new(DomainRateLimiter::new(10, 60));
    let fetcher = WebFetcher::new(&config, Arc::clone(&cache), limiter).unwrap();

    // Let the record's mtime fall clearly behind the zero TTL
    tokio::time::sleep(Duration::from_millis(50)).await;
    let fetched = fetcher.fetch(&url, 10_000, false).await.unwrap();

    assert!(fetched.text.contains("Fresh version of the page"));
    assert_eq!(server.hits(), 1, "stale entry must hit the network");
    // Overwritten on disk (still reported stale by get, so check raw stats)
    assert_eq!(cache.stats().file_count, 1);
}

#[tokio::test]
async fn test_http_error_leaves_existing_cache_record_untouched() {
    init_tracing();
    let server = TestServer::spawn(500, "<html><body>boom</body></html>".to_string()).await;
    let url = server.url("/page");

    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, dir.path().join("unused.json"));
    let cache = Arc::new(FileCache::new(dir.path().join("cache"), 3600).unwrap());
    cache.put(&url, "previously cached text").unwrap();
    let limiter = Arc::new(DomainRateLimiter::new(10, 60));
    let fetcher = WebFetcher::new(&config, Arc::clone(&cache), limiter).unwrap();

    let result = fetcher.fetch(&url, 10_000, true).await;

    assert!(matches!(
        result,
        Err(ContextError::HttpStatus { status: 500, .. })
    ));
    assert_eq!(
        cache.get(&url),
        Some("previously cached text".to_string()),
        "failed fetch must not corrupt the cache"
    );
}

#[tokio::test]
async fn test_rate_limit_fails_only_the_over_budget_url() {
    init_tracing();
    let server = TestServer::spawn(
        200,
        "<html><body>Domain limited page</body></html>".to_string(),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, dir.path().join("unused.json"));
    let cache = Arc::new(FileCache::new(dir.path().join("cache"), 3600).unwrap());
    // One request per window, zero backoff: the second URL must be denied
    let limiter = Arc::new(DomainRateLimiter::with_window(1, Duration::from_secs(60)));
    let fetcher = WebFetcher::new(&config, Arc::clone(&cache), limiter).unwrap();

    let first = fetcher.fetch(&server.url("/1"), 10_000, false).await;
    assert!(first.is_ok());

    let second = fetcher.fetch(&server.url("/2"), 10_000, false).await;
    assert!(matches!(second, Err(ContextError::RateLimited { .. })));

    // The first URL's record is still readable
    assert!(cache.get(&server.url("/1")).is_some());
}

#[tokio::test]
async fn test_denied_fetch_succeeds_after_backoff_recheck() {
    init_tracing();
    let server = TestServer::spawn(
        200,
        "<html><body>Admitted on the re-check</body></html>".to_string(),
    )
    .await;
    let url = server.url("/page");

    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir, dir.path().join("unused.json"));
    config.rate_limit_backoff_secs = 1;
    let cache = Arc::new(FileCache::new(dir.path().join("cache"), 3600).unwrap());
    // The window expires during the backoff, so the re-check must admit
    let limiter = Arc::new(DomainRateLimiter::with_window(1, Duration::from_millis(200)));
    limiter.record(&url);
    assert!(!limiter.admit(&url), "window must start out full");
    let fetcher = WebFetcher::new(&config, cache, limiter).unwrap();

    let fetched = fetcher.fetch(&url, 10_000, false).await.unwrap();

    assert!(fetched.text.contains("Admitted on the re-check"));
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn test_force_refetch_bypasses_cache() {
    init_tracing();
    let server = TestServer::spawn(
        200,
        "<html><body>Forced refresh content</body></html>".to_string(),
    )
    .await;
    let url = server.url("/page");

    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, dir.path().join("unused.json"));
    let cache = Arc::new(FileCache::new(dir.path().join("cache"), 3600).unwrap());
    let limiter = Arc::new(DomainRateLimiter::new(10, 60));
    let fetcher = WebFetcher::new(&config, cache, limiter).unwrap();

    fetcher.fetch(&url, 10_000, false).await.unwrap();
    assert_eq!(server.hits(), 1);

    fetcher.fetch(&url, 10_000, true).await.unwrap();
    assert_eq!(server.hits(), 2, "force must bypass a live cache entry");
}

#[tokio::test]
async fn test_admin_stats_and_full_purge() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let sets_file = write_sets_file(&dir, r#"{"@docs": []}"#);
    let service = WebContextService::new(test_config(&dir, sets_file)).unwrap();

    let empty = service.cache_stats();
    assert_eq!(empty.file_count, 0);
    assert_eq!(empty.total_size_bytes, 0);
    assert!(empty.oldest_file_age_hours.is_none());
    assert!(empty.newest_file_age_hours.is_none());

    // Seed three records through direct fetches against a local server
    let server = TestServer::spawn(200, "<html><body>Seed page</body></html>".to_string()).await;
    for path in ["/1", "/2", "/3"] {
        service.fetch_url(&server.url(path), false).await.unwrap();
    }

    let stats = service.cache_stats();
    assert_eq!(stats.file_count, 3);
    assert!(stats.total_size_bytes > 0);
    assert!(stats.oldest_file_age_hours.is_some());

    assert_eq!(service.purge_cache(), 3);
    assert_eq!(service.cache_stats().file_count, 0);
}

#[tokio::test]
async fn test_text_extraction_strips_markup_and_scripts() {
    init_tracing();
    let server = TestServer::spawn(
        200,
        concat!(
            "<html><head><script>var x = 'hidden';</script>",
            "<style>p { color: blue; }</style></head>",
            "<body><h1>Title</h1><p>Visible   body\ntext</p></body></html>"
        )
        .to_string(),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, dir.path().join("unused.json"));
    let cache = Arc::new(FileCache::new(dir.path().join("cache"), 3600).unwrap());
    let limiter = Arc::new(DomainRateLimiter::new(10, 60));
    let fetcher = WebFetcher::new(&config, cache, limiter).unwrap();

    let fetched = fetcher.fetch(&server.url("/page"), 10_000, false).await.unwrap();

    assert!(fetched.text.contains("Title Visible body text"));
    assert!(!fetched.text.contains("hidden"));
    assert!(!fetched.text.contains("color: blue"));
}
