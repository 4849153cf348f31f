//! Fetch-strategy tests: install/activate lifecycle, the network-first
//! timeout race, cache-first assets, and interception exclusions, all
//! against a mock network with controllable latency.

use asset_cache::{
    AppCommand, AssetCacheConfig, AssetCacheError, AssetCacheWorker, CacheStorage, Destination,
    FetchRequest, FetchResponse, Method, NetworkFetch, ResponseSource, WorkerEvent, WorkerState,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock network with per-instance latency and a URL-to-response table.
#[derive(Default)]
struct MockNetwork {
    responses: Mutex<HashMap<String, FetchResponse>>,
    delay: Mutex<Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockNetwork {
    fn respond(&self, url: &str, response: FetchResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    fn calls_for(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|called| called.as_str() == url)
            .count()
    }
}

#[async_trait]
impl NetworkFetch for MockNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, AssetCacheError> {
        self.calls.lock().unwrap().push(request.url.clone());
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .ok_or_else(|| AssetCacheError::Network(format!("unreachable: {}", request.url)))
    }
}

fn shell_network() -> Arc<MockNetwork> {
    let network = Arc::new(MockNetwork::default());
    network.respond("/", FetchResponse::ok("shell", Some("text/html")));
    network.respond("/index.html", FetchResponse::ok("shell-v1", Some("text/html")));
    network.respond("/manifest.json", FetchResponse::ok("{}", Some("application/json")));
    network
}

fn worker(
    config: AssetCacheConfig,
    storage: Arc<CacheStorage>,
    network: Arc<MockNetwork>,
) -> AssetCacheWorker<MockNetwork> {
    AssetCacheWorker::new(config, storage, network)
}

// ========== Install / activate lifecycle ==========

#[tokio::test]
async fn test_install_precaches_shell_and_tolerates_failures() {
    let network = Arc::new(MockNetwork::default());
    network.respond("/", FetchResponse::ok("shell", Some("text/html")));
    network.respond("/index.html", FetchResponse::ok("shell-v1", Some("text/html")));
    // "/manifest.json" is unreachable; install must still finish.

    let storage = Arc::new(CacheStorage::new());
    let cache = worker(AssetCacheConfig::default(), Arc::clone(&storage), network);

    cache.install().await;

    assert_eq!(cache.state().await, WorkerState::Activated);
    assert_eq!(storage.entry_count("recolha-static-v1").await, 2);
    assert!(storage.lookup("recolha-static-v1", "/").await.is_some());
}

#[tokio::test]
async fn test_new_version_waits_and_activates_on_skip_waiting() {
    let storage = Arc::new(CacheStorage::new());
    // A previous generation is still live.
    storage
        .put(
            "recolha-static-v1",
            "/index.html",
            FetchResponse::ok("old shell", Some("text/html")),
        )
        .await;

    let network = shell_network();
    let cache = worker(
        AssetCacheConfig::default().with_version("recolha-static-v2"),
        Arc::clone(&storage),
        network,
    );
    let mut events = cache.subscribe();

    cache.install().await;
    assert_eq!(cache.state().await, WorkerState::Waiting);
    assert_eq!(
        events.try_recv().unwrap(),
        WorkerEvent::UpdateAvailable {
            version: "recolha-static-v2".to_string()
        }
    );
    // The old generation survives until activation.
    assert!(storage.lookup("recolha-static-v1", "/index.html").await.is_some());

    cache.handle_command(AppCommand::SkipWaiting).await;

    assert_eq!(cache.state().await, WorkerState::Activated);
    assert_eq!(storage.cache_names().await, vec!["recolha-static-v2".to_string()]);
}

// ========== Network-first with timeout ==========

#[tokio::test(start_paused = true)]
async fn test_slow_network_serves_cached_shell_then_refreshes() {
    let network = shell_network();
    let storage = Arc::new(CacheStorage::new());
    let cache = worker(AssetCacheConfig::default(), Arc::clone(&storage), Arc::clone(&network));
    cache.install().await;

    // The next deploy is slow to respond and carries a newer shell.
    network.respond("/index.html", FetchResponse::ok("shell-v2", Some("text/html")));
    network.set_delay(Duration::from_millis(4000));

    let outcome = cache
        .handle_fetch(&FetchRequest::document("/index.html"))
        .await
        .unwrap();

    // The 3000 ms deadline wins; the cached copy is served.
    assert_eq!(outcome.source, ResponseSource::Cache);
    assert_eq!(outcome.response.body, b"shell-v1");

    // The abandoned network attempt finishes later and refreshes the cache
    // without affecting the already-returned response.
    tokio::time::sleep(Duration::from_millis(2000)).await;
    let refreshed = storage
        .lookup("recolha-static-v1", "/index.html")
        .await
        .unwrap();
    assert_eq!(refreshed.body, b"shell-v2");
}

#[tokio::test]
async fn test_fast_network_wins_the_race() {
    let network = shell_network();
    let storage = Arc::new(CacheStorage::new());
    let cache = worker(AssetCacheConfig::default(), Arc::clone(&storage), Arc::clone(&network));
    cache.install().await;

    network.respond("/index.html", FetchResponse::ok("shell-v2", Some("text/html")));

    let outcome = cache
        .handle_fetch(&FetchRequest::document("/index.html"))
        .await
        .unwrap();

    assert_eq!(outcome.source, ResponseSource::Network);
    assert_eq!(outcome.response.body, b"shell-v2");
}

#[tokio::test]
async fn test_unreachable_navigation_falls_back_to_root_document() {
    let network = shell_network();
    let storage = Arc::new(CacheStorage::new());
    let cache = worker(AssetCacheConfig::default(), storage, Arc::clone(&network));
    cache.install().await;

    // Never fetched before, and the network cannot serve it now.
    let outcome = cache
        .handle_fetch(&FetchRequest::document("/entidades/42"))
        .await
        .unwrap();

    assert_eq!(outcome.source, ResponseSource::Cache);
    assert_eq!(outcome.response.body, b"shell");
}

#[tokio::test]
async fn test_uncached_script_failure_reports_the_network_error() {
    let network = shell_network();
    let storage = Arc::new(CacheStorage::new());
    let cache = worker(AssetCacheConfig::default(), storage, network);
    cache.install().await;

    // A shell resource that was never cached and cannot be fetched. The
    // caller sees the underlying network failure, not a generic miss.
    let request = FetchRequest::get("/chunks/forms.js").with_destination(Destination::Script);
    match cache.handle_fetch(&request).await {
        Err(AssetCacheError::Network(message)) => assert!(message.contains("/chunks/forms.js")),
        other => panic!("expected a network error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_asset_without_fallback_errors() {
    let network = shell_network();
    let storage = Arc::new(CacheStorage::new());
    let cache = worker(AssetCacheConfig::default(), storage, network);
    cache.install().await;

    let result = cache
        .handle_fetch(&FetchRequest::get("/missing.png"))
        .await;

    assert!(matches!(result, Err(AssetCacheError::Network(_))));
}

// ========== Cache-first for static assets ==========

#[tokio::test]
async fn test_static_asset_is_fetched_once_then_served_from_cache() {
    let network = shell_network();
    network.respond(
        "/icon-192x192.png",
        FetchResponse::ok(vec![0x89, 0x50, 0x4e, 0x47], Some("image/png")),
    );
    let storage = Arc::new(CacheStorage::new());
    let cache = worker(AssetCacheConfig::default(), storage, Arc::clone(&network));
    cache.install().await;

    let first = cache
        .handle_fetch(&FetchRequest::get("/icon-192x192.png"))
        .await
        .unwrap();
    assert_eq!(first.source, ResponseSource::Network);
    assert_eq!(network.calls_for("/icon-192x192.png"), 1);

    let second = cache
        .handle_fetch(&FetchRequest::get("/icon-192x192.png"))
        .await
        .unwrap();
    assert_eq!(second.source, ResponseSource::Cache);
    assert_eq!(second.response, first.response);
    assert_eq!(network.calls_for("/icon-192x192.png"), 1);
}

#[tokio::test]
async fn test_non_success_static_response_is_not_cached() {
    let network = shell_network();
    network.respond(
        "/flaky.png",
        FetchResponse {
            status: 404,
            content_type: None,
            body: Vec::new(),
        },
    );
    let storage = Arc::new(CacheStorage::new());
    let cache = worker(AssetCacheConfig::default(), storage, Arc::clone(&network));
    cache.install().await;

    cache.handle_fetch(&FetchRequest::get("/flaky.png")).await.unwrap();
    cache.handle_fetch(&FetchRequest::get("/flaky.png")).await.unwrap();

    assert_eq!(network.calls_for("/flaky.png"), 2);
}

// ========== Interception exclusions ==========

#[tokio::test]
async fn test_non_get_requests_pass_through() {
    let network = shell_network();
    network.respond("/api/upload", FetchResponse::ok("done", None));
    let storage = Arc::new(CacheStorage::new());
    let cache = worker(AssetCacheConfig::default(), Arc::clone(&storage), Arc::clone(&network));
    cache.install().await;

    for _ in 0..2 {
        let outcome = cache
            .handle_fetch(&FetchRequest::get("/api/upload").with_method(Method::Post))
            .await
            .unwrap();
        assert_eq!(outcome.source, ResponseSource::Network);
    }

    assert_eq!(network.calls_for("/api/upload"), 2);
    assert!(storage.lookup("recolha-static-v1", "/api/upload").await.is_none());
}

#[tokio::test]
async fn test_backend_requests_are_never_cached() {
    let network = shell_network();
    let url = "https://backend.example/rest/v1/residuo";
    network.respond(url, FetchResponse::ok("[]", Some("application/json")));
    let storage = Arc::new(CacheStorage::new());
    let cache = worker(
        AssetCacheConfig::default().with_backend_host("backend.example"),
        Arc::clone(&storage),
        Arc::clone(&network),
    );
    cache.install().await;

    for _ in 0..2 {
        cache.handle_fetch(&FetchRequest::get(url)).await.unwrap();
    }

    assert_eq!(network.calls_for(url), 2);
    assert!(storage.lookup("recolha-static-v1", url).await.is_none());
}

// ========== Messaging ==========

#[tokio::test]
async fn test_background_sync_tag_is_relayed_to_clients() {
    let network = shell_network();
    let cache = worker(AssetCacheConfig::default(), Arc::new(CacheStorage::new()), network);
    let mut events = cache.subscribe();

    cache.handle_sync_event("background-sync");
    assert_eq!(events.try_recv().unwrap(), WorkerEvent::BackgroundSync);

    cache.handle_sync_event("periodic-cleanup");
    assert!(events.try_recv().is_err());
}
