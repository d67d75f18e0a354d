use super::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use url::Url;

use crate::cache::storage::MemoryCacheStorage;
use crate::cache::types::{NetworkError, ResponseSource, ResponseType};

const VERSION: &str = "vite-app-cache-v1";

struct MockNetwork {
    calls: AtomicUsize,
    offline: AtomicBool,
    status: u16,
    response_type: ResponseType,
}

impl MockNetwork {
    fn new(status: u16, response_type: ResponseType) -> Self {
        Self { calls: AtomicUsize::new(0), offline: AtomicBool::new(false), status, response_type }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::Request("offline".into()));
        }
        Ok(FetchResponse {
            status: self.status,
            headers: vec![("content-type".into(), "text/plain".into())],
            body: format!("body of {}", request.url.path()).into_bytes(),
            response_type: self.response_type,
            source: ResponseSource::Network,
        })
    }
}

fn url(path: &str) -> Url {
    Url::parse("http://device.local").unwrap().join(path).unwrap()
}

async fn active_worker(network: Arc<MockNetwork>) -> (AssetCacheWorker, Arc<MemoryCacheStorage>) {
    let storage = Arc::new(MemoryCacheStorage::new());
    let worker = AssetCacheWorker::new(VERSION, storage.clone(), network);
    worker.start().await.unwrap();
    (worker, storage)
}

// =============================================================
// Lifecycle
// =============================================================

#[tokio::test]
async fn lifecycle_runs_installing_activating_active() {
    let network = Arc::new(MockNetwork::new(200, ResponseType::Basic));
    let worker = AssetCacheWorker::new(VERSION, Arc::new(MemoryCacheStorage::new()), network);
    assert_eq!(worker.state(), WorkerState::Installing);
    worker.install().unwrap();
    assert_eq!(worker.state(), WorkerState::Activating);
    worker.activate().await.unwrap();
    assert_eq!(worker.state(), WorkerState::Active);
    worker.retire();
    assert_eq!(worker.state(), WorkerState::Redundant);
    assert!(matches!(worker.install(), Err(CacheError::InvalidState(WorkerState::Redundant))));
}

#[tokio::test]
async fn activate_requires_install() {
    let network = Arc::new(MockNetwork::new(200, ResponseType::Basic));
    let worker = AssetCacheWorker::new(VERSION, Arc::new(MemoryCacheStorage::new()), network);
    assert!(matches!(worker.activate().await, Err(CacheError::InvalidState(WorkerState::Installing))));
}

#[tokio::test]
async fn activation_purges_other_versions() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let old = CacheEntry {
        url: url("/app.js").into(),
        status: 200,
        headers: Vec::new(),
        body: b"old".to_vec(),
        response_type: ResponseType::Basic,
        cached_at: 0,
    };
    storage.put("vite-app-cache-v0", old.clone()).await.unwrap();
    storage.put("scratch", old.clone()).await.unwrap();
    storage.put(VERSION, old).await.unwrap();

    let network = Arc::new(MockNetwork::new(200, ResponseType::Basic));
    let worker = AssetCacheWorker::new(VERSION, storage.clone(), network);
    let report = worker.start().await.unwrap();

    let mut deleted = report.deleted_caches;
    deleted.sort();
    assert_eq!(deleted, vec!["scratch".to_string(), "vite-app-cache-v0".to_string()]);
    assert_eq!(storage.keys().await.unwrap(), vec![VERSION.to_string()]);
}

#[tokio::test]
async fn activation_claims_open_pages() {
    let network = Arc::new(MockNetwork::new(200, ResponseType::Basic));
    let worker = AssetCacheWorker::new(VERSION, Arc::new(MemoryCacheStorage::new()), network);
    worker.register_client("tab-1");
    worker.register_client("tab-2");
    assert!(!worker.controls("tab-1"));

    let report = worker.start().await.unwrap();
    assert_eq!(report.claimed_clients, 2);
    assert!(worker.controls("tab-1") && worker.controls("tab-2"));

    worker.register_client("tab-3");
    assert!(worker.controls("tab-3"));
    assert_eq!(worker.controlled_clients(), 3);
    worker.unregister_client("tab-3");
    assert!(!worker.controls("tab-3"));
}

// =============================================================
// Fetch policy
// =============================================================

#[tokio::test]
async fn repeat_get_is_served_from_cache() {
    let network = Arc::new(MockNetwork::new(200, ResponseType::Basic));
    let (worker, _storage) = active_worker(network.clone()).await;

    let first = worker.handle_fetch(FetchRequest::get(url("/assets/app-1234.js"))).await;
    assert_eq!(first.source, ResponseSource::Network);
    let second = worker.handle_fetch(FetchRequest::get(url("/assets/app-1234.js"))).await;
    assert_eq!(second.source, ResponseSource::Cache);
    assert_eq!(second.body, first.body);
    assert_eq!(network.calls(), 1);
}

#[tokio::test]
async fn fragment_does_not_split_cache_entries() {
    let network = Arc::new(MockNetwork::new(200, ResponseType::Basic));
    let (worker, _storage) = active_worker(network.clone()).await;

    worker.handle_fetch(FetchRequest::get(url("/logo.svg"))).await;
    let hit = worker.handle_fetch(FetchRequest::get(url("/logo.svg#icon"))).await;
    assert_eq!(hit.source, ResponseSource::Cache);
    assert_eq!(network.calls(), 1);
}

#[tokio::test]
async fn non_200_is_never_cached() {
    let network = Arc::new(MockNetwork::new(404, ResponseType::Basic));
    let (worker, storage) = active_worker(network.clone()).await;

    let resp = worker.handle_fetch(FetchRequest::get(url("/missing.js"))).await;
    assert_eq!(resp.status, 404);
    worker.handle_fetch(FetchRequest::get(url("/missing.js"))).await;
    assert_eq!(network.calls(), 2);
    assert!(storage.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn cross_origin_is_never_cached() {
    let network = Arc::new(MockNetwork::new(200, ResponseType::Cors));
    let (worker, storage) = active_worker(network.clone()).await;

    worker.handle_fetch(FetchRequest::get(url("/font.woff2"))).await;
    worker.handle_fetch(FetchRequest::get(url("/font.woff2"))).await;
    assert_eq!(network.calls(), 2);
    assert!(storage.match_in(VERSION, url("/font.woff2").as_str()).await.unwrap().is_none());
}

#[tokio::test]
async fn non_get_passes_through_uncached() {
    let network = Arc::new(MockNetwork::new(200, ResponseType::Basic));
    let (worker, storage) = active_worker(network.clone()).await;

    let mut post = FetchRequest::get(url("/assets/app.js"));
    post.method = Method::POST;
    worker.handle_fetch(post.clone()).await;
    worker.handle_fetch(post).await;
    assert_eq!(network.calls(), 2);
    assert!(storage.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn api_reads_always_hit_the_network() {
    let network = Arc::new(MockNetwork::new(200, ResponseType::Basic));
    let (worker, storage) = active_worker(network.clone()).await;

    let first = worker.handle_fetch(FetchRequest::get(url("/api/messages?group=General"))).await;
    let second = worker.handle_fetch(FetchRequest::get(url("/api/messages?group=General"))).await;
    assert_eq!(first.source, ResponseSource::Network);
    assert_eq!(second.source, ResponseSource::Network);
    assert_eq!(network.calls(), 2);
    assert!(storage.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn inactive_worker_does_not_intercept() {
    let network = Arc::new(MockNetwork::new(200, ResponseType::Basic));
    let storage = Arc::new(MemoryCacheStorage::new());
    let worker = AssetCacheWorker::new(VERSION, storage.clone(), network.clone());

    worker.handle_fetch(FetchRequest::get(url("/app.js"))).await;
    worker.handle_fetch(FetchRequest::get(url("/app.js"))).await;
    assert_eq!(network.calls(), 2);
    assert!(storage.keys().await.unwrap().is_empty());
}

// =============================================================
// Offline behavior
// =============================================================

#[tokio::test]
async fn offline_navigation_serves_cached_shell() {
    let network = Arc::new(MockNetwork::new(200, ResponseType::Basic));
    let (worker, _storage) = active_worker(network.clone()).await;
    worker.handle_fetch(FetchRequest::get(url("/index.html"))).await;

    network.offline.store(true, Ordering::SeqCst);
    let resp = worker.handle_fetch(FetchRequest::navigate(url("/channels/general"))).await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.source, ResponseSource::Cache);
    assert_eq!(resp.body, b"body of /index.html");
}

#[tokio::test]
async fn offline_navigation_falls_back_to_root_document() {
    let network = Arc::new(MockNetwork::new(200, ResponseType::Basic));
    let (worker, _storage) = active_worker(network.clone()).await;
    worker.handle_fetch(FetchRequest::navigate(url("/"))).await;

    network.offline.store(true, Ordering::SeqCst);
    let resp = worker.handle_fetch(FetchRequest::navigate(url("/settings"))).await;
    assert_eq!(resp.source, ResponseSource::Cache);
    assert_eq!(resp.body, b"body of /");
}

#[tokio::test]
async fn offline_asset_gets_synthetic_408() {
    let network = Arc::new(MockNetwork::new(200, ResponseType::Basic));
    let (worker, _storage) = active_worker(network.clone()).await;
    worker.handle_fetch(FetchRequest::get(url("/index.html"))).await;

    network.offline.store(true, Ordering::SeqCst);
    let resp = worker.handle_fetch(FetchRequest::get(url("/assets/new.js"))).await;
    assert_eq!(resp.status, 408);
    assert_eq!(resp.header("content-type"), Some("text/plain"));
    assert_eq!(resp.body, b"Network error happened");
    assert_eq!(resp.source, ResponseSource::Synthetic);
}

#[tokio::test]
async fn offline_navigation_without_shell_gets_408() {
    let network = Arc::new(MockNetwork::new(200, ResponseType::Basic));
    network.offline.store(true, Ordering::SeqCst);
    let (worker, _storage) = active_worker(network).await;

    let resp = worker.handle_fetch(FetchRequest::navigate(url("/"))).await;
    assert_eq!(resp.status, 408);
}

#[tokio::test]
async fn offline_cache_hit_still_served() {
    let network = Arc::new(MockNetwork::new(200, ResponseType::Basic));
    let (worker, _storage) = active_worker(network.clone()).await;
    worker.handle_fetch(FetchRequest::get(url("/app.css"))).await;

    network.offline.store(true, Ordering::SeqCst);
    let resp = worker.handle_fetch(FetchRequest::get(url("/app.css"))).await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.source, ResponseSource::Cache);
}
