use super::*;
use crate::cache::types::ResponseType;

fn entry(url: &str, body: &str) -> CacheEntry {
    CacheEntry {
        url: url.into(),
        status: 200,
        headers: vec![("content-type".into(), "text/javascript".into())],
        body: body.as_bytes().to_vec(),
        response_type: ResponseType::Basic,
        cached_at: 1,
    }
}

fn temp_root() -> PathBuf {
    std::env::temp_dir().join(format!("embedcord-cache-{}", uuid::Uuid::new_v4()))
}

async fn exercise(storage: &dyn CacheStorage) {
    assert!(storage.keys().await.unwrap().is_empty());
    assert!(storage.match_in("v1", "http://a/app.js").await.unwrap().is_none());

    storage.put("v1", entry("http://a/app.js", "one")).await.unwrap();
    storage.put("v0", entry("http://a/index.html", "<html>")).await.unwrap();
    assert_eq!(storage.keys().await.unwrap(), vec!["v0".to_string(), "v1".to_string()]);

    let hit = storage.match_in("v1", "http://a/app.js").await.unwrap().unwrap();
    assert_eq!(hit.body, b"one");
    assert_eq!(hit.headers, vec![("content-type".to_string(), "text/javascript".to_string())]);
    assert!(storage.match_in("v0", "http://a/app.js").await.unwrap().is_none());

    let any = storage.match_any("http://a/index.html").await.unwrap().unwrap();
    assert_eq!(any.body, b"<html>");

    storage.put("v1", entry("http://a/app.js", "two")).await.unwrap();
    assert_eq!(storage.match_in("v1", "http://a/app.js").await.unwrap().unwrap().body, b"two");

    assert!(storage.delete("v0").await.unwrap());
    assert!(!storage.delete("v0").await.unwrap());
    assert_eq!(storage.keys().await.unwrap(), vec!["v1".to_string()]);
    assert!(storage.match_any("http://a/index.html").await.unwrap().is_none());
}

#[tokio::test]
async fn memory_storage_behaves_like_a_cache() {
    exercise(&MemoryCacheStorage::new()).await;
}

#[tokio::test]
async fn disk_storage_behaves_like_a_cache() {
    let root = temp_root();
    exercise(&DiskCacheStorage::new(&root)).await;
    let _ = tokio::fs::remove_dir_all(&root).await;
}

#[tokio::test]
async fn disk_storage_persists_across_instances() {
    let root = temp_root();
    DiskCacheStorage::new(&root)
        .put("vite-app-cache-v1", entry("http://a/app.js", "body"))
        .await
        .unwrap();

    let reopened = DiskCacheStorage::new(&root);
    assert_eq!(reopened.keys().await.unwrap(), vec!["vite-app-cache-v1".to_string()]);
    let hit = reopened.match_in("vite-app-cache-v1", "http://a/app.js").await.unwrap().unwrap();
    assert_eq!(hit.body, b"body");
    let _ = tokio::fs::remove_dir_all(&root).await;
}

#[tokio::test]
async fn disk_entry_without_body_is_a_miss() {
    let root = temp_root();
    let storage = DiskCacheStorage::new(&root);
    storage.put("v1", entry("http://a/app.js", "body")).await.unwrap();
    let body = storage.cache_dir("v1").join(format!("{}.body", hex_digest("http://a/app.js")));
    tokio::fs::remove_file(body).await.unwrap();

    assert!(storage.match_in("v1", "http://a/app.js").await.unwrap().is_none());
    let _ = tokio::fs::remove_dir_all(&root).await;
}

#[test]
fn hex_digest_is_stable_sha256() {
    assert_eq!(hex_digest(""), "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
}
