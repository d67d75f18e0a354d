use super::*;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("embedcord-storage-{}", uuid::Uuid::new_v4()))
        .join(name)
}

#[test]
fn memory_store_round_trips_values() {
    let store = MemoryStore::new();
    assert_eq!(store.get("chatUsername").unwrap(), None);
    store.set("chatUsername", "User-1").unwrap();
    store.set("chatUsername", "User-2").unwrap();
    assert_eq!(store.get("chatUsername").unwrap().as_deref(), Some("User-2"));
}

#[test]
fn file_store_missing_file_is_empty() {
    let store = FileStore::open(temp_path("state.json")).unwrap();
    assert_eq!(store.get("anything").unwrap(), None);
}

#[test]
fn file_store_survives_reopen() {
    let path = temp_path("state.json");
    {
        let store = FileStore::open(&path).unwrap();
        store.set("chatUsername", "User-abc").unwrap();
    }
    let reopened = FileStore::open(&path).unwrap();
    assert_eq!(reopened.get("chatUsername").unwrap().as_deref(), Some("User-abc"));
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn file_store_rejects_corrupt_document() {
    let path = temp_path("state.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"not json").unwrap();
    assert!(matches!(FileStore::open(&path), Err(StorageError::Serde(_))));
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}
