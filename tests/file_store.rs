mod common;

use common::{FakeProvider, TAGUIG};
use epod_dropoff::sdk::geocoding::store::corrupt_path;
use epod_dropoff::sdk::geocoding::{GeocodingCache, JsonFileStore, KeyValueStore};
use std::fs;
use std::sync::Arc;

#[test]
fn missing_file_opens_empty_and_is_created_on_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("geo_cache.json");

    let store = JsonFileStore::open(&path).unwrap();
    assert!(store.is_empty());
    assert!(!path.exists());

    store.set("Taguig", r#"{"lat":14.5176,"lng":121.0509}"#).unwrap();
    assert!(path.exists());
}

#[test]
fn entries_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("geo_cache.json");

    {
        let store = JsonFileStore::open(&path).unwrap();
        store.set("A", "1").unwrap();
        store.set("B", "2").unwrap();
        assert!(store.remove("A").unwrap());
    }

    let reopened = JsonFileStore::open(&path).unwrap();
    assert_eq!(reopened.get("A").unwrap(), None);
    assert_eq!(reopened.get("B").unwrap().as_deref(), Some("2"));
    assert_eq!(reopened.len(), 1);
}

#[test]
fn truncated_file_is_set_aside_and_store_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("geo_cache.json");
    let truncated = "{\n  \"Taguig\": \"{\\\"lat\\\":14.5";
    fs::write(&path, truncated).unwrap();

    let store = JsonFileStore::open(&path).unwrap();

    assert!(store.is_empty());
    assert!(!path.exists());
    assert_eq!(fs::read_to_string(corrupt_path(&path)).unwrap(), truncated);

    // the store is usable again straight away
    store.set("Taguig", r#"{"lat":14.5176,"lng":121.0509}"#).unwrap();
    let reopened = JsonFileStore::open(&path).unwrap();
    assert_eq!(reopened.len(), 1);
}

#[test]
fn rewrites_leave_no_temporary_files_behind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("geo_cache.json");

    let store = JsonFileStore::open(&path).unwrap();
    for i in 0..5 {
        store.set(&format!("addr-{i}"), "{}").unwrap();
    }
    store.remove("addr-0").unwrap();

    let names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, ["geo_cache.json"]);

    let on_disk: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk.as_object().unwrap().len(), 4);
}

#[tokio::test]
async fn resolved_coordinate_is_on_disk_for_the_next_process() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("geo_cache.json");

    let provider = Arc::new(FakeProvider::new().found("Taguig", TAGUIG));
    let cache = GeocodingCache::new(Arc::new(JsonFileStore::open(&path).unwrap()), provider.clone());
    assert_eq!(cache.resolve("Taguig").await, Some(TAGUIG));

    // a fresh cache over the same file must not need the provider
    let offline = Arc::new(FakeProvider::new());
    let restarted = GeocodingCache::new(Arc::new(JsonFileStore::open(&path).unwrap()), offline.clone());
    assert_eq!(restarted.resolve("Taguig").await, Some(TAGUIG));
    assert_eq!(offline.calls(), 0);

    let on_disk: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert!(on_disk["Taguig"].is_string());
}
