//! Tests for the config stores.

use llmgate_config::{ConfigStore, FileStore, GatewayDocument, MemoryStore};
use std::{path::Path, sync::Arc, thread, time::Duration};

fn write_with_host(path: &Path, host: &str) {
    let mut doc = GatewayDocument::scaffold();
    doc.server.default_host_ip = Some(host.to_owned());
    std::fs::write(path, toml::to_string(&doc).unwrap()).unwrap();
}

/// Rewrite so the stamp changes even on filesystems with coarse mtimes.
fn rewrite_with_host(path: &Path, host: &str) {
    thread::sleep(Duration::from_millis(20));
    write_with_host(path, host);
}

#[test]
fn memory_store_clones_share_updates() {
    let store = MemoryStore::new(GatewayDocument::scaffold());
    let other = store.clone();
    let before = store.snapshot();

    other.update(|doc| doc.server.default_host_ip = Some("10.1.1.1".to_owned()));

    assert_eq!(before.server.default_host_ip.as_deref(), Some("0.0.0.0"));
    assert_eq!(
        store.snapshot().server.default_host_ip.as_deref(),
        Some("10.1.1.1")
    );

    store.replace(GatewayDocument::default());
    assert!(other.snapshot().server.model_worker.is_empty());
}

#[test]
fn stores_work_behind_arc_and_reference() {
    let store = MemoryStore::new(GatewayDocument::scaffold());
    fn port(store: impl ConfigStore) -> Option<u16> {
        store.snapshot().server.controller.port
    }
    assert_eq!(port(&store), Some(20001));
    assert_eq!(port(Arc::new(store)), Some(20001));
}

#[test]
fn file_store_rejects_invalid_initial_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gateway.toml");
    std::fs::write(&path, "[ServerConfig]\ndefault_host_ip = \"0.0.0.0\"\n").unwrap();
    let err = FileStore::open(&path).unwrap_err();
    assert!(err.to_string().contains("model_worker.default is missing"));

    assert!(FileStore::open(dir.path().join("absent.toml")).is_err());
}

#[test]
fn file_store_reloads_on_change() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gateway.toml");
    write_with_host(&path, "10.0.0.1");

    let store = FileStore::open(&path).unwrap();
    assert_eq!(store.path(), path);
    let first = store.snapshot();
    assert_eq!(first.server.default_host_ip.as_deref(), Some("10.0.0.1"));
    assert!(Arc::ptr_eq(&first, &store.snapshot()));

    rewrite_with_host(&path, "10.0.0.22");
    assert_eq!(
        store.snapshot().server.default_host_ip.as_deref(),
        Some("10.0.0.22")
    );
}

#[test]
fn file_store_keeps_last_good_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gateway.toml");
    write_with_host(&path, "10.0.0.1");
    let store = FileStore::open(&path).unwrap();

    thread::sleep(Duration::from_millis(20));
    std::fs::write(&path, "this is = = not toml").unwrap();
    assert_eq!(
        store.snapshot().server.default_host_ip.as_deref(),
        Some("10.0.0.1")
    );
    assert!(store.reload().is_err());

    rewrite_with_host(&path, "10.0.0.3");
    store.reload().unwrap();
    assert_eq!(
        store.snapshot().server.default_host_ip.as_deref(),
        Some("10.0.0.3")
    );
}

#[test]
fn file_store_serves_concurrent_readers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gateway.toml");
    write_with_host(&path, "10.0.0.1");
    let store = Arc::new(FileStore::open(&path).unwrap());
    let first = store.snapshot();

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || (0..50).map(|_| store.snapshot()).collect::<Vec<_>>())
        })
        .collect();
    for reader in readers {
        for doc in reader.join().unwrap() {
            assert!(Arc::ptr_eq(&first, &doc));
        }
    }

    rewrite_with_host(&path, "10.0.0.9");
    let readers: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || store.snapshot())
        })
        .collect();
    let docs: Vec<_> = readers.into_iter().map(|r| r.join().unwrap()).collect();
    for doc in &docs {
        assert_eq!(doc.server.default_host_ip.as_deref(), Some("10.0.0.9"));
        assert!(Arc::ptr_eq(&docs[0], doc));
    }
}
