//! Persistence of memo tables through the file store

use fnforge_cache::{CacheError, CacheStore, FileStore, MemoCache};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_round_trip_survives_restart() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileStore::new(dir.path()));

    {
        let cache = MemoCache::open("prime", store.clone()).await;
        let answer: Value = cache
            .get_or_compute(&json!({"model": "gpt-4", "n": 53}), || async {
                Ok::<_, CacheError>(json!({"content": "function f(n) {}"}))
            })
            .await
            .unwrap();
        assert_eq!(answer["content"], "function f(n) {}");
    }

    let cache = MemoCache::open("prime", store.clone()).await;
    let cached: Value = cache
        .get_or_compute(&json!({"n": 53, "model": "gpt-4"}), || async {
            Err::<Value, _>(CacheError::Corrupt {
                namespace: "prime".to_string(),
                reason: "should not compute".to_string(),
            })
        })
        .await
        .unwrap();
    assert_eq!(cached, json!({"content": "function f(n) {}"}));
    assert_eq!(cache.stats().hits, 1);
}

#[tokio::test]
async fn test_file_layout() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileStore::new(dir.path()));
    let cache = MemoCache::open("layout", store.clone()).await;
    cache.insert(&"k", &json!([1, 2])).await.unwrap();

    let text = std::fs::read_to_string(dir.path().join("layout.json")).unwrap();
    let document: Value = serde_json::from_str(&text).unwrap();
    let key = MemoCache::key_for(&"k").unwrap();
    assert_eq!(document, json!([[key, [1, 2]]]));
}

#[tokio::test]
async fn test_corrupt_file_is_ignored() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("broken.json"), "[[\"k\", ").unwrap();

    let store = Arc::new(FileStore::new(dir.path()));
    let cache = MemoCache::open("broken", store).await;
    assert!(cache.is_empty());

    cache.insert(&"fresh", &true).await.unwrap();
    let reopened = MemoCache::open("broken", Arc::new(FileStore::new(dir.path()))).await;
    assert_eq!(reopened.len(), 1);
}

#[tokio::test]
async fn test_flush_failure_keeps_value() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();

    let store = Arc::new(FileStore::new(&blocker));
    assert!(store.save("ns", "[]").await.is_err());

    let cache = MemoCache::open("ns", store).await;
    let value: u32 = cache
        .get_or_compute(&"k", || async { Ok::<_, CacheError>(7) })
        .await
        .unwrap();
    assert_eq!(value, 7);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().flush_failures, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_writers_leave_complete_document() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileStore::new(dir.path()));
    let cache = Arc::new(MemoCache::open("shared", store.clone()).await);

    for round in 0..10 {
        let writers: Vec<_> = (0..32)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    let key = format!("{}-{}", round, i);
                    let value = json!("x".repeat((i * 97) % 1500));
                    if i % 2 == 0 {
                        cache.insert(&key, &value).await.unwrap();
                    } else {
                        let _: Value = cache
                            .get_or_compute(&key, || async { Ok::<_, CacheError>(value) })
                            .await
                            .unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        let text = store.load("shared").await.unwrap().unwrap();
        let document: Vec<(String, Value)> = serde_json::from_str(&text).unwrap();
        assert!(!document.is_empty());
        for (_, value) in document {
            assert!(value.as_str().unwrap().chars().all(|c| c == 'x'));
        }
    }

    cache.insert(&"final", &true).await.unwrap();
    let reopened = MemoCache::open("shared", Arc::new(FileStore::new(dir.path()))).await;
    assert_eq!(reopened.len(), cache.len());
    assert_eq!(reopened.len(), 10 * 32 + 1);

    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("shared.json")]);
}
