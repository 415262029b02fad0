//! LanceStore integration tests
//!
//! Run against a real LanceDB database in a temp directory, with the
//! deterministic mock embedder standing in for the ML model.

use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use recall::embedding::EmbeddingProvider;
use recall::store::{LanceStore, MemoryStore};
use recall::testing::MockEmbeddingModel;

async fn open_store(dir: &TempDir) -> LanceStore {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbeddingModel::new());
    LanceStore::open(dir.path(), embedder)
        .await
        .expect("open store")
}

#[tokio::test]
async fn insert_then_get_roundtrip() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let inserted = store.insert("alice", "User lives in Berlin").await.unwrap();
    let fetched = store.get("alice", inserted.id).await.unwrap().unwrap();

    assert_eq!(fetched.id, inserted.id);
    assert_eq!(fetched.content, "User lives in Berlin");
    assert!(fetched.is_active());
}

#[tokio::test]
async fn get_missing_record_returns_none() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let fetched = store.get("alice", uuid::Uuid::new_v4()).await.unwrap();
    assert!(fetched.is_none());
}

#[tokio::test]
async fn tenants_are_isolated() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let record = store.insert("alice", "User lives in Berlin").await.unwrap();

    assert!(store.get("bob", record.id).await.unwrap().is_none());
    assert!(store.list("bob", true, 10).await.unwrap().is_empty());
    assert!(
        store
            .search("bob", "Berlin", 10, true)
            .await
            .unwrap()
            .is_empty()
    );

    let alice = store.list("alice", true, 10).await.unwrap();
    assert_eq!(alice.len(), 1);
}

#[tokio::test]
async fn search_respects_limit() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    for i in 0..5 {
        store
            .insert("alice", &format!("User fact number {i}"))
            .await
            .unwrap();
    }

    let results = store.search("alice", "User fact", 3, true).await.unwrap();
    assert_eq!(results.len(), 3);
}

#[tokio::test]
async fn active_only_search_excludes_invalidated() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let stale = store.insert("alice", "User lives in Berlin").await.unwrap();
    store.insert("alice", "User lives in Munich").await.unwrap();
    store.invalidate("alice", stale.id, Utc::now()).await.unwrap();

    let active = store.search("alice", "User lives", 10, true).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].content, "User lives in Munich");

    let all = store.search("alice", "User lives", 10, false).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn update_content_preserves_identity_and_lifecycle() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let record = store.insert("alice", "User lives in Berlin").await.unwrap();
    store
        .update_content("alice", record.id, "User lives in Berlin, Prenzlauer Berg")
        .await
        .unwrap();

    let updated = store.get("alice", record.id).await.unwrap().unwrap();
    assert_eq!(updated.id, record.id);
    assert_eq!(updated.content, "User lives in Berlin, Prenzlauer Berg");
    assert_eq!(
        updated.created_at.timestamp_micros(),
        record.created_at.timestamp_micros()
    );
    assert!(updated.invalidation_time.is_none());
    assert!(updated.updated_at >= record.updated_at);

    // Still exactly one row for this record
    assert_eq!(store.list("alice", true, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_missing_record_errors() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let result = store
        .update_content("alice", uuid::Uuid::new_v4(), "content")
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn invalidate_sets_timestamp_and_keeps_content() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let record = store.insert("alice", "User lives in Berlin").await.unwrap();
    let at = Utc::now();
    store.invalidate("alice", record.id, at).await.unwrap();

    let invalidated = store.get("alice", record.id).await.unwrap().unwrap();
    assert_eq!(invalidated.content, "User lives in Berlin");
    assert_eq!(
        invalidated.invalidation_time.unwrap().timestamp_micros(),
        at.timestamp_micros()
    );
    assert!(!invalidated.is_active());
}

#[tokio::test]
async fn invalidate_twice_errors_and_keeps_first_timestamp() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let record = store.insert("alice", "User lives in Berlin").await.unwrap();
    let first = Utc::now();
    store.invalidate("alice", record.id, first).await.unwrap();

    let again = store.invalidate("alice", record.id, Utc::now()).await;
    assert!(again.is_err());

    let fetched = store.get("alice", record.id).await.unwrap().unwrap();
    assert_eq!(
        fetched.invalidation_time.unwrap().timestamp_micros(),
        first.timestamp_micros()
    );
}

#[tokio::test]
async fn invalidate_missing_record_errors() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let result = store
        .invalidate("alice", uuid::Uuid::new_v4(), Utc::now())
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn list_partitions_by_lifecycle() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    store.insert("alice", "User lives in Munich").await.unwrap();
    let stale = store.insert("alice", "User lives in Berlin").await.unwrap();
    store.invalidate("alice", stale.id, Utc::now()).await.unwrap();

    let active = store.list("alice", true, 10).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].content, "User lives in Munich");

    let invalidated = store.list("alice", false, 10).await.unwrap();
    assert_eq!(invalidated.len(), 1);
    assert_eq!(invalidated[0].content, "User lives in Berlin");
}

#[tokio::test]
async fn records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let record = {
        let store = open_store(&dir).await;
        store.insert("alice", "User lives in Berlin").await.unwrap()
    };

    let reopened = open_store(&dir).await;
    let fetched = reopened.get("alice", record.id).await.unwrap().unwrap();
    assert_eq!(fetched.content, "User lives in Berlin");
}

#[tokio::test]
async fn tenant_names_with_quotes_are_escaped() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let tenant = "o'brien";
    let record = store.insert(tenant, "User lives in Dublin").await.unwrap();

    let fetched = store.get(tenant, record.id).await.unwrap().unwrap();
    assert_eq!(fetched.content, "User lives in Dublin");
    assert_eq!(store.list(tenant, true, 10).await.unwrap().len(), 1);
}
