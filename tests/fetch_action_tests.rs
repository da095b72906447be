//! 拉取动作功能测试

mod common;

use async_trait::async_trait;
use common::{items, page, pay_role, state_with, test_config, ScriptedSource, Step};
use iqms_sync::application::actions::{fetch_all_classes, fetch_class, restore_cached};
use iqms_sync::application::counts::{fetch_faq_list, fetch_frequency_count};
use iqms_sync::domain::error::IqmsError;
use iqms_sync::domain::model::{status_key, QueryClass, QueryItem};
use iqms_sync::domain::role::Level;
use iqms_sync::domain::traits::CacheStore;
use iqms_sync::infrastructure::config::{FetchStrategy, StoreBackend};
use iqms_sync::infrastructure::storage::cache::MemoryStore;
use iqms_sync::state::{AppState, Stores};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

async fn wait_for_items(state: &AppState, key: &str, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while state.board.get(key).map(|s| s.items.len()) != Some(count) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_resolves_after_first_page_while_rest_continues() {
    let gate = Arc::new(Semaphore::new(0));
    let source = Arc::new(ScriptedSource::gated(gate.clone()));
    source.script(
        "U1A",
        vec![
            page(items(0..2), true, Some(2)),
            page(items(2..4), true, Some(2)),
            page(items(4..6), false, Some(2)),
        ],
    );
    let (state, store) = state_with(source.clone(), test_config());
    let mut events = state.events.subscribe();

    let started = fetch_class(&state, QueryClass::Pending, &pay_role(), Level::Creator)
        .await
        .unwrap();

    // Pages 2 and 3 are still held at the gate
    assert_eq!(started.key, "U1A");
    assert_eq!(started.first_page_item_count, 2);
    let status = state.board.get("pending:U1A").unwrap();
    assert!(status.loading);
    assert_eq!(status.items, items(0..2));

    gate.add_permits(1);
    wait_for_items(&state, "pending:U1A", 4).await;
    let status = state.board.get("pending:U1A").unwrap();
    assert!(status.loading);
    assert_eq!(status.items, items(0..4));

    gate.add_permits(1);
    started.finished().await.unwrap();

    let status = state.board.get("pending:U1A").unwrap();
    assert!(!status.loading);
    assert_eq!(status.error, None);
    assert_eq!(status.items, items(0..6));

    let counts: Vec<usize> = (0..3).map(|_| events.try_recv().unwrap().count).collect();
    assert_eq!(counts, vec![2, 4, 6]);
    assert!(events.try_recv().is_err());

    let cached = store.load(QueryClass::Pending.namespace()).await.unwrap();
    assert_eq!(cached["U1A"], items(0..6));
}

#[tokio::test]
async fn test_background_failure_is_recorded_not_raised() {
    let source = Arc::new(ScriptedSource::new());
    source.script(
        "U1A",
        vec![
            page(items(0..2), true, Some(2)),
            Step::Fail("HTTP 503".to_string()),
            page(items(4..6), false, Some(2)),
        ],
    );
    let (state, store) = state_with(source, test_config());

    let started = fetch_class(&state, QueryClass::Transferred, &pay_role(), Level::Creator)
        .await
        .unwrap();
    assert_eq!(started.first_page_item_count, 2);
    started.finished().await.unwrap();

    let status = state.board.get("transferred:U1A").unwrap();
    assert!(!status.loading);
    assert!(status.error.unwrap().contains("HTTP 503"));
    assert_eq!(status.items, items(0..2));

    let cached = store.load(QueryClass::Transferred.namespace()).await.unwrap();
    assert_eq!(cached["U1A"], items(0..2));
}

#[tokio::test]
async fn test_cancel_between_pages_keeps_first_page() {
    let gate = Arc::new(Semaphore::new(0));
    let source = Arc::new(ScriptedSource::gated(gate));
    source.script(
        "U1A",
        vec![
            page(items(0..2), true, Some(2)),
            page(items(2..4), false, Some(2)),
        ],
    );
    let (state, store) = state_with(source, test_config());

    let started = fetch_class(&state, QueryClass::Pending, &pay_role(), Level::Creator)
        .await
        .unwrap();
    assert_eq!(started.first_page_item_count, 2);

    // Page 2 never gets past the gate
    state.shutdown.cancel();
    started.finished().await.unwrap();

    let status = state.board.get("pending:U1A").unwrap();
    assert!(!status.loading);
    assert_eq!(status.error.as_deref(), Some("Operation cancelled"));
    assert_eq!(status.items, items(0..2));

    let cached = store.load(QueryClass::Pending.namespace()).await.unwrap();
    assert_eq!(cached["U1A"], items(0..2));
}

#[tokio::test]
async fn test_failure_before_first_page_is_returned() {
    let source = Arc::new(ScriptedSource::new());
    source.script("U2A", vec![Step::Fail("connection refused".to_string())]);
    let (state, store) = state_with(source, test_config());

    let result = fetch_class(&state, QueryClass::Pending, &pay_role(), Level::Verifier).await;

    assert!(matches!(result, Err(IqmsError::Api(_))));
    let status = state.board.get("pending:U2A").unwrap();
    assert!(!status.loading);
    assert!(status.error.is_some());
    assert!(store.is_empty(QueryClass::Pending.namespace()));
}

#[tokio::test]
async fn test_refetch_overwrites_instead_of_appending() {
    let source = Arc::new(ScriptedSource::new());
    source.script(
        "U1A",
        vec![
            page(items(0..2), true, Some(2)),
            page(items(2..3), false, Some(2)),
            page(items(10..11), false, Some(2)),
        ],
    );
    let (state, store) = state_with(source, test_config());
    let role = pay_role();

    for _ in 0..2 {
        fetch_class(&state, QueryClass::Replied, &role, Level::Creator)
            .await
            .unwrap()
            .finished()
            .await
            .unwrap();
    }

    assert_eq!(state.board.get("replied:U1A").unwrap().items, items(10..11));
    let cached = store.load(QueryClass::Replied.namespace()).await.unwrap();
    assert_eq!(cached["U1A"], items(10..11));
}

#[tokio::test]
async fn test_batch_strategy_posts_role_filters() {
    let source = Arc::new(ScriptedSource::new());
    source.script_batch("U3A", Ok(items(0..4)));
    let mut config = test_config();
    config.classes.pending.strategy = FetchStrategy::Batch;
    config.classes.transferred.strategy = FetchStrategy::Batch;
    let (state, _store) = state_with(source.clone(), config);
    let mut role = pay_role();
    role.cells = vec!["C1".to_string(), "C2".to_string()];

    let started = fetch_class(&state, QueryClass::Pending, &role, Level::Approver)
        .await
        .unwrap();
    assert_eq!(started.first_page_item_count, 4);
    started.finished().await.unwrap();
    fetch_class(&state, QueryClass::Transferred, &role, Level::Approver)
        .await
        .unwrap()
        .finished()
        .await
        .unwrap();

    let requests = source.batch_requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].query_name, "getPendingQueries");
    assert_eq!(requests[0].routing_field, "PEN_WITH");
    assert_eq!(requests[0].routing_code, "U3A");
    assert_eq!(requests[0].module_cat, "A");
    assert_eq!(requests[0].cell, "C1,C2");
    assert_eq!(requests[1].routing_field, "SUB_SECTION");
    assert!(source.page_requests.lock().unwrap().is_empty());

    assert_eq!(state.board.get("pending:U3A").unwrap().items, items(0..4));
}

#[tokio::test]
async fn test_batch_failure_is_returned() {
    let source = Arc::new(ScriptedSource::new());
    source.script_batch("U1A", Err("success=false".to_string()));
    let mut config = test_config();
    config.classes.replied.strategy = FetchStrategy::Batch;
    let (state, _store) = state_with(source, config);

    let result = fetch_class(&state, QueryClass::Replied, &pay_role(), Level::Creator).await;
    assert!(result.is_err());
    assert!(state.board.get("replied:U1A").unwrap().error.is_some());
}

#[tokio::test]
async fn test_each_class_uses_its_configured_store() {
    let source = Arc::new(ScriptedSource::new());
    source.script("U1A", vec![page(items(0..1), false, None)]);

    let file = Arc::new(MemoryStore::new());
    let sqlite = Arc::new(MemoryStore::new());
    let stores = Stores {
        file: file.clone(),
        sqlite: sqlite.clone(),
        memory: Arc::new(MemoryStore::new()),
    };
    let config = test_config();
    assert_eq!(config.classes.replied.store, StoreBackend::Sqlite);
    let state = AppState::new(config, source, stores);

    fetch_class(&state, QueryClass::Replied, &pay_role(), Level::Creator)
        .await
        .unwrap()
        .finished()
        .await
        .unwrap();

    assert_eq!(sqlite.len(QueryClass::Replied.namespace()), 1);
    assert!(file.is_empty(QueryClass::Replied.namespace()));
}

#[tokio::test]
async fn test_fetch_all_classes_runs_every_class() {
    let source = Arc::new(ScriptedSource::new());
    source.script("U2A", vec![page(items(0..3), false, None)]);
    let (state, _store) = state_with(source, test_config());

    let results = fetch_all_classes(&state, &pay_role(), Level::Verifier).await;
    assert_eq!(results.len(), 3);
    for (class, result) in results {
        let started = result.unwrap();
        started.finished().await.unwrap();
        assert!(state.board.get(&status_key(class, "U2A")).is_some());
    }
}

#[tokio::test]
async fn test_restore_hydrates_board_from_cache() {
    let source = Arc::new(ScriptedSource::new());
    let (state, store) = state_with(source, test_config());
    store
        .save(QueryClass::Pending.namespace(), "U1A", &items(0..3))
        .await
        .unwrap();
    store
        .save(QueryClass::Pending.namespace(), "Z9Z", &items(0..1))
        .await
        .unwrap();

    let restored = restore_cached(&state, &pay_role()).await.unwrap();

    assert_eq!(restored, 1);
    let status = state.board.get("pending:U1A").unwrap();
    assert!(!status.loading);
    assert_eq!(status.items.len(), 3);
    assert!(state.board.get("pending:Z9Z").is_none());
}

/// Store whose backing file can't be read
struct UnreadableStore;

#[async_trait]
impl CacheStore for UnreadableStore {
    async fn load(&self, _namespace: &str) -> Result<HashMap<String, Vec<QueryItem>>, IqmsError> {
        Err(IqmsError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "permission denied",
        )))
    }

    async fn save(&self, _namespace: &str, _key: &str, _items: &[QueryItem]) -> Result<(), IqmsError> {
        Ok(())
    }

    async fn remove(&self, _namespace: &str, _key: &str) -> Result<(), IqmsError> {
        Ok(())
    }

    async fn clear(&self, _namespace: &str) -> Result<(), IqmsError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_restore_skips_unreadable_store() {
    let memory = Arc::new(MemoryStore::new());
    let stores = Stores {
        file: Arc::new(UnreadableStore),
        sqlite: memory.clone(),
        memory: memory.clone(),
    };
    let state = AppState::new(test_config(), Arc::new(ScriptedSource::new()), stores);
    memory
        .save(QueryClass::Replied.namespace(), "U2A", &items(0..2))
        .await
        .unwrap();

    // Pending and transferred live in the unreadable file store by default
    let restored = restore_cached(&state, &pay_role()).await.unwrap();

    assert_eq!(restored, 1);
    assert_eq!(state.board.get("replied:U2A").unwrap().items, items(0..2));
    assert!(state.board.get("pending:U2A").is_none());
}

#[tokio::test]
async fn test_faq_retries_until_success() {
    let source = Arc::new(ScriptedSource::new());
    source.fail_faq(2);
    let (state, _store) = state_with(source.clone(), test_config());

    let faq = fetch_faq_list(&state, &state.shutdown).await.unwrap();

    assert_eq!(faq, vec![json!({"q": "How do I raise a pay query?"})]);
    assert_eq!(source.faq_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_faq_gives_up_after_max_attempts() {
    let source = Arc::new(ScriptedSource::new());
    source.fail_faq(10);
    let (state, _store) = state_with(source.clone(), test_config());

    let result = fetch_faq_list(&state, &state.shutdown).await;

    assert!(matches!(result, Err(IqmsError::Api(_))));
    assert_eq!(source.faq_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_frequency_count_uses_role_key() {
    let source = Arc::new(ScriptedSource::new());
    let (state, _store) = state_with(source, test_config());

    let count = fetch_frequency_count(&state, &pay_role(), Level::Verifier, &state.shutdown)
        .await
        .unwrap();
    assert_eq!(count, 3);
}
