//! Settings Workflow Integration Tests
//!
//! Tests for the complete store lifecycle including:
//! - Lazy and explicit initialization
//! - Single and batch updates
//! - Merging stored values over defaults
//! - Reset and storage area switching
//! - Listener notifications

mod common;

use common::{EventLog, TestFixture, default_settings};
use extman::{
    AreaStore, Error, MemoryStorage, StaticSource, StorageArea, StorageBackend, StoreState,
    SettingsStore,
};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// =============================================================================
// Initialization
// =============================================================================

#[tokio::test]
async fn test_first_read_initializes_with_defaults() {
    let fixture = TestFixture::new();
    let events = EventLog::attach(&fixture.store);
    assert_eq!(fixture.store.state().await, StoreState::Uninitialized);

    let theme = fixture.store.get_setting("theme").await.unwrap();

    assert_eq!(theme.value, json!("dark"));
    assert_eq!(fixture.store.state().await, StoreState::Ready);
    assert_eq!(events.names(), vec!["initialized"]);

    // Already ready: no second initialization
    fixture.store.get_setting("volume").await.unwrap();
    assert_eq!(events.names(), vec!["initialized"]);
}

#[tokio::test]
async fn test_merge_is_idempotent() {
    let fixture = TestFixture::new();
    fixture
        .store
        .update_setting("theme", json!("light"))
        .await
        .unwrap();

    fixture.store.initialize().await.unwrap();
    let first = fixture.store.get_all_settings().await.unwrap();
    fixture.store.initialize().await.unwrap();
    let second = fixture.store.get_all_settings().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first["theme"].value, json!("light"));
}

#[tokio::test]
async fn test_stored_values_override_defaults() {
    let storage = MemoryStorage::new();
    {
        let fixture = TestFixture::with_storage(storage.clone());
        fixture
            .store
            .update_setting("nickname", json!("ada"))
            .await
            .unwrap();
    }

    // A new store over the same storage picks the value up
    let fixture = TestFixture::with_storage(storage);
    let nickname = fixture.store.get_setting("nickname").await.unwrap();
    assert_eq!(nickname.value, json!("ada"));
    assert_eq!(nickname.constraints.max_length, Some(8));
}

#[tokio::test]
async fn test_invalid_stored_values_are_ignored() {
    let storage = MemoryStorage::new();
    let local = storage.area(StorageArea::Local).unwrap();
    local
        .set(
            [
                ("volume".to_string(), json!({"type": "number", "value": 99})),
                ("theme".to_string(), json!({"type": "enum", "value": "light"})),
                ("retired".to_string(), json!({"type": "text", "value": "x"})),
            ]
            .into_iter()
            .collect(),
        )
        .await
        .unwrap();

    let fixture = TestFixture::with_storage(storage);
    let all = fixture.store.get_all_settings().await.unwrap();

    assert_eq!(all["volume"].value, json!(5.0));
    assert_eq!(all["theme"].value, json!("light"));
    assert!(!all.contains_key("retired"));
}

#[tokio::test]
async fn test_configuration_failure_leaves_store_uninitialized() {
    let store = SettingsStore::builder(
        extman::FileSource::new("/nonexistent/defaults.json"),
        MemoryStorage::new(),
    )
    .build()
    .unwrap();

    let err = store.get_setting("theme").await.unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert_eq!(store.state().await, StoreState::Uninitialized);
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn test_single_read_of_unknown_key_fails() {
    let fixture = TestFixture::new();
    let err = fixture.store.get_setting("missing").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_batch_read_omits_unknown_keys() {
    let fixture = TestFixture::new();
    let found = fixture
        .store
        .get_settings(["theme", "missing", "volume"])
        .await
        .unwrap();

    assert_eq!(found.len(), 2);
    assert!(found.contains_key("theme"));
    assert!(found.contains_key("volume"));
}

#[tokio::test]
async fn test_get_all_returns_a_copy() {
    let fixture = TestFixture::new();
    let mut all = fixture.store.get_all_settings().await.unwrap();
    all.get_mut("theme").unwrap().value = json!("light");

    let theme = fixture.store.get_setting("theme").await.unwrap();
    assert_eq!(theme.value, json!("dark"));
    assert_eq!(all.len(), default_settings().len());
}

// =============================================================================
// Single Updates
// =============================================================================

#[tokio::test]
async fn test_update_setting_persists_and_notifies() {
    let fixture = TestFixture::new();
    fixture.store.initialize().await.unwrap();
    let events = EventLog::attach(&fixture.store);

    fixture
        .store
        .update_setting("volume", json!(7))
        .await
        .unwrap();

    assert_eq!(
        fixture.store.get_setting("volume").await.unwrap().value,
        json!(7)
    );
    assert_eq!(
        fixture.stored_value(StorageArea::Local, "volume").await,
        Some(json!(7))
    );
    assert_eq!(
        events.all(),
        vec![("updated".to_string(), json!({"key": "volume", "value": 7}))]
    );
}

#[tokio::test]
async fn test_update_setting_out_of_range_is_rejected() {
    let fixture = TestFixture::new();

    let err = fixture
        .store
        .update_setting("volume", json!(11))
        .await
        .unwrap_err();

    match err {
        Error::InvalidSettingValue { key, reason } => {
            assert_eq!(key, "volume");
            assert!(reason.contains("10"), "reason was: {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        fixture.store.get_setting("volume").await.unwrap().value,
        json!(5.0)
    );
    assert_eq!(fixture.stored_value(StorageArea::Local, "volume").await, None);
}

#[tokio::test]
async fn test_update_unknown_key_fails() {
    let fixture = TestFixture::new();
    let err = fixture
        .store
        .update_setting("missing", json!(true))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SettingNotFound(ref key) if key == "missing"));
}

// =============================================================================
// Batch Updates
// =============================================================================

#[tokio::test]
async fn test_batch_with_invalid_pair_mutates_nothing() {
    let fixture = TestFixture::new();
    fixture.store.initialize().await.unwrap();
    let events = EventLog::attach(&fixture.store);

    let err = fixture
        .store
        .update_settings([
            ("theme", json!("light")),
            ("nickname", json!("far too long")),
            ("volume", json!(-1)),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidSettingValue { ref key, .. } if key == "nickname"));
    let all = fixture.store.get_all_settings().await.unwrap();
    assert_eq!(all["theme"].value, json!("dark"));
    assert!(fixture.stored(StorageArea::Local).await.is_empty());
    assert!(events.names().is_empty());
}

#[tokio::test]
async fn test_batch_with_unknown_key_mutates_nothing() {
    let fixture = TestFixture::new();
    let err = fixture
        .store
        .update_settings([("theme", json!("light")), ("missing", json!(1))])
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(
        fixture.store.get_setting("theme").await.unwrap().value,
        json!("dark")
    );
}

#[tokio::test]
async fn test_batch_update_applies_all_with_one_event() {
    let fixture = TestFixture::new();
    fixture.store.initialize().await.unwrap();
    let events = EventLog::attach(&fixture.store);

    fixture
        .store
        .update_settings([
            ("theme", json!("auto")),
            ("notifications", json!(false)),
        ])
        .await
        .unwrap();

    assert_eq!(
        events.all(),
        vec![(
            "updated".to_string(),
            json!({"theme": "auto", "notifications": false})
        )]
    );
    assert_eq!(
        fixture.stored_value(StorageArea::Local, "theme").await,
        Some(json!("auto"))
    );
    assert_eq!(
        fixture
            .stored_value(StorageArea::Local, "notifications")
            .await,
        Some(json!(false))
    );
}

#[tokio::test]
async fn test_one_key_batch_keeps_map_payload() {
    let fixture = TestFixture::new();
    fixture.store.initialize().await.unwrap();
    let events = EventLog::attach(&fixture.store);

    fixture
        .store
        .update_settings([("volume", json!(4))])
        .await
        .unwrap();
    fixture
        .store
        .update_setting("volume", json!(6))
        .await
        .unwrap();

    assert_eq!(
        events.all(),
        vec![
            ("updated".to_string(), json!({"volume": 4})),
            ("updated".to_string(), json!({"key": "volume", "value": 6})),
        ]
    );
}

#[tokio::test]
async fn test_empty_batch_is_a_no_op() {
    let fixture = TestFixture::new();
    fixture.store.initialize().await.unwrap();
    let events = EventLog::attach(&fixture.store);

    let empty: Vec<(String, serde_json::Value)> = Vec::new();
    fixture.store.update_settings(empty).await.unwrap();

    assert!(events.names().is_empty());
    assert!(fixture.stored(StorageArea::Local).await.is_empty());
}

// =============================================================================
// Reset
// =============================================================================

#[tokio::test]
async fn test_reset_restores_defaults_and_clears_storage() {
    let fixture = TestFixture::new();
    fixture
        .store
        .update_setting("theme", json!("light"))
        .await
        .unwrap();
    let events = EventLog::attach(&fixture.store);

    fixture.store.reset_to_defaults().await.unwrap();

    assert_eq!(
        fixture.store.get_setting("theme").await.unwrap().value,
        json!("dark")
    );
    assert!(fixture.stored(StorageArea::Local).await.is_empty());
    assert_eq!(events.names(), vec!["initialized", "reset"]);
    assert_eq!(events.all()[1].1["theme"]["value"], json!("dark"));
}

// =============================================================================
// Storage Areas
// =============================================================================

#[tokio::test]
async fn test_switching_area_redirects_writes() {
    let fixture = TestFixture::new();
    fixture
        .store
        .update_setting("theme", json!("light"))
        .await
        .unwrap();

    fixture
        .store
        .set_storage_area(StorageArea::Sync)
        .await
        .unwrap();
    assert_eq!(fixture.store.storage_area().await, StorageArea::Sync);

    // In-memory values survive the switch; nothing is migrated
    assert_eq!(
        fixture.store.get_setting("theme").await.unwrap().value,
        json!("light")
    );
    assert!(fixture.stored(StorageArea::Sync).await.is_empty());

    fixture
        .store
        .update_setting("volume", json!(3))
        .await
        .unwrap();
    assert_eq!(
        fixture.stored_value(StorageArea::Sync, "volume").await,
        Some(json!(3))
    );
    assert_eq!(fixture.stored_value(StorageArea::Local, "volume").await, None);
}

#[tokio::test]
async fn test_switching_to_missing_area_fails() {
    let fixture = TestFixture::with_storage(MemoryStorage::local_only());

    let err = fixture
        .store
        .set_storage_area(StorageArea::Sync)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidArea(_)));
    assert_eq!(fixture.store.storage_area().await, StorageArea::Local);
}

#[tokio::test]
async fn test_building_over_missing_area_fails() {
    let result = SettingsStore::builder(
        StaticSource::new(default_settings()),
        MemoryStorage::local_only(),
    )
    .storage_area(StorageArea::Sync)
    .build();

    assert!(matches!(result, Err(Error::InvalidArea(_))));
}

// =============================================================================
// Listeners and Teardown
// =============================================================================

#[tokio::test]
async fn test_removed_listener_is_not_called() {
    let fixture = TestFixture::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    let handle = fixture.store.on_event(move |_event| {
        calls_clone.fetch_add(1, Ordering::SeqCst);
    });

    // Same handle registers once
    assert!(!fixture.store.add_listener(handle.clone()));

    fixture.store.initialize().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(fixture.store.remove_listener(&handle));
    assert!(!fixture.store.remove_listener(&handle));

    fixture.store.initialize().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_destroy_drops_state_and_listeners() {
    let fixture = TestFixture::new();
    fixture
        .store
        .update_setting("theme", json!("light"))
        .await
        .unwrap();
    let events = EventLog::attach(&fixture.store);

    fixture.store.destroy().await;
    assert_eq!(fixture.store.state().await, StoreState::Uninitialized);

    // Next use reloads from storage; the old listener is gone
    let theme = fixture.store.get_setting("theme").await.unwrap();
    assert_eq!(theme.value, json!("light"));
    assert!(events.names().is_empty());
}
