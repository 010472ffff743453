//! Common test utilities for extman integration tests
//!
//! Provides shared defaults, store fixtures, event recorders and a storage
//! backend whose failures can be switched on.

#![allow(dead_code)]

use async_trait::async_trait;
use extman::{
    AreaStore, Error, MemoryStorage, Result, Setting, SettingDefinitions, SettingsEvent,
    SettingsStore, StaticSource, StorageArea, StorageBackend, StoredRecords, settings,
};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Route library logs to the test harness (`RUST_LOG=debug` to see them)
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// =============================================================================
// Test Definitions
// =============================================================================

/// Defaults covering every supported setting type
pub fn default_settings() -> SettingDefinitions {
    settings! {
        "theme" => Setting::select("Theme", "dark", [("light", "Light"), ("dark", "Dark"), ("auto", "System")]),
        "volume" => Setting::number("Volume", 5.0).min(0.0).max(10.0),
        "nickname" => Setting::text("Nickname", "guest").max_length(8),
        "signature" => Setting::longtext("Signature", "").max_length(200),
        "notifications" => Setting::boolean("Notifications", true),
        "shortcuts" => Setting::json("Shortcuts", json!({"open": "Ctrl+O"})),
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A store over in-memory storage, with a handle on that storage
pub struct TestFixture {
    pub store: SettingsStore,
    pub storage: MemoryStorage,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_storage(MemoryStorage::new())
    }

    pub fn with_storage(storage: MemoryStorage) -> Self {
        init_logging();
        let store = SettingsStore::builder(StaticSource::new(default_settings()), storage.clone())
            .build()
            .unwrap();
        Self { store, storage }
    }

    /// Records currently held in `area`
    pub async fn stored(&self, area: StorageArea) -> StoredRecords {
        self.storage.area(area).unwrap().get_all().await.unwrap()
    }

    /// Value persisted for `key` in `area`, if any
    pub async fn stored_value(&self, area: StorageArea, key: &str) -> Option<Value> {
        self.stored(area)
            .await
            .get(key)
            .and_then(|record| record.get("value").cloned())
    }
}

/// Collects `(name, data)` for every event a store emits
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<(String, Value)>>>,
}

impl EventLog {
    pub fn attach(store: &SettingsStore) -> Self {
        let log = Self::default();
        let events = log.events.clone();
        store.on_event(move |event: &SettingsEvent| {
            events
                .lock()
                .unwrap()
                .push((event.name().to_string(), event.data()));
        });
        log
    }

    pub fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn all(&self) -> Vec<(String, Value)> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

// =============================================================================
// Failing Storage
// =============================================================================

/// Single-area backend whose writes fail while `fail_writes` is set
#[derive(Clone, Default)]
pub struct FlakyStorage {
    area: Arc<FlakyArea>,
}

#[derive(Default)]
struct FlakyArea {
    records: Mutex<StoredRecords>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.area.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.area.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn records(&self) -> StoredRecords {
        self.area.records.lock().unwrap().clone()
    }

    pub fn seed(&self, key: &str, record: Value) {
        self.area
            .records
            .lock()
            .unwrap()
            .insert(key.to_string(), record);
    }
}

impl StorageBackend for FlakyStorage {
    fn area(&self, area: StorageArea) -> Option<Arc<dyn AreaStore>> {
        match area {
            StorageArea::Local => Some(self.area.clone() as Arc<dyn AreaStore>),
            StorageArea::Sync => None,
        }
    }
}

fn injected(reason: &str) -> Error {
    Error::Storage {
        area: "local".into(),
        reason: reason.into(),
    }
}

#[async_trait]
impl AreaStore for FlakyArea {
    async fn get_all(&self) -> Result<StoredRecords> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(injected("injected read failure"));
        }
        Ok(self.records.lock().unwrap().clone())
    }

    async fn set(&self, records: StoredRecords) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("injected write failure"));
        }
        self.records.lock().unwrap().extend(records);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.records.lock().unwrap().clear();
        Ok(())
    }

    async fn bytes_in_use(&self) -> Result<Option<u64>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(injected("injected read failure"));
        }
        Ok(Some(0))
    }
}

/// A store over [`FlakyStorage`]
pub fn flaky_store(storage: &FlakyStorage) -> SettingsStore {
    init_logging();
    SettingsStore::builder(StaticSource::new(default_settings()), storage.clone())
        .build()
        .unwrap()
}
