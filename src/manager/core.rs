use crate::config::{ConfigurationSource, SettingDefinitions, SettingsConfig};
use crate::error::{Error, Result};
use crate::events::{Listener, ListenerRegistry, SettingsEvent};
use crate::storage::{AreaStore, StorageArea, StorageBackend};

use log::info;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Lifecycle state of a [`SettingsStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// Nothing loaded; the next operation initializes
    Uninitialized,
    /// Defaults and stored values are being merged
    Initializing,
    /// Settings are in memory and usable
    Ready,
}

/// Settings store merging declarative defaults with persisted user values.
///
/// The `SettingsStore` owns the in-memory settings map and is the only path for
/// reads and writes:
///
/// - **Merge**: defaults from a [`ConfigurationSource`] overlaid with values
///   from the active storage area
/// - **Validate**: every write is checked against the setting's type and
///   constraints before memory changes
/// - **Persist**: accepted values are written to the active [`StorageArea`]
/// - **Notify**: listeners receive an event after each state transition
///
/// Operations run one at a time per store: the state sits behind an async
/// mutex held across validate, mutate and persist. Listeners are notified after
/// the mutex is released.
///
/// # Example
///
/// ```rust
/// use extman::{MemoryStorage, Setting, SettingsStore, StaticSource, settings};
/// use serde_json::json;
///
/// # async fn example() -> extman::Result<()> {
/// let defaults = settings! {
///     "volume" => Setting::number("Volume", 5.0).min(0.0).max(10.0),
/// };
/// let store = SettingsStore::builder(StaticSource::new(defaults), MemoryStorage::new()).build()?;
///
/// store.update_setting("volume", json!(7)).await?;
/// assert_eq!(store.get_setting("volume").await?.value, json!(7));
/// assert!(store.update_setting("volume", json!(11)).await.is_err());
/// # Ok(())
/// # }
/// ```
pub struct SettingsStore {
    /// Configuration
    pub(crate) config: SettingsConfig,

    /// Source of setting definitions
    pub(crate) source: Arc<dyn ConfigurationSource>,

    /// Provider of storage areas
    pub(crate) backend: Arc<dyn StorageBackend>,

    /// Mutable state, one operation at a time
    pub(crate) inner: Mutex<StoreInner>,

    /// Registered listeners
    pub(crate) listeners: ListenerRegistry,
}

pub(crate) struct StoreInner {
    pub(crate) state: StoreState,
    pub(crate) settings: SettingDefinitions,
    pub(crate) area: StorageArea,
    pub(crate) store: Arc<dyn AreaStore>,
}

impl SettingsStore {
    /// Create a new settings store with the given configuration.
    ///
    /// Nothing is loaded yet; the first operation (or an explicit
    /// [`initialize`](Self::initialize)) merges defaults and stored values.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArea` if the backend lacks the configured area.
    pub fn new(
        config: SettingsConfig,
        source: Arc<dyn ConfigurationSource>,
        backend: Arc<dyn StorageBackend>,
    ) -> Result<Self> {
        let area = config.storage_area;
        let store = backend
            .area(area)
            .ok_or_else(|| Error::InvalidArea(format!("storage backend has no '{area}' area")))?;

        info!("Created settings store using '{area}' storage");

        Ok(Self {
            config,
            source,
            backend,
            inner: Mutex::new(StoreInner {
                state: StoreState::Uninitialized,
                settings: SettingDefinitions::new(),
                area,
                store,
            }),
            listeners: ListenerRegistry::new(),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &SettingsConfig {
        &self.config
    }

    /// Current lifecycle state
    pub async fn state(&self) -> StoreState {
        self.inner.lock().await.state
    }

    /// Area currently receiving writes
    pub async fn storage_area(&self) -> StorageArea {
        self.inner.lock().await.area
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Register a listener for `initialized`, `updated`, `imported` and
    /// `reset` events.
    ///
    /// Re-adding the same listener is a no-op. Returns `true` if it was added.
    pub fn add_listener(&self, listener: Listener) -> bool {
        self.listeners.add(listener)
    }

    /// Register a closure and return its handle for later removal.
    pub fn on_event<F>(&self, callback: F) -> Listener
    where
        F: Fn(&SettingsEvent) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(callback);
        self.listeners.add(listener.clone());
        listener
    }

    /// Unregister a listener. Absent listeners are ignored.
    pub fn remove_listener(&self, listener: &Listener) -> bool {
        self.listeners.remove(listener)
    }

    /// Deliver queued events; called once the state lock is released.
    pub(crate) fn dispatch(&self, events: Vec<SettingsEvent>) {
        for event in &events {
            self.listeners.notify(event);
        }
    }

    /// Release all in-memory settings and listeners.
    ///
    /// The store returns to [`StoreState::Uninitialized`]; the next operation
    /// reloads from the configuration source and storage.
    pub async fn destroy(&self) {
        let mut inner = self.inner.lock().await;
        inner.settings.clear();
        inner.state = StoreState::Uninitialized;
        self.listeners.clear();
        info!("Settings store destroyed");
    }
}
