use crate::config::SettingDefinitions;
use crate::error::{Error, Result};
use crate::events::SettingsEvent;
use crate::manager::core::{SettingsStore, StoreInner, StoreState};
use crate::storage::{AreaStore, StorageArea, StoredRecords};
use crate::validation;

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;

// =============================================================================
// Diagnostics Types
// =============================================================================

/// Outcome of an advisory storage query
///
/// Serialized untagged, so a failure is exactly `{ "error": "<reason>" }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StorageReport<T> {
    /// The query succeeded
    Ready(T),
    /// The backend failed; the reason is reported instead of raised
    Failed { error: String },
}

impl<T> StorageReport<T> {
    /// The successful payload, if any
    pub fn ok(self) -> Option<T> {
        match self {
            StorageReport::Ready(value) => Some(value),
            StorageReport::Failed { .. } => None,
        }
    }

    /// The failure reason, if any
    pub fn error(&self) -> Option<&str> {
        match self {
            StorageReport::Ready(_) => None,
            StorageReport::Failed { error } => Some(error),
        }
    }
}

/// Usage of the active storage area
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub area: StorageArea,
    /// `None` when the backend cannot measure usage
    pub bytes_in_use: Option<u64>,
    /// Settings held in memory
    pub setting_count: usize,
    /// Records present in the storage area
    pub stored_count: usize,
}

/// Quota usage of the active storage area
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
    pub area: StorageArea,
    pub bytes_in_use: Option<u64>,
    pub quota_bytes: Option<u64>,
    /// Percentage of the quota in use, when both numbers are known
    pub percent_used: Option<f64>,
    /// Usage is at or above the configured warning ratio
    pub near_limit: bool,
}

impl SettingsStore {
    // =========================================================================
    // Initialization
    // =========================================================================

    /// Merge defaults with stored values and mark the store ready.
    ///
    /// Always reloads, even when already initialized. Emits `initialized`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the defaults cannot be loaded, or a
    /// storage error if the active area cannot be read.
    pub async fn initialize(&self) -> Result<()> {
        let mut events = Vec::new();
        let result = {
            let mut inner = self.inner.lock().await;
            self.initialize_locked(&mut inner, &mut events).await
        };
        self.dispatch(events);
        result
    }

    /// Initialize if needed; at most once until destroyed or reset.
    pub(crate) async fn ensure_ready(
        &self,
        inner: &mut StoreInner,
        events: &mut Vec<SettingsEvent>,
    ) -> Result<()> {
        if inner.state == StoreState::Ready {
            return Ok(());
        }
        self.initialize_locked(inner, events).await
    }

    pub(crate) async fn initialize_locked(
        &self,
        inner: &mut StoreInner,
        events: &mut Vec<SettingsEvent>,
    ) -> Result<()> {
        inner.state = StoreState::Initializing;

        match self.load_merged(inner.store.as_ref()).await {
            Ok(settings) => {
                info!(
                    "Settings initialized: {} settings from '{}' storage",
                    settings.len(),
                    inner.area
                );
                inner.settings = settings;
                inner.state = StoreState::Ready;
                events.push(SettingsEvent::Initialized {
                    settings: inner.settings.clone(),
                });
                Ok(())
            }
            Err(e) => {
                inner.state = StoreState::Uninitialized;
                Err(e)
            }
        }
    }

    /// Overlay stored values onto freshly loaded defaults
    async fn load_merged(&self, store: &dyn AreaStore) -> Result<SettingDefinitions> {
        let mut settings = self.source.load(self.config.load_strategy).await?;
        let stored = store.get_all().await?;

        for (key, setting) in &mut settings {
            let Some(value) = stored.get(key).and_then(stored_value) else {
                continue;
            };
            match validation::validate(setting, value) {
                Ok(()) => setting.value = value.clone(),
                Err(e) => warn!("Ignoring stored value for {key}, keeping default: {e}"),
            }
        }

        let unknown = stored.keys().filter(|k| !settings.contains_key(*k)).count();
        if unknown > 0 {
            debug!("{unknown} stored records have no definition and were ignored");
        }

        Ok(settings)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Write the in-memory records for `keys` to the active area in one batch
    pub(crate) async fn persist(&self, inner: &StoreInner, keys: &[String]) -> Result<()> {
        let mut records = StoredRecords::new();
        for key in keys {
            if let Some(setting) = inner.settings.get(key) {
                records.insert(key.clone(), serde_json::to_value(setting)?);
            }
        }
        let count = records.len();
        inner.store.set(records).await?;
        debug!("Persisted {count} settings to '{}' storage", inner.area);
        Ok(())
    }

    /// Clear the active area and reload defaults.
    ///
    /// Emits `initialized` followed by `reset` carrying the merged settings.
    ///
    /// # Errors
    ///
    /// Returns an error if clearing storage or reinitializing fails.
    pub async fn reset_to_defaults(&self) -> Result<()> {
        let mut events = Vec::new();
        let result = {
            let mut inner = self.inner.lock().await;
            self.reset_locked(&mut inner, &mut events).await
        };
        self.dispatch(events);
        result
    }

    async fn reset_locked(
        &self,
        inner: &mut StoreInner,
        events: &mut Vec<SettingsEvent>,
    ) -> Result<()> {
        inner.store.clear().await?;
        inner.settings.clear();
        inner.state = StoreState::Uninitialized;

        self.initialize_locked(inner, events).await?;
        events.push(SettingsEvent::Reset {
            settings: inner.settings.clone(),
        });
        info!("All settings reset to defaults");
        Ok(())
    }

    /// Direct subsequent writes to `area`.
    ///
    /// Existing data is not migrated between areas and in-memory values are
    /// kept as they are.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArea` if the backend lacks `area`; the active
    /// area is left unchanged.
    pub async fn set_storage_area(&self, area: StorageArea) -> Result<()> {
        let store = self
            .backend
            .area(area)
            .ok_or_else(|| Error::InvalidArea(format!("storage backend has no '{area}' area")))?;

        let mut inner = self.inner.lock().await;
        inner.area = area;
        inner.store = store;
        info!("Settings storage area set to '{area}'");
        Ok(())
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Usage statistics for the active area.
    ///
    /// Backend failures are reported in the payload, never raised.
    pub async fn get_storage_stats(&self) -> StorageReport<StorageStats> {
        let inner = self.inner.lock().await;

        let stats = async {
            let stored = inner.store.get_all().await?;
            let bytes_in_use = inner.store.bytes_in_use().await?;
            Ok::<_, Error>(StorageStats {
                area: inner.area,
                bytes_in_use,
                setting_count: inner.settings.len(),
                stored_count: stored.len(),
            })
        }
        .await;

        match stats {
            Ok(stats) => StorageReport::Ready(stats),
            Err(e) => {
                warn!("Failed to read storage stats: {e}");
                StorageReport::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Quota usage for the active area.
    ///
    /// Backend failures are reported in the payload, never raised.
    pub async fn check_storage_quota(&self) -> StorageReport<QuotaStatus> {
        let inner = self.inner.lock().await;

        let usage = async {
            let bytes_in_use = inner.store.bytes_in_use().await?;
            let quota_bytes = inner.store.quota_bytes().await?;
            Ok::<_, Error>((bytes_in_use, quota_bytes))
        }
        .await;

        match usage {
            Ok((bytes_in_use, quota_bytes)) => {
                let ratio = match (bytes_in_use, quota_bytes) {
                    (Some(used), Some(quota)) if quota > 0 => Some(used as f64 / quota as f64),
                    _ => None,
                };
                StorageReport::Ready(QuotaStatus {
                    area: inner.area,
                    bytes_in_use,
                    quota_bytes,
                    percent_used: ratio.map(|r| r * 100.0),
                    near_limit: ratio.is_some_and(|r| r >= self.config.quota_warning_ratio),
                })
            }
            Err(e) => {
                warn!("Failed to check storage quota: {e}");
                StorageReport::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

/// Value of a stored record, if it has one
fn stored_value(record: &Value) -> Option<&Value> {
    record.get("value")
}
