use crate::config::{Setting, SettingDefinitions};
use crate::error::{Error, Result};
use crate::events::SettingsEvent;
use crate::manager::core::{SettingsStore, StoreInner};
use crate::validation::{self, RuleViolation};

use log::{debug, info};
use serde_json::Value;
use std::collections::BTreeMap;

/// Lift a validator verdict into a store error naming `key`
pub(crate) fn check_value(key: &str, setting: &Setting, value: &Value) -> Result<()> {
    validation::validate(setting, value).map_err(|violation| match violation {
        RuleViolation::Invalid(reason) => Error::InvalidSettingValue {
            key: key.to_string(),
            reason,
        },
        RuleViolation::UnknownType(setting_type) => Error::UnknownType {
            key: key.to_string(),
            setting_type,
        },
    })
}

impl SettingsStore {
    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a copy of one setting.
    ///
    /// # Errors
    ///
    /// Returns `Error::SettingNotFound` if `key` is not defined, or an
    /// initialization error on first use.
    pub async fn get_setting(&self, key: &str) -> Result<Setting> {
        let mut events = Vec::new();
        let result = {
            let mut inner = self.inner.lock().await;
            match self.ensure_ready(&mut inner, &mut events).await {
                Ok(()) => inner
                    .settings
                    .get(key)
                    .cloned()
                    .ok_or_else(|| Error::SettingNotFound(key.to_string())),
                Err(e) => Err(e),
            }
        };
        self.dispatch(events);
        result
    }

    /// Get copies of several settings.
    ///
    /// Best-effort: keys that are not defined are left out of the result
    /// rather than reported as errors.
    ///
    /// # Errors
    ///
    /// Returns an initialization error on first use.
    pub async fn get_settings<I, K>(&self, keys: I) -> Result<SettingDefinitions>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys: Vec<K> = keys.into_iter().collect();
        let mut events = Vec::new();
        let result = {
            let mut inner = self.inner.lock().await;
            self.ensure_ready(&mut inner, &mut events).await.map(|()| {
                keys.iter()
                    .filter_map(|key| {
                        let key = key.as_ref();
                        inner
                            .settings
                            .get(key)
                            .map(|setting| (key.to_string(), setting.clone()))
                    })
                    .collect()
            })
        };
        self.dispatch(events);
        result
    }

    /// Get a snapshot of every setting.
    ///
    /// # Errors
    ///
    /// Returns an initialization error on first use.
    pub async fn get_all_settings(&self) -> Result<SettingDefinitions> {
        let mut events = Vec::new();
        let result = {
            let mut inner = self.inner.lock().await;
            self.ensure_ready(&mut inner, &mut events)
                .await
                .map(|()| inner.settings.clone())
        };
        self.dispatch(events);
        result
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Validate, store and persist a single value.
    ///
    /// Memory is updated before the write to storage. If persisting fails the
    /// error is returned and the in-memory value is kept; it is not rolled
    /// back. Emits `updated` with `{key, value}` on success.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `key` is not defined (`Error::SettingNotFound`)
    /// - the value fails validation (`Error::InvalidSettingValue`)
    /// - the setting has an unsupported type (`Error::UnknownType`)
    /// - persisting to storage fails
    pub async fn update_setting(&self, key: &str, value: Value) -> Result<()> {
        let mut events = Vec::new();
        let result = {
            let mut inner = self.inner.lock().await;
            self.update_locked(&mut inner, vec![(key.to_string(), value.clone())], &mut events)
                .await
        };
        let result = result.map(|_| {
            events.push(SettingsEvent::Updated {
                key: key.to_string(),
                value,
            });
        });
        self.dispatch(events);
        result
    }

    /// Validate every pair, then store and persist them as one batch.
    ///
    /// Nothing is mutated or persisted unless every key exists and every value
    /// is valid. An empty batch does nothing. Emits one `updated` event
    /// carrying the whole batch as a map, whatever its size.
    ///
    /// # Errors
    ///
    /// Returns the error for the first offending key (in the order given), or
    /// a storage error if persisting fails.
    pub async fn update_settings<I, K>(&self, updates: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let updates: Vec<(String, Value)> = updates
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect();

        let mut events = Vec::new();
        let result = {
            let mut inner = self.inner.lock().await;
            self.update_locked(&mut inner, updates, &mut events).await
        };
        let result = result.map(|changes| {
            if let Some(changes) = changes {
                events.push(SettingsEvent::BatchUpdated { changes });
            }
        });
        self.dispatch(events);
        result
    }

    /// Validate, store and persist `updates`; returns the applied changes, or
    /// `None` for an empty batch
    async fn update_locked(
        &self,
        inner: &mut StoreInner,
        updates: Vec<(String, Value)>,
        events: &mut Vec<SettingsEvent>,
    ) -> Result<Option<BTreeMap<String, Value>>> {
        self.ensure_ready(inner, events).await?;

        if updates.is_empty() {
            debug!("Empty settings batch, nothing to update");
            return Ok(None);
        }

        // Validate everything before touching memory
        for (key, value) in &updates {
            let setting = inner
                .settings
                .get(key)
                .ok_or_else(|| Error::SettingNotFound(key.clone()))?;
            check_value(key, setting, value)?;
        }

        let mut changes = BTreeMap::new();
        for (key, value) in updates {
            if let Some(setting) = inner.settings.get(&key) {
                let updated = setting.with_value(value.clone());
                inner.settings.insert(key.clone(), updated);
            }
            changes.insert(key, value);
        }

        let keys: Vec<String> = changes.keys().cloned().collect();
        self.persist(inner, &keys).await?;

        if keys.len() == 1 {
            info!("Setting {} updated", keys[0]);
        } else {
            info!("{} settings updated", keys.len());
        }
        Ok(Some(changes))
    }
}
