//! Export and import of settings snapshots
//!
//! The wire format is a JSON object:
//!
//! ```json
//! { "version": "1.0", "timestamp": "2024-05-01T12:00:00Z", "settings": { "theme": { ... } } }
//! ```
//!
//! Import is best-effort. Payloads may come from another version of the
//! extension, so keys that are unknown, malformed or invalid are skipped and
//! reported instead of failing the whole import.

use crate::config::{Setting, SettingDefinitions, SettingType};
use crate::error::{Error, Result};
use crate::events::SettingsEvent;
use crate::manager::core::{SettingsStore, StoreInner};
use crate::manager::operations::check_value;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

/// Versioned snapshot of every setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportPayload {
    /// Format version
    pub version: String,
    /// When the snapshot was taken (RFC 3339)
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Full settings map at export time
    pub settings: SettingDefinitions,
}

/// Outcome of an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Keys whose values were applied, in key order
    pub imported: Vec<String>,
    /// Keys that were left out and why, in key order
    pub skipped: Vec<SkippedSetting>,
}

/// A key excluded from an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSetting {
    pub key: String,
    pub reason: String,
}

impl SettingsStore {
    // =========================================================================
    // Export
    // =========================================================================

    /// Take a typed snapshot of every setting.
    ///
    /// # Errors
    ///
    /// Returns an initialization error on first use.
    pub async fn export_snapshot(&self) -> Result<ExportPayload> {
        let mut events = Vec::new();
        let result = {
            let mut inner = self.inner.lock().await;
            self.ensure_ready(&mut inner, &mut events)
                .await
                .map(|()| ExportPayload {
                    version: self.config.export_version.clone(),
                    timestamp: OffsetDateTime::now_utc(),
                    settings: inner.settings.clone(),
                })
        };
        self.dispatch(events);
        result
    }

    /// Serialize a snapshot of every setting to JSON.
    ///
    /// The output is accepted unchanged by [`import_settings`](Self::import_settings).
    ///
    /// # Errors
    ///
    /// Returns an initialization or serialization error.
    pub async fn export_settings(&self) -> Result<String> {
        let payload = self.export_snapshot().await?;
        let json = if self.config.pretty_export {
            serde_json::to_string_pretty(&payload)?
        } else {
            serde_json::to_string(&payload)?
        };
        info!("Exported {} settings", payload.settings.len());
        Ok(json)
    }

    // =========================================================================
    // Import
    // =========================================================================

    /// Apply the values of an exported payload.
    ///
    /// Each incoming key is skipped when it is unknown, lacks `type` or
    /// `value`, declares a different type than the current definition, or
    /// fails validation. The accepted keys are stored, persisted in one batch
    /// and announced with an `imported` event.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the payload is not JSON or has no `settings` object (`Error::Format`)
    /// - no key survives filtering (`Error::Import`)
    /// - persisting to storage fails
    pub async fn import_settings(&self, data: &str) -> Result<ImportReport> {
        let incoming = parse_payload(data)?;

        let mut events = Vec::new();
        let result = {
            let mut inner = self.inner.lock().await;
            self.import_locked(&mut inner, incoming, &mut events).await
        };
        self.dispatch(events);
        result
    }

    async fn import_locked(
        &self,
        inner: &mut StoreInner,
        incoming: Map<String, Value>,
        events: &mut Vec<SettingsEvent>,
    ) -> Result<ImportReport> {
        self.ensure_ready(inner, events).await?;

        let mut report = ImportReport::default();
        let mut accepted = Vec::new();

        for (key, record) in incoming {
            match accept_record(&key, &record, &inner.settings) {
                Ok(setting) => {
                    report.imported.push(key.clone());
                    accepted.push((key, setting));
                }
                Err(reason) => {
                    warn!("Skipping imported setting {key}: {reason}");
                    report.skipped.push(SkippedSetting { key, reason });
                }
            }
        }

        if accepted.is_empty() {
            return Err(Error::Import(format!(
                "no valid settings found ({} skipped)",
                report.skipped.len()
            )));
        }

        for (key, setting) in accepted {
            inner.settings.insert(key, setting);
        }
        self.persist(inner, &report.imported).await?;

        info!(
            "Imported {} settings ({} skipped)",
            report.imported.len(),
            report.skipped.len()
        );
        events.push(SettingsEvent::Imported {
            keys: report.imported.clone(),
        });
        Ok(report)
    }
}

fn parse_payload(data: &str) -> Result<Map<String, Value>> {
    let mut payload: Value = serde_json::from_str(data)
        .map_err(|e| Error::Format(format!("import payload is not valid JSON: {e}")))?;

    match payload.get_mut("settings").map(Value::take) {
        Some(Value::Object(settings)) => Ok(settings),
        Some(_) => Err(Error::Format("'settings' must be an object".into())),
        None => Err(Error::Format("import payload has no 'settings' object".into())),
    }
}

/// Check one incoming record against the current definition.
///
/// Returns the updated setting, or the reason it was skipped.
fn accept_record(
    key: &str,
    record: &Value,
    current: &SettingDefinitions,
) -> std::result::Result<Setting, String> {
    let setting = current
        .get(key)
        .ok_or_else(|| "unknown setting".to_string())?;

    let (Some(type_name), Some(value)) = (record.get("type"), record.get("value")) else {
        return Err("record is missing 'type' or 'value'".into());
    };

    let incoming_type = type_name
        .as_str()
        .map(|name| SettingType::from(name.to_string()))
        .ok_or_else(|| "'type' must be a string".to_string())?;
    if incoming_type != setting.setting_type {
        return Err(format!(
            "type mismatch (expected {}, got {incoming_type})",
            setting.setting_type
        ));
    }

    check_value(key, setting, value).map_err(|e| e.to_string())?;
    Ok(setting.with_value(value.clone()))
}
