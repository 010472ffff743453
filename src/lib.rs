//! # extman - extension settings manager
//!
//! Settings subsystem for browser extensions: declarative defaults merged with
//! persisted user values, validated on every write, stored in a local or
//! synced storage area and announced to listeners.
//!
//! ## Features
//!
//! - **Merge**: defaults from a [`ConfigurationSource`] overlaid with stored values
//! - **Validation**: type and constraint checks for `boolean`, `text`, `longtext`,
//!   `number`, `json` and `enum` settings
//! - **Storage Areas**: `local` and `sync` areas behind a [`StorageBackend`]
//! - **Import/Export**: versioned JSON snapshots, imported best-effort
//! - **Events**: `initialized`, `updated`, `imported` and `reset` notifications
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use extman::{FileSource, JsonFileStorage, SettingsStore};
//! use serde_json::json;
//!
//! # async fn run() -> extman::Result<()> {
//! let store = SettingsStore::builder(
//!     FileSource::new("defaults.json"),
//!     JsonFileStorage::in_config_dir("my-extension"),
//! )
//! .build()?;
//!
//! store.on_event(|event| println!("settings {}: {}", event.name(), event.data()));
//!
//! store.update_setting("theme", json!("light")).await?;
//! let theme = store.get_setting("theme").await?;
//! println!("theme = {}", theme.value);
//! # Ok(())
//! # }
//! ```
//!
//! ## Defining Settings
//!
//! ```rust
//! use extman::{Setting, settings};
//! use serde_json::json;
//!
//! let defaults = settings! {
//!     "theme" => Setting::select("Theme", "dark", [("light", "Light"), ("dark", "Dark")]),
//!     "volume" => Setting::number("Volume", 5.0).min(0.0).max(10.0),
//!     "signature" => Setting::longtext("Signature", "").max_length(500),
//!     "shortcuts" => Setting::json("Shortcuts", json!({})),
//!     "notifications" => Setting::boolean("Notifications", true),
//! };
//! assert_eq!(defaults.len(), 5);
//! ```
//!
//! ## Stored Values
//!
//! Stored records that no longer pass validation (for example after a
//! constraint was tightened) are ignored at load time and the default is
//! kept. Records for keys without a definition are ignored as well.

// Core modules
mod error;
mod events;
mod manager;
pub mod storage;
mod sync;
pub mod validation;

// Grouped modules
pub mod config;

// Re-exports from core
pub use error::{Error, Result};
pub use events::{Listener, ListenerRegistry, SettingsEvent};
pub use manager::{
    ExportPayload, ImportReport, QuotaStatus, SettingsStore, SettingsStoreBuilder,
    SkippedSetting, StorageReport, StorageStats, StoreState,
};
pub use storage::{
    AreaStore, JsonFileStorage, MemoryStorage, StorageArea, StorageBackend, StoredRecords,
};
pub use validation::{RuleViolation, validate, validate_text_secure};

// Re-exports from config
pub use config::{
    ConfigurationSource, EXPORT_VERSION, FileSource, LoadStrategy, Setting, SettingConstraints,
    SettingDefinitions, SettingType, SettingsConfig, SettingsConfigBuilder, StaticSource,
};
