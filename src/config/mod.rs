//! Core configuration types and traits
//!
//! This module contains the foundational types for settings management:
//! - `Setting` - A typed setting definition with constraints
//! - `ConfigurationSource` - Where setting definitions come from
//! - `SettingsConfig` - Configuration for the settings store

mod schema;
mod source;
mod types;

pub use schema::{Setting, SettingConstraints, SettingDefinitions, SettingType};
pub use source::{ConfigurationSource, FileSource, StaticSource};
pub use types::{EXPORT_VERSION, LoadStrategy, SettingsConfig, SettingsConfigBuilder};
