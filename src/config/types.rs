//! Core configuration types for the settings store

use crate::storage::StorageArea;

/// Default export format version
pub const EXPORT_VERSION: &str = "1.0";

/// How defaults are obtained from a [`ConfigurationSource`](super::ConfigurationSource)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStrategy {
    /// Only the primary source; its failure is fatal
    #[default]
    Primary,
    /// Try the primary source, fall back to embedded defaults on failure
    PrimaryWithFallback,
}

/// Configuration for a [`SettingsStore`](crate::SettingsStore)
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsConfig {
    /// Storage area used until [`set_storage_area`](crate::SettingsStore::set_storage_area) is called
    pub storage_area: StorageArea,

    /// Strategy used when loading defaults
    pub load_strategy: LoadStrategy,

    /// Version string written into exports
    pub export_version: String,

    /// Pretty print exported JSON
    pub pretty_export: bool,

    /// Fraction of the quota above which [`QuotaStatus::near_limit`](crate::QuotaStatus) is set
    pub quota_warning_ratio: f64,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            storage_area: StorageArea::Local,
            load_strategy: LoadStrategy::Primary,
            export_version: EXPORT_VERSION.into(),
            pretty_export: true,
            quota_warning_ratio: 0.9,
        }
    }
}

impl SettingsConfig {
    /// Create a new builder for `SettingsConfig`
    ///
    /// # Example
    /// ```rust
    /// use extman::{LoadStrategy, SettingsConfig, StorageArea};
    ///
    /// let config = SettingsConfig::builder()
    ///     .storage_area(StorageArea::Sync)
    ///     .load_strategy(LoadStrategy::PrimaryWithFallback)
    ///     .build();
    /// assert_eq!(config.storage_area, StorageArea::Sync);
    /// ```
    pub fn builder() -> SettingsConfigBuilder {
        SettingsConfigBuilder::new()
    }
}

/// Builder for creating `SettingsConfig` with a fluent API
#[derive(Debug, Clone, Default)]
pub struct SettingsConfigBuilder {
    config: SettingsConfig,
}

impl SettingsConfigBuilder {
    /// Create a builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial storage area (default: `local`)
    pub fn storage_area(mut self, area: StorageArea) -> Self {
        self.config.storage_area = area;
        self
    }

    /// Set the defaults load strategy (default: primary only)
    pub fn load_strategy(mut self, strategy: LoadStrategy) -> Self {
        self.config.load_strategy = strategy;
        self
    }

    /// Set the version written into exports (default: "1.0")
    pub fn export_version(mut self, version: impl Into<String>) -> Self {
        self.config.export_version = version.into();
        self
    }

    /// Use compact JSON for exports
    pub fn compact_export(mut self) -> Self {
        self.config.pretty_export = false;
        self
    }

    /// Set the quota usage ratio that counts as "near the limit"
    ///
    /// Values outside `0.0..=1.0` are clamped.
    pub fn quota_warning_ratio(mut self, ratio: f64) -> Self {
        self.config.quota_warning_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// Build the `SettingsConfig`
    pub fn build(self) -> SettingsConfig {
        self.config
    }
}
