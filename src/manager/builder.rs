//! Builder for SettingsStore
//!
//! This module contains [`SettingsStoreBuilder`] which provides a fluent API
//! for creating a [`SettingsStore`](super::SettingsStore).

use crate::config::{ConfigurationSource, LoadStrategy, SettingsConfigBuilder};
use crate::error::Result;
use crate::storage::{StorageArea, StorageBackend};
use std::sync::Arc;

use super::SettingsStore;

/// Builder for creating a [`SettingsStore`] with a fluent API.
///
/// # Example
///
/// ```rust
/// use extman::{FileSource, JsonFileStorage, LoadStrategy, SettingsStore, StorageArea};
///
/// let store = SettingsStore::builder(
///     FileSource::new("defaults.json"),
///     JsonFileStorage::in_config_dir("my-extension"),
/// )
/// .storage_area(StorageArea::Sync)
/// .load_strategy(LoadStrategy::PrimaryWithFallback)
/// .build()
/// .unwrap();
/// ```
pub struct SettingsStoreBuilder {
    config_builder: SettingsConfigBuilder,
    source: Arc<dyn ConfigurationSource>,
    backend: Arc<dyn StorageBackend>,
}

impl SettingsStoreBuilder {
    /// Create a new builder from a definitions source and a storage backend.
    pub fn new(
        source: impl ConfigurationSource + 'static,
        backend: impl StorageBackend + 'static,
    ) -> Self {
        Self::from_shared(Arc::new(source), Arc::new(backend))
    }

    /// Create a new builder from already shared collaborators.
    pub fn from_shared(
        source: Arc<dyn ConfigurationSource>,
        backend: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            config_builder: SettingsConfigBuilder::new(),
            source,
            backend,
        }
    }

    /// Set the initial storage area (default: `local`).
    pub fn storage_area(mut self, area: StorageArea) -> Self {
        self.config_builder = self.config_builder.storage_area(area);
        self
    }

    /// Set the defaults load strategy (default: primary only).
    pub fn load_strategy(mut self, strategy: LoadStrategy) -> Self {
        self.config_builder = self.config_builder.load_strategy(strategy);
        self
    }

    /// Set the version written into exports (default: "1.0").
    pub fn export_version(mut self, version: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.export_version(version);
        self
    }

    /// Use compact JSON for exports.
    pub fn compact_export(mut self) -> Self {
        self.config_builder = self.config_builder.compact_export();
        self
    }

    /// Set the quota usage ratio that counts as "near the limit".
    pub fn quota_warning_ratio(mut self, ratio: f64) -> Self {
        self.config_builder = self.config_builder.quota_warning_ratio(ratio);
        self
    }

    /// Build the [`SettingsStore`].
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArea` if the backend lacks the configured area.
    pub fn build(self) -> Result<SettingsStore> {
        SettingsStore::new(self.config_builder.build(), self.source, self.backend)
    }
}

impl SettingsStore {
    /// Create a builder for `SettingsStore` with a fluent API.
    ///
    /// This is the recommended way to create a `SettingsStore`.
    pub fn builder(
        source: impl ConfigurationSource + 'static,
        backend: impl StorageBackend + 'static,
    ) -> SettingsStoreBuilder {
        SettingsStoreBuilder::new(source, backend)
    }
}
