//! Configuration sources supplying setting definitions
//!
//! A source yields the canonical `key -> definition` map. The store asks for it
//! through [`ConfigurationSource::load`] with a [`LoadStrategy`], which decides
//! whether a failing primary source may be replaced by embedded defaults.

use super::schema::SettingDefinitions;
use super::types::LoadStrategy;
use crate::error::{Error, Result};
use async_trait::async_trait;
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Trait for anything that can supply setting definitions
#[async_trait]
pub trait ConfigurationSource: Send + Sync {
    /// Load the primary definitions
    async fn load_configuration(&self) -> Result<SettingDefinitions>;

    /// Embedded defaults used by [`LoadStrategy::PrimaryWithFallback`]
    fn load_fallback_configuration(&self) -> Option<SettingDefinitions> {
        None
    }

    /// Load definitions according to `strategy` and check each of them
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if no usable definitions could be loaded
    /// or if a definition is malformed (unknown type, inverted range, default
    /// value failing its own rules).
    async fn load(&self, strategy: LoadStrategy) -> Result<SettingDefinitions> {
        let primary = self
            .load_configuration()
            .await
            .map_err(into_configuration_error)
            .and_then(check_definitions);

        match (primary, strategy) {
            (Ok(definitions), _) => Ok(definitions),
            (Err(e), LoadStrategy::Primary) => Err(e),
            (Err(e), LoadStrategy::PrimaryWithFallback) => {
                let Some(fallback) = self.load_fallback_configuration() else {
                    return Err(e);
                };
                warn!("Primary configuration unavailable ({e}), using fallback defaults");
                check_definitions(fallback)
            }
        }
    }
}

fn into_configuration_error(e: Error) -> Error {
    match e {
        Error::Configuration(_) => e,
        other => Error::Configuration(other.to_string()),
    }
}

/// Reject definitions the store could never hold
fn check_definitions(definitions: SettingDefinitions) -> Result<SettingDefinitions> {
    for (key, setting) in &definitions {
        setting.validate_definition().map_err(|reason| {
            Error::Configuration(format!("Invalid definition for '{key}': {reason}"))
        })?;
    }
    Ok(definitions)
}

// =============================================================================
// Static Source
// =============================================================================

/// In-memory definitions, typically compiled into the extension
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    definitions: SettingDefinitions,
}

impl StaticSource {
    /// Create a source serving `definitions`
    pub fn new(definitions: SettingDefinitions) -> Self {
        Self { definitions }
    }
}

#[async_trait]
impl ConfigurationSource for StaticSource {
    async fn load_configuration(&self) -> Result<SettingDefinitions> {
        Ok(self.definitions.clone())
    }
}

// =============================================================================
// File Source
// =============================================================================

/// Definitions read from a file on disk
///
/// The format follows the file extension: `.json` always, `.toml` with the
/// `toml` feature, `.yaml`/`.yml` with the `yaml` feature.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    fallback: Option<SettingDefinitions>,
}

impl FileSource {
    /// Create a source reading `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fallback: None,
        }
    }

    /// Embedded defaults returned as the fallback configuration
    #[must_use]
    pub fn with_fallback(mut self, definitions: SettingDefinitions) -> Self {
        self.fallback = Some(definitions);
        self
    }

    /// Path of the definitions file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, content: &str) -> Result<SettingDefinitions> {
        let extension = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let parse_error = |e: &dyn std::fmt::Display| {
            Error::Configuration(format!("Failed to parse '{}': {e}", self.path.display()))
        };

        match extension.as_str() {
            "json" => serde_json::from_str(content).map_err(|e| parse_error(&e)),
            #[cfg(feature = "toml")]
            "toml" => toml::from_str(content).map_err(|e| parse_error(&e)),
            #[cfg(feature = "yaml")]
            "yaml" | "yml" => serde_yaml::from_str(content).map_err(|e| parse_error(&e)),
            other => Err(Error::Configuration(format!(
                "Unsupported configuration format '{other}' for '{}'",
                self.path.display()
            ))),
        }
    }
}

#[async_trait]
impl ConfigurationSource for FileSource {
    async fn load_configuration(&self) -> Result<SettingDefinitions> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| {
                Error::Configuration(format!("Failed to read '{}': {e}", self.path.display()))
            })?;

        let definitions = self.parse(&content)?;
        debug!(
            "Loaded {} setting definitions from {}",
            definitions.len(),
            self.path.display()
        );
        Ok(definitions)
    }

    fn load_fallback_configuration(&self) -> Option<SettingDefinitions> {
        self.fallback.clone()
    }
}

// =============================================================================
// Tests
// =============================================================================
