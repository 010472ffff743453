//! Error types for extman library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for extman operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for extman library
#[derive(Error, Debug)]
pub enum Error {
    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Configuration(String),

    // -------------------------------------------------------------------------
    // Settings Errors
    // -------------------------------------------------------------------------
    #[error("Setting not found: {0}")]
    SettingNotFound(String),

    #[error("Invalid setting value for {key}: {reason}")]
    InvalidSettingValue { key: String, reason: String },

    #[error("Unknown setting type '{setting_type}' for {key}")]
    UnknownType { key: String, setting_type: String },

    // -------------------------------------------------------------------------
    // Import/Export Errors
    // -------------------------------------------------------------------------
    #[error("Invalid settings format: {0}")]
    Format(String),

    #[error("Import failed: {0}")]
    Import(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Invalid storage area: {0}")]
    InvalidArea(String),

    #[error("Storage error in '{area}' area: {reason}")]
    Storage { area: String, reason: String },

    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Failed to serialize data: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Error {
    /// Check if this is a "not found" type error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::SettingNotFound(_))
    }

    /// Check if this error rejected a value (bad value or unsupported type)
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidSettingValue { .. } | Error::UnknownType { .. }
        )
    }

    /// Check if this error came from the persistence layer
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            Error::Storage { .. }
                | Error::FileRead { .. }
                | Error::FileWrite { .. }
                | Error::DirectoryCreate { .. }
        )
    }
}
