//! Persistent storage areas and backend implementations
//!
//! The host key-value store is modelled as a [`StorageBackend`] that hands out
//! independently addressable [`AreaStore`]s, one per [`StorageArea`]. Records
//! are JSON values keyed by setting key; `set` has upsert semantics.

use crate::error::{Error, Result};
use crate::sync::RwLockExt;
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, RwLock};

/// Records held by one storage area: setting key -> stored record
pub type StoredRecords = BTreeMap<String, Value>;

// =============================================================================
// Storage Area
// =============================================================================

/// Named persistence namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageArea {
    /// Device-local storage
    #[default]
    Local,
    /// Storage the host may replicate across devices
    Sync,
}

impl StorageArea {
    /// Wire name of this area
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageArea::Local => "local",
            StorageArea::Sync => "sync",
        }
    }
}

impl fmt::Display for StorageArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageArea {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(StorageArea::Local),
            "sync" => Ok(StorageArea::Sync),
            other => Err(Error::InvalidArea(format!(
                "'{other}' (expected \"local\" or \"sync\")"
            ))),
        }
    }
}

// =============================================================================
// Traits
// =============================================================================

/// One area of the host key-value store
#[async_trait]
pub trait AreaStore: Send + Sync {
    /// Read every record in the area
    async fn get_all(&self) -> Result<StoredRecords>;

    /// Upsert the given records
    async fn set(&self, records: StoredRecords) -> Result<()>;

    /// Remove every record in the area
    async fn clear(&self) -> Result<()>;

    /// Bytes currently used, or `None` if the backend cannot tell
    async fn bytes_in_use(&self) -> Result<Option<u64>> {
        Ok(None)
    }

    /// Maximum bytes the area may hold, or `None` if unknown/unlimited
    async fn quota_bytes(&self) -> Result<Option<u64>> {
        Ok(None)
    }
}

/// Provider of storage areas, resolved once when a store is built
pub trait StorageBackend: Send + Sync {
    /// Get the store for `area`, or `None` if the backend lacks it
    fn area(&self, area: StorageArea) -> Option<Arc<dyn AreaStore>>;
}

fn encoded_size(records: &StoredRecords) -> Result<u64> {
    Ok(serde_json::to_vec(records)?.len() as u64)
}

// =============================================================================
// Memory Storage
// =============================================================================

/// In-memory storage (not persisted), useful for tests and headless hosts
#[derive(Clone)]
pub struct MemoryStorage {
    local: Option<Arc<MemoryArea>>,
    sync: Option<Arc<MemoryArea>>,
}

impl MemoryStorage {
    /// Create a memory backend with both `local` and `sync` areas
    #[must_use]
    pub fn new() -> Self {
        Self {
            local: Some(Arc::new(MemoryArea::new(StorageArea::Local, None))),
            sync: Some(Arc::new(MemoryArea::new(StorageArea::Sync, None))),
        }
    }

    /// Create a memory backend that only has a `local` area
    #[must_use]
    pub fn local_only() -> Self {
        Self {
            sync: None,
            ..Self::new()
        }
    }

    /// Create a memory backend whose areas reject writes beyond `bytes`
    #[must_use]
    pub fn with_quota(bytes: u64) -> Self {
        Self {
            local: Some(Arc::new(MemoryArea::new(StorageArea::Local, Some(bytes)))),
            sync: Some(Arc::new(MemoryArea::new(StorageArea::Sync, Some(bytes)))),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for MemoryStorage {
    fn area(&self, area: StorageArea) -> Option<Arc<dyn AreaStore>> {
        let store = match area {
            StorageArea::Local => self.local.clone(),
            StorageArea::Sync => self.sync.clone(),
        };
        store.map(|s| s as Arc<dyn AreaStore>)
    }
}

struct MemoryArea {
    area: StorageArea,
    records: RwLock<StoredRecords>,
    quota: Option<u64>,
}

impl MemoryArea {
    fn new(area: StorageArea, quota: Option<u64>) -> Self {
        Self {
            area,
            records: RwLock::new(StoredRecords::new()),
            quota,
        }
    }
}

#[async_trait]
impl AreaStore for MemoryArea {
    async fn get_all(&self) -> Result<StoredRecords> {
        Ok(self.records.read_recovered().clone())
    }

    async fn set(&self, records: StoredRecords) -> Result<()> {
        let mut guard = self.records.write_recovered();
        let mut updated = guard.clone();
        updated.extend(records);

        if let Some(quota) = self.quota {
            let size = encoded_size(&updated)?;
            if size > quota {
                return Err(Error::Storage {
                    area: self.area.to_string(),
                    reason: format!("quota exceeded ({size} > {quota} bytes)"),
                });
            }
        }

        *guard = updated;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.records.write_recovered().clear();
        Ok(())
    }

    async fn bytes_in_use(&self) -> Result<Option<u64>> {
        let guard = self.records.read_recovered();
        encoded_size(&guard).map(Some)
    }

    async fn quota_bytes(&self) -> Result<Option<u64>> {
        Ok(self.quota)
    }
}

// =============================================================================
// JSON File Storage
// =============================================================================

/// File-backed storage: one JSON file per area inside a directory
///
/// Writes are atomic (temp file + rename). A missing file reads as an empty
/// area.
#[derive(Clone, Debug)]
pub struct JsonFileStorage {
    dir: PathBuf,
    pretty: bool,
    quota: Option<u64>,
}

impl JsonFileStorage {
    /// Create a file backend rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pretty: true,
            quota: None,
        }
    }

    /// Create a file backend in the system config directory for `app_name`
    pub fn in_config_dir(app_name: &str) -> Self {
        let dir = dirs::config_dir()
            .map(|d| d.join(app_name))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(dir)
    }

    /// Use compact JSON (no pretty printing)
    #[must_use]
    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    /// Report `bytes` as the per-area quota
    #[must_use]
    pub fn with_quota(mut self, bytes: u64) -> Self {
        self.quota = Some(bytes);
        self
    }

    /// Directory holding the area files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `area`
    pub fn area_path(&self, area: StorageArea) -> PathBuf {
        self.dir.join(format!("{area}.json"))
    }
}

impl StorageBackend for JsonFileStorage {
    fn area(&self, area: StorageArea) -> Option<Arc<dyn AreaStore>> {
        Some(Arc::new(JsonFileArea {
            area,
            path: self.area_path(area),
            pretty: self.pretty,
            quota: self.quota,
        }))
    }
}

struct JsonFileArea {
    area: StorageArea,
    path: PathBuf,
    pretty: bool,
    quota: Option<u64>,
}

impl JsonFileArea {
    async fn read(&self) -> Result<StoredRecords> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StoredRecords::new()),
            Err(e) => {
                return Err(Error::FileRead {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };

        serde_json::from_str(&content).map_err(|e| Error::Storage {
            area: self.area.to_string(),
            reason: format!("corrupt file '{}': {e}", self.path.display()),
        })
    }

    async fn write(&self, records: &StoredRecords) -> Result<()> {
        let content = if self.pretty {
            serde_json::to_string_pretty(records)?
        } else {
            serde_json::to_string(records)?
        };

        if let Some(parent) = self.path.parent() {
            ensure_secure_dir(parent).await?;
        }

        let mut temp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        temp_name.push(".tmp");
        let temp_path = self.path.with_file_name(temp_name);

        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| Error::FileWrite {
                path: temp_path.clone(),
                source: e,
            })?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::FileWrite {
                path: self.path.clone(),
                source: e,
            })?;

        debug!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl AreaStore for JsonFileArea {
    async fn get_all(&self) -> Result<StoredRecords> {
        self.read().await
    }

    async fn set(&self, records: StoredRecords) -> Result<()> {
        let mut current = self.read().await?;
        current.extend(records);
        self.write(&current).await
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::FileWrite {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    async fn bytes_in_use(&self) -> Result<Option<u64>> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Some(0)),
            Err(e) => Err(Error::FileRead {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    async fn quota_bytes(&self) -> Result<Option<u64>> {
        Ok(self.quota)
    }
}

/// Create a directory (and parents) restricted to the owner on Unix
async fn ensure_secure_dir(path: &Path) -> Result<()> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(());
    }

    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| Error::DirectoryCreate {
            path: path.to_path_buf(),
            source: e,
        })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .await
            .map_err(|e| Error::DirectoryCreate {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
