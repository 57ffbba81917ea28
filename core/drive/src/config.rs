//! Handle configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use driverator_common::{Error, Result};

/// Default directory for cached metadata.
pub const DEFAULT_CACHE_DIR: &str = "data/driverator";
/// Default cache entry lifetime in days.
pub const DEFAULT_TTL_DAYS: u32 = 7;
/// Prefix of every cache key.
const CACHE_KEY_PREFIX: &str = "driverator";

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

fn default_ttl_days() -> u32 {
    DEFAULT_TTL_DAYS
}

/// Settings for one [`Handle`](crate::Handle).
///
/// Seed identifiers are all optional; `initialize()` fills in what it can
/// resolve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandleConfig {
    /// Service account key file.
    pub service_account_file: PathBuf,
    /// Known remote file id.
    #[serde(default)]
    pub file_id: Option<String>,
    /// File name, used for resolution and as the upload name.
    #[serde(default)]
    pub file_name: Option<String>,
    /// Known remote folder id.
    #[serde(default)]
    pub folder_id: Option<String>,
    /// Folder name, resolved (or created) when no folder id is given.
    #[serde(default)]
    pub folder_name: Option<String>,
    /// Folder under which folder names are resolved and created.
    #[serde(default)]
    pub parent_folder_id: Option<String>,
    /// Directory holding cached metadata.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Cache entry lifetime in days.
    #[serde(default = "default_ttl_days")]
    pub ttl_days: u32,
    /// Drop any cached entry for this handle on initialization.
    #[serde(default)]
    pub clear_cache: bool,
}

impl HandleConfig {
    /// Configuration with defaults and no seed identifiers.
    pub fn new(service_account_file: impl Into<PathBuf>) -> Self {
        Self {
            service_account_file: service_account_file.into(),
            file_id: None,
            file_name: None,
            folder_id: None,
            folder_name: None,
            parent_folder_id: None,
            cache_dir: default_cache_dir(),
            ttl_days: DEFAULT_TTL_DAYS,
            clear_cache: false,
        }
    }

    /// Load a configuration from a JSON file.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        serde_json::from_str(&json).map_err(|e| {
            Error::InvalidInput(format!("Invalid config {}: {}", path.display(), e))
        })
    }

    pub fn with_file_id(mut self, file_id: impl Into<String>) -> Self {
        self.file_id = Some(file_id.into());
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_folder_id(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    pub fn with_folder_name(mut self, folder_name: impl Into<String>) -> Self {
        self.folder_name = Some(folder_name.into());
        self
    }

    pub fn with_parent_folder_id(mut self, parent_folder_id: impl Into<String>) -> Self {
        self.parent_folder_id = Some(parent_folder_id.into());
        self
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn with_ttl_days(mut self, ttl_days: u32) -> Self {
        self.ttl_days = ttl_days;
        self
    }

    pub fn with_clear_cache(mut self, clear_cache: bool) -> Self {
        self.clear_cache = clear_cache;
        self
    }

    /// Cache entry lifetime.
    pub fn ttl(&self) -> Duration {
        Duration::days(i64::from(self.ttl_days))
    }

    /// Cache key: `driverator_{file name | file id | "file"}`.
    pub fn cache_key(&self) -> String {
        let subject = self
            .file_name
            .as_deref()
            .or(self.file_id.as_deref())
            .unwrap_or("file");
        format!("{}_{}", CACHE_KEY_PREFIX, subject)
    }
}
