//! Metadata cache: a TTL-bounded mirror of each handle's last-known state.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

use driverator_common::{Error, FileId, Result};

/// Snapshot of a handle's fields, as persisted in the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_id: Option<FileId>,
    pub file_name: Option<String>,
    pub folder_id: Option<FileId>,
    pub folder_name: Option<String>,
    pub size: Option<u64>,
    pub mime_type: Option<String>,
    pub created_time: Option<DateTime<Utc>>,
    pub modified_time: Option<DateTime<Utc>>,
    pub url: Option<String>,
    pub download_url: Option<String>,
}

/// Keyed store of the last-known record for a logical file.
#[async_trait]
pub trait MetadataCache: Send + Sync {
    /// Get the live record for `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<FileRecord>>;

    /// Store `record` under `key`, replacing any previous entry.
    async fn save(&self, key: &str, record: &FileRecord) -> Result<()>;

    /// Remove the entry for `key`. Missing entries are not an error.
    async fn clear(&self, key: &str) -> Result<()>;
}

/// On-disk entry layout.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    saved_at: DateTime<Utc>,
    record: FileRecord,
}

/// One pretty-printed JSON file per key under a cache directory.
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    dir: PathBuf,
    ttl: Duration,
}

impl JsonFileCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`. Characters outside `[A-Za-z0-9._-]` become `_`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        entry.saved_at + self.ttl < Utc::now()
    }
}

fn cache_error(action: &str, path: &Path, e: impl std::fmt::Display) -> Error {
    Error::Cache(format!("Failed to {} {}: {}", action, path.display(), e))
}

#[async_trait]
impl MetadataCache for JsonFileCache {
    async fn load(&self, key: &str) -> Result<Option<FileRecord>> {
        let path = self.path_for(key);

        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(cache_error("read", &path, e)),
        };

        let entry: CacheEntry =
            serde_json::from_str(&json).map_err(|e| cache_error("parse", &path, e))?;

        if self.is_expired(&entry) {
            debug!(key, saved_at = %entry.saved_at, "Cache entry expired");
            self.clear(key).await?;
            return Ok(None);
        }

        Ok(Some(entry.record))
    }

    async fn save(&self, key: &str, record: &FileRecord) -> Result<()> {
        let path = self.path_for(key);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| cache_error("create", &self.dir, e))?;

        let entry = CacheEntry {
            saved_at: Utc::now(),
            record: record.clone(),
        };
        let json = serde_json::to_string_pretty(&entry)?;

        // Write-then-rename so readers never see a torn entry.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| cache_error("write", &tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| cache_error("write", &path, e))?;

        debug!(key, path = %path.display(), "Cache entry saved");
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(cache_error("remove", &path, e)),
        }
    }
}

/// In-process cache. Entries never expire.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, FileRecord>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MetadataCache for MemoryCache {
    async fn load(&self, key: &str) -> Result<Option<FileRecord>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    async fn save(&self, key: &str, record: &FileRecord) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), record.clone());
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}
