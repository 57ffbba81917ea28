//! The file handle: lifecycle and content operations.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use driverator_common::{Error, FileId, Result};
use driverator_storage::{
    CredentialProvider, DriveFile, FileUpdate, NewFile, RemoteClient, ServiceAccountCredentials,
    DRIVE_SCOPE,
};

use crate::cache::{FileRecord, JsonFileCache, MetadataCache};
use crate::config::HandleConfig;
use crate::resolver::Resolver;

/// Parse an optional seed id, rejecting empty strings.
fn seed_id(id: Option<String>) -> Result<Option<FileId>> {
    id.map(FileId::new).transpose()
}

/// One remote file, addressed by id or by name within a folder.
///
/// Mutating operations take `&mut self`; a handle is not meant to be shared
/// between concurrent callers.
pub struct Handle {
    credentials: Arc<dyn CredentialProvider>,
    cache: Arc<dyn MetadataCache>,
    cache_key: String,
    clear_cache: bool,
    client: Option<Arc<dyn RemoteClient>>,

    file_id: Option<FileId>,
    file_name: Option<String>,
    folder_id: Option<FileId>,
    folder_name: Option<String>,
    parent_folder_id: Option<FileId>,
    size: Option<u64>,
    mime_type: Option<String>,
    created_time: Option<DateTime<Utc>>,
    modified_time: Option<DateTime<Utc>>,
}

impl Handle {
    /// Create a handle that authenticates with the configured service
    /// account and caches metadata as JSON under `cache_dir`.
    ///
    /// No I/O happens until [`Self::initialize`].
    ///
    /// # Errors
    /// - An id in the configuration is empty
    pub fn new(config: HandleConfig) -> Result<Self> {
        let credentials = Arc::new(ServiceAccountCredentials::new(
            config.service_account_file.clone(),
        ));
        let cache = Arc::new(JsonFileCache::new(config.cache_dir.clone(), config.ttl()));
        Self::with_backends(config, credentials, cache)
    }

    /// Create a handle with explicit credential and cache backends.
    pub fn with_backends(
        config: HandleConfig,
        credentials: Arc<dyn CredentialProvider>,
        cache: Arc<dyn MetadataCache>,
    ) -> Result<Self> {
        let cache_key = config.cache_key();

        Ok(Self {
            credentials,
            cache,
            cache_key,
            clear_cache: config.clear_cache,
            client: None,
            file_id: seed_id(config.file_id)?,
            file_name: config.file_name,
            folder_id: seed_id(config.folder_id)?,
            folder_name: config.folder_name,
            parent_folder_id: seed_id(config.parent_folder_id)?,
            size: None,
            mime_type: None,
            created_time: None,
            modified_time: None,
        })
    }

    /// Authenticate, resolve names to ids, and load metadata.
    ///
    /// # Postconditions
    /// - The handle holds an authenticated client
    /// - A folder name without id is resolved, creating the folder if needed
    /// - A file name without id is resolved within the folder; no match
    ///   leaves the file id unset
    /// - If the file exists and is not trashed, metadata is loaded and cached
    ///
    /// # Errors
    /// - Key file missing or rejected
    /// - Remote errors during resolution or folder creation
    pub async fn initialize(&mut self) -> Result<()> {
        if self.clear_cache {
            self.cache.clear(&self.cache_key).await?;
            self.clear_cache = false;
        }

        let client = self.credentials.authenticate(&[DRIVE_SCOPE]).await?;
        self.client = Some(client.clone());
        let resolver = Resolver::new(client.as_ref());

        if self.folder_id.is_none() {
            if let Some(folder_name) = &self.folder_name {
                let folder_id = resolver
                    .find_or_create_folder(folder_name, self.parent_folder_id.as_ref())
                    .await?;
                debug!(folder_name = %folder_name, folder_id = %folder_id, "Folder resolved");
                self.folder_id = Some(folder_id);
            }
        }

        if self.file_id.is_none() {
            if let Some(file_name) = &self.file_name {
                self.file_id = resolver
                    .find_file_by_name(file_name, self.folder_id.as_ref())
                    .await?;
                debug!(file_name = %file_name, found = self.file_id.is_some(), "File resolved");
            }
        }

        if self.file_id.is_some() && self.exists().await {
            self.refresh().await?;
        }

        Ok(())
    }

    /// Whether the file exists remotely and is not trashed.
    ///
    /// Any remote failure, including "not found", reads as `false`. So does a
    /// handle without a file id, and a handle that was never initialized even
    /// if it was configured with a file id; check [`Self::is_initialized`]
    /// to tell that case from a deleted file.
    pub async fn exists(&self) -> bool {
        let (Some(client), Some(file_id)) = (&self.client, &self.file_id) else {
            return false;
        };

        match client.get_file(file_id.as_str()).await {
            Ok(file) => !file.trashed,
            Err(e) => {
                warn!(file_id = %file_id, error = %e, "Existence check failed");
                false
            }
        }
    }

    /// Reload every metadata field from the remote object and rewrite the
    /// cache entry.
    pub async fn refresh(&mut self) -> Result<()> {
        let (client, file_id) = self.target()?;
        let file = client.get_file(file_id.as_str()).await?;

        self.apply(&file)?;
        self.persist().await
    }

    /// Create a new remote object from the file at `local_path`.
    ///
    /// The remote name is the configured file name, else the local base
    /// name. Each call creates a distinct object, even when the handle
    /// already has a file id.
    ///
    /// # Errors
    /// - Handle not initialized
    /// - Local file missing or not a regular file
    /// - Remote errors
    pub async fn upload(&mut self, local_path: impl AsRef<Path>) -> Result<()> {
        let local_path = local_path.as_ref();
        let client = self.client()?.clone();

        let local = tokio::fs::metadata(local_path).await?;
        if !local.is_file() {
            return Err(Error::InvalidInput(format!(
                "Not a file: {}",
                local_path.display()
            )));
        }

        let name = match &self.file_name {
            Some(name) => name.clone(),
            None => local_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    Error::InvalidInput(format!("No file name in {}", local_path.display()))
                })?,
        };

        let metadata = NewFile::file(name, self.folder_id.as_ref().map(FileId::as_str));
        let file = client.create_file(&metadata, Some(local_path)).await?;

        self.apply(&file)?;
        self.persist().await?;

        info!(file_id = %file.id, name = %file.name, size = local.len(), "File uploaded");
        Ok(())
    }

    /// Replace the remote content with the file at `local_path`. The remote
    /// name is unchanged.
    pub async fn update(&mut self, local_path: impl AsRef<Path>) -> Result<()> {
        let local_path = local_path.as_ref();
        let (client, file_id) = self.target()?;

        let file = client
            .update_file(file_id.as_str(), &FileUpdate::default(), Some(local_path))
            .await?;

        self.size = file.size_bytes();
        self.mime_type = Some(file.mime_type);
        self.modified_time = file.modified_time;
        self.persist().await?;

        info!(file_id = %file.id, size = ?self.size, "File content updated");
        Ok(())
    }

    /// Stream the remote content into `local_path`, truncating it first.
    ///
    /// A failed transfer leaves a partially written file behind.
    ///
    /// # Returns
    /// Number of bytes written.
    pub async fn download(&self, local_path: impl AsRef<Path>) -> Result<u64> {
        let local_path = local_path.as_ref();
        let (client, file_id) = self.target()?;

        let mut stream = client.download(file_id.as_str()).await?;
        let mut out = tokio::fs::File::create(local_path).await?;
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            out.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        out.flush().await?;

        info!(file_id = %file_id, path = %local_path.display(), bytes = written, "File downloaded");
        Ok(written)
    }

    /// Rename the remote object.
    pub async fn rename(&mut self, new_name: &str) -> Result<()> {
        let (client, file_id) = self.target()?;

        client
            .update_file(file_id.as_str(), &FileUpdate::rename(new_name), None)
            .await?;

        info!(file_id = %file_id, new_name, "File renamed");
        self.file_name = Some(new_name.to_string());
        self.persist().await
    }

    /// Move the file into a single target folder, removing it from every
    /// previous parent.
    ///
    /// `folder_id` wins when both are given; otherwise `folder_name` is
    /// resolved (or created) like in [`Self::initialize`].
    ///
    /// # Errors
    /// - No file id, or neither target given (before any remote call)
    /// - Remote errors
    pub async fn move_to(
        &mut self,
        folder_id: Option<FileId>,
        folder_name: Option<&str>,
    ) -> Result<()> {
        let (client, file_id) = self.target()?;

        let target = match (folder_id, folder_name) {
            (Some(id), _) => id,
            (None, Some(name)) => {
                Resolver::new(client.as_ref())
                    .find_or_create_folder(name, self.parent_folder_id.as_ref())
                    .await?
            }
            (None, None) => {
                return Err(Error::Precondition(
                    "Must provide folder_id or folder_name".to_string(),
                ))
            }
        };

        let current = client.get_file(file_id.as_str()).await?;
        let update = FileUpdate::reparent(target.as_str(), current.parents);
        client.update_file(file_id.as_str(), &update, None).await?;

        info!(file_id = %file_id, folder_id = %target, "File moved");
        self.folder_id = Some(target);
        self.folder_name = folder_name.map(str::to_string);
        self.persist().await
    }

    /// Trash the file, or delete it irreversibly when `permanent`.
    ///
    /// Local fields are kept; `exists()` reports `false` afterwards.
    pub async fn delete(&mut self, permanent: bool) -> Result<()> {
        let (client, file_id) = self.target()?;

        if permanent {
            client.delete_file(file_id.as_str()).await?;
        } else {
            client
                .update_file(file_id.as_str(), &FileUpdate::trash(), None)
                .await?;
        }

        info!(file_id = %file_id, permanent, "File deleted");
        Ok(())
    }

    /// Last record written to the cache for this handle, if still live.
    pub async fn cached_record(&self) -> Result<Option<FileRecord>> {
        self.cache.load(&self.cache_key).await
    }

    /// Snapshot of the handle's fields.
    pub fn record(&self) -> FileRecord {
        FileRecord {
            file_id: self.file_id.clone(),
            file_name: self.file_name.clone(),
            folder_id: self.folder_id.clone(),
            folder_name: self.folder_name.clone(),
            size: self.size,
            mime_type: self.mime_type.clone(),
            created_time: self.created_time,
            modified_time: self.modified_time,
            url: self.url(),
            download_url: self.download_url(),
        }
    }

    pub fn file_id(&self) -> Option<&FileId> {
        self.file_id.as_ref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn folder_id(&self) -> Option<&FileId> {
        self.folder_id.as_ref()
    }

    pub fn folder_name(&self) -> Option<&str> {
        self.folder_name.as_deref()
    }

    /// Size in bytes, once loaded.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        self.created_time
    }

    pub fn modified_time(&self) -> Option<DateTime<Utc>> {
        self.modified_time
    }

    /// View link; present iff the file id is set.
    pub fn url(&self) -> Option<String> {
        self.file_id.as_ref().map(FileId::view_url)
    }

    /// Direct download link; present iff the file id is set.
    pub fn download_url(&self) -> Option<String> {
        self.file_id.as_ref().map(FileId::download_url)
    }

    pub fn is_initialized(&self) -> bool {
        self.client.is_some()
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    /// The authenticated client.
    pub(crate) fn client(&self) -> Result<&Arc<dyn RemoteClient>> {
        self.client.as_ref().ok_or_else(|| {
            Error::Precondition("Handle not initialized. Call initialize() first.".to_string())
        })
    }

    /// Client and file id for a file-scoped operation.
    ///
    /// The file id is checked first, so a handle without one always fails
    /// with the same precondition error.
    pub(crate) fn target(&self) -> Result<(Arc<dyn RemoteClient>, FileId)> {
        let file_id = self.file_id.clone().ok_or_else(Error::missing_file_id)?;
        Ok((self.client()?.clone(), file_id))
    }

    /// Replace id and all metadata fields from a remote record.
    fn apply(&mut self, file: &DriveFile) -> Result<()> {
        self.file_id = Some(FileId::new(file.id.clone())?);
        self.file_name = Some(file.name.clone());
        self.size = file.size_bytes();
        self.mime_type = Some(file.mime_type.clone());
        self.created_time = file.created_time;
        self.modified_time = file.modified_time;
        Ok(())
    }

    async fn persist(&self) -> Result<()> {
        self.cache.save(&self.cache_key, &self.record()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use driverator_storage::MemoryDrive;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const TEST_FOLDER: &str = "Driverator Test";

    struct Fixture {
        drive: MemoryDrive,
        cache: Arc<MemoryCache>,
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                drive: MemoryDrive::new(),
                cache: Arc::new(MemoryCache::new()),
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn handle(&self, config: HandleConfig) -> Handle {
            Handle::with_backends(config, Arc::new(self.drive.clone()), self.cache.clone()).unwrap()
        }

        async fn local_file(&self, name: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            tokio::fs::write(&path, content).await.unwrap();
            path
        }

        /// Initialized handle with an uploaded file named `name` in the test folder.
        async fn uploaded(&self, name: &str) -> Handle {
            let local = self.local_file("source.txt", "Test content").await;
            let mut handle = self.handle(config().with_file_name(name).with_folder_name(TEST_FOLDER));
            handle.initialize().await.unwrap();
            handle.upload(&local).await.unwrap();
            handle
        }
    }

    fn config() -> HandleConfig {
        HandleConfig::new("unused-key.json")
    }

    #[tokio::test]
    async fn test_initialize_basic() {
        let fx = Fixture::new();
        let mut handle = fx.handle(config());

        assert!(!handle.is_initialized());
        handle.initialize().await.unwrap();

        assert!(handle.is_initialized());
        assert!(handle.file_id().is_none());
        assert!(handle.url().is_none());
        assert!(handle.download_url().is_none());
    }

    #[tokio::test]
    async fn test_initialize_creates_folder_once() {
        let fx = Fixture::new();

        let mut first = fx.handle(config().with_folder_name(TEST_FOLDER));
        first.initialize().await.unwrap();
        let mut second = fx.handle(config().with_folder_name(TEST_FOLDER));
        second.initialize().await.unwrap();

        assert!(first.folder_id().is_some());
        assert_eq!(first.folder_id(), second.folder_id());
        assert_eq!(fx.drive.len(), 1);
    }

    #[tokio::test]
    async fn test_initialize_with_missing_key_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = HandleConfig::new(dir.path().join("missing.json"))
            .with_cache_dir(dir.path().join("cache"));

        let mut handle = Handle::new(config).unwrap();
        let result = handle.initialize().await;

        assert!(matches!(result, Err(Error::Authentication(_))));
        assert!(!handle.is_initialized());
    }

    #[test]
    fn test_empty_seed_id_rejected() {
        let fx = Fixture::new();
        let result = Handle::with_backends(
            config().with_file_id(""),
            Arc::new(fx.drive.clone()),
            fx.cache.clone(),
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_upload_populates_metadata() {
        let fx = Fixture::new();
        let handle = fx.uploaded("test_upload.txt").await;

        let file_id = handle.file_id().unwrap().clone();
        assert_eq!(handle.file_name(), Some("test_upload.txt"));
        assert_eq!(handle.size(), Some(12));
        assert_eq!(handle.mime_type(), Some("text/plain"));
        assert!(handle.created_time().is_some());
        assert!(handle.modified_time().is_some());
        assert_eq!(
            handle.url(),
            Some(format!("https://drive.google.com/file/d/{}/view", file_id))
        );
        assert_eq!(
            handle.download_url(),
            Some(format!("https://drive.google.com/uc?export=download&id={}", file_id))
        );
        assert!(handle.exists().await);
    }

    #[tokio::test]
    async fn test_upload_uses_local_name_without_file_name() {
        let fx = Fixture::new();
        let local = fx.local_file("local_name.txt", "x").await;
        let mut handle = fx.handle(config());
        handle.initialize().await.unwrap();

        handle.upload(&local).await.unwrap();
        assert_eq!(handle.file_name(), Some("local_name.txt"));
    }

    #[tokio::test]
    async fn test_upload_places_file_in_folder() {
        let fx = Fixture::new();
        let handle = fx.uploaded("in_folder.txt").await;

        let file = fx.drive.get_file(handle.file_id().unwrap().as_str()).await.unwrap();
        assert_eq!(file.parents, vec![handle.folder_id().unwrap().to_string()]);
    }

    #[tokio::test]
    async fn test_upload_twice_creates_second_object() {
        let fx = Fixture::new();
        let mut handle = fx.uploaded("twice.txt").await;
        let first = handle.file_id().unwrap().clone();

        let local = fx.local_file("again.txt", "Test content").await;
        handle.upload(&local).await.unwrap();

        assert_ne!(handle.file_id().unwrap(), &first);
        // folder + two files
        assert_eq!(fx.drive.len(), 3);
    }

    #[tokio::test]
    async fn test_upload_missing_local_file() {
        let fx = Fixture::new();
        let mut handle = fx.handle(config());
        handle.initialize().await.unwrap();

        let result = handle.upload(fx.dir.path().join("nope.txt")).await;
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(handle.file_id().is_none());
    }

    #[tokio::test]
    async fn test_upload_before_initialize_fails() {
        let fx = Fixture::new();
        let local = fx.local_file("a.txt", "x").await;
        let mut handle = fx.handle(config());

        assert!(matches!(handle.upload(&local).await, Err(Error::Precondition(_))));
        assert_eq!(fx.drive.calls(), 0);
    }

    #[tokio::test]
    async fn test_upload_persists_record() {
        let fx = Fixture::new();
        let handle = fx.uploaded("cached.txt").await;

        let cached = handle.cached_record().await.unwrap().unwrap();
        assert_eq!(cached, handle.record());
        assert_eq!(cached.url, handle.url());
        assert_eq!(handle.cache_key(), "driverator_cached.txt");
    }

    #[tokio::test]
    async fn test_round_trip_content() {
        let fx = Fixture {
            drive: MemoryDrive::new().with_chunk_size(4),
            ..Fixture::new()
        };
        let handle = fx.uploaded("round_trip.txt").await;

        let target = fx.dir.path().join("downloaded.txt");
        tokio::fs::write(&target, "stale content that is longer").await.unwrap();

        let written = handle.download(&target).await.unwrap();
        assert_eq!(written, 12);
        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"Test content");
    }

    #[tokio::test]
    async fn test_resolve_by_name_is_idempotent() {
        let fx = Fixture::new();
        let uploaded = fx.uploaded("shared_name.txt").await;

        let mut a = fx.handle(config().with_file_name("shared_name.txt").with_folder_name(TEST_FOLDER));
        let mut b = fx.handle(config().with_file_name("shared_name.txt").with_folder_name(TEST_FOLDER));
        a.initialize().await.unwrap();
        b.initialize().await.unwrap();

        assert_eq!(a.file_id(), uploaded.file_id());
        assert_eq!(a.file_id(), b.file_id());
        assert_eq!(a.size(), Some(12));
    }

    #[tokio::test]
    async fn test_resolution_scoped_to_folder() {
        let fx = Fixture::new();
        fx.uploaded("scoped.txt").await;

        let mut other = fx.handle(config().with_file_name("scoped.txt").with_folder_name("Elsewhere"));
        other.initialize().await.unwrap();

        assert!(other.file_id().is_none());
    }

    #[tokio::test]
    async fn test_initialize_with_unknown_id() {
        let fx = Fixture::new();
        let mut handle = fx.handle(config().with_file_id("nonexistent_id"));

        handle.initialize().await.unwrap();
        assert!(!handle.exists().await);
        assert!(handle.size().is_none());
    }

    #[tokio::test]
    async fn test_initialize_loads_existing_by_id() {
        let fx = Fixture::new();
        let uploaded = fx.uploaded("by_id.txt").await;
        let id = uploaded.file_id().unwrap().to_string();

        let mut handle = fx.handle(config().with_file_id(id.clone()));
        handle.initialize().await.unwrap();

        assert_eq!(handle.file_name(), Some("by_id.txt"));
        assert_eq!(handle.mime_type(), Some("text/plain"));
        assert_eq!(
            handle.cached_record().await.unwrap().unwrap().file_id.map(|f| f.to_string()),
            Some(id)
        );
    }

    #[tokio::test]
    async fn test_update_replaces_content() {
        let fx = Fixture::new();
        let mut handle = fx.uploaded("update.txt").await;
        let old_size = handle.size();

        let updated = fx.local_file("updated.txt", "Updated content").await;
        handle.update(&updated).await.unwrap();

        assert_ne!(handle.size(), old_size);
        assert_eq!(handle.size(), Some(15));
        assert_eq!(handle.file_name(), Some("update.txt"));
        assert_eq!(
            fx.drive.content(handle.file_id().unwrap().as_str()).unwrap(),
            b"Updated content"
        );
        assert_eq!(handle.cached_record().await.unwrap().unwrap().size, Some(15));
    }

    #[tokio::test]
    async fn test_rename() {
        let fx = Fixture::new();
        let mut handle = fx.uploaded("before.txt").await;

        handle.rename("after.txt").await.unwrap();

        assert_eq!(handle.file_name(), Some("after.txt"));
        let remote = fx.drive.get_file(handle.file_id().unwrap().as_str()).await.unwrap();
        assert_eq!(remote.name, "after.txt");
        assert_eq!(
            handle.cached_record().await.unwrap().unwrap().file_name.as_deref(),
            Some("after.txt")
        );
    }

    #[tokio::test]
    async fn test_move_by_name_creates_folder_and_replaces_parents() {
        let fx = Fixture::new();
        let mut handle = fx.uploaded("mover.txt").await;
        let old_folder = handle.folder_id().unwrap().clone();

        handle.move_to(None, Some("Moved Here")).await.unwrap();

        let new_folder = handle.folder_id().unwrap().clone();
        assert_ne!(new_folder, old_folder);
        assert_eq!(handle.folder_name(), Some("Moved Here"));

        let remote = fx.drive.get_file(handle.file_id().unwrap().as_str()).await.unwrap();
        assert_eq!(remote.parents, vec![new_folder.to_string()]);
    }

    #[tokio::test]
    async fn test_move_removes_every_previous_parent() {
        let fx = Fixture::new();
        let mut handle = fx.uploaded("mover.txt").await;
        let file_id = handle.file_id().unwrap().to_string();
        let resolver = Resolver::new(&fx.drive);
        let second = resolver.create_folder("Second", None).await.unwrap();

        let add_second = FileUpdate {
            add_parents: vec![second.to_string()],
            ..FileUpdate::default()
        };
        fx.drive.update_file(&file_id, &add_second, None).await.unwrap();
        assert_eq!(fx.drive.get_file(&file_id).await.unwrap().parents.len(), 2);

        handle.move_to(None, Some("Third")).await.unwrap();

        let target = handle.folder_id().unwrap().to_string();
        let remote = fx.drive.get_file(&file_id).await.unwrap();
        assert_eq!(remote.parents, vec![target]);
    }

    #[tokio::test]
    async fn test_move_by_id() {
        let fx = Fixture::new();
        let mut handle = fx.uploaded("mover.txt").await;
        let target = Resolver::new(&fx.drive)
            .create_folder("Target", None)
            .await
            .unwrap();

        handle.move_to(Some(target.clone()), None).await.unwrap();

        assert_eq!(handle.folder_id(), Some(&target));
        assert_eq!(handle.folder_name(), None);
        let remote = fx.drive.get_file(handle.file_id().unwrap().as_str()).await.unwrap();
        assert_eq!(remote.parents, vec![target.to_string()]);
    }

    #[tokio::test]
    async fn test_exists_false_before_initialize() {
        let fx = Fixture::new();
        let uploaded = fx.uploaded("present.txt").await;
        let id = uploaded.file_id().unwrap().to_string();
        let calls = fx.drive.calls();

        let mut handle = fx.handle(config().with_file_id(id));
        assert!(!handle.is_initialized());
        assert!(!handle.exists().await);
        assert_eq!(fx.drive.calls(), calls);

        handle.initialize().await.unwrap();
        assert!(handle.exists().await);
    }

    #[tokio::test]
    async fn test_move_without_target_fails_before_remote_call() {
        let fx = Fixture::new();
        let mut handle = fx.uploaded("stay.txt").await;
        let calls = fx.drive.calls();

        let result = handle.move_to(None, None).await;

        assert!(matches!(result, Err(Error::Precondition(_))));
        assert_eq!(fx.drive.calls(), calls);
    }

    #[tokio::test]
    async fn test_permanent_delete() {
        let fx = Fixture::new();
        let mut handle = fx.uploaded("gone.txt").await;

        handle.delete(true).await.unwrap();

        assert!(!handle.exists().await);
        assert!(handle.file_id().is_some());
        // only the folder remains
        assert_eq!(fx.drive.len(), 1);
    }

    #[tokio::test]
    async fn test_soft_delete() {
        let fx = Fixture::new();
        let mut handle = fx.uploaded("trashed.txt").await;

        handle.delete(false).await.unwrap();

        assert!(!handle.exists().await);
        let remote = fx.drive.get_file(handle.file_id().unwrap().as_str()).await.unwrap();
        assert!(remote.trashed);
    }

    #[tokio::test]
    async fn test_trashed_file_not_resolved_by_name() {
        let fx = Fixture::new();
        let mut handle = fx.uploaded("trash_me.txt").await;
        handle.delete(false).await.unwrap();

        let mut again = fx.handle(config().with_file_name("trash_me.txt").with_folder_name(TEST_FOLDER));
        again.initialize().await.unwrap();
        assert!(again.file_id().is_none());
    }

    #[tokio::test]
    async fn test_file_operations_require_file_id() {
        let fx = Fixture::new();
        let local = fx.local_file("a.txt", "x").await;
        let mut handle = fx.handle(config());
        handle.initialize().await.unwrap();
        let calls = fx.drive.calls();

        assert!(matches!(handle.update(&local).await, Err(Error::Precondition(_))));
        assert!(matches!(handle.download(&local).await, Err(Error::Precondition(_))));
        assert!(matches!(handle.rename("b").await, Err(Error::Precondition(_))));
        assert!(matches!(
            handle.move_to(None, Some("x")).await,
            Err(Error::Precondition(_))
        ));
        assert!(matches!(handle.delete(true).await, Err(Error::Precondition(_))));
        assert!(matches!(handle.delete(false).await, Err(Error::Precondition(_))));
        assert!(matches!(handle.refresh().await, Err(Error::Precondition(_))));
        assert!(!handle.exists().await);

        assert_eq!(fx.drive.calls(), calls);
    }

    #[tokio::test]
    async fn test_clear_cache_on_initialize() {
        let fx = Fixture::new();
        fx.cache
            .save("driverator_stale.txt", &FileRecord::default())
            .await
            .unwrap();

        let mut handle = fx.handle(config().with_file_name("stale.txt").with_clear_cache(true));
        handle.initialize().await.unwrap();

        assert_eq!(handle.cached_record().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_json_cache_backend() {
        let fx = Fixture::new();
        let cache = Arc::new(JsonFileCache::new(fx.dir.path().join("cache"), chrono::Duration::days(7)));
        let local = fx.local_file("json.txt", "Test content").await;

        let mut handle = Handle::with_backends(
            config().with_file_name("json.txt"),
            Arc::new(fx.drive.clone()),
            cache.clone(),
        )
        .unwrap();
        handle.initialize().await.unwrap();
        handle.upload(&local).await.unwrap();

        assert!(cache.path_for("driverator_json.txt").exists());
        assert_eq!(handle.cached_record().await.unwrap(), Some(handle.record()));
    }
}
