//! In-memory remote provider for testing.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::stream;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use driverator_common::{Error, Permission, PermissionKind, PermissionRequest, Result};

use crate::remote::{
    ByteStream, CredentialProvider, DriveFile, FileQuery, FileUpdate, NewFile, RemoteClient,
};

/// Default download chunk size.
const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// In-memory storage entry.
#[derive(Debug, Clone)]
struct Entry {
    file: DriveFile,
    data: Vec<u8>,
    permissions: Vec<Permission>,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, Entry>,
    /// Creation order, which is also list order.
    order: Vec<String>,
}

/// In-memory remote provider.
///
/// Mirrors the provider semantics the handle relies on: trash flag,
/// parents, folder MIME type, permissions and chunked downloads. Clones
/// share the same storage.
#[derive(Clone)]
pub struct MemoryDrive {
    state: Arc<RwLock<State>>,
    calls: Arc<AtomicUsize>,
    chunk_size: usize,
}

impl MemoryDrive {
    /// Create a new empty drive.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            calls: Arc::new(AtomicUsize::new(0)),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Use `chunk_size` bytes per download chunk.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Number of remote calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of stored objects, trashed ones included.
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    /// Check if the drive holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw content of a stored object.
    pub fn content(&self, file_id: &str) -> Option<Vec<u8>> {
        self.read().entries.get(file_id).map(|e| e.data.clone())
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn not_found(file_id: &str) -> Error {
        Error::NotFound(format!("File not found: {}", file_id))
    }

    fn check_parents(state: &State, parents: &[String]) -> Result<()> {
        for parent in parents {
            match state.entries.get(parent) {
                Some(entry) if entry.file.is_folder() => {}
                Some(_) => {
                    return Err(Error::InvalidInput(format!("Parent is not a folder: {}", parent)))
                }
                None => return Err(Error::NotFound(format!("Parent folder not found: {}", parent))),
            }
        }
        Ok(())
    }
}

impl Default for MemoryDrive {
    fn default() -> Self {
        Self::new()
    }
}

/// Read local media the way a transfer would.
async fn read_media(media: Option<&Path>) -> Result<Option<(Vec<u8>, String)>> {
    match media {
        Some(path) => {
            let data = tokio::fs::read(path).await?;
            let mime = mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string();
            Ok(Some((data, mime)))
        }
        None => Ok(None),
    }
}

#[async_trait]
impl RemoteClient for MemoryDrive {
    async fn get_file(&self, file_id: &str) -> Result<DriveFile> {
        self.record_call();
        self.read()
            .entries
            .get(file_id)
            .map(|e| e.file.clone())
            .ok_or_else(|| Self::not_found(file_id))
    }

    async fn list_files(&self, query: &FileQuery) -> Result<Vec<DriveFile>> {
        self.record_call();
        let state = self.read();
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.entries.get(id))
            .filter(|e| query.matches(&e.file))
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|e| e.file.clone())
            .collect())
    }

    async fn create_file(&self, metadata: &NewFile, media: Option<&Path>) -> Result<DriveFile> {
        self.record_call();
        let media = read_media(media).await?;

        let mut state = self.write();
        Self::check_parents(&state, &metadata.parents)?;

        let now = Utc::now();
        let (data, detected_mime) = media.unwrap_or_default();
        let mime_type = metadata
            .mime_type
            .clone()
            .or_else(|| (!detected_mime.is_empty()).then_some(detected_mime))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut file = DriveFile {
            id: Uuid::new_v4().simple().to_string(),
            name: metadata.name.clone(),
            mime_type,
            size: None,
            created_time: Some(now),
            modified_time: Some(now),
            parents: metadata.parents.clone(),
            trashed: false,
        };
        if !file.is_folder() {
            file.size = Some(data.len().to_string());
        }

        state.order.push(file.id.clone());
        state.entries.insert(
            file.id.clone(),
            Entry {
                file: file.clone(),
                data,
                permissions: Vec::new(),
            },
        );

        Ok(file)
    }

    async fn update_file(
        &self,
        file_id: &str,
        update: &FileUpdate,
        media: Option<&Path>,
    ) -> Result<DriveFile> {
        self.record_call();
        let media = read_media(media).await?;

        let mut state = self.write();
        Self::check_parents(&state, &update.add_parents)?;

        let entry = state
            .entries
            .get_mut(file_id)
            .ok_or_else(|| Self::not_found(file_id))?;

        if let Some(name) = &update.name {
            entry.file.name = name.clone();
        }
        if let Some(trashed) = update.trashed {
            entry.file.trashed = trashed;
        }
        entry
            .file
            .parents
            .retain(|p| !update.remove_parents.contains(p));
        for parent in &update.add_parents {
            if !entry.file.parents.contains(parent) {
                entry.file.parents.push(parent.clone());
            }
        }
        if let Some((data, mime)) = media {
            entry.file.size = Some(data.len().to_string());
            entry.file.mime_type = mime;
            entry.data = data;
        }
        entry.file.modified_time = Some(Utc::now());

        Ok(entry.file.clone())
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        self.record_call();
        let mut state = self.write();
        state
            .entries
            .remove(file_id)
            .ok_or_else(|| Self::not_found(file_id))?;
        state.order.retain(|id| id != file_id);
        Ok(())
    }

    async fn download(&self, file_id: &str) -> Result<ByteStream> {
        self.record_call();
        let data = {
            let state = self.read();
            let entry = state
                .entries
                .get(file_id)
                .ok_or_else(|| Self::not_found(file_id))?;
            if entry.file.is_folder() {
                return Err(Error::InvalidInput("Cannot download a folder".to_string()));
            }
            entry.data.clone()
        };

        let chunks: Vec<Result<Bytes>> = data
            .chunks(self.chunk_size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();

        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn create_permission(
        &self,
        file_id: &str,
        request: &PermissionRequest,
        send_notification_email: Option<bool>,
    ) -> Result<Permission> {
        self.record_call();
        if send_notification_email.is_some()
            && !matches!(request.kind, PermissionKind::User | PermissionKind::Group)
        {
            return Err(Error::InvalidInput(format!(
                "sendNotificationEmail is not valid for {} permissions",
                request.kind
            )));
        }

        let mut state = self.write();
        let entry = state
            .entries
            .get_mut(file_id)
            .ok_or_else(|| Self::not_found(file_id))?;

        let permission = Permission {
            id: Uuid::new_v4().simple().to_string(),
            kind: request.kind,
            role: request.role,
            email_address: request.email_address.clone(),
        };
        entry.permissions.push(permission.clone());

        Ok(permission)
    }

    async fn list_permissions(&self, file_id: &str) -> Result<Vec<Permission>> {
        self.record_call();
        self.read()
            .entries
            .get(file_id)
            .map(|e| e.permissions.clone())
            .ok_or_else(|| Self::not_found(file_id))
    }

    async fn delete_permission(&self, file_id: &str, permission_id: &str) -> Result<()> {
        self.record_call();
        let mut state = self.write();
        let entry = state
            .entries
            .get_mut(file_id)
            .ok_or_else(|| Self::not_found(file_id))?;

        let before = entry.permissions.len();
        entry.permissions.retain(|p| p.id != permission_id);
        if entry.permissions.len() == before {
            return Err(Error::NotFound(format!("Permission not found: {}", permission_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialProvider for MemoryDrive {
    async fn authenticate(&self, _scopes: &[&str]) -> Result<Arc<dyn RemoteClient>> {
        Ok(Arc::new(self.clone()))
    }
}
