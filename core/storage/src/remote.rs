//! Remote client and credential provider traits.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use driverator_common::{Permission, PermissionRequest, Result};

/// MIME type the provider uses to mark folder objects.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Full-access Drive scope.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Byte stream type for downloads. Chunk boundaries are provider-determined.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Remote file metadata as returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File ID.
    pub id: String,
    /// File name.
    pub name: String,
    /// MIME type.
    pub mime_type: String,
    /// File size in bytes (only for files, not folders).
    #[serde(default)]
    pub size: Option<String>,
    /// Created time.
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    /// Modified time.
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
    /// Parent folder IDs.
    #[serde(default)]
    pub parents: Vec<String>,
    /// Trashed status.
    #[serde(default)]
    pub trashed: bool,
}

impl DriveFile {
    /// Check if this is a folder.
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Get size as u64.
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_ref().and_then(|s| s.parse().ok())
    }
}

/// Which object kinds a name query matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Folder,
    File,
}

/// Structured name search over non-trashed objects.
///
/// Rendered into the provider's filter expression by [`FileQuery::to_query_string`];
/// in-process providers evaluate it with [`FileQuery::matches`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileQuery {
    /// Exact, case-sensitive name.
    pub name: String,
    /// Folder or non-folder objects.
    pub kind: ObjectKind,
    /// Restrict to direct children of this folder.
    pub parent: Option<String>,
    /// Stop after this many matches.
    pub limit: Option<usize>,
}

impl FileQuery {
    /// Query for folders named `name`.
    pub fn folder(name: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            name: name.into(),
            kind: ObjectKind::Folder,
            parent: parent.map(str::to_string),
            limit: None,
        }
    }

    /// Query for non-folder files named `name`.
    pub fn file(name: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            name: name.into(),
            kind: ObjectKind::File,
            parent: parent.map(str::to_string),
            limit: None,
        }
    }

    /// Return at most `limit` matches.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Render as a `files.list` `q` expression.
    pub fn to_query_string(&self) -> String {
        let mime_op = match self.kind {
            ObjectKind::Folder => "=",
            ObjectKind::File => "!=",
        };

        let mut query = format!(
            "name = '{}' and mimeType {} '{}' and trashed = false",
            escape_literal(&self.name),
            mime_op,
            FOLDER_MIME_TYPE
        );

        if let Some(parent) = &self.parent {
            query.push_str(&format!(" and '{}' in parents", escape_literal(parent)));
        }

        query
    }

    /// Evaluate the query against a metadata record.
    pub fn matches(&self, file: &DriveFile) -> bool {
        let kind_ok = match self.kind {
            ObjectKind::Folder => file.is_folder(),
            ObjectKind::File => !file.is_folder(),
        };

        kind_ok
            && !file.trashed
            && file.name == self.name
            && self
                .parent
                .as_ref()
                .map_or(true, |p| file.parents.iter().any(|fp| fp == p))
    }
}

/// Escape a string literal for the filter expression language.
fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Metadata for a new remote object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

impl NewFile {
    /// A plain file, optionally under `parent`.
    pub fn file(name: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            parents: parent.map(|p| vec![p.to_string()]).unwrap_or_default(),
        }
    }

    /// A folder, optionally under `parent`.
    pub fn folder(name: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
            ..Self::file(name, parent)
        }
    }
}

/// Partial update of an existing remote object.
///
/// `name` and `trashed` travel in the request body; parent changes travel as
/// `addParents` / `removeParents` query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileUpdate {
    pub name: Option<String>,
    pub trashed: Option<bool>,
    pub add_parents: Vec<String>,
    pub remove_parents: Vec<String>,
}

impl FileUpdate {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn trash() -> Self {
        Self {
            trashed: Some(true),
            ..Self::default()
        }
    }

    /// Replace all `previous` parents with `target`.
    pub fn reparent(target: impl Into<String>, previous: Vec<String>) -> Self {
        Self {
            add_parents: vec![target.into()],
            remove_parents: previous,
            ..Self::default()
        }
    }

    /// JSON body for the metadata part of the request.
    pub fn body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({});
        if let Some(name) = &self.name {
            body["name"] = serde_json::json!(name);
        }
        if let Some(trashed) = self.trashed {
            body["trashed"] = serde_json::json!(trashed);
        }
        body
    }
}

/// Remote storage client.
///
/// Every call is attempted exactly once; errors propagate unmodified.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Fetch full metadata for an object (trashed objects included).
    ///
    /// # Errors
    /// - `NotFound` when the id does not exist
    async fn get_file(&self, file_id: &str) -> Result<DriveFile>;

    /// List objects matching `query`, in provider order, up to its limit.
    async fn list_files(&self, query: &FileQuery) -> Result<Vec<DriveFile>>;

    /// Create an object, uploading the local file at `media` if given.
    ///
    /// # Errors
    /// - Local file unreadable
    /// - Network/authentication errors
    async fn create_file(&self, metadata: &NewFile, media: Option<&Path>) -> Result<DriveFile>;

    /// Update metadata, parents and/or content of an object.
    async fn update_file(
        &self,
        file_id: &str,
        update: &FileUpdate,
        media: Option<&Path>,
    ) -> Result<DriveFile>;

    /// Permanently delete an object, bypassing trash.
    async fn delete_file(&self, file_id: &str) -> Result<()>;

    /// Stream the content of an object.
    async fn download(&self, file_id: &str) -> Result<ByteStream>;

    /// Attach a permission to an object.
    ///
    /// `send_notification_email` is only valid for `user` and `group`
    /// grants; pass `None` for any other kind.
    async fn create_permission(
        &self,
        file_id: &str,
        request: &PermissionRequest,
        send_notification_email: Option<bool>,
    ) -> Result<Permission>;

    /// List permissions of an object (single page).
    async fn list_permissions(&self, file_id: &str) -> Result<Vec<Permission>>;

    /// Remove a permission from an object.
    async fn delete_permission(&self, file_id: &str, permission_id: &str) -> Result<()>;
}

/// Produces an authenticated remote client.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Authenticate for `scopes` and return a ready client.
    ///
    /// # Errors
    /// - `Authentication` when credentials are missing or rejected
    async fn authenticate(&self, scopes: &[&str]) -> Result<Arc<dyn RemoteClient>>;
}
