//! Google Drive API client.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use driverator_common::{Error, Permission, PermissionRequest, Result};

use super::auth::TokenManager;
use crate::remote::{ByteStream, DriveFile, FileQuery, FileUpdate, NewFile, RemoteClient};

/// Google Drive API base URL.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
/// Google Drive upload API base URL.
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Chunk size for resumable uploads (must be a multiple of 256KB).
const CHUNK_SIZE: usize = 256 * 1024;

/// Metadata fields requested for every file record.
const FILE_FIELDS: &str = "id,name,mimeType,size,createdTime,modifiedTime,parents,trashed";
/// Largest page the provider serves for `files.list`.
const MAX_PAGE_SIZE: usize = 1000;

/// Metadata fields requested for every permission record.
const PERMISSION_FIELDS: &str = "id,type,role,emailAddress";

/// Response from listing files.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Response from listing permissions.
#[derive(Debug, Deserialize)]
struct PermissionListResponse {
    #[serde(default)]
    permissions: Vec<Permission>,
}

/// Map a non-success status to the error taxonomy.
fn error_for_status(status: StatusCode, body: &str) -> Error {
    match status {
        StatusCode::NOT_FOUND => Error::NotFound(format!("Resource not found: {}", body)),
        StatusCode::UNAUTHORIZED => {
            Error::Authentication("Invalid or expired token".to_string())
        }
        StatusCode::FORBIDDEN => Error::PermissionDenied(format!("Access denied: {}", body)),
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited(body.to_string()),
        _ => Error::Network(format!("API error: {} - {}", status, body)),
    }
}

/// `Content-Range` header for one chunk of a resumable upload.
fn content_range(start_byte: u64, len: usize, total_size: u64) -> String {
    if len == 0 {
        format!("bytes */{}", total_size)
    } else {
        format!("bytes {}-{}/{}", start_byte, start_byte + len as u64 - 1, total_size)
    }
}

/// Content type for an upload, guessed from the file extension.
fn guess_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Google Drive API client.
pub struct DriveClient {
    http: Client,
    token_manager: Arc<TokenManager>,
}

impl DriveClient {
    /// Create a new Drive client.
    pub fn new(token_manager: Arc<TokenManager>) -> Result<Self> {
        Ok(Self::with_http(Self::http_client()?, token_manager))
    }

    /// Create a client sharing an existing HTTP connection pool.
    pub fn with_http(http: Client, token_manager: Arc<TokenManager>) -> Self {
        Self {
            http,
            token_manager,
        }
    }

    /// HTTP client configured for the Drive API.
    pub fn http_client() -> Result<Client> {
        Client::builder()
            .user_agent(concat!("driverator/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))
    }

    /// Get authorization header.
    async fn auth_header(&self) -> Result<String> {
        let token = self.token_manager.get_access_token().await?;
        Ok(format!("Bearer {}", token))
    }

    /// Authorized request builder.
    async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        let auth = self.auth_header().await?;
        Ok(self
            .http
            .request(method, url)
            .header(header::AUTHORIZATION, auth))
    }

    /// Open a resumable upload session and return its upload URI.
    ///
    /// `url` selects create (POST on the collection) or content replacement
    /// (PATCH on the file).
    async fn start_resumable_upload(
        &self,
        method: Method,
        url: &str,
        extra_query: &[(&str, String)],
        metadata: &serde_json::Value,
        content_type: &str,
        total_size: u64,
    ) -> Result<String> {
        let response = self
            .request(method, url)
            .await?
            .query(&[("uploadType", "resumable")])
            .query(extra_query)
            .header(header::CONTENT_TYPE, "application/json; charset=UTF-8")
            .header("X-Upload-Content-Type", content_type)
            .header("X-Upload-Content-Length", total_size.to_string())
            .json(metadata)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to start resumable upload: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &body));
        }

        // Extract upload URI from Location header
        let upload_uri = response
            .headers()
            .get(header::LOCATION)
            .ok_or_else(|| Error::Network("No upload URI in response".to_string()))?
            .to_str()
            .map_err(|e| Error::Network(format!("Invalid upload URI: {}", e)))?
            .to_string();

        Ok(upload_uri)
    }

    /// Upload a chunk to a resumable upload session.
    ///
    /// Returns the final record once the provider reports completion.
    async fn upload_chunk(
        &self,
        upload_uri: &str,
        data: Vec<u8>,
        start_byte: u64,
        total_size: u64,
    ) -> Result<Option<DriveFile>> {
        let range = content_range(start_byte, data.len(), total_size);

        let response = self
            .http
            .put(upload_uri)
            .header(header::CONTENT_LENGTH, data.len().to_string())
            .header(header::CONTENT_RANGE, range)
            .body(data)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to upload chunk: {}", e)))?;

        let status = response.status();

        if status == StatusCode::OK || status == StatusCode::CREATED {
            let file: DriveFile = response
                .json()
                .await
                .map_err(|e| Error::Network(format!("Failed to parse upload response: {}", e)))?;
            Ok(Some(file))
        } else if status == StatusCode::PERMANENT_REDIRECT {
            // 308 Resume Incomplete: more chunks needed
            Ok(None)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(error_for_status(status, &body))
        }
    }

    /// Stream a local file through an open upload session.
    async fn upload_from_path(&self, upload_uri: &str, path: &Path, total_size: u64) -> Result<DriveFile> {
        if total_size == 0 {
            return self
                .upload_chunk(upload_uri, Vec::new(), 0, 0)
                .await?
                .ok_or_else(|| Error::Network("Upload did not complete".to_string()));
        }

        let file = tokio::fs::File::open(path).await?;
        let mut stream = ReaderStream::with_capacity(file, CHUNK_SIZE);

        let mut bytes_uploaded = 0u64;
        let mut buffer = Vec::with_capacity(CHUNK_SIZE);

        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);

            while buffer.len() >= CHUNK_SIZE {
                let chunk_to_upload: Vec<u8> = buffer.drain(..CHUNK_SIZE).collect();
                let len = chunk_to_upload.len() as u64;
                let result = self
                    .upload_chunk(upload_uri, chunk_to_upload, bytes_uploaded, total_size)
                    .await?;

                bytes_uploaded += len;
                tracing::trace!(bytes_uploaded, total_size, "Uploaded chunk");

                if let Some(file) = result {
                    return Ok(file);
                }
            }
        }

        // Upload remaining bytes
        if !buffer.is_empty() {
            let result = self
                .upload_chunk(upload_uri, buffer, bytes_uploaded, total_size)
                .await?;

            if let Some(file) = result {
                return Ok(file);
            }
        }

        Err(Error::Network("Upload did not complete".to_string()))
    }

    /// Run a full resumable upload of `path`.
    async fn upload_resumable(
        &self,
        method: Method,
        url: &str,
        extra_query: &[(&str, String)],
        metadata: &serde_json::Value,
        path: &Path,
    ) -> Result<DriveFile> {
        let total_size = tokio::fs::metadata(path).await?.len();
        let content_type = guess_content_type(path);

        let upload_uri = self
            .start_resumable_upload(method, url, extra_query, metadata, &content_type, total_size)
            .await?;

        tracing::debug!(path = %path.display(), total_size, %content_type, "Resumable upload started");

        self.upload_from_path(&upload_uri, path, total_size).await
    }

    /// Handle API response with error checking.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| Error::Network(format!("Failed to parse response: {}", e)))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(error_for_status(status, &body))
        }
    }

    /// Check a response that carries no body of interest.
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(error_for_status(status, &body))
        }
    }
}

/// `fields`, `addParents` and `removeParents` query parameters for an update.
fn update_query(update: &FileUpdate) -> Vec<(&'static str, String)> {
    let mut query = vec![("fields", FILE_FIELDS.to_string())];
    if !update.add_parents.is_empty() {
        query.push(("addParents", update.add_parents.join(",")));
    }
    if !update.remove_parents.is_empty() {
        query.push(("removeParents", update.remove_parents.join(",")));
    }
    query
}

/// Query parameters for a permission create. The notification flag is only
/// sent when given; Drive rejects it for `anyone` and `domain` grants.
fn create_permission_query(send_notification_email: Option<bool>) -> Vec<(&'static str, String)> {
    let mut query = vec![("fields", PERMISSION_FIELDS.to_string())];
    if let Some(notify) = send_notification_email {
        query.push(("sendNotificationEmail", notify.to_string()));
    }
    query
}

#[async_trait]
impl RemoteClient for DriveClient {
    async fn get_file(&self, file_id: &str) -> Result<DriveFile> {
        let url = format!("{}/files/{}", DRIVE_API_BASE, file_id);

        let response = self
            .request(Method::GET, &url)
            .await?
            .query(&[("fields", FILE_FIELDS)])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to get file: {}", e)))?;

        self.handle_response(response).await
    }

    async fn list_files(&self, query: &FileQuery) -> Result<Vec<DriveFile>> {
        let url = format!("{}/files", DRIVE_API_BASE);
        let q = query.to_query_string();
        let fields = format!("files({}),nextPageToken", FILE_FIELDS);
        let limit = query.limit.unwrap_or(usize::MAX);
        let page_size = limit.clamp(1, MAX_PAGE_SIZE).to_string();

        let mut all_files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.request(Method::GET, &url).await?.query(&[
                ("q", q.as_str()),
                ("spaces", "drive"),
                ("fields", fields.as_str()),
                ("pageSize", page_size.as_str()),
            ]);

            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| Error::Network(format!("Failed to list files: {}", e)))?;

            let list_response: FileListResponse = self.handle_response(response).await?;
            all_files.extend(list_response.files);

            if all_files.len() >= limit {
                all_files.truncate(limit);
                break;
            }

            match list_response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(all_files)
    }

    async fn create_file(&self, metadata: &NewFile, media: Option<&Path>) -> Result<DriveFile> {
        let body = serde_json::to_value(metadata)?;

        if let Some(path) = media {
            let url = format!("{}/files", DRIVE_UPLOAD_BASE);
            let query = [("fields", FILE_FIELDS.to_string())];
            return self
                .upload_resumable(Method::POST, &url, &query, &body, path)
                .await;
        }

        let url = format!("{}/files", DRIVE_API_BASE);
        let response = self
            .request(Method::POST, &url)
            .await?
            .query(&[("fields", FILE_FIELDS)])
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to create file: {}", e)))?;

        self.handle_response(response).await
    }

    async fn update_file(
        &self,
        file_id: &str,
        update: &FileUpdate,
        media: Option<&Path>,
    ) -> Result<DriveFile> {
        let body = update.body();
        let query = update_query(update);

        if let Some(path) = media {
            let url = format!("{}/files/{}", DRIVE_UPLOAD_BASE, file_id);
            return self
                .upload_resumable(Method::PATCH, &url, &query, &body, path)
                .await;
        }

        let url = format!("{}/files/{}", DRIVE_API_BASE, file_id);
        let response = self
            .request(Method::PATCH, &url)
            .await?
            .query(&query)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to update file: {}", e)))?;

        self.handle_response(response).await
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        let url = format!("{}/files/{}", DRIVE_API_BASE, file_id);

        let response = self
            .request(Method::DELETE, &url)
            .await?
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to delete file: {}", e)))?;

        self.handle_empty_response(response).await
    }

    async fn download(&self, file_id: &str) -> Result<ByteStream> {
        let url = format!("{}/files/{}", DRIVE_API_BASE, file_id);

        let response = self
            .request(Method::GET, &url)
            .await?
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to start download: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &body));
        }

        let stream = response
            .bytes_stream()
            .map(|result| result.map_err(|e| Error::Network(format!("Stream read error: {}", e))));

        Ok(Box::pin(stream))
    }

    async fn create_permission(
        &self,
        file_id: &str,
        request: &PermissionRequest,
        send_notification_email: Option<bool>,
    ) -> Result<Permission> {
        let url = format!("{}/files/{}/permissions", DRIVE_API_BASE, file_id);

        let response = self
            .request(Method::POST, &url)
            .await?
            .query(&create_permission_query(send_notification_email))
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to create permission: {}", e)))?;

        self.handle_response(response).await
    }

    async fn list_permissions(&self, file_id: &str) -> Result<Vec<Permission>> {
        let url = format!("{}/files/{}/permissions", DRIVE_API_BASE, file_id);
        let fields = format!("permissions({})", PERMISSION_FIELDS);

        let response = self
            .request(Method::GET, &url)
            .await?
            .query(&[("fields", fields.as_str())])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to list permissions: {}", e)))?;

        let list: PermissionListResponse = self.handle_response(response).await?;
        Ok(list.permissions)
    }

    async fn delete_permission(&self, file_id: &str, permission_id: &str) -> Result<()> {
        let url = format!(
            "{}/files/{}/permissions/{}",
            DRIVE_API_BASE, file_id, permission_id
        );

        let response = self
            .request(Method::DELETE, &url)
            .await?
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to delete permission: {}", e)))?;

        self.handle_empty_response(response).await
    }
}
