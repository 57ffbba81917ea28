//! Service-account authentication and token management for Google Drive.
//!
//! A JWT signed with the service account's RSA key is exchanged at the
//! token endpoint for a short-lived bearer token, which is cached and
//! refreshed shortly before it expires.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zeroize::Zeroize;

use driverator_common::{Error, Result};

use super::client::DriveClient;
use crate::remote::{CredentialProvider, RemoteClient};

/// OAuth2 token endpoint used when the key file does not name one.
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Grant type for the JWT bearer assertion flow.
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each assertion (the provider's maximum).
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

/// Service account key file contents.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    /// Parse a key from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            Error::Authentication(format!("Invalid service account key JSON: {}", e))
        })
    }

    /// Read and validate a key file.
    ///
    /// # Errors
    /// - File missing or unreadable
    /// - Malformed JSON or not a service account key
    pub async fn from_file(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Authentication(format!(
                "Cannot read service account key {}: {}",
                path.display(),
                e
            ))
        })?;

        let key = Self::from_json(&json)?;
        key.validate()?;
        Ok(key)
    }

    /// Check the fields the JWT flow depends on.
    pub fn validate(&self) -> Result<()> {
        if self.key_type != "service_account" {
            return Err(Error::Authentication(format!(
                "Expected key type 'service_account', got '{}'",
                self.key_type
            )));
        }
        if self.client_email.is_empty() {
            return Err(Error::Authentication("client_email is empty".to_string()));
        }
        if self.private_key.is_empty() {
            return Err(Error::Authentication("private_key is empty".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

impl Drop for ServiceAccountKey {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

/// JWT claims for the assertion.
#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    scope: String,
    aud: String,
    exp: i64,
    iat: i64,
}

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Bearer token with expiration tracking.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Check if the token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        // Consider expired if less than 5 minutes remaining
        self.expires_at < Utc::now() + Duration::minutes(5)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token manager that mints a new token when the cached one expires.
pub struct TokenManager {
    key: ServiceAccountKey,
    scopes: Vec<String>,
    http: Client,
    token: tokio::sync::RwLock<Option<AccessToken>>,
}

impl TokenManager {
    /// Create a token manager. No request is made until a token is needed.
    pub fn new(key: ServiceAccountKey, scopes: &[&str], http: Client) -> Self {
        Self {
            key,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            http,
            token: tokio::sync::RwLock::new(None),
        }
    }

    /// Get a valid access token, fetching a new one if necessary.
    ///
    /// # Errors
    /// - Key rejected by the token endpoint
    /// - Network errors
    pub async fn get_access_token(&self) -> Result<String> {
        {
            let token = self.token.read().await;
            if let Some(token) = token.as_ref().filter(|t| !t.is_expired()) {
                return Ok(token.token.clone());
            }
        }

        let mut token = self.token.write().await;

        // Double-check after acquiring write lock
        if let Some(current) = token.as_ref().filter(|t| !t.is_expired()) {
            return Ok(current.token.clone());
        }

        tracing::info!(client_email = %self.key.client_email, "Fetching service account access token");

        let fresh = self.fetch_token().await?;
        let value = fresh.token.clone();
        *token = Some(fresh);

        Ok(value)
    }

    /// Build the signed assertion.
    fn assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let iat = now.timestamp();
        let claims = JwtClaims {
            iss: self.key.client_email.clone(),
            scope: self.scopes.join(" "),
            aud: self.key.token_uri.clone(),
            exp: iat + ASSERTION_LIFETIME_SECS,
            iat,
        };

        let mut header = Header::new(Algorithm::RS256);
        if !self.key.private_key_id.is_empty() {
            header.kid = Some(self.key.private_key_id.clone());
        }

        // Key files sometimes carry escaped newlines.
        let pem = self.key.private_key.replace("\\n", "\n");
        let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| Error::Authentication(format!("Invalid private key: {}", e)))?;

        encode(&header, &claims, &encoding_key)
            .map_err(|e| Error::Authentication(format!("Failed to sign JWT: {}", e)))
    }

    /// Exchange a fresh assertion for an access token.
    async fn fetch_token(&self) -> Result<AccessToken> {
        let now = Utc::now();
        let assertion = self.assertion(now)?;

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Token exchange request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Authentication(format!(
                "Token exchange failed: {} - {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Authentication(format!("Invalid token response: {}", e)))?;

        let expires_in = token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);

        Ok(AccessToken {
            token: token.access_token,
            expires_at: now + Duration::seconds(expires_in),
        })
    }

    /// Service account email the tokens are issued for.
    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }
}

/// Credential provider backed by a service account key file.
#[derive(Debug, Clone)]
pub struct ServiceAccountCredentials {
    key_file: PathBuf,
}

impl ServiceAccountCredentials {
    pub fn new(key_file: impl Into<PathBuf>) -> Self {
        Self {
            key_file: key_file.into(),
        }
    }

    pub fn key_file(&self) -> &Path {
        &self.key_file
    }
}

#[async_trait]
impl CredentialProvider for ServiceAccountCredentials {
    /// Load the key and mint a first token so bad credentials fail here,
    /// not on the first file operation.
    async fn authenticate(&self, scopes: &[&str]) -> Result<Arc<dyn RemoteClient>> {
        let key = ServiceAccountKey::from_file(&self.key_file).await?;
        let http = DriveClient::http_client()?;
        let token_manager = Arc::new(TokenManager::new(key, scopes, http.clone()));

        token_manager.get_access_token().await?;

        tracing::debug!(client_email = %token_manager.client_email(), "Service account authenticated");

        Ok(Arc::new(DriveClient::with_http(http, token_manager)))
    }
}
