//! Google Drive storage backend.
//!
//! This module provides:
//! - Service-account authentication with automatic token renewal
//! - Resumable uploads streamed from local files
//! - Streaming downloads
//! - Permission management

pub mod auth;
pub mod client;

pub use auth::{AccessToken, ServiceAccountCredentials, ServiceAccountKey, TokenManager};
pub use client::DriveClient;
