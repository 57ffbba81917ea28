//! Remote storage boundary for driverator.
//!
//! This module provides the trait-based interface the handle talks to
//! (`RemoteClient`, `CredentialProvider`), the Google Drive v3
//! implementation of it, and an in-memory implementation for tests.
//!
//! # Design Principles
//! - Pass-through: every trait call maps to exactly one provider operation
//!   (uploads excepted, which are one resumable session)
//! - No retries: failures propagate to the caller unmodified
//! - Streaming: downloads are chunk streams, uploads stream from disk

pub mod gdrive;
pub mod memory;
pub mod remote;

pub use gdrive::{DriveClient, ServiceAccountCredentials, ServiceAccountKey, TokenManager};
pub use memory::MemoryDrive;
pub use remote::{
    ByteStream, CredentialProvider, DriveFile, FileQuery, FileUpdate, NewFile, ObjectKind,
    RemoteClient, DRIVE_SCOPE, FOLDER_MIME_TYPE,
};
