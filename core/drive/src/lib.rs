//! Name-addressed handles on Google Drive files.
//!
//! A [`Handle`] represents one remote file. It resolves human-readable
//! file and folder names to remote ids (creating the folder when it does
//! not exist yet), exposes upload/download/rename/move/delete and sharing
//! operations, and mirrors its last-known metadata into a TTL-bounded
//! [`MetadataCache`].
//!
//! ```no_run
//! # async fn demo() -> driverator::Result<()> {
//! use driverator::{Handle, HandleConfig, Role};
//!
//! let config = HandleConfig::new("service-account-key.json")
//!     .with_file_name("report.txt")
//!     .with_folder_name("Reports");
//!
//! let mut file = Handle::new(config)?;
//! file.initialize().await?;
//! file.upload("report.txt").await?;
//! file.share(["colleague@example.com"], Role::Reader).await?;
//! println!("{}", file.url().unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod cache;
pub mod config;
pub mod handle;
pub mod resolver;

pub use cache::{FileRecord, JsonFileCache, MemoryCache, MetadataCache};
pub use config::HandleConfig;
pub use handle::Handle;
pub use resolver::Resolver;

pub use driverator_common::{Error, FileId, Permission, PermissionKind, Result, Role};
