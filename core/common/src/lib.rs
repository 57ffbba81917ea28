//! Common utilities and types shared across the driverator crates.
//!
//! This module provides the error type and the small set of domain types
//! (remote ids, permission roles) that every other crate speaks.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{FileId, Permission, PermissionKind, PermissionRequest, Role};
