//! Common types used throughout driverator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Base of the browser view link for a file.
const VIEW_URL_BASE: &str = "https://drive.google.com/file/d";
/// Base of the direct download link for a file.
const DOWNLOAD_URL_BASE: &str = "https://drive.google.com/uc?export=download&id=";

/// Opaque remote identifier of a file or folder.
///
/// Folders are files on the provider side, so the same type names both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    /// Create a new FileId from a string.
    ///
    /// # Errors
    /// - Returns error if id is empty
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(crate::Error::InvalidInput(
                "FileId cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Browser view link: `https://drive.google.com/file/d/{id}/view`.
    pub fn view_url(&self) -> String {
        format!("{}/{}/view", VIEW_URL_BASE, self.0)
    }

    /// Direct download link: `https://drive.google.com/uc?export=download&id={id}`.
    pub fn download_url(&self) -> String {
        format!("{}{}", DOWNLOAD_URL_BASE, self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for FileId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Access level granted by a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Owner,
    Organizer,
    FileOrganizer,
    Writer,
    Commenter,
    #[default]
    Reader,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Organizer => "organizer",
            Role::FileOrganizer => "fileOrganizer",
            Role::Writer => "writer",
            Role::Commenter => "commenter",
            Role::Reader => "reader",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "owner" => Ok(Role::Owner),
            "organizer" => Ok(Role::Organizer),
            "fileOrganizer" => Ok(Role::FileOrganizer),
            "writer" => Ok(Role::Writer),
            "commenter" => Ok(Role::Commenter),
            "reader" => Ok(Role::Reader),
            other => Err(crate::Error::InvalidInput(format!("Unknown role: {}", other))),
        }
    }
}

/// Kind of principal a permission is granted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionKind {
    User,
    Group,
    Domain,
    Anyone,
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermissionKind::User => "user",
            PermissionKind::Group => "group",
            PermissionKind::Domain => "domain",
            PermissionKind::Anyone => "anyone",
        };
        f.write_str(s)
    }
}

/// A permission entry attached to a remote object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    /// Provider-assigned permission id.
    pub id: String,
    /// Principal kind.
    #[serde(rename = "type")]
    pub kind: PermissionKind,
    /// Granted role.
    pub role: Role,
    /// Email of the principal (user and group permissions only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
}

/// Body of a permission-create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    #[serde(rename = "type")]
    pub kind: PermissionKind,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
}

impl PermissionRequest {
    /// Grant `role` to a single user.
    pub fn user(email: impl Into<String>, role: Role) -> Self {
        Self {
            kind: PermissionKind::User,
            role,
            email_address: Some(email.into()),
        }
    }

    /// Grant `role` to anyone holding the link.
    pub fn anyone(role: Role) -> Self {
        Self {
            kind: PermissionKind::Anyone,
            role,
            email_address: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_file_id_creation() {
        let id = FileId::new("1AbC").unwrap();
        assert_eq!(id.as_str(), "1AbC");
    }

    #[test]
    fn test_file_id_empty_fails() {
        assert!(FileId::new("").is_err());
    }

    #[test]
    fn test_urls_are_exact() {
        let id = FileId::new("abc123").unwrap();
        assert_eq!(id.view_url(), "https://drive.google.com/file/d/abc123/view");
        assert_eq!(
            id.download_url(),
            "https://drive.google.com/uc?export=download&id=abc123"
        );
    }

    #[test]
    fn test_role_wire_names() {
        for role in [
            Role::Owner,
            Role::Organizer,
            Role::FileOrganizer,
            Role::Writer,
            Role::Commenter,
            Role::Reader,
        ] {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_permission_deserialize_from_api() {
        let json = r#"[
            {"id": "p1", "type": "user", "role": "writer", "emailAddress": "a@example.com"},
            {"id": "anyoneWithLink", "type": "anyone", "role": "reader"}
        ]"#;
        let perms: Vec<Permission> = serde_json::from_str(json).unwrap();

        assert_eq!(perms[0].kind, PermissionKind::User);
        assert_eq!(perms[0].email_address.as_deref(), Some("a@example.com"));
        assert_eq!(perms[1].kind, PermissionKind::Anyone);
        assert_eq!(perms[1].email_address, None);
    }

    #[test]
    fn test_permission_request_body() {
        let body = serde_json::to_value(PermissionRequest::user("a@example.com", Role::Reader)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"type": "user", "role": "reader", "emailAddress": "a@example.com"})
        );

        let body = serde_json::to_value(PermissionRequest::anyone(Role::Writer)).unwrap();
        assert_eq!(body, serde_json::json!({"type": "anyone", "role": "writer"}));
    }

    proptest! {
        #[test]
        fn prop_urls_embed_id(raw in "[A-Za-z0-9_-]{1,64}") {
            let id = FileId::new(raw.clone()).unwrap();
            prop_assert_eq!(id.view_url(), format!("https://drive.google.com/file/d/{}/view", raw));
            prop_assert_eq!(id.download_url(), format!("https://drive.google.com/uc?export=download&id={}", raw));
        }
    }
}
