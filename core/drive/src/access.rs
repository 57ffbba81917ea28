//! Access control on a handle's remote object.
//!
//! Permissions are never cached; every call reads or writes the remote list.

use tracing::{debug, info};

use driverator_common::{Error, Permission, PermissionRequest, Result, Role};

use crate::handle::Handle;

impl Handle {
    /// Grant `role` to each email, one remote call per email, without
    /// notification.
    ///
    /// A failure part way through leaves earlier grants in place.
    pub async fn share<I, S>(&mut self, emails: I, role: Role) -> Result<Vec<Permission>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (client, file_id) = self.target()?;
        let mut granted = Vec::new();

        for email in emails {
            let email = email.as_ref();
            let request = PermissionRequest::user(email, role);
            let permission = client
                .create_permission(file_id.as_str(), &request, Some(false))
                .await?;

            info!(file_id = %file_id, email, %role, "Permission granted");
            granted.push(permission);
        }

        Ok(granted)
    }

    /// Grant `role` to anyone holding the link.
    pub async fn set_anyone_access(&mut self, role: Role) -> Result<Permission> {
        let (client, file_id) = self.target()?;

        let permission = client
            .create_permission(file_id.as_str(), &PermissionRequest::anyone(role), None)
            .await?;

        info!(file_id = %file_id, %role, "Public access granted");
        Ok(permission)
    }

    /// Current permissions on the remote object, as returned by a single
    /// listing call.
    pub async fn list_permissions(&self) -> Result<Vec<Permission>> {
        let (client, file_id) = self.target()?;

        let permissions = client.list_permissions(file_id.as_str()).await?;
        debug!(file_id = %file_id, count = permissions.len(), "Permissions listed");
        Ok(permissions)
    }

    /// Revoke the permission held by `email`.
    ///
    /// # Errors
    /// - `PermissionNotFound` when no entry matches; nothing is deleted
    pub async fn remove_permission(&mut self, email: &str) -> Result<()> {
        let (client, file_id) = self.target()?;

        let permission = self
            .list_permissions()
            .await?
            .into_iter()
            .find(|p| p.email_address.as_deref() == Some(email))
            .ok_or_else(|| Error::PermissionNotFound(email.to_string()))?;

        client
            .delete_permission(file_id.as_str(), &permission.id)
            .await?;

        info!(file_id = %file_id, email, permission_id = %permission.id, "Permission removed");
        Ok(())
    }
}
