//! Name to id resolution against the remote provider.
//!
//! Matching is exact and case-sensitive as the provider defines it. The
//! find-then-create sequence in [`Resolver::find_or_create_folder`] is not
//! atomic: two concurrent callers can both miss and both create.

use tracing::{debug, info};

use driverator_common::{FileId, Result};
use driverator_storage::{FileQuery, NewFile, RemoteClient};

/// Resolves folder and file names to remote ids.
pub struct Resolver<'a> {
    client: &'a dyn RemoteClient,
}

impl<'a> Resolver<'a> {
    pub fn new(client: &'a dyn RemoteClient) -> Self {
        Self { client }
    }

    /// First non-trashed folder named `name`, optionally under `parent`.
    pub async fn find_folder_by_name(
        &self,
        name: &str,
        parent: Option<&FileId>,
    ) -> Result<Option<FileId>> {
        let query = FileQuery::folder(name, parent.map(FileId::as_str)).with_limit(1);
        self.first_match(&query).await
    }

    /// Create a folder named `name`, optionally under `parent`.
    ///
    /// Never checks for an existing folder; see [`Self::find_or_create_folder`].
    pub async fn create_folder(&self, name: &str, parent: Option<&FileId>) -> Result<FileId> {
        let folder = self
            .client
            .create_file(&NewFile::folder(name, parent.map(FileId::as_str)), None)
            .await?;

        info!(folder_id = %folder.id, name, "Folder created");
        FileId::new(folder.id)
    }

    /// Id of the folder named `name`, creating it when absent.
    pub async fn find_or_create_folder(&self, name: &str, parent: Option<&FileId>) -> Result<FileId> {
        match self.find_folder_by_name(name, parent).await? {
            Some(id) => Ok(id),
            None => self.create_folder(name, parent).await,
        }
    }

    /// First non-trashed, non-folder object named `name`, optionally
    /// restricted to direct children of `scope`.
    pub async fn find_file_by_name(
        &self,
        name: &str,
        scope: Option<&FileId>,
    ) -> Result<Option<FileId>> {
        let query = FileQuery::file(name, scope.map(FileId::as_str)).with_limit(1);
        self.first_match(&query).await
    }

    async fn first_match(&self, query: &FileQuery) -> Result<Option<FileId>> {
        let files = self.client.list_files(query).await?;
        debug!(query = %query.to_query_string(), matches = files.len(), "Resolved name");

        files
            .into_iter()
            .next()
            .map(|f| FileId::new(f.id))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driverator_storage::{FileUpdate, MemoryDrive};

    #[tokio::test]
    async fn test_find_or_create_folder_is_idempotent() {
        let drive = MemoryDrive::new();
        let resolver = Resolver::new(&drive);

        let first = resolver.find_or_create_folder("Reports", None).await.unwrap();
        let second = resolver.find_or_create_folder("Reports", None).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(drive.len(), 1);
    }

    #[tokio::test]
    async fn test_create_folder_never_checks_existing() {
        let drive = MemoryDrive::new();
        let resolver = Resolver::new(&drive);

        let a = resolver.create_folder("dup", None).await.unwrap();
        let b = resolver.create_folder("dup", None).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(drive.len(), 2);
    }

    #[tokio::test]
    async fn test_folder_lookup_scoped_to_parent() {
        let drive = MemoryDrive::new();
        let resolver = Resolver::new(&drive);

        let outer = resolver.create_folder("outer", None).await.unwrap();
        let inner = resolver.create_folder("inner", Some(&outer)).await.unwrap();

        assert_eq!(
            resolver.find_folder_by_name("inner", Some(&outer)).await.unwrap(),
            Some(inner.clone())
        );
        assert_eq!(
            resolver.find_folder_by_name("inner", Some(&inner)).await.unwrap(),
            None
        );
        assert_eq!(resolver.find_folder_by_name("inner", None).await.unwrap(), Some(inner));
    }

    #[tokio::test]
    async fn test_find_file_ignores_folders_and_trash() {
        let drive = MemoryDrive::new();
        let resolver = Resolver::new(&drive);

        let folder = resolver.create_folder("same", None).await.unwrap();
        assert_eq!(resolver.find_file_by_name("same", None).await.unwrap(), None);

        let file = drive
            .create_file(&NewFile::file("same", Some(folder.as_str())), None)
            .await
            .unwrap();
        assert_eq!(
            resolver
                .find_file_by_name("same", Some(&folder))
                .await
                .unwrap()
                .map(|id| id.to_string()),
            Some(file.id.clone())
        );

        drive
            .update_file(&file.id, &FileUpdate::trash(), None)
            .await
            .unwrap();
        assert_eq!(resolver.find_file_by_name("same", Some(&folder)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_name_match_is_case_sensitive() {
        let drive = MemoryDrive::new();
        let resolver = Resolver::new(&drive);

        resolver.create_folder("Docs", None).await.unwrap();
        assert_eq!(resolver.find_folder_by_name("docs", None).await.unwrap(), None);
    }
}
