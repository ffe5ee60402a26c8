//! Directory creation and deletion over the flat namespace.
//!
//! A directory exists when its marker object (an empty object keyed with a
//! trailing delimiter) exists. Records in the metadata store are written and
//! removed best-effort; failures there are logged and never undo the object
//! store mutation.

use super::{
    error::{FileManagerError, FileManagerResult},
    lister::NamespaceLister,
    metadata_store::{MetadataResult, MetadataStore},
    object_store::ObjectStore,
    paths::DirPath,
};
use crate::models::records::{DIRECTORIES, DirectoryRecord, to_fields};
use bytes::Bytes;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Content type recorded on directory markers.
pub const DIRECTORY_CONTENT_TYPE: &str = "application/x-directory";

#[derive(Clone)]
pub struct DirectoryService {
    objects: Arc<dyn ObjectStore>,
    metadata: Arc<dyn MetadataStore>,
    lister: NamespaceLister,
}

impl DirectoryService {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        metadata: Arc<dyn MetadataStore>,
        lister: NamespaceLister,
    ) -> Self {
        Self {
            objects,
            metadata,
            lister,
        }
    }

    /// Create `name` under `parent_path` and return the new directory path.
    ///
    /// Idempotent: re-creating an existing directory rewrites the same empty
    /// marker and does not add a second record.
    pub async fn create(
        &self,
        name: &str,
        parent_path: &str,
        owner: Option<&str>,
    ) -> FileManagerResult<DirPath> {
        let parent = DirPath::parse(parent_path)?;
        let full_path = parent.join_dir(name)?;

        self.objects
            .put(full_path.as_str(), Bytes::new(), DIRECTORY_CONTENT_TYPE)
            .await?;
        info!("created directory `{}`", full_path);

        if let Err(err) = self.record_directory(&full_path, owner).await {
            warn!(
                "directory `{}` exists but its record was not written: {}",
                full_path, err
            );
        }
        Ok(full_path)
    }

    /// Delete an empty directory.
    ///
    /// Fails with `DirectoryNotEmpty` (and mutates nothing) while any child
    /// file or directory is listed, and with `NotFound` when no marker exists.
    pub async fn delete(&self, path: &str) -> FileManagerResult<()> {
        let dir = DirPath::parse(path)?;
        if dir.is_root() {
            return Err(FileManagerError::invalid_path(
                path,
                "the root directory cannot be deleted",
            ));
        }

        let listing = self.lister.list(&dir).await?;
        if !listing.is_empty() {
            return Err(FileManagerError::DirectoryNotEmpty(dir.to_string()));
        }

        if !self.objects.delete(dir.as_str()).await? {
            return Err(FileManagerError::NotFound(dir.to_string()));
        }
        info!("deleted directory `{}`", dir);

        if let Err(err) = self.forget_directory(&dir).await {
            warn!("directory `{}` deleted but its record remains: {}", dir, err);
        }
        Ok(())
    }

    async fn record_directory(&self, path: &DirPath, owner: Option<&str>) -> MetadataResult<()> {
        let existing = self
            .metadata
            .query(DIRECTORIES, "path", &Value::from(path.as_str()))
            .await?;
        if !existing.is_empty() {
            return Ok(());
        }

        let record = DirectoryRecord {
            path: path.to_string(),
            parent_path: Some(path.parent().to_string()),
            owner: owner.map(str::to_string),
            created_at: Utc::now(),
        };
        self.metadata.add(DIRECTORIES, to_fields(&record)?).await?;
        Ok(())
    }

    async fn forget_directory(&self, path: &DirPath) -> MetadataResult<()> {
        let records = self
            .metadata
            .query(DIRECTORIES, "path", &Value::from(path.as_str()))
            .await?;
        for record in records {
            self.metadata.delete(DIRECTORIES, &record.id).await?;
        }
        Ok(())
    }
}
