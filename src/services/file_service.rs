//! File upload, download and deletion.

use super::{
    error::{FileManagerError, FileManagerResult},
    lister::NamespaceLister,
    metadata_store::{MetadataResult, MetadataStore},
    object_store::ObjectStore,
    paths::FilePath,
};
use crate::models::{
    object::{ObjectInfo, StoredObject, content_hash},
    records::{FILES, FileRecord, to_fields},
};
use bytes::Bytes;
use futures::future::try_join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Clone)]
pub struct FileService {
    objects: Arc<dyn ObjectStore>,
    metadata: Arc<dyn MetadataStore>,
    lister: NamespaceLister,
}

/// One file to be written.
#[derive(Debug, Clone)]
pub struct Upload<'a> {
    pub content: Bytes,
    pub target_path: &'a str,
    /// Content type supplied by the client, if any.
    pub content_type: Option<&'a str>,
    /// Write even when a sibling already holds identical bytes.
    pub overwrite: bool,
    pub owner: Option<&'a str>,
}

impl FileService {
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

    /// Write a file, refusing content already present among its siblings
    /// unless `overwrite` is set.
    ///
    /// The object write and the record write are separate steps; a failure of
    /// the latter is reported but leaves the object in place.
    pub async fn upload(&self, upload: Upload<'_>) -> FileManagerResult<ObjectInfo> {
        let target = FilePath::parse(upload.target_path)?;
        let hash = content_hash(&upload.content);

        let conflicts = self.duplicates_of(&target, &hash).await?;
        if !conflicts.is_empty() && !upload.overwrite {
            return Err(FileManagerError::DuplicateContent {
                path: target.to_string(),
                conflicts,
            });
        }

        let content_type = resolve_content_type(upload.content_type, &target);
        let info = self
            .objects
            .put(target.as_str(), upload.content, &content_type)
            .await?;
        info!("stored `{}` ({} bytes)", target, info.size_bytes);

        self.record_file(&target, &info, upload.owner).await?;
        Ok(info)
    }

    /// Fetch the bytes stored at exactly `path`.
    pub async fn download(&self, path: &str) -> FileManagerResult<StoredObject> {
        let target = FilePath::parse(path)?;
        self.objects
            .get(target.as_str())
            .await?
            .ok_or_else(|| FileManagerError::NotFound(target.to_string()))
    }

    /// Remove the object at `path`. The file record is left behind; the
    /// reconciliation job prunes it.
    pub async fn delete(&self, path: &str) -> FileManagerResult<()> {
        let target = FilePath::parse(path)?;
        if !self.objects.delete(target.as_str()).await? {
            return Err(FileManagerError::NotFound(target.to_string()));
        }
        info!("deleted file `{}`", target);
        Ok(())
    }

    /// Sibling files of `target` whose stored hash equals `hash`.
    async fn duplicates_of(&self, target: &FilePath, hash: &str) -> FileManagerResult<Vec<String>> {
        let siblings = self.lister.list(&target.parent()).await?;
        let hashes = try_join_all(siblings.files.iter().map(|key| async move {
            self.objects
                .hash_of(key)
                .await
                .map(|stored| (key.clone(), stored))
        }))
        .await?;

        let conflicts: Vec<String> = hashes
            .into_iter()
            .filter(|(_, stored)| stored.as_deref() == Some(hash))
            .map(|(key, _)| key)
            .collect();
        debug!(
            "`{}` compared against {} siblings, {} identical",
            target,
            siblings.files.len(),
            conflicts.len()
        );
        Ok(conflicts)
    }

    /// Insert or refresh the record for `target`.
    async fn record_file(
        &self,
        target: &FilePath,
        info: &ObjectInfo,
        owner: Option<&str>,
    ) -> MetadataResult<()> {
        let record = FileRecord {
            path: target.to_string(),
            directory: target.parent().to_string(),
            size: info.size_bytes,
            content_type: info.content_type.clone(),
            hash: info.etag.clone(),
            owner: owner.map(str::to_string),
            created_at: info.last_modified,
        };
        let fields = to_fields(&record)?;

        let existing = self
            .metadata
            .query(FILES, "path", &Value::from(target.as_str()))
            .await?;
        match existing.split_first() {
            Some((first, stale)) => {
                self.metadata.set(FILES, &first.id, fields).await?;
                for doc in stale {
                    self.metadata.delete(FILES, &doc.id).await?;
                }
            }
            None => {
                self.metadata.add(FILES, fields).await?;
            }
        }
        Ok(())
    }
}

/// Client-supplied type, else a guess from the extension, else octet-stream.
fn resolve_content_type(supplied: Option<&str>, target: &FilePath) -> String {
    supplied
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .map(str::to_string)
        .or_else(|| {
            mime_guess::from_path(target.name())
                .first_raw()
                .map(str::to_string)
        })
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string())
}
