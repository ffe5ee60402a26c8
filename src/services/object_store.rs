//! Object-store capability consumed by the namespace services.
//!
//! The store is a flat key -> bytes map with prefix/delimiter listing. Every
//! backend folds keys through [`fold_listing`] so the listing semantics do not
//! depend on which backend is wired in.

use crate::models::object::{KeyListing, ObjectInfo, StoredObject};
use async_trait::async_trait;
use bytes::Bytes;
use std::{collections::BTreeMap, collections::BTreeSet, io};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List keys under `prefix`, folding anything past the next `delimiter`
    /// into a common prefix.
    async fn list_keys(&self, prefix: &str, delimiter: &str) -> StoreResult<KeyListing>;

    /// Fetch an object's payload. `None` when no object exists at `key`.
    async fn get(&self, key: &str) -> StoreResult<Option<StoredObject>>;

    /// Write (or wholly overwrite) the object at `key`.
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> StoreResult<ObjectInfo>;

    /// Remove the object at `key`. Returns `false` if it did not exist.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Stored content hash for `key`, `None` when absent.
    async fn hash_of(&self, key: &str) -> StoreResult<Option<String>>;
}

/// Partition keys under `prefix` into direct keys and one-level common prefixes.
///
/// Keys that do not start with `prefix` are ignored. Common prefixes are
/// deduplicated and sorted.
pub fn fold_listing<'a>(
    keys: impl IntoIterator<Item = &'a str>,
    prefix: &str,
    delimiter: &str,
) -> KeyListing {
    let mut direct = Vec::new();
    let mut common_prefixes = BTreeSet::new();
    for key in keys {
        if !key.starts_with(prefix) {
            continue;
        }
        match compute_common_prefix(key, prefix, delimiter) {
            Some(common) => {
                common_prefixes.insert(common);
            }
            None => direct.push(key.to_string()),
        }
    }
    KeyListing {
        keys: direct,
        common_prefixes: common_prefixes.into_iter().collect(),
    }
}

/// Compute the synthetic common prefix for `key`, if it has a delimiter past
/// `prefix`.
fn compute_common_prefix(key: &str, prefix: &str, delimiter: &str) -> Option<String> {
    if delimiter.is_empty() {
        return None;
    }
    let after_prefix = key.strip_prefix(prefix)?;
    let pos = after_prefix.find(delimiter)?;
    let mut combined = String::with_capacity(prefix.len() + pos + delimiter.len());
    combined.push_str(prefix);
    combined.push_str(&after_prefix[..pos + delimiter.len()]);
    Some(combined)
}

/// Object store held entirely in memory.
///
/// Used by tests and handy for running the service without any disk state.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, (ObjectInfo, Bytes)>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every key currently stored.
    #[cfg(test)]
    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_keys(&self, prefix: &str, delimiter: &str) -> StoreResult<KeyListing> {
        let objects = self.objects.read().await;
        let candidates = objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.as_str());
        Ok(fold_listing(candidates, prefix, delimiter))
    }

    async fn get(&self, key: &str) -> StoreResult<Option<StoredObject>> {
        Ok(self
            .objects
            .read()
            .await
            .get(key)
            .map(|(info, bytes)| StoredObject {
                bytes: bytes.clone(),
                content_type: info.content_type.clone(),
            }))
    }

    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> StoreResult<ObjectInfo> {
        let info = ObjectInfo::describe(key, &bytes, content_type);
        self.objects
            .write()
            .await
            .insert(key.to_string(), (info.clone(), bytes));
        Ok(info)
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.objects.write().await.remove(key).is_some())
    }

    async fn hash_of(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self
            .objects
            .read()
            .await
            .get(key)
            .map(|(info, _)| info.etag.clone()))
    }
}
