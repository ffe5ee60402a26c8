//! Directory listings derived from prefix/delimiter queries.

use super::{
    error::FileManagerResult,
    object_store::ObjectStore,
    paths::{DELIMITER, DELIMITER_STR, DirPath},
};
use std::{collections::BTreeSet, sync::Arc};
use tracing::debug;

/// Immediate children of a directory, as full keys.
///
/// `files` never contain a delimiter past the listed prefix; `directories`
/// contain exactly one, at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub files: BTreeSet<String>,
    pub directories: BTreeSet<String>,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directories.is_empty()
    }
}

#[derive(Clone)]
pub struct NamespaceLister {
    objects: Arc<dyn ObjectStore>,
}

impl NamespaceLister {
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        Self { objects }
    }

    /// Partition the keys under `prefix` into child files and child directories.
    ///
    /// The directory's own marker is never reported as a child. Store failures
    /// surface as `StoreUnavailable` and are not retried.
    pub async fn list(&self, prefix: &DirPath) -> FileManagerResult<Listing> {
        let prefix = prefix.as_str();
        let raw = self.objects.list_keys(prefix, DELIMITER_STR).await?;

        let mut listing = Listing::default();
        for key in raw.keys {
            if key == prefix {
                continue;
            }
            let Some(rest) = key.strip_prefix(prefix) else {
                continue;
            };
            match rest.find(DELIMITER) {
                None => {
                    listing.files.insert(key);
                }
                // Backends are expected to fold these, but do not trust it.
                Some(_) => {
                    if let Some(child) = child_directory(prefix, rest) {
                        listing.directories.insert(child);
                    }
                }
            }
        }

        for common in raw.common_prefixes {
            let Some(rest) = common.strip_prefix(prefix) else {
                continue;
            };
            match child_directory(prefix, rest) {
                Some(child) => {
                    listing.directories.insert(child);
                }
                None => debug!("ignoring degenerate common prefix `{}`", common),
            }
        }

        debug!(
            "listed `{}`: {} files, {} directories",
            prefix,
            listing.files.len(),
            listing.directories.len()
        );
        Ok(listing)
    }
}

/// Fold `rest` (a key with `prefix` removed) to its first segment.
///
/// Returns `None` for an empty first segment, which is what a bare delimiter
/// reported as a child prefix of root looks like.
fn child_directory(prefix: &str, rest: &str) -> Option<String> {
    let segment = rest.split(DELIMITER).next().unwrap_or_default();
    if segment.is_empty() {
        return None;
    }
    Some(format!("{prefix}{segment}{DELIMITER}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::object::{KeyListing, ObjectInfo, StoredObject},
        services::{
            error::FileManagerError,
            object_store::{MemoryObjectStore, StoreError, StoreResult},
        },
    };
    use async_trait::async_trait;
    use bytes::Bytes;
    use proptest::prelude::*;

    async fn seeded(keys: &[&str]) -> (NamespaceLister, Arc<MemoryObjectStore>) {
        let store = Arc::new(MemoryObjectStore::new());
        for key in keys {
            store.put(key, Bytes::new(), "text/plain").await.unwrap();
        }
        (NamespaceLister::new(store.clone()), store)
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn empty_store_lists_empty_root() {
        let (lister, _) = seeded(&[]).await;
        let listing = lister.list(&DirPath::root()).await.unwrap();
        assert!(listing.is_empty());
    }

    #[tokio::test]
    async fn partitions_root_and_nested_children() {
        let (lister, _) = seeded(&[
            "a.txt",
            "reports/",
            "reports/q1.txt",
            "reports/2025/",
            "reports/2025/deep.txt",
            "implicit/child.txt",
        ])
        .await;

        let root = lister.list(&DirPath::root()).await.unwrap();
        assert_eq!(root.files, set(&["a.txt"]));
        assert_eq!(root.directories, set(&["implicit/", "reports/"]));

        let reports = lister.list(&DirPath::parse("reports").unwrap()).await.unwrap();
        assert_eq!(reports.files, set(&["reports/q1.txt"]));
        assert_eq!(reports.directories, set(&["reports/2025/"]));
    }

    #[tokio::test]
    async fn own_marker_is_not_a_child() {
        let (lister, _) = seeded(&["reports/"]).await;
        let listing = lister.list(&DirPath::parse("reports/").unwrap()).await.unwrap();
        assert!(listing.is_empty());
    }

    struct DegenerateStore;

    #[async_trait]
    impl ObjectStore for DegenerateStore {
        async fn list_keys(&self, _prefix: &str, _delimiter: &str) -> StoreResult<KeyListing> {
            Ok(KeyListing {
                keys: vec!["/".into(), "top.txt".into()],
                common_prefixes: vec!["/".into(), "docs/".into()],
            })
        }
        async fn get(&self, _key: &str) -> StoreResult<Option<StoredObject>> {
            Ok(None)
        }
        async fn put(&self, key: &str, bytes: Bytes, ct: &str) -> StoreResult<ObjectInfo> {
            Ok(ObjectInfo::describe(key, &bytes, ct))
        }
        async fn delete(&self, _key: &str) -> StoreResult<bool> {
            Ok(false)
        }
        async fn hash_of(&self, _key: &str) -> StoreResult<Option<String>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn root_delimiter_is_not_a_subdirectory() {
        let lister = NamespaceLister::new(Arc::new(DegenerateStore));
        let listing = lister.list(&DirPath::root()).await.unwrap();
        assert_eq!(listing.files, set(&["top.txt"]));
        assert_eq!(listing.directories, set(&["docs/"]));
    }

    struct DownStore;

    fn refused() -> StoreError {
        StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ))
    }

    #[async_trait]
    impl ObjectStore for DownStore {
        async fn list_keys(&self, _prefix: &str, _delimiter: &str) -> StoreResult<KeyListing> {
            Err(refused())
        }
        async fn get(&self, _key: &str) -> StoreResult<Option<StoredObject>> {
            Err(refused())
        }
        async fn put(&self, _key: &str, _bytes: Bytes, _ct: &str) -> StoreResult<ObjectInfo> {
            Err(refused())
        }
        async fn delete(&self, _key: &str) -> StoreResult<bool> {
            Err(refused())
        }
        async fn hash_of(&self, _key: &str) -> StoreResult<Option<String>> {
            Err(refused())
        }
    }

    #[tokio::test]
    async fn listing_failure_is_store_unavailable() {
        let lister = NamespaceLister::new(Arc::new(DownStore));
        let err = lister.list(&DirPath::root()).await.unwrap_err();
        assert!(matches!(err, FileManagerError::StoreUnavailable(_)));
    }

    proptest! {
        #[test]
        fn partition_is_exhaustive_and_disjoint(
            keys in proptest::collection::btree_set("[ab]{1,2}(/[ab]{1,2}){0,3}/?", 0..12),
            depth in 0usize..2,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let prefix = if depth == 0 { DirPath::root() } else { DirPath::parse("a").unwrap() };
            let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
            let listing = runtime.block_on(async {
                let (lister, _) = seeded(&key_refs).await;
                lister.list(&prefix).await.unwrap()
            });

            prop_assert!(listing.files.is_disjoint(&listing.directories));
            for key in keys.iter().filter(|k| k.starts_with(prefix.as_str())) {
                if key == prefix.as_str() {
                    prop_assert!(!listing.files.contains(key) && !listing.directories.contains(key));
                    continue;
                }
                let rest = &key[prefix.as_str().len()..];
                match rest.find('/') {
                    None => prop_assert!(listing.files.contains(key)),
                    Some(pos) => {
                        let folded = format!("{}{}", prefix.as_str(), &rest[..=pos]);
                        prop_assert!(listing.directories.contains(&folded));
                    }
                }
            }
            for dir in &listing.directories {
                let rest = &dir[prefix.as_str().len()..];
                prop_assert_eq!(rest.find('/'), Some(rest.len() - 1));
            }
        }
    }
}
