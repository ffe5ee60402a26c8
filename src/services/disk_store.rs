//! src/services/disk_store.rs
//!
//! DiskObjectStore — the flat object namespace backed by SQLite for the key
//! index and local disk for payloads. Payloads are sharded beneath
//! `base_path/{shard}/{shard}/{md5(key)}` so arbitrary keys (including
//! delimiter-terminated directory markers) map onto plain file names.

use super::object_store::{ObjectStore, StoreError, StoreResult, fold_listing};
use crate::models::object::{KeyListing, ObjectInfo, StoredObject};
use async_trait::async_trait;
use bytes::Bytes;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct DiskObjectStore {
    /// Shared SQLite connection pool holding the key index.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,
}

impl DiskObjectStore {
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Two-level shard identifiers and payload file name for a key.
    fn object_shards(key: &str) -> (String, String, String) {
        let digest = md5::compute(key);
        (
            format!("{:02x}", digest[0]),
            format!("{:02x}", digest[1]),
            format!("{:x}", digest),
        )
    }

    /// Fully-qualified payload path. Parent directories may not exist yet.
    fn object_path(&self, key: &str) -> PathBuf {
        let (shard_a, shard_b, name) = Self::object_shards(key);
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(name);
        path
    }

    async fn fetch_object(&self, key: &str) -> StoreResult<Option<ObjectInfo>> {
        let row = sqlx::query_as::<_, ObjectInfo>(
            "SELECT key, content_type, size_bytes, etag, last_modified
             FROM objects WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&*self.db)
        .await?;
        Ok(row)
    }

    /// Write bytes to a temp file beside `file_path` and fsync it. The
    /// caller renames it into place or removes it.
    async fn stage_payload(&self, file_path: &Path, bytes: &[u8]) -> StoreResult<PathBuf> {
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StoreError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let written = async {
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        Ok(tmp_path)
    }

    async fn promote_payload(tmp_path: &Path, file_path: &Path) -> io::Result<()> {
        match fs::rename(tmp_path, file_path).await {
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                fs::remove_file(file_path).await?;
                fs::rename(tmp_path, file_path).await
            }
            other => other,
        }
    }
}

#[async_trait]
impl ObjectStore for DiskObjectStore {
    async fn list_keys(&self, prefix: &str, delimiter: &str) -> StoreResult<KeyListing> {
        // Descendants are rolled up to their first delimiter past `prefix` in
        // SQL, so only one row per direct child comes back. substr() keeps
        // `%` and `_` in user keys literal, unlike LIKE.
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT DISTINCT ");
        if delimiter.is_empty() {
            builder.push("key");
        } else {
            builder.push("CASE WHEN instr(substr(key, length(");
            builder.push_bind(prefix);
            builder.push(") + 1), ");
            builder.push_bind(delimiter);
            builder.push(") > 0 THEN substr(key, 1, length(");
            builder.push_bind(prefix);
            builder.push(") + instr(substr(key, length(");
            builder.push_bind(prefix);
            builder.push(") + 1), ");
            builder.push_bind(delimiter);
            builder.push(") + length(");
            builder.push_bind(delimiter);
            builder.push(") - 1) ELSE key END");
        }
        builder.push(" AS entry FROM objects");
        if !prefix.is_empty() {
            builder.push(" WHERE substr(key, 1, length(");
            builder.push_bind(prefix);
            builder.push(")) = ");
            builder.push_bind(prefix);
        }
        builder.push(" ORDER BY entry ASC");

        let entries: Vec<String> = builder
            .build_query_scalar()
            .fetch_all(&*self.db)
            .await?;
        debug!("indexed {} entries under prefix `{}`", entries.len(), prefix);

        Ok(fold_listing(entries.iter().map(String::as_str), prefix, delimiter))
    }

    async fn get(&self, key: &str) -> StoreResult<Option<StoredObject>> {
        let Some(info) = self.fetch_object(key).await? else {
            return Ok(None);
        };
        match fs::read(self.object_path(key)).await {
            Ok(bytes) => Ok(Some(StoredObject {
                bytes: Bytes::from(bytes),
                content_type: info.content_type,
            })),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("index entry `{}` has no payload on disk", key);
                Ok(None)
            }
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> StoreResult<ObjectInfo> {
        let file_path = self.object_path(key);
        let tmp_path = self.stage_payload(&file_path, &bytes).await?;

        // The index row and the payload change together: the upsert stays
        // uncommitted until the new payload has replaced the old one.
        let info = ObjectInfo::describe(key, &bytes, content_type);
        let indexed = async {
            let mut tx = self.db.begin().await?;
            let row = sqlx::query_as::<_, ObjectInfo>(
                r#"
                INSERT INTO objects (key, content_type, size_bytes, etag, last_modified)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                    content_type = excluded.content_type,
                    size_bytes = excluded.size_bytes,
                    etag = excluded.etag,
                    last_modified = excluded.last_modified
                RETURNING key, content_type, size_bytes, etag, last_modified
                "#,
            )
            .bind(&info.key)
            .bind(&info.content_type)
            .bind(info.size_bytes)
            .bind(&info.etag)
            .bind(info.last_modified)
            .fetch_one(&mut *tx)
            .await?;
            Ok::<_, sqlx::Error>((tx, row))
        }
        .await;

        let (tx, row) = match indexed {
            Ok(staged) => staged,
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StoreError::Sqlx(err));
            }
        };

        if let Err(err) = Self::promote_payload(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        tx.commit().await?;
        Ok(row)
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut tx = self.db.begin().await?;
        let result = sqlx::query("DELETE FROM objects WHERE key = ?")
            .bind(key)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        // Dropping `tx` on a payload error rolls the index row back.
        let file_path = self.object_path(key);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed physical file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("file {} already missing", file_path.display());
            }
            Err(err) => return Err(StoreError::Io(err)),
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn hash_of(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.fetch_object(key).await?.map(|info| info.etag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> (DiskObjectStore, tempfile::TempDir) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::run_migrations(&pool).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        (DiskObjectStore::new(Arc::new(pool), dir.path()), dir)
    }

    #[tokio::test]
    async fn put_get_delete_payload() {
        let (store, _dir) = store().await;
        store
            .put("reports/a.txt", Bytes::from_static(b"hello"), "text/plain")
            .await
            .unwrap();
        assert!(store.object_path("reports/a.txt").exists());

        let stored = store.get("reports/a.txt").await.unwrap().unwrap();
        assert_eq!(&stored.bytes[..], b"hello");
        assert_eq!(
            store.hash_of("reports/a.txt").await.unwrap().as_deref(),
            Some("5d41402abc4b2a76b9719d911017c592")
        );

        assert!(store.delete("reports/a.txt").await.unwrap());
        assert!(!store.object_path("reports/a.txt").exists());
        assert!(store.get("reports/a.txt").await.unwrap().is_none());
        assert!(!store.delete("reports/a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn overwrite_replaces_index_row() {
        let (store, _dir) = store().await;
        store
            .put("a.txt", Bytes::from_static(b"one"), "text/plain")
            .await
            .unwrap();
        let info = store
            .put("a.txt", Bytes::from_static(b"three"), "text/markdown")
            .await
            .unwrap();
        assert_eq!(info.size_bytes, 5);
        let stored = store.get("a.txt").await.unwrap().unwrap();
        assert_eq!(&stored.bytes[..], b"three");
        assert_eq!(stored.content_type, "text/markdown");
    }

    /// Entries in the shard directory holding `key`'s payload.
    fn shard_entries(store: &DiskObjectStore, key: &str) -> Vec<String> {
        let path = store.object_path(key);
        let Some(shard) = path.parent() else {
            return Vec::new();
        };
        std::fs::read_dir(shard)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn failed_overwrite_keeps_previous_version() {
        let (store, _dir) = store().await;
        store
            .put("a.txt", Bytes::from_static(b"one"), "text/plain")
            .await
            .unwrap();
        sqlx::query(
            "CREATE TRIGGER freeze_objects BEFORE UPDATE ON objects
             BEGIN SELECT RAISE(ABORT, 'objects are frozen'); END",
        )
        .execute(&*store.db)
        .await
        .unwrap();

        let err = store
            .put("a.txt", Bytes::from_static(b"two"), "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Sqlx(_)));

        let stored = store.get("a.txt").await.unwrap().unwrap();
        assert_eq!(&stored.bytes[..], b"one");
        assert_eq!(
            store.hash_of("a.txt").await.unwrap(),
            Some(format!("{:x}", md5::compute(b"one")))
        );
        assert_eq!(shard_entries(&store, "a.txt").len(), 1);
    }

    #[tokio::test]
    async fn failed_payload_removal_keeps_index_row() {
        let (store, _dir) = store().await;
        store
            .put("a.txt", Bytes::from_static(b"one"), "text/plain")
            .await
            .unwrap();

        // A non-empty directory in the payload's place cannot be unlinked.
        let path = store.object_path("a.txt");
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("pin"), b"x").unwrap();

        assert!(matches!(
            store.delete("a.txt").await,
            Err(StoreError::Io(_))
        ));
        assert!(store.hash_of("a.txt").await.unwrap().is_some());
        assert_eq!(
            store.list_keys("", "/").await.unwrap().keys,
            vec!["a.txt".to_string()]
        );
    }

    #[tokio::test]
    async fn listing_treats_wildcards_literally() {
        let (store, _dir) = store().await;
        for key in [
            "a_b/",
            "a_b/x.txt",
            "a_b/deep/er/z.txt",
            "axb/y.txt",
            "a%/z.txt",
            "top.txt",
        ] {
            store.put(key, Bytes::new(), "text/plain").await.unwrap();
        }

        let nested = store.list_keys("a_b/", "/").await.unwrap();
        assert_eq!(
            nested.keys,
            vec!["a_b/".to_string(), "a_b/x.txt".to_string()]
        );
        assert_eq!(nested.common_prefixes, vec!["a_b/deep/".to_string()]);

        let deeper = store.list_keys("a_b/deep/", "/").await.unwrap();
        assert!(deeper.keys.is_empty());
        assert_eq!(deeper.common_prefixes, vec!["a_b/deep/er/".to_string()]);

        let flat = store.list_keys("a_b/", "").await.unwrap();
        assert_eq!(flat.keys.len(), 3);
        assert!(flat.common_prefixes.is_empty());

        let root = store.list_keys("", "/").await.unwrap();
        assert_eq!(root.keys, vec!["top.txt".to_string()]);
        assert_eq!(
            root.common_prefixes,
            vec!["a%/".to_string(), "a_b/".to_string(), "axb/".to_string()]
        );
    }
}
