//! Document-store capability for advisory metadata.
//!
//! Documents are loosely structured JSON maps grouped into collections. The
//! object store stays authoritative for existence; nothing read from here
//! decides whether a path exists.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{FromRow, SqlitePool};
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

pub type Fields = Map<String, Value>;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("document `{collection}/{id}` is malformed: {source}")]
    Malformed {
        collection: String,
        id: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Encode(#[from] serde_json::Error),
}

pub type MetadataResult<T> = Result<T, MetadataError>;

/// A stored document and its id within the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> MetadataResult<Option<Document>>;

    /// Create or replace the document at `collection/id`.
    async fn set(&self, collection: &str, id: &str, fields: Fields) -> MetadataResult<()>;

    /// Insert under a freshly generated id and return it.
    async fn add(&self, collection: &str, fields: Fields) -> MetadataResult<String>;

    async fn delete(&self, collection: &str, id: &str) -> MetadataResult<bool>;

    /// All documents in `collection` whose `field` equals `value`.
    async fn query(&self, collection: &str, field: &str, value: &Value)
    -> MetadataResult<Vec<Document>>;

    /// Every document in `collection`.
    async fn scan(&self, collection: &str) -> MetadataResult<Vec<Document>>;
}

#[derive(FromRow)]
struct DocumentRow {
    id: String,
    body: String,
}

impl DocumentRow {
    fn into_document(self, collection: &str) -> MetadataResult<Document> {
        let fields = serde_json::from_str::<Fields>(&self.body).map_err(|source| {
            MetadataError::Malformed {
                collection: collection.to_string(),
                id: self.id.clone(),
                source,
            }
        })?;
        Ok(Document {
            id: self.id,
            fields,
        })
    }
}

/// Metadata documents stored as JSON text in the `documents` table.
#[derive(Clone)]
pub struct SqliteMetadataStore {
    pub db: Arc<SqlitePool>,
}

impl SqliteMetadataStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn get(&self, collection: &str, id: &str) -> MetadataResult<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, body FROM documents WHERE collection = ? AND id = ?",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        row.map(|row| row.into_document(collection)).transpose()
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> MetadataResult<()> {
        let body = serde_json::to_string(&fields)?;
        sqlx::query(
            "INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)
             ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body",
        )
        .bind(collection)
        .bind(id)
        .bind(body)
        .execute(&*self.db)
        .await?;
        Ok(())
    }

    async fn add(&self, collection: &str, fields: Fields) -> MetadataResult<String> {
        let id = Uuid::new_v4().to_string();
        self.set(collection, &id, fields).await?;
        Ok(id)
    }

    async fn delete(&self, collection: &str, id: &str) -> MetadataResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&*self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> MetadataResult<Vec<Document>> {
        let documents = self.scan(collection).await?;
        Ok(documents
            .into_iter()
            .filter(|doc| doc.fields.get(field) == Some(value))
            .collect())
    }

    async fn scan(&self, collection: &str) -> MetadataResult<Vec<Document>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, body FROM documents WHERE collection = ? ORDER BY id",
        )
        .bind(collection)
        .fetch_all(&*self.db)
        .await?;
        rows.into_iter()
            .map(|row| row.into_document(collection))
            .collect()
    }
}

/// In-memory document store, keyed by `(collection, id)`.
#[derive(Default)]
pub struct MemoryMetadataStore {
    documents: RwLock<BTreeMap<(String, String), Fields>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn get(&self, collection: &str, id: &str) -> MetadataResult<Option<Document>> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(&(collection.to_string(), id.to_string()))
            .map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            }))
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> MetadataResult<()> {
        self.documents
            .write()
            .await
            .insert((collection.to_string(), id.to_string()), fields);
        Ok(())
    }

    async fn add(&self, collection: &str, fields: Fields) -> MetadataResult<String> {
        let id = Uuid::new_v4().to_string();
        self.set(collection, &id, fields).await?;
        Ok(id)
    }

    async fn delete(&self, collection: &str, id: &str) -> MetadataResult<bool> {
        Ok(self
            .documents
            .write()
            .await
            .remove(&(collection.to_string(), id.to_string()))
            .is_some())
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> MetadataResult<Vec<Document>> {
        let documents = self.scan(collection).await?;
        Ok(documents
            .into_iter()
            .filter(|doc| doc.fields.get(field) == Some(value))
            .collect())
    }

    async fn scan(&self, collection: &str) -> MetadataResult<Vec<Document>> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .filter(|((coll, _), _)| coll == collection)
            .map(|((_, id), fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect())
    }
}
