//! Represents an entry in the flat object namespace.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Index row for a single object.
///
/// Whether an object is a directory marker or content is structural: markers
/// are keyed with a trailing delimiter and carry no bytes. Nothing here stores
/// a "kind" flag.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Full normalized key.
    pub key: String,

    /// Content type (MIME type) recorded at write time.
    pub content_type: String,

    /// Size in bytes.
    pub size_bytes: i64,

    /// Lowercase hex MD5 of the payload.
    pub etag: String,

    /// When the object was last written.
    pub last_modified: DateTime<Utc>,
}

impl ObjectInfo {
    pub fn describe(key: &str, content: &[u8], content_type: &str) -> Self {
        Self {
            key: key.to_string(),
            content_type: content_type.to_string(),
            size_bytes: content.len() as i64,
            etag: content_hash(content),
            last_modified: Utc::now(),
        }
    }
}

/// Payload plus the content type it was stored with.
#[derive(Clone, Debug)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Raw result of a prefix/delimiter listing.
///
/// `keys` are objects directly under the prefix, `common_prefixes` are the
/// one-level child groupings, each ending in the delimiter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyListing {
    pub keys: Vec<String>,
    pub common_prefixes: Vec<String>,
}

/// Content hash used for etags and duplicate detection.
pub fn content_hash(content: &[u8]) -> String {
    format!("{:x}", md5::compute(content))
}
