//! Advisory documents mirrored into the metadata store.
//!
//! These records are bookkeeping only. They may drift from the object store,
//! which remains the source of truth for what exists.

use crate::services::metadata_store::Fields;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned, ser::Error as _};
use serde_json::Value;

pub const USERS: &str = "users";
pub const DIRECTORIES: &str = "directories";
pub const FILES: &str = "files";

/// Directory bookkeeping: who created which path and when.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DirectoryRecord {
    /// Normalized directory path (root is `""`).
    pub path: String,

    /// Containing directory, absent for root.
    pub parent_path: Option<String>,

    /// User id of the creator, when known.
    pub owner: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// File bookkeeping, including the hash used for duplicate detection.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FileRecord {
    pub path: String,
    pub directory: String,
    pub size: i64,
    pub content_type: String,
    pub hash: String,
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-user profile created the first time a user signs in.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserProfile {
    pub name: String,
    pub email: String,

    /// Id of the user's root directory record.
    pub root_directory: Option<String>,
}

pub fn to_fields<T: Serialize>(record: &T) -> Result<Fields, serde_json::Error> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        _ => Err(serde_json::Error::custom("record did not serialize to an object")),
    }
}

pub fn from_fields<T: DeserializeOwned>(fields: Fields) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_survive_field_maps() {
        let record = FileRecord {
            path: "reports/a.txt".into(),
            directory: "reports/".into(),
            size: 5,
            content_type: "text/plain".into(),
            hash: "5d41402abc4b2a76b9719d911017c592".into(),
            owner: Some("u1".into()),
            created_at: Utc::now(),
        };
        let fields = to_fields(&record).unwrap();
        assert_eq!(fields["path"], Value::from("reports/a.txt"));
        assert_eq!(from_fields::<FileRecord>(fields).unwrap(), record);
    }
}
