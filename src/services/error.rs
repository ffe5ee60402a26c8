//! Error taxonomy shared by the namespace services.

use super::{metadata_store::MetadataError, object_store::StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileManagerError {
    #[error("invalid path `{path}`: {reason}")]
    InvalidPath { path: String, reason: &'static str },
    #[error("invalid name `{name}`: {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("`{0}` not found")]
    NotFound(String),
    #[error("directory `{0}` is not empty")]
    DirectoryNotEmpty(String),
    #[error("`{path}` duplicates existing content in {}", .conflicts.join(", "))]
    DuplicateContent {
        path: String,
        conflicts: Vec<String>,
    },
    #[error("object store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
    #[error("metadata store unavailable: {0}")]
    MetadataUnavailable(#[from] MetadataError),
    #[error("authentication required")]
    AuthRequired,
}

impl FileManagerError {
    pub(crate) fn invalid_path(path: &str, reason: &'static str) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason,
        }
    }

    pub(crate) fn invalid_name(name: &str, reason: &'static str) -> Self {
        Self::InvalidName {
            name: name.to_string(),
            reason,
        }
    }
}

pub type FileManagerResult<T> = Result<T, FileManagerError>;
