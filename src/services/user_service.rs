//! First-sign-in bootstrap of per-user profiles.

use super::{
    error::FileManagerResult,
    identity::Identity,
    metadata_store::{MetadataError, MetadataStore},
};
use crate::models::records::{DIRECTORIES, DirectoryRecord, USERS, UserProfile, from_fields, to_fields};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

const DEFAULT_NAME: &str = "New User";
const DEFAULT_EMAIL: &str = "no-email@example.com";

#[derive(Clone)]
pub struct UserService {
    metadata: Arc<dyn MetadataStore>,
}

impl UserService {
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    /// Load the caller's profile, creating it (and its root directory
    /// record) on first sight.
    pub async fn ensure_user(&self, identity: &Identity) -> FileManagerResult<UserProfile> {
        if let Some(doc) = self.metadata.get(USERS, &identity.user_id).await? {
            let profile = from_fields(doc.fields).map_err(|source| MetadataError::Malformed {
                collection: USERS.to_string(),
                id: doc.id,
                source,
            })?;
            return Ok(profile);
        }

        let root = DirectoryRecord {
            path: String::new(),
            parent_path: None,
            owner: Some(identity.user_id.clone()),
            created_at: Utc::now(),
        };
        let root_id = self
            .metadata
            .add(DIRECTORIES, to_fields(&root).map_err(MetadataError::from)?)
            .await?;

        let profile = UserProfile {
            name: identity
                .name
                .clone()
                .unwrap_or_else(|| DEFAULT_NAME.to_string()),
            email: identity
                .email
                .clone()
                .unwrap_or_else(|| DEFAULT_EMAIL.to_string()),
            root_directory: Some(root_id),
        };
        self.metadata
            .set(
                USERS,
                &identity.user_id,
                to_fields(&profile).map_err(MetadataError::from)?,
            )
            .await?;
        info!("created profile for user `{}`", identity.user_id);
        Ok(profile)
    }
}
