//! Wiring of the namespace services over injected collaborators.

use super::{
    directory_service::DirectoryService,
    error::FileManagerResult,
    file_service::FileService,
    lister::NamespaceLister,
    metadata_store::MetadataStore,
    object_store::ObjectStore,
    reconcile::{ReconcileReport, reconcile},
    user_service::UserService,
};
use std::sync::Arc;

/// All services sharing one object store and one metadata store.
///
/// Cheap to clone; holds no request state.
#[derive(Clone)]
pub struct FileManager {
    pub objects: Arc<dyn ObjectStore>,
    pub metadata: Arc<dyn MetadataStore>,
    pub lister: NamespaceLister,
    pub directories: DirectoryService,
    pub files: FileService,
    pub users: UserService,
}

impl FileManager {
    pub fn new(objects: Arc<dyn ObjectStore>, metadata: Arc<dyn MetadataStore>) -> Self {
        let lister = NamespaceLister::new(objects.clone());
        Self {
            directories: DirectoryService::new(objects.clone(), metadata.clone(), lister.clone()),
            files: FileService::new(objects.clone(), metadata.clone(), lister.clone()),
            users: UserService::new(metadata.clone()),
            lister,
            objects,
            metadata,
        }
    }

    pub async fn reconcile(&self) -> FileManagerResult<ReconcileReport> {
        reconcile(self.objects.as_ref(), self.metadata.as_ref()).await
    }
}
