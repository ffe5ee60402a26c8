//! Out-of-band repair of metadata drift.
//!
//! Request handlers never repair the metadata store inline. This job walks the
//! directory and file records and drops any whose object is gone from the
//! object store. It does not create records for unrecorded objects.

use super::{
    error::FileManagerResult, metadata_store::MetadataStore, object_store::ObjectStore,
};
use crate::models::records::{DIRECTORIES, FILES};
use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub scanned: usize,
    pub directories_removed: usize,
    pub files_removed: usize,
}

pub async fn reconcile(
    objects: &dyn ObjectStore,
    metadata: &dyn MetadataStore,
) -> FileManagerResult<ReconcileReport> {
    let mut report = ReconcileReport::default();
    report.directories_removed = prune(objects, metadata, DIRECTORIES, &mut report.scanned).await?;
    report.files_removed = prune(objects, metadata, FILES, &mut report.scanned).await?;
    info!(
        "reconciled {} records: removed {} directory and {} file records",
        report.scanned, report.directories_removed, report.files_removed
    );
    Ok(report)
}

async fn prune(
    objects: &dyn ObjectStore,
    metadata: &dyn MetadataStore,
    collection: &str,
    scanned: &mut usize,
) -> FileManagerResult<usize> {
    let mut removed = 0;
    for doc in metadata.scan(collection).await? {
        *scanned += 1;
        let Some(path) = doc.fields.get("path").and_then(Value::as_str) else {
            warn!("record `{}/{}` has no path; skipping", collection, doc.id);
            continue;
        };
        // The per-user root record has no marker object.
        if path.is_empty() {
            continue;
        }
        if objects.hash_of(path).await?.is_none() {
            metadata.delete(collection, &doc.id).await?;
            info!("dropped stale record `{}/{}` for `{}`", collection, doc.id, path);
            removed += 1;
        }
    }
    Ok(removed)
}
