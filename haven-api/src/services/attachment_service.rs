//! Attachment Service
//!
//! Reconciles the image rows of a parent record with the object store.
//! This runs after the parent's own write has committed and is not part of
//! any transaction: a failure here leaves a valid parent whose attachment
//! set the caller is told about.

use tracing::{debug, warn};

use haven_core::{AttachmentError, AttachmentOwner, RecordId};
use haven_storage::{AttachmentRepository, ObjectStore};

use crate::telemetry::METRICS;

/// A file received with a create or update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpload {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Remove `deletions`, then upload and link `uploads`.
///
/// Only URLs currently linked to `(owner, parent_id)` are deleted; any
/// other URL is skipped with a warning. A remote delete that fails is logged and the row is removed anyway, so
/// a deleted URL never shows up in the parent's list again. An upload that
/// fails stops the batch; files linked before it stay linked.
///
/// Returns the URLs linked by this call, in upload order.
pub async fn sync_attachments<R>(
    repo: &R,
    objects: &dyn ObjectStore,
    owner: AttachmentOwner,
    parent_id: RecordId,
    deletions: &[String],
    uploads: Vec<PendingUpload>,
) -> Result<Vec<String>, AttachmentError>
where
    R: AttachmentRepository + ?Sized,
{
    let owned = if deletions.is_empty() {
        Vec::new()
    } else {
        repo.attachment_list(owner, parent_id).await?
    };

    for url in deletions {
        if !owned.contains(url) {
            // Another record's object, or one already gone. Leave it alone.
            warn!(
                owner = owner.name(),
                parent_id,
                url = %url,
                "Deletion names an attachment the record does not own, skipping"
            );
            continue;
        }

        let removed_remote = objects.delete(url).await;
        record_object_store("delete", removed_remote.is_ok());
        if let Err(e) = removed_remote {
            warn!(
                owner = owner.name(),
                parent_id,
                url = %url,
                error = %e,
                "Remote object not removed, dropping the row anyway"
            );
        }
        if !repo.attachment_delete(owner, parent_id, url).await? {
            debug!(owner = owner.name(), parent_id, url = %url, "Attachment row already removed");
        }
    }

    let requested = uploads.len();
    let mut attached = Vec::with_capacity(requested);
    for file in uploads {
        let uploaded = objects
            .put(file.bytes, &file.content_type, &file.name)
            .await;
        record_object_store("put", uploaded.is_ok());
        let url = uploaded.map_err(|source| AttachmentError::UploadFailed {
            attached: attached.len(),
            requested,
            source,
        })?;

        if let Err(e) = repo.attachment_insert(owner, parent_id, &url).await {
            // The blob has no row pointing at it; try not to leave it behind.
            if let Err(cleanup) = objects.delete(&url).await {
                warn!(url = %url, error = %cleanup, "Orphaned upload not removed");
            }
            return Err(e.into());
        }
        attached.push(url);
    }

    Ok(attached)
}

/// Remove remote objects whose rows are already gone. Failures are logged.
pub async fn purge_objects(objects: &dyn ObjectStore, urls: &[String]) {
    for url in urls {
        let removed = objects.delete(url).await;
        record_object_store("delete", removed.is_ok());
        if let Err(e) = removed {
            warn!(url = %url, error = %e, "Remote object not removed");
        }
    }
}

fn record_object_store(operation: &str, success: bool) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_object_store_operation(operation, success);
    }
}
