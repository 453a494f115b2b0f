//! Tests for attachment reconciliation and cascading record deletes.

use haven_api::services::{delete_record, sync_attachments, PendingUpload};
use haven_core::{AttachmentError, AttachmentOwner, Examination, Pet, StorageError};
use haven_storage::{AttachmentRepository, ObjectStore};
use haven_test_utils::fixtures::object_store;
use haven_test_utils::{InMemoryStore, PetStatus};
use proptest::prelude::*;

fn upload(name: &str) -> PendingUpload {
    PendingUpload {
        name: name.to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![0x89, b'P', b'N', b'G'],
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

// ============================================================================
// SYNCHRONIZATION
// ============================================================================

#[tokio::test]
async fn test_uploads_are_linked_in_order() {
    let repo = InMemoryStore::new();
    let objects = object_store();

    let urls = sync_attachments(
        &repo,
        &objects,
        AttachmentOwner::Pet,
        1,
        &[],
        vec![upload("a.png"), upload("b.png")],
    )
    .await
    .expect("sync");

    assert_eq!(urls.len(), 2);
    assert!(urls[0].ends_with("_a.png"));
    assert!(urls[1].ends_with("_b.png"));
    let linked = repo
        .attachment_list(AttachmentOwner::Pet, 1)
        .await
        .expect("list");
    assert_eq!(linked, urls);
    assert_eq!(objects.len().await, 2);
}

#[tokio::test]
async fn test_deletions_run_before_uploads() {
    let repo = InMemoryStore::new();
    let objects = object_store();
    let first = sync_attachments(&repo, &objects, AttachmentOwner::Fund, 3, &[], vec![upload("old.png")])
        .await
        .expect("seed");

    let added = sync_attachments(
        &repo,
        &objects,
        AttachmentOwner::Fund,
        3,
        &first,
        vec![upload("new.png")],
    )
    .await
    .expect("sync");

    let linked = repo
        .attachment_list(AttachmentOwner::Fund, 3)
        .await
        .expect("list");
    assert_eq!(linked, added);
    assert!(!objects.contains(&first[0]).await);
    assert!(objects.contains(&added[0]).await);
}

#[tokio::test]
async fn test_remote_delete_failure_still_drops_row() {
    let repo = InMemoryStore::new();
    let objects = object_store();
    let first = sync_attachments(&repo, &objects, AttachmentOwner::Shelter, 2, &[], vec![upload("a.png")])
        .await
        .expect("seed");

    objects.fail_deletes(true);
    sync_attachments(&repo, &objects, AttachmentOwner::Shelter, 2, &first, Vec::new())
        .await
        .expect("sync");

    assert!(repo
        .attachment_list(AttachmentOwner::Shelter, 2)
        .await
        .expect("list")
        .is_empty());
    assert_eq!(objects.delete_calls(), 1);
}

#[tokio::test]
async fn test_partial_upload_failure_reports_progress() {
    let repo = InMemoryStore::new();
    let objects = object_store();
    objects.fail_uploads_after(2);

    let err = sync_attachments(
        &repo,
        &objects,
        AttachmentOwner::Feed,
        9,
        &[],
        vec![upload("1.png"), upload("2.png"), upload("3.png"), upload("4.png")],
    )
    .await
    .unwrap_err();

    match err {
        AttachmentError::UploadFailed {
            attached,
            requested,
            ..
        } => {
            assert_eq!(attached, 2);
            assert_eq!(requested, 4);
        }
        other => panic!("unexpected error: {}", other),
    }
    let linked = repo
        .attachment_list(AttachmentOwner::Feed, 9)
        .await
        .expect("list");
    assert_eq!(linked.len(), 2);
}

#[tokio::test]
async fn test_foreign_url_is_not_sent_to_store() {
    let repo = InMemoryStore::new();
    let objects = object_store();

    sync_attachments(
        &repo,
        &objects,
        AttachmentOwner::Network,
        1,
        &["https://elsewhere.example/haven/x.png".to_string()],
        Vec::new(),
    )
    .await
    .expect("sync");

    assert_eq!(objects.delete_calls(), 0);
}

#[tokio::test]
async fn test_deletion_of_another_records_image_is_skipped() {
    let repo = InMemoryStore::new();
    let objects = object_store();
    let own = sync_attachments(&repo, &objects, AttachmentOwner::Pet, 1, &[], vec![upload("a.png")])
        .await
        .expect("seed pet 1");
    let theirs = sync_attachments(&repo, &objects, AttachmentOwner::Pet, 2, &[], vec![upload("b.png")])
        .await
        .expect("seed pet 2");

    sync_attachments(&repo, &objects, AttachmentOwner::Pet, 1, &theirs, Vec::new())
        .await
        .expect("sync");

    let linked = repo
        .attachment_list(AttachmentOwner::Pet, 2)
        .await
        .expect("list");
    assert_eq!(linked, theirs);
    assert!(objects.contains(&theirs[0]).await);
    assert_eq!(objects.delete_calls(), 0);

    let linked = repo
        .attachment_list(AttachmentOwner::Pet, 1)
        .await
        .expect("list");
    assert_eq!(linked, own);
}

#[tokio::test]
async fn test_same_parent_id_under_other_owner_is_not_deleted() {
    let repo = InMemoryStore::new();
    let objects = object_store();
    let fund = sync_attachments(&repo, &objects, AttachmentOwner::Fund, 5, &[], vec![upload("f.png")])
        .await
        .expect("seed fund");

    sync_attachments(&repo, &objects, AttachmentOwner::Network, 5, &fund, Vec::new())
        .await
        .expect("sync");

    assert!(objects.contains(&fund[0]).await);
    assert_eq!(
        repo.attachment_list(AttachmentOwner::Fund, 5)
            .await
            .expect("list"),
        fund
    );
}

// ============================================================================
// CASCADING DELETE
// ============================================================================

#[tokio::test]
async fn test_delete_record_removes_rows_and_objects() {
    let store = InMemoryStore::new();
    let objects = object_store();
    let pet = store.seed_pet(PetStatus::Available).await;
    let urls = sync_attachments(
        &store,
        &objects,
        AttachmentOwner::Pet,
        pet,
        &[],
        vec![upload("a.png"), upload("b.png")],
    )
    .await
    .expect("sync");

    let removed = delete_record::<Pet, _>(&store, &objects, pet)
        .await
        .expect("delete");

    assert_eq!(removed, urls);
    assert!(!store.record_exists("\"Pets\"", pet).await);
    assert!(store
        .attachment_list(AttachmentOwner::Pet, pet)
        .await
        .expect("list")
        .is_empty());
    assert!(objects.is_empty().await);
}

#[tokio::test]
async fn test_delete_record_survives_remote_failure() {
    let store = InMemoryStore::new();
    let objects = object_store();
    let pet = store.seed_pet(PetStatus::Available).await;
    sync_attachments(&store, &objects, AttachmentOwner::Pet, pet, &[], vec![upload("a.png")])
        .await
        .expect("sync");

    objects.fail_deletes(true);
    delete_record::<Pet, _>(&store, &objects, pet)
        .await
        .expect("delete");

    assert!(!store.record_exists("\"Pets\"", pet).await);
    assert_eq!(objects.len().await, 1);
}

#[tokio::test]
async fn test_delete_record_without_attachments() {
    let store = InMemoryStore::new();
    let objects = object_store();
    let id = store.seed_record("\"Examination\"").await;

    let removed = delete_record::<Examination, _>(&store, &objects, id)
        .await
        .expect("delete");
    assert!(removed.is_empty());
    assert_eq!(objects.delete_calls(), 0);
}

#[tokio::test]
async fn test_delete_unknown_record() {
    let store = InMemoryStore::new();
    let objects = object_store();
    let err = delete_record::<Pet, _>(&store, &objects, 77)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { id: 77, .. }));
}

#[tokio::test]
async fn test_object_store_trait_object() {
    let objects = object_store();
    let store: &dyn ObjectStore = &objects;
    let url = store
        .put(vec![1, 2, 3], "image/jpeg", "cat.jpg")
        .await
        .expect("put");
    store.delete(&url).await.expect("delete");
    assert!(objects.is_empty().await);
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// The linked set after a sync is the old set minus the deletions plus
    /// the uploads, in order.
    #[test]
    fn prop_sync_result_is_old_minus_deleted_plus_added(
        existing in 0usize..5,
        delete_mask in prop::collection::vec(any::<bool>(), 5),
        added in 0usize..4,
    ) {
        runtime().block_on(async {
            let repo = InMemoryStore::new();
            let objects = object_store();
            let seeded: Vec<PendingUpload> =
                (0..existing).map(|i| upload(&format!("old{}.png", i))).collect();
            let old = sync_attachments(&repo, &objects, AttachmentOwner::Pet, 1, &[], seeded)
                .await
                .map_err(|e| proptest::test_runner::TestCaseError::fail(e.to_string()))?;

            let deletions: Vec<String> = old
                .iter()
                .zip(&delete_mask)
                .filter(|(_, delete)| **delete)
                .map(|(url, _)| url.clone())
                .collect();
            let uploads: Vec<PendingUpload> =
                (0..added).map(|i| upload(&format!("new{}.png", i))).collect();
            let new = sync_attachments(&repo, &objects, AttachmentOwner::Pet, 1, &deletions, uploads)
                .await
                .map_err(|e| proptest::test_runner::TestCaseError::fail(e.to_string()))?;

            let mut expected: Vec<String> =
                old.into_iter().filter(|u| !deletions.contains(u)).collect();
            expected.extend(new);
            let linked = repo
                .attachment_list(AttachmentOwner::Pet, 1)
                .await
                .map_err(|e| proptest::test_runner::TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(linked, expected);
            Ok(())
        })?;
    }
}
