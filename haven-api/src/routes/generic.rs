//! Generic CRUD route handlers for Component types.
//!
//! Entity routers wire these with a turbofish:
//! ```ignore
//! Router::new()
//!     .route("/", post(create_form::<Pet>).get(list_pets))
//!     .route("/:id", get(get_one::<Pet>).put(update_form::<Pet>).delete(delete_one::<Pet>))
//! ```
//! Only list handlers are written per entity, since each kind is listed by
//! its own scope column.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use haven_core::{RecordId, SearchFilter};

use crate::{
    component::{Component, Listable},
    constants::{MSG_CREATED, MSG_DELETED, MSG_FETCHED, MSG_UPDATED},
    db::DbClient,
    error::{ApiError, ApiResult},
    events::{ChangeAction, ChangeEvent},
    extractors::RecordForm,
    services::{delete_record, sync_attachments, PendingUpload},
    state::AppState,
    types::{ApiResponse, MessageResponse},
    ws::WsState,
};

type Created<C> = (StatusCode, Json<ApiResponse<C>>);

// ============================================================================
// GENERIC HANDLER HELPERS
// ============================================================================

/// Run a list query and wrap the rows.
pub async fn list_response<C: Listable>(
    db: &DbClient,
    filter: SearchFilter,
) -> ApiResult<Json<ApiResponse<Vec<C>>>> {
    let rows = db.list::<C>(&filter).await?;
    Ok(Json(ApiResponse::new(MSG_FETCHED, rows)))
}

/// Reconcile the record's images and announce the change.
///
/// The broadcast payload lists only the URLs attached by this request; the
/// response carries the record as re-read, with every linked image.
async fn attach_and_announce<C: Component>(
    state: &AppState,
    record: C,
    deletions: &[String],
    uploads: Vec<PendingUpload>,
    action: ChangeAction,
) -> ApiResult<C> {
    let Some(owner) = C::ATTACHMENTS else {
        state
            .ws
            .publish(&ChangeEvent::with_record(C::event_name(action), &record));
        return Ok(record);
    };

    let id = record.entity_id();
    let attached = sync_attachments(
        &state.db,
        state.objects.as_ref(),
        owner,
        id,
        deletions,
        uploads,
    )
    .await?;

    state.ws.publish(&ChangeEvent::with_attachments(
        C::event_name(action),
        &record,
        &attached,
    ));
    Ok(state.db.get::<C>(id).await?.unwrap_or(record))
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// `POST` with a JSON body.
pub async fn create_json<C: Component>(
    State(db): State<DbClient>,
    State(ws): State<Arc<WsState>>,
    Json(req): Json<C::Create>,
) -> ApiResult<Created<C>> {
    let record = db.create::<C>(&req).await?;
    ws.publish(&ChangeEvent::with_record(
        C::event_name(ChangeAction::Add),
        &record,
    ));
    Ok(ApiResponse::new(MSG_CREATED, record).created())
}

/// `POST` with a multipart body: the record is created first, then its
/// images are uploaded and linked.
pub async fn create_form<C: Component>(
    State(state): State<AppState>,
    mut form: RecordForm<C::Create>,
) -> ApiResult<Created<C>> {
    let req = form.require_payload()?;
    let record = state.db.create::<C>(&req).await?;
    let record =
        attach_and_announce(&state, record, &[], form.uploads, ChangeAction::Add).await?;
    Ok(ApiResponse::new(MSG_CREATED, record).created())
}

pub async fn get_one<C: Listable>(
    State(db): State<DbClient>,
    Path(id): Path<RecordId>,
) -> ApiResult<Json<ApiResponse<C>>> {
    let record = db
        .get::<C>(id)
        .await?
        .ok_or_else(|| ApiError::entity_not_found(C::ENTITY_NAME, id))?;
    Ok(Json(ApiResponse::new(MSG_FETCHED, record)))
}

/// `PUT` with a JSON body.
pub async fn update_json<C: Component>(
    State(db): State<DbClient>,
    State(ws): State<Arc<WsState>>,
    Path(id): Path<RecordId>,
    Json(req): Json<C::Update>,
) -> ApiResult<Json<ApiResponse<C>>> {
    let record = db.update::<C>(id, &req).await?;
    ws.publish(&ChangeEvent::with_record(
        C::event_name(ChangeAction::Update),
        &record,
    ));
    Ok(Json(ApiResponse::new(MSG_UPDATED, record)))
}

/// `PUT` with a multipart body. The field update commits before any image
/// is touched; `deletedImages` are removed before new files are added.
pub async fn update_form<C>(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
    mut form: RecordForm<C::Update>,
) -> ApiResult<Json<ApiResponse<C>>>
where
    C: Component,
    C::Update: Default,
{
    let req = form.payload_or_default();
    let record = state.db.update::<C>(id, &req).await?;
    let record = attach_and_announce(
        &state,
        record,
        &form.deleted_images,
        form.uploads,
        ChangeAction::Update,
    )
    .await?;
    Ok(Json(ApiResponse::new(MSG_UPDATED, record)))
}

/// `DELETE` of a record and its attachments.
pub async fn delete_one<C: Component>(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> ApiResult<MessageResponse> {
    delete_record::<C, _>(&state.db, state.objects.as_ref(), id).await?;
    state.ws.publish(&ChangeEvent::deleted(
        C::event_name(ChangeAction::Delete),
        id,
    ));
    Ok(MessageResponse::new(MSG_DELETED))
}

/// `DELETE` of a record that is not announced to subscribers.
pub async fn delete_quiet<C: Listable>(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> ApiResult<MessageResponse> {
    delete_record::<C, _>(&state.db, state.objects.as_ref(), id).await?;
    Ok(MessageResponse::new(MSG_DELETED))
}
