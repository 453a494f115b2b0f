//! Content request and adoption application REST API Routes
//!
//! Requests are created by users and decided by shelter staff. A decision
//! runs the whole transition (audit message, request status, pet status)
//! in one transaction.

use axum::{
    extract::{Query, State},
    routing::{post, put},
    Json, Router,
};
use std::sync::Arc;

use haven_core::{
    AdoptionApplication, ContentRequest, Message, NewMessage, SearchFilter, WorkflowKind,
};

use super::generic::{create_json, delete_one, list_response, update_json};
use crate::{
    component::Listable,
    constants::MSG_DECISION_APPLIED,
    db::DbClient,
    error::ApiResult,
    services::apply_decision,
    state::AppState,
    types::{ApiResponse, DecisionRequest, ListParams},
    ws::WsState,
};

/// GET /api/applications/content - Content requests addressed to a user
pub async fn list_content(
    State(db): State<DbClient>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<Vec<ContentRequest>>>> {
    let filter = SearchFilter::new()
        .with_eq("user_id", params.require_user()?)
        .with_text(ContentRequest::SEARCH_FIELDS, params.text());
    list_response::<ContentRequest>(&db, filter).await
}

/// GET /api/applications/adoption - Adoption applications addressed to a user
pub async fn list_adoption(
    State(db): State<DbClient>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<Vec<AdoptionApplication>>>> {
    let filter = SearchFilter::new()
        .with_eq("user_id", params.require_user()?)
        .with_text(AdoptionApplication::SEARCH_FIELDS, params.text());
    list_response::<AdoptionApplication>(&db, filter).await
}

/// POST /api/applications/content/decision
pub async fn decide_content(
    State(db): State<DbClient>,
    State(ws): State<Arc<WsState>>,
    Json(req): Json<DecisionRequest>,
) -> ApiResult<Json<ApiResponse<Message>>> {
    decide(&db, &ws, WorkflowKind::ContentRequest, req).await
}

/// POST /api/applications/adoption/decision
pub async fn decide_adoption(
    State(db): State<DbClient>,
    State(ws): State<Arc<WsState>>,
    Json(req): Json<DecisionRequest>,
) -> ApiResult<Json<ApiResponse<Message>>> {
    decide(&db, &ws, WorkflowKind::Adoption, req).await
}

async fn decide(
    db: &DbClient,
    ws: &WsState,
    kind: WorkflowKind,
    req: DecisionRequest,
) -> ApiResult<Json<ApiResponse<Message>>> {
    let audit = NewMessage {
        creator: req.creator,
        message: req.message,
        user_id: req.user_id,
        decision: req.decision,
    };
    let message = apply_decision(db, ws, kind, req.request_id, &audit).await?;
    Ok(Json(ApiResponse::new(MSG_DECISION_APPLIED, message)))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            "/content",
            post(create_json::<ContentRequest>).get(list_content),
        )
        .route("/content/decision", post(decide_content))
        .route(
            "/content/:id",
            put(update_json::<ContentRequest>).delete(delete_one::<ContentRequest>),
        )
        .route(
            "/adoption",
            post(create_json::<AdoptionApplication>).get(list_adoption),
        )
        .route("/adoption/decision", post(decide_adoption))
        .route(
            "/adoption/:id",
            put(update_json::<AdoptionApplication>).delete(delete_one::<AdoptionApplication>),
        )
}
