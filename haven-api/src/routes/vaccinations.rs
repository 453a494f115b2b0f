//! Vaccination ledger and vaccine stock REST API Routes
//!
//! Neither table is written through the generic record operations: every
//! change goes through the inventory service.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use haven_core::{
    NewStock, NewVaccination, RecordId, SearchFilter, StockEntry, StockUpdate, VaccinationEdit,
    VaccinationRecord,
};

use super::generic::{get_one, list_response};
use crate::{
    component::Listable,
    constants::{MSG_CREATED, MSG_DELETED, MSG_UPDATED},
    db::DbClient,
    error::ApiResult,
    services,
    state::AppState,
    types::{ApiResponse, ListParams, MessageResponse},
    ws::WsState,
};

// ============================================================================
// VACCINATIONS
// ============================================================================

/// GET /api/vaccinations - Vaccinations given at a shelter
pub async fn list_vaccinations(
    State(db): State<DbClient>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<Vec<VaccinationRecord>>>> {
    let filter = SearchFilter::new()
        .with_eq("shelter_id", params.require_shelter()?)
        .with_optional_eq("pets_id", params.pets_id)
        .with_text(VaccinationRecord::SEARCH_FIELDS, params.text());
    list_response::<VaccinationRecord>(&db, filter).await
}

/// POST /api/vaccinations - Record a vaccination and take the doses from stock
pub async fn record_vaccination(
    State(db): State<DbClient>,
    State(ws): State<Arc<WsState>>,
    Json(req): Json<NewVaccination>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let record = services::record_vaccination(&db, &ws, &req).await?;
    Ok(ApiResponse::new(MSG_CREATED, record).created())
}

/// PUT /api/vaccinations/:id - Rewrite a vaccination, moving doses between stocks
pub async fn edit_vaccination(
    State(db): State<DbClient>,
    State(ws): State<Arc<WsState>>,
    Path(id): Path<RecordId>,
    Json(req): Json<VaccinationEdit>,
) -> ApiResult<Json<ApiResponse<VaccinationRecord>>> {
    let record = services::edit_vaccination(&db, &ws, id, &req).await?;
    Ok(Json(ApiResponse::new(MSG_UPDATED, record)))
}

/// DELETE /api/vaccinations/:id
pub async fn delete_vaccination(
    State(db): State<DbClient>,
    State(ws): State<Arc<WsState>>,
    Path(id): Path<RecordId>,
) -> ApiResult<MessageResponse> {
    services::delete_vaccination(&db, &ws, id).await?;
    Ok(MessageResponse::new(MSG_DELETED))
}

// ============================================================================
// STOCK
// ============================================================================

/// GET /api/vaccines - Stock on hand at a shelter
pub async fn list_stock(
    State(db): State<DbClient>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<Vec<StockEntry>>>> {
    let filter = SearchFilter::new()
        .with_eq("shelter_id", params.require_shelter()?)
        .with_text(StockEntry::SEARCH_FIELDS, params.text());
    list_response::<StockEntry>(&db, filter).await
}

/// POST /api/vaccines
pub async fn register_stock(
    State(db): State<DbClient>,
    State(ws): State<Arc<WsState>>,
    Json(req): Json<NewStock>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let stock = services::register_stock(&db, &ws, &req).await?;
    Ok(ApiResponse::new(MSG_CREATED, stock).created())
}

/// PUT /api/vaccines/:id
pub async fn adjust_stock(
    State(db): State<DbClient>,
    State(ws): State<Arc<WsState>>,
    Path(id): Path<RecordId>,
    Json(req): Json<StockUpdate>,
) -> ApiResult<Json<ApiResponse<StockEntry>>> {
    let stock = services::adjust_stock(&db, &ws, id, &req).await?;
    Ok(Json(ApiResponse::new(MSG_UPDATED, stock)))
}

/// DELETE /api/vaccines/:id
pub async fn remove_stock(
    State(db): State<DbClient>,
    State(ws): State<Arc<WsState>>,
    Path(id): Path<RecordId>,
) -> ApiResult<MessageResponse> {
    services::remove_stock(&db, &ws, id).await?;
    Ok(MessageResponse::new(MSG_DELETED))
}

pub fn vaccination_router() -> Router<AppState> {
    Router::new()
        .route("/", post(record_vaccination).get(list_vaccinations))
        .route(
            "/:id",
            get(get_one::<VaccinationRecord>)
                .put(edit_vaccination)
                .delete(delete_vaccination),
        )
}

pub fn stock_router() -> Router<AppState> {
    Router::new()
        .route("/", post(register_stock).get(list_stock))
        .route(
            "/:id",
            get(get_one::<StockEntry>)
                .put(adjust_stock)
                .delete(remove_stock),
        )
}
