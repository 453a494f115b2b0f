//! Lookup table REST API Routes

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::Value as JsonValue;

use crate::{
    constants::MSG_FETCHED,
    db::{DbClient, ReferenceTable},
    error::ApiResult,
    state::AppState,
    types::ApiResponse,
};

/// GET /api/reference/:table - e.g. `pet-statuses`, `roles`, `vaccines`
pub async fn list_reference(
    State(db): State<DbClient>,
    Path(table): Path<ReferenceTable>,
) -> ApiResult<Json<ApiResponse<Vec<JsonValue>>>> {
    let rows = db.reference(table).await?;
    Ok(Json(ApiResponse::new(MSG_FETCHED, rows)))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/:table", get(list_reference))
}
