//! Fundraising campaign REST API Routes

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};

use haven_core::{Fund, SearchFilter};

use super::generic::{create_form, delete_one, get_one, list_response, update_form};
use crate::{
    component::Listable,
    db::DbClient,
    error::ApiResult,
    state::AppState,
    types::{ApiResponse, ListParams},
};

/// GET /api/funds - Campaigns of a shelter
pub async fn list_funds(
    State(db): State<DbClient>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<Vec<Fund>>>> {
    let filter = SearchFilter::new()
        .with_eq("shelter_id", params.require_shelter()?)
        .with_text(Fund::SEARCH_FIELDS, params.text());
    list_response::<Fund>(&db, filter).await
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_form::<Fund>).get(list_funds))
        .route(
            "/:id",
            get(get_one::<Fund>)
                .put(update_form::<Fund>)
                .delete(delete_one::<Fund>),
        )
}
