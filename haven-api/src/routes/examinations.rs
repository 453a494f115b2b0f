//! Medical examination REST API Routes

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};

use haven_core::{Examination, SearchFilter};

use super::generic::{create_json, delete_one, get_one, list_response, update_json};
use crate::{
    component::Listable,
    db::DbClient,
    error::ApiResult,
    state::AppState,
    types::{ApiResponse, ListParams},
};

/// GET /api/examinations - Examinations at a shelter, optionally for one pet
pub async fn list_examinations(
    State(db): State<DbClient>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<Vec<Examination>>>> {
    let filter = SearchFilter::new()
        .with_eq("shelter_id", params.require_shelter()?)
        .with_optional_eq("pets_id", params.pets_id)
        .with_text(Examination::SEARCH_FIELDS, params.text());
    list_response::<Examination>(&db, filter).await
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_json::<Examination>).get(list_examinations))
        .route(
            "/:id",
            get(get_one::<Examination>)
                .put(update_json::<Examination>)
                .delete(delete_one::<Examination>),
        )
}
