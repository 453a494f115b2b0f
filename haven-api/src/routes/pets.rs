//! Pet REST API Routes

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};

use haven_core::{Pet, SearchFilter};

use super::generic::{create_form, delete_one, get_one, list_response, update_form};
use crate::{
    component::Listable, db::DbClient, error::ApiResult, state::AppState, types::ApiResponse,
    types::ListParams,
};

/// GET /api/pets - Pets of a shelter, optionally filtered by text
pub async fn list_pets(
    State(db): State<DbClient>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<Vec<Pet>>>> {
    let filter = SearchFilter::new()
        .with_eq("shelter_id", params.require_shelter()?)
        .with_optional_eq("category_id", params.category_id)
        .with_optional_eq("status_id", params.status_id)
        .with_text(Pet::SEARCH_FIELDS, params.text());
    list_response::<Pet>(&db, filter).await
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_form::<Pet>).get(list_pets))
        .route(
            "/:id",
            get(get_one::<Pet>)
                .put(update_form::<Pet>)
                .delete(delete_one::<Pet>),
        )
}
