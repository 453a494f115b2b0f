//! Shelter REST API Routes

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};

use haven_core::{SearchFilter, Shelter};

use super::generic::{create_form, delete_one, get_one, list_response, update_form};
use crate::{
    component::Listable,
    db::DbClient,
    error::ApiResult,
    state::AppState,
    types::{ApiResponse, ListParams},
};

/// GET /api/shelters - Shelters registered by a creator, or the shelters of
/// a network
pub async fn list_shelters(
    State(db): State<DbClient>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<Vec<Shelter>>>> {
    let filter = match params.network_id {
        Some(network_id) => SearchFilter::new().with_eq("network_id", network_id),
        None => SearchFilter::new().with_eq("creator", params.require_creator()?),
    };
    let filter = filter
        .with_optional_eq("status_id", params.status_id)
        .with_text(Shelter::SEARCH_FIELDS, params.text());
    list_response::<Shelter>(&db, filter).await
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_form::<Shelter>).get(list_shelters))
        .route(
            "/:id",
            get(get_one::<Shelter>)
                .put(update_form::<Shelter>)
                .delete(delete_one::<Shelter>),
        )
}
