//! Shelter network REST API Routes

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};

use haven_core::{Network, SearchFilter};

use super::generic::{create_form, delete_one, get_one, list_response, update_form};
use crate::{
    component::Listable,
    db::DbClient,
    error::ApiResult,
    state::AppState,
    types::{ApiResponse, ListParams},
};

/// GET /api/networks - Networks registered by a creator
pub async fn list_networks(
    State(db): State<DbClient>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<Vec<Network>>>> {
    let filter = SearchFilter::new()
        .with_eq("creator", params.require_creator()?)
        .with_text(Network::SEARCH_FIELDS, params.text());
    list_response::<Network>(&db, filter).await
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_form::<Network>).get(list_networks))
        .route(
            "/:id",
            get(get_one::<Network>)
                .put(update_form::<Network>)
                .delete(delete_one::<Network>),
        )
}
