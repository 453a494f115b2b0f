//! Feed and found-home post REST API Routes
//!
//! Both kinds share the same body and are listed per shelter.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};

use haven_core::{FeedPost, FoundHomePost, SearchFilter};

use super::generic::{create_form, delete_one, get_one, list_response, update_form};
use crate::{
    component::Listable,
    db::DbClient,
    error::ApiResult,
    state::AppState,
    types::{ApiResponse, ListParams},
};

/// GET /api/feed - News posts of a shelter
pub async fn list_feed(
    State(db): State<DbClient>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<Vec<FeedPost>>>> {
    let filter = SearchFilter::new()
        .with_eq("shelter_id", params.require_shelter()?)
        .with_text(FeedPost::SEARCH_FIELDS, params.text());
    list_response::<FeedPost>(&db, filter).await
}

/// GET /api/found-homes - Success stories of a shelter
pub async fn list_found_homes(
    State(db): State<DbClient>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<Vec<FoundHomePost>>>> {
    let filter = SearchFilter::new()
        .with_eq("shelter_id", params.require_shelter()?)
        .with_optional_eq("status_id", params.status_id)
        .with_text(FoundHomePost::SEARCH_FIELDS, params.text());
    list_response::<FoundHomePost>(&db, filter).await
}

pub fn feed_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_form::<FeedPost>).get(list_feed))
        .route(
            "/:id",
            get(get_one::<FeedPost>)
                .put(update_form::<FeedPost>)
                .delete(delete_one::<FeedPost>),
        )
}

pub fn found_home_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_form::<FoundHomePost>).get(list_found_homes))
        .route(
            "/:id",
            get(get_one::<FoundHomePost>)
                .put(update_form::<FoundHomePost>)
                .delete(delete_one::<FoundHomePost>),
        )
}
