//! User REST API Routes
//!
//! Shelter staff are listed per shelter with the system roles hidden.
//! Shelter administrators are listed per the user who created them.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};

use haven_core::{SearchFilter, User};

use super::generic::{create_json, delete_one, get_one, list_response, update_json};
use crate::{
    component::Listable,
    constants::{ADMIN_ROLE_ID, SYSTEM_ROLE_IDS},
    db::DbClient,
    error::ApiResult,
    state::AppState,
    types::{ApiResponse, ListParams},
};

/// GET /api/users - Staff of a shelter
pub async fn list_users(
    State(db): State<DbClient>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<Vec<User>>>> {
    let filter = SearchFilter::new()
        .with_eq("shelter_id", params.require_shelter()?)
        .with_not_in("role_id", &SYSTEM_ROLE_IDS)
        .with_text(User::SEARCH_FIELDS, params.text());
    list_response::<User>(&db, filter).await
}

/// GET /api/users/admins - Shelter administrators created by a user
pub async fn list_admins(
    State(db): State<DbClient>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<Vec<User>>>> {
    let filter = SearchFilter::new()
        .with_eq("role_id", ADMIN_ROLE_ID)
        .with_eq("creator", params.require_creator()?)
        .with_text(User::SEARCH_FIELDS, params.text());
    list_response::<User>(&db, filter).await
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_json::<User>).get(list_users))
        .route("/admins", get(list_admins))
        .route(
            "/:id",
            get(get_one::<User>)
                .put(update_json::<User>)
                .delete(delete_one::<User>),
        )
}
