//! Notification REST API Routes
//!
//! Messages are written only by decisions; users read and dismiss them.

use axum::{
    extract::{Query, State},
    routing::{delete, get},
    Json, Router,
};

use haven_core::{Message, SearchFilter};

use super::generic::{delete_quiet, list_response};
use crate::{
    component::Listable,
    db::DbClient,
    error::{ApiError, ApiResult},
    state::AppState,
    types::{ApiResponse, ListParams},
};

/// GET /api/messages - Messages addressed to a user, or sent by a creator
pub async fn list_messages(
    State(db): State<DbClient>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<Vec<Message>>>> {
    let filter = match (params.user_id, params.creator) {
        (Some(user_id), _) => SearchFilter::new().with_eq("user_id", user_id),
        (None, Some(creator)) => SearchFilter::new().with_eq("creator", creator),
        (None, None) => return Err(ApiError::missing_field("user_id")),
    };
    let filter = filter.with_text(Message::SEARCH_FIELDS, params.text());
    list_response::<Message>(&db, filter).await
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_messages))
        .route("/:id", delete(delete_quiet::<Message>))
}
