//! Feed post and found-home post component implementations.
//!
//! Both kinds share one request body; found-home posts additionally carry
//! a status.

use haven_core::{AttachmentOwner, FeedPost, FoundHomePost, RecordId};

use crate::component::{require_text, Columns, Component, Listable, UniqueKey};
use crate::error::ApiResult;
use crate::types::{CreatePostRequest, UpdatePostRequest};

fn post_columns(req: &CreatePostRequest) -> ApiResult<Columns> {
    require_text("heading", &req.heading)?;
    require_text("text", &req.text)?;
    Ok(Columns::new()
        .set("heading", req.heading.trim())
        .set("text", req.text.clone())
        .set("author", req.author.clone())
        .set("shelter_id", req.shelter_id))
}

fn post_updates(req: &UpdatePostRequest) -> ApiResult<Columns> {
    if let Some(heading) = &req.heading {
        require_text("heading", heading)?;
    }
    Ok(Columns::new()
        .set_some("heading", req.heading.as_deref().map(str::trim))
        .set_some("text", req.text.clone())
        .set_some("author", req.author.clone())
        .set_some("shelter_id", req.shelter_id))
}

fn heading_key(req: &CreatePostRequest) -> Vec<UniqueKey> {
    match req.shelter_id {
        Some(shelter_id) => vec![UniqueKey::scoped(
            "heading",
            req.heading.trim(),
            "shelter_id",
            shelter_id,
        )],
        None => vec![UniqueKey::single("heading", req.heading.trim())],
    }
}

fn heading_update_key(req: &UpdatePostRequest) -> Vec<UniqueKey> {
    UniqueKey::scoped_opt(
        "heading",
        req.heading.as_deref().map(str::trim),
        "shelter_id",
        req.shelter_id,
    )
    .into_iter()
    .collect()
}

impl Listable for FeedPost {
    const ENTITY_NAME: &'static str = "Feed";
    const TABLE: &'static str = "\"Feed\"";
    const PK_FIELD: &'static str = "id_feed";
    const SEARCH_FIELDS: &'static [&'static str] = &["heading", "text", "author"];
    const ORDER_FIELD: Option<&'static str> = Some("heading");
    const ATTACHMENTS: Option<AttachmentOwner> = Some(AttachmentOwner::Feed);
}

impl Component for FeedPost {
    type Create = CreatePostRequest;
    type Update = UpdatePostRequest;

    const EVENT_PREFIX: &'static str = "feed";

    fn entity_id(&self) -> RecordId {
        self.id_feed
    }

    fn create_columns(req: &CreatePostRequest) -> ApiResult<Columns> {
        post_columns(req)
    }

    fn update_columns(req: &UpdatePostRequest) -> ApiResult<Columns> {
        post_updates(req)
    }

    fn create_unique_keys(req: &CreatePostRequest) -> Vec<UniqueKey> {
        heading_key(req)
    }

    fn update_unique_keys(req: &UpdatePostRequest) -> Vec<UniqueKey> {
        heading_update_key(req)
    }
}

impl Listable for FoundHomePost {
    const ENTITY_NAME: &'static str = "FoundHome";
    const TABLE: &'static str = "\"FoundHome\"";
    const PK_FIELD: &'static str = "id_found_home";
    const SEARCH_FIELDS: &'static [&'static str] = &["heading", "text", "author"];
    const ORDER_FIELD: Option<&'static str> = Some("heading");
    const ATTACHMENTS: Option<AttachmentOwner> = Some(AttachmentOwner::FoundHome);
}

impl Component for FoundHomePost {
    type Create = CreatePostRequest;
    type Update = UpdatePostRequest;

    const EVENT_PREFIX: &'static str = "found-home";

    fn entity_id(&self) -> RecordId {
        self.id_found_home
    }

    fn create_columns(req: &CreatePostRequest) -> ApiResult<Columns> {
        Ok(post_columns(req)?.set("status_id", req.status_id))
    }

    fn update_columns(req: &UpdatePostRequest) -> ApiResult<Columns> {
        Ok(post_updates(req)?.set_some("status_id", req.status_id))
    }

    fn create_unique_keys(req: &CreatePostRequest) -> Vec<UniqueKey> {
        heading_key(req)
    }

    fn update_unique_keys(req: &UpdatePostRequest) -> Vec<UniqueKey> {
        heading_update_key(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChangeAction;

    fn request() -> CreatePostRequest {
        CreatePostRequest {
            heading: "Open day".to_string(),
            text: "Saturday at noon".to_string(),
            author: None,
            shelter_id: Some(3),
            status_id: Some(1),
        }
    }

    #[test]
    fn test_feed_ignores_status() {
        let columns = FeedPost::create_columns(&request()).expect("columns");
        assert!(columns.get("status_id").is_none());
        let columns = FoundHomePost::create_columns(&request()).expect("columns");
        assert!(columns.get("status_id").is_some());
    }

    #[test]
    fn test_found_home_tags() {
        assert_eq!(FoundHomePost::event_name(ChangeAction::Update), "found-home-update");
    }

    #[test]
    fn test_heading_unique_within_shelter() {
        let keys = FeedPost::create_unique_keys(&request());
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].columns.len(), 2);
    }
}
