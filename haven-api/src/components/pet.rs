//! Pet component implementation.

use haven_core::{AttachmentOwner, Pet, RecordId};

use crate::component::{require_text, Columns, Component, Listable, UniqueKey};
use crate::error::ApiResult;
use crate::types::{CreatePetRequest, UpdatePetRequest};

impl Listable for Pet {
    const ENTITY_NAME: &'static str = "Pet";
    const TABLE: &'static str = "\"Pets\"";
    const PK_FIELD: &'static str = "id_pets";
    const SEARCH_FIELDS: &'static [&'static str] =
        &["nickname", "age", "sex", "description", "status_id", "category_id"];
    const ORDER_FIELD: Option<&'static str> = Some("nickname");
    const ATTACHMENTS: Option<AttachmentOwner> = Some(AttachmentOwner::Pet);
}

impl Component for Pet {
    type Create = CreatePetRequest;
    type Update = UpdatePetRequest;

    const EVENT_PREFIX: &'static str = "pets";

    fn entity_id(&self) -> RecordId {
        self.id_pets
    }

    fn create_columns(req: &CreatePetRequest) -> ApiResult<Columns> {
        require_text("nickname", &req.nickname)?;
        Ok(Columns::new()
            .set("nickname", req.nickname.trim())
            .set("age", req.age)
            .set("status_id", req.status_id)
            .set("description", req.description.clone())
            .set("category_id", req.category_id)
            .set("shelter_id", req.shelter_id)
            .set("sex", req.sex.clone())
            .set("vaccination_id", req.vaccination_id))
    }

    fn update_columns(req: &UpdatePetRequest) -> ApiResult<Columns> {
        if let Some(nickname) = &req.nickname {
            require_text("nickname", nickname)?;
        }
        Ok(Columns::new()
            .set_some("nickname", req.nickname.as_deref().map(str::trim))
            .set_some("age", req.age)
            .set_some("status_id", req.status_id)
            .set_some("description", req.description.clone())
            .set_some("category_id", req.category_id)
            .set_some("shelter_id", req.shelter_id)
            .set_some("sex", req.sex.clone())
            .set_some("vaccination_id", req.vaccination_id))
    }

    fn create_unique_keys(req: &CreatePetRequest) -> Vec<UniqueKey> {
        vec![UniqueKey::scoped(
            "nickname",
            req.nickname.trim(),
            "shelter_id",
            req.shelter_id,
        )]
    }

    fn update_unique_keys(req: &UpdatePetRequest) -> Vec<UniqueKey> {
        UniqueKey::scoped_opt(
            "nickname",
            req.nickname.as_deref().map(str::trim),
            "shelter_id",
            req.shelter_id,
        )
        .into_iter()
        .collect()
    }
}
