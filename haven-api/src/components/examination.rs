//! Examination component implementation.

use haven_core::{Examination, RecordId};

use crate::component::{require_text, Columns, Component, Listable, UniqueKey};
use crate::error::ApiResult;
use crate::types::{CreateExaminationRequest, UpdateExaminationRequest};

impl Listable for Examination {
    const ENTITY_NAME: &'static str = "Examination";
    const TABLE: &'static str = "\"Examination\"";
    const PK_FIELD: &'static str = "id_examination";
    const SEARCH_FIELDS: &'static [&'static str] =
        &["name", "description", "treatment", "pets_id", "date"];
    const ORDER_FIELD: Option<&'static str> = Some("name");
}

impl Component for Examination {
    type Create = CreateExaminationRequest;
    type Update = UpdateExaminationRequest;

    const EVENT_PREFIX: &'static str = "examination";

    fn entity_id(&self) -> RecordId {
        self.id_examination
    }

    fn create_columns(req: &CreateExaminationRequest) -> ApiResult<Columns> {
        require_text("name", &req.name)?;
        Ok(Columns::new()
            .set("name", req.name.trim())
            .set("description", req.description.clone())
            .set("treatment", req.treatment.clone())
            .set("pets_id", req.pets_id)
            .set("shelter_id", req.shelter_id)
            .set("date", req.date))
    }

    fn update_columns(req: &UpdateExaminationRequest) -> ApiResult<Columns> {
        Ok(Columns::new()
            .set_some("name", req.name.as_deref().map(str::trim))
            .set_some("description", req.description.clone())
            .set_some("treatment", req.treatment.clone())
            .set_some("pets_id", req.pets_id)
            .set_some("shelter_id", req.shelter_id)
            .set_some("date", req.date))
    }

    fn create_unique_keys(req: &CreateExaminationRequest) -> Vec<UniqueKey> {
        vec![UniqueKey::scoped(
            "name",
            req.name.trim(),
            "shelter_id",
            req.shelter_id,
        )]
    }

    fn update_unique_keys(req: &UpdateExaminationRequest) -> Vec<UniqueKey> {
        UniqueKey::scoped_opt(
            "name",
            req.name.as_deref().map(str::trim),
            "shelter_id",
            req.shelter_id,
        )
        .into_iter()
        .collect()
    }
}
