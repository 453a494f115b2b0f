//! Fund component implementation.

use haven_core::{AttachmentOwner, Fund, RecordId};

use crate::component::{require_text, Columns, Component, Listable, UniqueKey};
use crate::error::ApiResult;
use crate::types::{CreateFundRequest, UpdateFundRequest};

impl Listable for Fund {
    const ENTITY_NAME: &'static str = "Fund";
    const TABLE: &'static str = "\"Fund\"";
    const PK_FIELD: &'static str = "id_fund";
    const SEARCH_FIELDS: &'static [&'static str] = &["name_fund", "description", "url"];
    const ORDER_FIELD: Option<&'static str> = Some("name_fund");
    const ATTACHMENTS: Option<AttachmentOwner> = Some(AttachmentOwner::Fund);
}

impl Component for Fund {
    type Create = CreateFundRequest;
    type Update = UpdateFundRequest;

    const EVENT_PREFIX: &'static str = "fund";

    fn entity_id(&self) -> RecordId {
        self.id_fund
    }

    fn create_columns(req: &CreateFundRequest) -> ApiResult<Columns> {
        require_text("name_fund", &req.name_fund)?;
        Ok(Columns::new()
            .set("name_fund", req.name_fund.trim())
            .set("description", req.description.clone())
            .set("url", req.url.clone())
            .set("shelter_id", req.shelter_id))
    }

    fn update_columns(req: &UpdateFundRequest) -> ApiResult<Columns> {
        Ok(Columns::new()
            .set_some("name_fund", req.name_fund.as_deref().map(str::trim))
            .set_some("description", req.description.clone())
            .set_some("url", req.url.clone())
            .set_some("shelter_id", req.shelter_id))
    }

    fn create_unique_keys(req: &CreateFundRequest) -> Vec<UniqueKey> {
        match req.shelter_id {
            Some(shelter_id) => vec![UniqueKey::scoped(
                "name_fund",
                req.name_fund.trim(),
                "shelter_id",
                shelter_id,
            )],
            None => vec![UniqueKey::single("name_fund", req.name_fund.trim())],
        }
    }

    fn update_unique_keys(req: &UpdateFundRequest) -> Vec<UniqueKey> {
        UniqueKey::scoped_opt(
            "name_fund",
            req.name_fund.as_deref().map(str::trim),
            "shelter_id",
            req.shelter_id,
        )
        .into_iter()
        .collect()
    }
}
