//! Shelter network component implementation.

use haven_core::{AttachmentOwner, Network, RecordId};

use crate::component::{require_text, Columns, Component, Listable, UniqueKey};
use crate::error::ApiResult;
use crate::types::{CreateNetworkRequest, UpdateNetworkRequest};

impl Listable for Network {
    const ENTITY_NAME: &'static str = "Network";
    const TABLE: &'static str = "\"Network\"";
    const PK_FIELD: &'static str = "id_network";
    const SEARCH_FIELDS: &'static [&'static str] = &["name_network", "telephone"];
    const ORDER_FIELD: Option<&'static str> = Some("name_network");
    const ATTACHMENTS: Option<AttachmentOwner> = Some(AttachmentOwner::Network);
}

impl Component for Network {
    type Create = CreateNetworkRequest;
    type Update = UpdateNetworkRequest;

    const EVENT_PREFIX: &'static str = "network";

    fn entity_id(&self) -> RecordId {
        self.id_network
    }

    fn create_columns(req: &CreateNetworkRequest) -> ApiResult<Columns> {
        require_text("name_network", &req.name_network)?;
        Ok(Columns::new()
            .set("name_network", req.name_network.trim())
            .set("telephone", req.telephone.clone())
            .set("creator", req.creator))
    }

    fn update_columns(req: &UpdateNetworkRequest) -> ApiResult<Columns> {
        Ok(Columns::new()
            .set_some("name_network", req.name_network.as_deref().map(str::trim))
            .set_some("telephone", req.telephone.clone())
            .set_some("creator", req.creator))
    }

    fn create_unique_keys(req: &CreateNetworkRequest) -> Vec<UniqueKey> {
        vec![UniqueKey::single("name_network", req.name_network.trim())]
    }

    fn update_unique_keys(req: &UpdateNetworkRequest) -> Vec<UniqueKey> {
        req.name_network
            .as_deref()
            .map(|name| UniqueKey::single("name_network", name.trim()))
            .into_iter()
            .collect()
    }
}
