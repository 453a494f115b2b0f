//! Shelter component implementation.
//!
//! Addresses are normalized before they are written so that the same place
//! spelled with different abbreviations compares equal.

use haven_core::{normalize_address, AttachmentOwner, RecordId, Shelter};

use crate::component::{require_text, Columns, Component, Listable, UniqueKey};
use crate::error::ApiResult;
use crate::types::{CreateShelterRequest, UpdateShelterRequest};

impl Listable for Shelter {
    const ENTITY_NAME: &'static str = "Shelter";
    const TABLE: &'static str = "\"Shelter\"";
    const PK_FIELD: &'static str = "id_shelter";
    const SEARCH_FIELDS: &'static [&'static str] =
        &["name_shelter", "opf", "ogrn", "inn_kpp", "address", "telephone"];
    const ORDER_FIELD: Option<&'static str> = Some("name_shelter");
    const ATTACHMENTS: Option<AttachmentOwner> = Some(AttachmentOwner::Shelter);
}

impl Component for Shelter {
    type Create = CreateShelterRequest;
    type Update = UpdateShelterRequest;

    const EVENT_PREFIX: &'static str = "shelter";

    fn entity_id(&self) -> RecordId {
        self.id_shelter
    }

    fn create_columns(req: &CreateShelterRequest) -> ApiResult<Columns> {
        require_text("name_shelter", &req.name_shelter)?;
        require_text("address", &req.address)?;
        Ok(Columns::new()
            .set("name_shelter", req.name_shelter.trim())
            .set("network_id", req.network_id)
            .set("opf", req.opf.clone())
            .set("ogrn", req.ogrn.clone())
            .set("inn_kpp", req.inn_kpp.clone())
            .set("address", normalize_address(&req.address))
            .set("telephone", req.telephone.clone())
            .set("creator", req.creator)
            .set("status_id", req.status_id))
    }

    fn update_columns(req: &UpdateShelterRequest) -> ApiResult<Columns> {
        if let Some(name) = &req.name_shelter {
            require_text("name_shelter", name)?;
        }
        Ok(Columns::new()
            .set_some("name_shelter", req.name_shelter.as_deref().map(str::trim))
            .set_some("network_id", req.network_id)
            .set_some("opf", req.opf.clone())
            .set_some("ogrn", req.ogrn.clone())
            .set_some("inn_kpp", req.inn_kpp.clone())
            .set_some("address", req.address.as_deref().map(normalize_address))
            .set_some("telephone", req.telephone.clone())
            .set_some("creator", req.creator)
            .set_some("status_id", req.status_id))
    }

    fn create_unique_keys(req: &CreateShelterRequest) -> Vec<UniqueKey> {
        vec![UniqueKey::single("name_shelter", req.name_shelter.trim())]
    }

    fn update_unique_keys(req: &UpdateShelterRequest) -> Vec<UniqueKey> {
        req.name_shelter
            .as_deref()
            .map(|name| UniqueKey::single("name_shelter", name.trim()))
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::SqlParam;

    #[test]
    fn test_address_normalized_on_update() {
        let req = UpdateShelterRequest {
            address: Some("ул. Ленина, д. 5".to_string()),
            ..UpdateShelterRequest::default()
        };
        let columns = Shelter::update_columns(&req).expect("columns");
        let expected = normalize_address("ул. Ленина, д. 5");
        assert_eq!(columns.get("address"), Some(&SqlParam::String(expected)));
        assert!(Shelter::update_unique_keys(&req).is_empty());
    }
}
