//! Content request and adoption application component implementations.
//!
//! New requests always start pending. Their status only changes through
//! the decision service.

use haven_core::{AdoptionApplication, ContentRequest, RecordId, RequestStatus};

use crate::component::{require_text, Columns, Component, Listable};
use crate::error::ApiResult;
use crate::events::ChangeAction;
use crate::types::{CreateAdoptionRequest, CreateContentRequest, UpdateApplicantRequest};

fn applicant_updates(req: &UpdateApplicantRequest) -> Columns {
    Columns::new()
        .set_some("first_name", req.first_name.as_deref().map(str::trim))
        .set_some("last_name", req.last_name.clone())
        .set_some("telephone", req.telephone.as_deref().map(str::trim))
}

impl Listable for ContentRequest {
    const ENTITY_NAME: &'static str = "ContentRequest";
    const TABLE: &'static str = "\"ContentRequest\"";
    const PK_FIELD: &'static str = "id_request";
    const SEARCH_FIELDS: &'static [&'static str] =
        &["first_name", "last_name", "telephone", "description"];
    const ORDER_FIELD: Option<&'static str> = Some("first_name");
}

impl Component for ContentRequest {
    type Create = CreateContentRequest;
    type Update = UpdateApplicantRequest;

    const EVENT_PREFIX: &'static str = "content";

    fn entity_id(&self) -> RecordId {
        self.id_request
    }

    fn create_columns(req: &CreateContentRequest) -> ApiResult<Columns> {
        require_text("first_name", &req.first_name)?;
        require_text("telephone", &req.telephone)?;
        Ok(Columns::new()
            .set("first_name", req.first_name.trim())
            .set("last_name", req.last_name.clone())
            .set("telephone", req.telephone.trim())
            .set("description", req.description.clone())
            .set("user_id", req.user_id)
            .set("pets_id", req.pets_id)
            .set("creator", req.creator)
            .set("date", req.date.unwrap_or_else(haven_core::today))
            .set("status_adoption_id", RequestStatus::Pending))
    }

    fn update_columns(req: &UpdateApplicantRequest) -> ApiResult<Columns> {
        Ok(applicant_updates(req).set_some("description", req.description.clone()))
    }

    fn event_name(action: ChangeAction) -> String {
        match action {
            ChangeAction::Add => "add-content".to_string(),
            other => format!("content-{}", other.as_str()),
        }
    }
}

impl Listable for AdoptionApplication {
    const ENTITY_NAME: &'static str = "AdoptionApplication";
    const TABLE: &'static str = "\"AdoptionApp\"";
    const PK_FIELD: &'static str = "id_adoption";
    const SEARCH_FIELDS: &'static [&'static str] = &["first_name", "last_name", "telephone"];
    const ORDER_FIELD: Option<&'static str> = Some("first_name");
}

impl Component for AdoptionApplication {
    type Create = CreateAdoptionRequest;
    type Update = UpdateApplicantRequest;

    const EVENT_PREFIX: &'static str = "adoption";

    fn entity_id(&self) -> RecordId {
        self.id_adoption
    }

    fn create_columns(req: &CreateAdoptionRequest) -> ApiResult<Columns> {
        require_text("first_name", &req.first_name)?;
        require_text("telephone", &req.telephone)?;
        Ok(Columns::new()
            .set("first_name", req.first_name.trim())
            .set("last_name", req.last_name.clone())
            .set("telephone", req.telephone.trim())
            .set("user_id", req.user_id)
            .set("pets_id", req.pets_id)
            .set("creator", req.creator)
            .set("date", req.date.unwrap_or_else(haven_core::today))
            .set("status_adoption_id", RequestStatus::Pending))
    }

    fn update_columns(req: &UpdateApplicantRequest) -> ApiResult<Columns> {
        Ok(applicant_updates(req))
    }

    fn event_name(action: ChangeAction) -> String {
        match action {
            ChangeAction::Add => "add-adoption".to_string(),
            other => format!("adoption-{}", other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::SqlParam;

    #[test]
    fn test_new_requests_are_pending() {
        let req = CreateAdoptionRequest {
            first_name: "Anna".to_string(),
            last_name: None,
            telephone: "+70000000000".to_string(),
            user_id: Some(5),
            pets_id: 9,
            creator: None,
            date: None,
        };
        let columns = AdoptionApplication::create_columns(&req).expect("columns");
        assert_eq!(columns.get("status_adoption_id"), Some(&SqlParam::Int(1)));
        assert!(columns.get("date").is_some());
    }

    #[test]
    fn test_add_tags() {
        assert_eq!(ContentRequest::event_name(ChangeAction::Add), "add-content");
        assert_eq!(AdoptionApplication::event_name(ChangeAction::Add), "add-adoption");
        assert_eq!(AdoptionApplication::event_name(ChangeAction::Delete), "adoption-delete");
    }

    #[test]
    fn test_status_not_updatable() {
        let req = UpdateApplicantRequest {
            telephone: Some(" 123 ".to_string()),
            ..UpdateApplicantRequest::default()
        };
        let columns = ContentRequest::update_columns(&req).expect("columns");
        assert_eq!(columns.names().collect::<Vec<_>>(), vec!["telephone"]);
    }
}
