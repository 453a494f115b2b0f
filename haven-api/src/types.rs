//! Request and response bodies.
//!
//! Create bodies carry every required column; update bodies are partial and
//! only the present fields are written.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use haven_core::{Date, Decision, PetStatus, RecordId};

use crate::error::{ApiError, ApiResult};

// ============================================================================
// RESPONSE ENVELOPE
// ============================================================================

/// Success body `{message, data}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }

    pub fn ok(self) -> (StatusCode, Json<Self>) {
        (StatusCode::OK, Json(self))
    }

    pub fn created(self) -> (StatusCode, Json<Self>) {
        (StatusCode::CREATED, Json(self))
    }
}

/// Success body without data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl IntoResponse for MessageResponse {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

// ============================================================================
// LIST QUERY
// ============================================================================

/// Query string shared by list endpoints. Each endpoint requires the scope
/// it is listed by.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub text: Option<String>,
    #[serde(alias = "shelter")]
    pub shelter_id: Option<RecordId>,
    pub creator: Option<RecordId>,
    pub user_id: Option<RecordId>,
    pub pets_id: Option<RecordId>,
    pub network_id: Option<RecordId>,
    #[serde(alias = "category")]
    pub category_id: Option<RecordId>,
    pub status_id: Option<RecordId>,
}

impl ListParams {
    pub fn require_shelter(&self) -> ApiResult<RecordId> {
        self.shelter_id
            .ok_or_else(|| ApiError::missing_field("shelter_id"))
    }

    pub fn require_creator(&self) -> ApiResult<RecordId> {
        self.creator.ok_or_else(|| ApiError::missing_field("creator"))
    }

    pub fn require_user(&self) -> ApiResult<RecordId> {
        self.user_id.ok_or_else(|| ApiError::missing_field("user_id"))
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

// ============================================================================
// CATALOGUE RECORDS
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePetRequest {
    pub nickname: String,
    pub age: i32,
    #[serde(default = "default_pet_status")]
    pub status_id: PetStatus,
    pub description: Option<String>,
    pub category_id: RecordId,
    pub shelter_id: RecordId,
    pub sex: Option<String>,
    pub vaccination_id: Option<RecordId>,
}

fn default_pet_status() -> PetStatus {
    PetStatus::Available
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePetRequest {
    pub nickname: Option<String>,
    pub age: Option<i32>,
    pub status_id: Option<PetStatus>,
    pub description: Option<String>,
    pub category_id: Option<RecordId>,
    pub shelter_id: Option<RecordId>,
    pub sex: Option<String>,
    pub vaccination_id: Option<RecordId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateShelterRequest {
    pub name_shelter: String,
    pub network_id: Option<RecordId>,
    pub opf: Option<String>,
    pub ogrn: Option<String>,
    pub inn_kpp: Option<String>,
    pub address: String,
    pub telephone: Option<String>,
    pub creator: Option<RecordId>,
    pub status_id: Option<RecordId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateShelterRequest {
    pub name_shelter: Option<String>,
    pub network_id: Option<RecordId>,
    pub opf: Option<String>,
    pub ogrn: Option<String>,
    pub inn_kpp: Option<String>,
    pub address: Option<String>,
    pub telephone: Option<String>,
    pub creator: Option<RecordId>,
    pub status_id: Option<RecordId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFundRequest {
    pub name_fund: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub shelter_id: Option<RecordId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFundRequest {
    pub name_fund: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub shelter_id: Option<RecordId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateNetworkRequest {
    pub name_network: String,
    pub telephone: Option<String>,
    pub creator: Option<RecordId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNetworkRequest {
    pub name_network: Option<String>,
    pub telephone: Option<String>,
    pub creator: Option<RecordId>,
}

/// Body shared by feed posts and found-home posts.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostRequest {
    pub heading: String,
    pub text: String,
    pub author: Option<String>,
    pub shelter_id: Option<RecordId>,
    pub status_id: Option<RecordId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub heading: Option<String>,
    pub text: Option<String>,
    pub author: Option<String>,
    pub shelter_id: Option<RecordId>,
    pub status_id: Option<RecordId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateExaminationRequest {
    pub name: String,
    pub description: Option<String>,
    pub treatment: Option<String>,
    pub pets_id: RecordId,
    pub shelter_id: RecordId,
    pub date: Date,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateExaminationRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub treatment: Option<String>,
    pub pets_id: Option<RecordId>,
    pub shelter_id: Option<RecordId>,
    pub date: Option<Date>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub role_id: RecordId,
    pub login: String,
    pub mail: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub telephone: Option<String>,
    pub shelter_id: Option<RecordId>,
    pub creator: Option<RecordId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub role_id: Option<RecordId>,
    pub login: Option<String>,
    pub mail: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub telephone: Option<String>,
    pub shelter_id: Option<RecordId>,
    pub creator: Option<RecordId>,
}

// ============================================================================
// WORKFLOW RECORDS
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateContentRequest {
    pub first_name: String,
    pub last_name: Option<String>,
    pub telephone: String,
    pub description: Option<String>,
    pub user_id: Option<RecordId>,
    pub pets_id: RecordId,
    pub creator: Option<RecordId>,
    pub date: Option<Date>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAdoptionRequest {
    pub first_name: String,
    pub last_name: Option<String>,
    pub telephone: String,
    pub user_id: Option<RecordId>,
    pub pets_id: RecordId,
    pub creator: Option<RecordId>,
    pub date: Option<Date>,
}

/// Contact details of a workflow request. The status only changes through
/// a decision.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateApplicantRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub telephone: Option<String>,
    pub description: Option<String>,
}

/// Body of the decision endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionRequest {
    pub request_id: RecordId,
    pub decision: Decision,
    pub creator: Option<RecordId>,
    pub message: String,
    pub user_id: Option<RecordId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pet_status_defaults_to_available() {
        let req: CreatePetRequest = serde_json::from_value(serde_json::json!({
            "nickname": "Barsik",
            "age": 2,
            "category_id": 1,
            "shelter_id": 3
        }))
        .expect("request");
        assert_eq!(req.status_id, PetStatus::Available);
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let result: Result<CreateShelterRequest, _> =
            serde_json::from_value(serde_json::json!({ "name_shelter": "Paws" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_decision_body() {
        let req: DecisionRequest = serde_json::from_value(serde_json::json!({
            "request_id": 4,
            "decision": "accept",
            "creator": 1,
            "message": "Welcome",
            "user_id": 9
        }))
        .expect("decision");
        assert_eq!(req.decision, Decision::Accept);
    }

    #[test]
    fn test_list_params_accept_short_names() {
        let params: ListParams =
            serde_json::from_value(serde_json::json!({ "shelter": 4, "text": "cat" }))
                .expect("params");
        assert_eq!(params.shelter_id, Some(4));
        assert_eq!(params.text(), Some("cat"));
    }

    #[test]
    fn test_list_params_scope_required() {
        let params = ListParams::default();
        assert!(params.require_shelter().is_err());
        let params = ListParams {
            shelter_id: Some(2),
            ..ListParams::default()
        };
        assert_eq!(params.require_shelter().ok(), Some(2));
    }
}
