//! Status code domains and workflow transitions.
//!
//! Status columns are integer foreign keys into fixed lookup tables. The
//! enums here serialize as those integer codes so rows read straight from
//! the database deserialize without a translation layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

// ============================================================================
// REQUEST STATUS
// ============================================================================

/// Status of a workflow request (`"StatusAdoption"` lookup table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum RequestStatus {
    /// Cancelled, or reset back to the start of the workflow.
    Reset,
    /// Waiting for a shelter decision.
    Pending,
    /// Accepted by the shelter.
    Accepted,
}

impl RequestStatus {
    pub const fn code(self) -> i32 {
        match self {
            RequestStatus::Reset => 0,
            RequestStatus::Pending => 1,
            RequestStatus::Accepted => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(RequestStatus::Reset),
            1 => Some(RequestStatus::Pending),
            2 => Some(RequestStatus::Accepted),
            _ => None,
        }
    }
}

impl From<RequestStatus> for i32 {
    fn from(status: RequestStatus) -> Self {
        status.code()
    }
}

impl TryFrom<i32> for RequestStatus {
    type Error = ValidationError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        RequestStatus::from_code(code).ok_or_else(|| ValidationError::InvalidValue {
            field: "status_adoption_id".to_string(),
            reason: format!("unknown request status code {}", code),
        })
    }
}

// ============================================================================
// PET STATUS
// ============================================================================

/// Status of a pet (`"StatusPets"` lookup table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum PetStatus {
    Available,
    Reserved,
    Adopted,
}

impl PetStatus {
    pub const fn code(self) -> i32 {
        match self {
            PetStatus::Available => 1,
            PetStatus::Reserved => 2,
            PetStatus::Adopted => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(PetStatus::Available),
            2 => Some(PetStatus::Reserved),
            3 => Some(PetStatus::Adopted),
            _ => None,
        }
    }
}

impl From<PetStatus> for i32 {
    fn from(status: PetStatus) -> Self {
        status.code()
    }
}

impl TryFrom<i32> for PetStatus {
    type Error = ValidationError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        PetStatus::from_code(code).ok_or_else(|| ValidationError::InvalidValue {
            field: "status_id".to_string(),
            reason: format!("unknown pet status code {}", code),
        })
    }
}

// ============================================================================
// DECISIONS
// ============================================================================

/// A shelter's decision on a workflow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Cancel,
}

impl Decision {
    /// Tag written to the audit message's `status` column.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Decision::Accept => "accept",
            Decision::Cancel => "cancel",
        }
    }

    /// Broadcast tag announced after the decision commits.
    pub fn event_tag(&self) -> &'static str {
        match self {
            Decision::Accept => "message-accept",
            Decision::Cancel => "message-cancel",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for Decision {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "accept" => Ok(Decision::Accept),
            "cancel" => Ok(Decision::Cancel),
            other => Err(ValidationError::InvalidValue {
                field: "decision".to_string(),
                reason: format!("expected 'accept' or 'cancel', got '{}'", other),
            }),
        }
    }
}

// ============================================================================
// WORKFLOW KINDS
// ============================================================================

/// The two kinds of workflow entity whose status is tied to a pet's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    /// Request to sponsor ("content") a pet.
    ContentRequest,
    /// Application to adopt a pet.
    Adoption,
}

/// Status pair a decision moves a request and its pet to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub request_status: RequestStatus,
    pub pet_status: PetStatus,
}

impl WorkflowKind {
    pub fn table(&self) -> &'static str {
        match self {
            WorkflowKind::ContentRequest => "\"ContentRequest\"",
            WorkflowKind::Adoption => "\"AdoptionApp\"",
        }
    }

    pub fn pk_column(&self) -> &'static str {
        match self {
            WorkflowKind::ContentRequest => "id_request",
            WorkflowKind::Adoption => "id_adoption",
        }
    }

    pub fn entity_name(&self) -> &'static str {
        match self {
            WorkflowKind::ContentRequest => "ContentRequest",
            WorkflowKind::Adoption => "AdoptionApplication",
        }
    }

    /// The request and pet statuses implied by `decision` for this kind.
    pub fn transition(&self, decision: Decision) -> Transition {
        match (self, decision) {
            (WorkflowKind::ContentRequest, Decision::Accept) => Transition {
                request_status: RequestStatus::Accepted,
                pet_status: PetStatus::Reserved,
            },
            (WorkflowKind::Adoption, Decision::Accept) => Transition {
                request_status: RequestStatus::Accepted,
                pet_status: PetStatus::Adopted,
            },
            (_, Decision::Cancel) => Transition {
                request_status: RequestStatus::Reset,
                pet_status: PetStatus::Available,
            },
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entity_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_roundtrip() {
        for status in [RequestStatus::Reset, RequestStatus::Pending, RequestStatus::Accepted] {
            assert_eq!(RequestStatus::from_code(status.code()), Some(status));
        }
        for status in [PetStatus::Available, PetStatus::Reserved, PetStatus::Adopted] {
            assert_eq!(PetStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(PetStatus::from_code(0), None);
        assert_eq!(RequestStatus::from_code(7), None);
    }

    #[test]
    fn test_status_serializes_as_code() {
        let json = serde_json::to_string(&RequestStatus::Accepted).expect("serialize");
        assert_eq!(json, "2");
        let status: PetStatus = serde_json::from_str("3").expect("deserialize");
        assert_eq!(status, PetStatus::Adopted);
        assert!(serde_json::from_str::<PetStatus>("9").is_err());
    }

    #[test]
    fn test_content_accept_reserves_pet() {
        let t = WorkflowKind::ContentRequest.transition(Decision::Accept);
        assert_eq!(t.request_status.code(), 2);
        assert_eq!(t.pet_status, PetStatus::Reserved);
        assert_eq!(t.pet_status.code(), 2);
    }

    #[test]
    fn test_adoption_accept_adopts_pet() {
        let t = WorkflowKind::Adoption.transition(Decision::Accept);
        assert_eq!(t.request_status, RequestStatus::Accepted);
        assert_eq!(t.pet_status, PetStatus::Adopted);
    }

    #[test]
    fn test_cancel_makes_pet_available() {
        for kind in [WorkflowKind::ContentRequest, WorkflowKind::Adoption] {
            let t = kind.transition(Decision::Cancel);
            assert_eq!(t.request_status.code(), 0);
            assert_eq!(t.pet_status.code(), 1);
        }
    }

    #[test]
    fn test_decision_parsing() {
        assert_eq!("accept".parse::<Decision>(), Ok(Decision::Accept));
        assert_eq!(" Cancel ".parse::<Decision>(), Ok(Decision::Cancel));
        assert!("reject".parse::<Decision>().is_err());
        assert_eq!(Decision::Accept.event_tag(), "message-accept");
    }
}
