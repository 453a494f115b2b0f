//! Entity rows and mutation inputs.
//!
//! Field names follow the relational column names so that a row converted
//! with `to_jsonb(...)` deserializes directly into these structs.

use serde::{Deserialize, Serialize};

use crate::enums::{Decision, PetStatus, RequestStatus};
use crate::{Date, RecordId};

// ============================================================================
// CATALOGUE ENTITIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub id_pets: RecordId,
    pub nickname: String,
    pub age: i32,
    pub status_id: PetStatus,
    pub description: Option<String>,
    pub category_id: RecordId,
    pub shelter_id: RecordId,
    pub sex: Option<String>,
    pub vaccination_id: Option<RecordId>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shelter {
    pub id_shelter: RecordId,
    pub name_shelter: String,
    pub network_id: Option<RecordId>,
    pub opf: Option<String>,
    pub ogrn: Option<String>,
    pub inn_kpp: Option<String>,
    pub address: String,
    pub telephone: Option<String>,
    pub creator: Option<RecordId>,
    pub status_id: Option<RecordId>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fund {
    pub id_fund: RecordId,
    pub name_fund: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub shelter_id: Option<RecordId>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub id_network: RecordId,
    pub name_network: String,
    pub telephone: Option<String>,
    pub creator: Option<RecordId>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPost {
    pub id_feed: RecordId,
    pub heading: String,
    pub text: String,
    pub author: Option<String>,
    pub shelter_id: Option<RecordId>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundHomePost {
    pub id_found_home: RecordId,
    pub heading: String,
    pub text: String,
    pub author: Option<String>,
    pub shelter_id: Option<RecordId>,
    pub status_id: Option<RecordId>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Examination {
    pub id_examination: RecordId,
    pub name: String,
    pub description: Option<String>,
    pub treatment: Option<String>,
    pub pets_id: RecordId,
    pub shelter_id: RecordId,
    pub date: Date,
}

/// Staff or volunteer account. The password hash column is never mapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id_user: RecordId,
    pub role_id: RecordId,
    pub login: String,
    pub mail: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub telephone: Option<String>,
    pub shelter_id: Option<RecordId>,
    pub creator: Option<RecordId>,
}

// ============================================================================
// WORKFLOW ENTITIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRequest {
    pub id_request: RecordId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub telephone: String,
    pub description: Option<String>,
    pub user_id: Option<RecordId>,
    pub pets_id: RecordId,
    pub creator: Option<RecordId>,
    pub date: Option<Date>,
    pub status_adoption_id: RequestStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdoptionApplication {
    pub id_adoption: RecordId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub telephone: String,
    pub user_id: Option<RecordId>,
    pub pets_id: RecordId,
    pub creator: Option<RecordId>,
    pub date: Option<Date>,
    pub status_adoption_id: RequestStatus,
}

/// Audit row written for every decision, addressed to the requesting user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id_message: RecordId,
    pub creator: Option<RecordId>,
    pub message: String,
    pub user_id: Option<RecordId>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub creator: Option<RecordId>,
    pub message: String,
    pub user_id: Option<RecordId>,
    pub decision: Decision,
}

// ============================================================================
// INVENTORY ENTITIES
// ============================================================================

/// Per-shelter stock of one vaccine, with a single expiry date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntry {
    pub id_shelter_vaccine: RecordId,
    pub vaccine_id: RecordId,
    pub shelter_id: RecordId,
    pub quantity: i32,
    /// Expiry date of the batch on hand.
    pub date: Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStock {
    pub vaccine_id: RecordId,
    pub shelter_id: RecordId,
    pub quantity: i32,
    pub date: Date,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockUpdate {
    pub quantity: Option<i32>,
    pub date: Option<Date>,
}

/// One administered vaccination. Its quantity was taken from the stock of
/// `(vaccine_id, shelter_id)` when the row was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccinationRecord {
    pub id_vaccination: RecordId,
    pub pets_id: RecordId,
    pub shelter_id: RecordId,
    pub vaccine_id: RecordId,
    pub quantity: i32,
    pub date: Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVaccination {
    pub pets_id: RecordId,
    pub shelter_id: RecordId,
    pub vaccine_id: RecordId,
    pub quantity: i32,
    pub date: Date,
}

/// Replacement values for an existing vaccination. The shelter is fixed to
/// the one stored on the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccinationEdit {
    pub pets_id: RecordId,
    pub vaccine_id: RecordId,
    pub quantity: i32,
    pub date: Date,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pet_from_row_json() {
        let row = json!({
            "id_pets": 7,
            "nickname": "Barsik",
            "age": 3,
            "status_id": 2,
            "description": null,
            "category_id": 1,
            "shelter_id": 4,
            "sex": "m",
            "vaccination_id": null,
            "images": ["https://storage.example/bucket/1_a.png"]
        });
        let pet: Pet = serde_json::from_value(row).expect("pet row");
        assert_eq!(pet.status_id, PetStatus::Reserved);
        assert_eq!(pet.images.len(), 1);
    }

    #[test]
    fn test_user_ignores_password_column() {
        let row = json!({
            "id_user": 1,
            "role_id": 3,
            "login": "keeper",
            "mail": "keeper@example.org",
            "password": "$argon2id$v=19$...",
            "first_name": null,
            "last_name": null,
            "telephone": null,
            "shelter_id": 2,
            "creator": null
        });
        let user: User = serde_json::from_value(row).expect("user row");
        let back = serde_json::to_value(&user).expect("user json");
        assert!(back.get("password").is_none());
    }

    #[test]
    fn test_stock_date_is_calendar_date() {
        let row = json!({
            "id_shelter_vaccine": 1,
            "vaccine_id": 2,
            "shelter_id": 3,
            "quantity": 10,
            "date": "2025-06-30"
        });
        let stock: StockEntry = serde_json::from_value(row).expect("stock row");
        assert_eq!(stock.date, Date::from_ymd_opt(2025, 6, 30).unwrap_or_default());
    }
}
