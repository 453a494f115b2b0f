//! Read-only lookup tables.

use std::time::Instant;

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::constants::SYSTEM_ROLE_IDS;
use crate::error::ApiResult;

use super::{observe, DbClient};

/// Lookup tables exposed verbatim to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceTable {
    PetStatuses,
    VaccinationStatuses,
    PetCategories,
    ShelterStatuses,
    FoundHomeStatuses,
    Roles,
    Vaccines,
}

impl ReferenceTable {
    pub fn table(&self) -> &'static str {
        match self {
            ReferenceTable::PetStatuses => "\"StatusPets\"",
            ReferenceTable::VaccinationStatuses => "\"StatusVaccination\"",
            ReferenceTable::PetCategories => "\"PetsCategory\"",
            ReferenceTable::ShelterStatuses => "\"StatusShelter\"",
            ReferenceTable::FoundHomeStatuses => "\"StatusFoundHome\"",
            ReferenceTable::Roles => "\"Role\"",
            ReferenceTable::Vaccines => "\"Vaccine\"",
        }
    }

    fn query(&self) -> String {
        match self {
            // System roles are never assignable from the client.
            ReferenceTable::Roles => format!(
                "SELECT to_jsonb(t) FROM {} t WHERE t.id_role <> ALL($1) ORDER BY 1",
                self.table()
            ),
            _ => format!("SELECT to_jsonb(t) FROM {} t ORDER BY 1", self.table()),
        }
    }
}

impl DbClient {
    /// Every row of a lookup table, as JSON objects.
    pub async fn reference(&self, table: ReferenceTable) -> ApiResult<Vec<JsonValue>> {
        let start = Instant::now();
        let result = self.reference_inner(table).await;
        observe("list", table.table(), start, &result);
        result
    }

    async fn reference_inner(&self, table: ReferenceTable) -> ApiResult<Vec<JsonValue>> {
        let conn = self.get_conn().await?;
        let sql = table.query();
        let rows = match table {
            ReferenceTable::Roles => {
                let excluded: Vec<i32> = SYSTEM_ROLE_IDS.to_vec();
                conn.query(&sql, &[&excluded]).await?
            }
            _ => conn.query(&sql, &[]).await?,
        };
        rows.iter()
            .map(|row| row.try_get::<_, JsonValue>(0).map_err(Into::into))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_exclude_system_roles() {
        let sql = ReferenceTable::Roles.query();
        assert!(sql.contains("<> ALL($1)"));
        assert!(!ReferenceTable::Vaccines.query().contains("$1"));
    }

    #[test]
    fn test_path_names() {
        let table: ReferenceTable = serde_json::from_value(serde_json::json!("pet-categories"))
            .expect("table");
        assert_eq!(table, ReferenceTable::PetCategories);
        assert_eq!(table.table(), "\"PetsCategory\"");
    }
}
