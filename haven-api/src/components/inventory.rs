//! Read-side mapping of vaccine stock and the vaccination ledger.
//!
//! Both tables are written only by the inventory service, so they are
//! listable but not components.

use haven_core::{StockEntry, VaccinationRecord};

use crate::component::Listable;

impl Listable for StockEntry {
    const ENTITY_NAME: &'static str = "ShelterVaccine";
    const TABLE: &'static str = "\"ShelterVaccine\"";
    const PK_FIELD: &'static str = "id_shelter_vaccine";
    const SEARCH_FIELDS: &'static [&'static str] = &["vaccine_id", "quantity", "date"];
    const ORDER_FIELD: Option<&'static str> = Some("date");
}

impl Listable for VaccinationRecord {
    const ENTITY_NAME: &'static str = "VaccinationPet";
    const TABLE: &'static str = "\"VaccinationPet\"";
    const PK_FIELD: &'static str = "id_vaccination";
    const SEARCH_FIELDS: &'static [&'static str] = &["pets_id", "vaccine_id", "quantity", "date"];
    const ORDER_FIELD: Option<&'static str> = Some("date");
}
