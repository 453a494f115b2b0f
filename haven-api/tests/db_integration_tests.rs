#![cfg(feature = "db-tests")]
//! PostgreSQL-backed tests.
//!
//! Run with `--features db-tests` against a disposable database configured
//! through the `HAVEN_DB_*` variables. The schema is installed on first use.

use std::sync::Arc;

use haven_api::services::{apply_decision, edit_vaccination, record_vaccination, register_stock};
use haven_api::types::{CreatePetRequest, CreateShelterRequest, UpdatePetRequest};
use haven_api::ws::WsState;
use haven_api::{DbClient, DbConfig, ErrorCode};
use haven_core::{
    Decision, InventoryError, Pet, PetStatus, SearchFilter, Shelter, WorkflowKind,
};
use haven_test_utils::fixtures::{audit, edit_of, new_stock, new_vaccination};
use uuid::Uuid;

const SCHEMA: &str = include_str!("../sql/schema.sql");

async fn test_db() -> DbClient {
    let db = DbClient::from_config(&DbConfig::from_env()).expect("pool");
    db.execute_script(SCHEMA).await.expect("schema");
    db.execute_script(
        "INSERT INTO \"PetsCategory\" (id_category, name_category) VALUES (1, 'cat') \
         ON CONFLICT DO NOTHING; \
         INSERT INTO \"Vaccine\" (id_vaccine, name_vaccine) VALUES (1, 'rabies'), (2, 'plague') \
         ON CONFLICT DO NOTHING;",
    )
    .await
    .expect("reference rows");
    db
}

async fn seed_shelter(db: &DbClient) -> Shelter {
    db.create::<Shelter>(&CreateShelterRequest {
        name_shelter: format!("Shelter {}", Uuid::now_v7()),
        network_id: None,
        opf: None,
        ogrn: None,
        inn_kpp: None,
        address: "Lenina 1".to_string(),
        telephone: None,
        creator: Some(1),
        status_id: None,
    })
    .await
    .expect("shelter")
}

fn pet_request(shelter_id: i32, nickname: &str) -> CreatePetRequest {
    CreatePetRequest {
        nickname: nickname.to_string(),
        age: 2,
        status_id: PetStatus::Available,
        description: None,
        category_id: 1,
        shelter_id,
        sex: None,
        vaccination_id: None,
    }
}

#[tokio::test]
async fn test_pet_crud_round() {
    let db = test_db().await;
    let shelter = seed_shelter(&db).await;

    let pet = db
        .create::<Pet>(&pet_request(shelter.id_shelter, "Barsik"))
        .await
        .expect("create");
    assert!(pet.images.is_empty());

    let duplicate = db
        .create::<Pet>(&pet_request(shelter.id_shelter, "Barsik"))
        .await
        .unwrap_err();
    assert_eq!(duplicate.code, ErrorCode::EntityAlreadyExists);

    let updated = db
        .update::<Pet>(
            pet.id_pets,
            &UpdatePetRequest {
                age: Some(3),
                ..UpdatePetRequest::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(updated.age, 3);
    assert_eq!(updated.nickname, "Barsik");

    let listed = db
        .list::<Pet>(
            &SearchFilter::new()
                .with_eq("shelter_id", shelter.id_shelter)
                .with_text(&["nickname"], Some("bars")),
        )
        .await
        .expect("list");
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_empty_list_is_not_found() {
    let db = test_db().await;
    let err = db
        .list::<Pet>(&SearchFilter::new().with_eq("shelter_id", -1))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::EntityNotFound);
}

#[tokio::test]
async fn test_decision_against_postgres() {
    let db = test_db().await;
    let ws = WsState::new(8);
    let shelter = seed_shelter(&db).await;
    let pet = db
        .create::<Pet>(&pet_request(shelter.id_shelter, "Murka"))
        .await
        .expect("pet");
    let request = db
        .create::<haven_core::AdoptionApplication>(&haven_api::types::CreateAdoptionRequest {
            first_name: "Anna".to_string(),
            last_name: None,
            telephone: "+70000000000".to_string(),
            user_id: Some(42),
            pets_id: pet.id_pets,
            creator: Some(1),
            date: None,
        })
        .await
        .expect("application");

    apply_decision(&db, &ws, WorkflowKind::Adoption, request.id_adoption, &audit(Decision::Accept))
        .await
        .expect("accept");

    let adopted = db.get::<Pet>(pet.id_pets).await.expect("get").expect("pet");
    assert_eq!(adopted.status_id, PetStatus::Adopted);
}

/// Concurrent transactions on separate pooled connections, so the
/// conditional decrement is what keeps the stock from going negative.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookings_against_postgres() {
    let db = test_db().await;
    let ws = Arc::new(WsState::new(64));
    let shelter = seed_shelter(&db).await;
    let pet = db
        .create::<Pet>(&pet_request(shelter.id_shelter, "Sharik"))
        .await
        .expect("pet");
    register_stock(&db, &ws, &new_stock(1, shelter.id_shelter, 5))
        .await
        .expect("stock");

    let mut handles = Vec::new();
    for _ in 0..12 {
        let db = db.clone();
        let ws = ws.clone();
        let booking = new_vaccination(pet.id_pets, 1, shelter.id_shelter, 1);
        handles.push(tokio::spawn(async move {
            record_vaccination(&db, &ws, &booking).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.expect("task").is_ok() {
            succeeded += 1;
        }
    }
    assert_eq!(succeeded, 5);
}

#[tokio::test]
async fn test_failed_edit_leaves_postgres_stock() {
    let db = test_db().await;
    let ws = WsState::new(8);
    let shelter = seed_shelter(&db).await;
    let pet = db
        .create::<Pet>(&pet_request(shelter.id_shelter, "Tuzik"))
        .await
        .expect("pet");
    register_stock(&db, &ws, &new_stock(1, shelter.id_shelter, 10))
        .await
        .expect("stock a");
    register_stock(&db, &ws, &new_stock(2, shelter.id_shelter, 1))
        .await
        .expect("stock b");

    let row = record_vaccination(&db, &ws, &new_vaccination(pet.id_pets, 1, shelter.id_shelter, 2))
        .await
        .expect("booking");
    let err = edit_vaccination(&db, &ws, row.id_vaccination, &edit_of(&row, 2, 3))
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::InsufficientStock { .. }));

    // Booking the full remainder of A proves the reversal was rolled back.
    let rest = record_vaccination(&db, &ws, &new_vaccination(pet.id_pets, 1, shelter.id_shelter, 8)).await;
    assert!(rest.is_ok());
    let over = record_vaccination(&db, &ws, &new_vaccination(pet.id_pets, 1, shelter.id_shelter, 1)).await;
    assert!(over.is_err());
}
