//! Inventory Service
//!
//! Vaccine stock and the vaccination ledger. Doses leave the stock only
//! through the conditional decrement, so concurrent bookings can never
//! drive a stock below zero.

use tracing::{debug, info};

use haven_core::{
    today, InventoryError, NewStock, NewVaccination, RecordId, StockEntry, StockUpdate,
    VaccinationEdit, VaccinationRecord,
};
use haven_storage::{LedgerTx, Transaction, TransactionalStore};

use crate::events::ChangeEvent;
use crate::telemetry::METRICS;
use crate::ws::WsState;

use super::abort;

pub const VACCINATION_EVENT_PREFIX: &str = "vaccination";
pub const STOCK_EVENT_PREFIX: &str = "vaccine";

// ============================================================================
// VACCINATION LEDGER
// ============================================================================

/// Take `record.quantity` doses from the shelter's stock and write the
/// ledger row.
///
/// # Errors
/// `NoSuchStock`, `Expired` or `InsufficientStock`; the stock is unchanged
/// in every error case.
pub async fn record_vaccination<S: TransactionalStore>(
    store: &S,
    ws: &WsState,
    record: &NewVaccination,
) -> Result<VaccinationRecord, InventoryError> {
    let saved = counted("record_vaccination", book(store, record).await)?;

    info!(
        vaccination_id = saved.id_vaccination,
        vaccine_id = saved.vaccine_id,
        shelter_id = saved.shelter_id,
        quantity = saved.quantity,
        "Vaccination recorded"
    );
    ws.publish(&ChangeEvent::with_record(
        format!("{}-add", VACCINATION_EVENT_PREFIX),
        &saved,
    ));
    Ok(saved)
}

/// Rewrite a ledger row. When the vaccine or the quantity changes, the old
/// doses are returned to the stock they came from before the new doses are
/// taken, all in one transaction.
///
/// # Errors
/// `RecordNotFound` when the row does not exist; `NoSuchStock`, `Expired`
/// or `InsufficientStock` for the new stock. Any error leaves both the
/// ledger row and every stock quantity as they were.
pub async fn edit_vaccination<S: TransactionalStore>(
    store: &S,
    ws: &WsState,
    id: RecordId,
    edit: &VaccinationEdit,
) -> Result<VaccinationRecord, InventoryError> {
    let saved = counted("edit_vaccination", commit_edit(store, id, edit).await)?;

    info!(vaccination_id = id, "Vaccination edited");
    ws.publish(&ChangeEvent::with_record(
        format!("{}-update", VACCINATION_EVENT_PREFIX),
        &saved,
    ));
    Ok(saved)
}

async fn book<S: TransactionalStore>(
    store: &S,
    record: &NewVaccination,
) -> Result<VaccinationRecord, InventoryError> {
    require_positive(record.quantity)?;

    let mut tx = store.begin().await?;
    let step = async {
        take_doses(&mut tx, record.vaccine_id, record.shelter_id, record.quantity).await?;
        Ok::<_, InventoryError>(tx.ledger_insert(record).await?)
    }
    .await;
    let saved = match step {
        Ok(saved) => saved,
        Err(e) => {
            abort(tx, "record_vaccination").await;
            return Err(e);
        }
    };
    tx.commit().await?;
    Ok(saved)
}

async fn commit_edit<S: TransactionalStore>(
    store: &S,
    id: RecordId,
    edit: &VaccinationEdit,
) -> Result<VaccinationRecord, InventoryError> {
    require_positive(edit.quantity)?;

    let mut tx = store.begin().await?;
    let saved = match rewrite(&mut tx, id, edit).await {
        Ok(saved) => saved,
        Err(e) => {
            abort(tx, "edit_vaccination").await;
            return Err(e);
        }
    };
    tx.commit().await?;
    Ok(saved)
}

/// Count the outcome of a dose-moving operation.
fn counted<T>(
    operation: &'static str,
    result: Result<T, InventoryError>,
) -> Result<T, InventoryError> {
    if let Ok(metrics) = METRICS.as_ref() {
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.reason(),
        };
        metrics.record_inventory(operation, outcome);
    }
    result
}

async fn rewrite<T: LedgerTx>(
    tx: &mut T,
    id: RecordId,
    edit: &VaccinationEdit,
) -> Result<VaccinationRecord, InventoryError> {
    let old = tx
        .ledger_get(id)
        .await?
        .ok_or(InventoryError::RecordNotFound { id })?;

    if old.vaccine_id != edit.vaccine_id || old.quantity != edit.quantity {
        // The shelter stays the one stored on the row.
        if !tx
            .stock_increment(old.vaccine_id, old.shelter_id, old.quantity)
            .await?
        {
            return Err(InventoryError::NoSuchStock {
                vaccine_id: old.vaccine_id,
                shelter_id: old.shelter_id,
            });
        }
        take_doses(tx, edit.vaccine_id, old.shelter_id, edit.quantity).await?;
    }

    tx.ledger_update(id, edit)
        .await?
        .ok_or(InventoryError::RecordNotFound { id })
}

/// Remove a ledger row. Administered doses are not returned to the stock.
pub async fn delete_vaccination<S: TransactionalStore>(
    store: &S,
    ws: &WsState,
    id: RecordId,
) -> Result<(), InventoryError> {
    let mut tx = store.begin().await?;
    match tx.ledger_delete(id).await {
        Ok(true) => {}
        Ok(false) => {
            abort(tx, "delete_vaccination").await;
            return Err(InventoryError::RecordNotFound { id });
        }
        Err(e) => {
            abort(tx, "delete_vaccination").await;
            return Err(e.into());
        }
    }
    tx.commit().await?;

    ws.publish(&ChangeEvent::deleted(
        format!("{}-delete", VACCINATION_EVENT_PREFIX),
        id,
    ));
    Ok(())
}

/// Check and decrement the stock of `(vaccine_id, shelter_id)`.
async fn take_doses<T: LedgerTx>(
    tx: &mut T,
    vaccine_id: RecordId,
    shelter_id: RecordId,
    quantity: i32,
) -> Result<(), InventoryError> {
    let stock = tx
        .stock_for_update(vaccine_id, shelter_id)
        .await?
        .ok_or(InventoryError::NoSuchStock {
            vaccine_id,
            shelter_id,
        })?;

    // Usable through the expiry date itself.
    if stock.date < today() {
        return Err(InventoryError::Expired {
            vaccine_id,
            shelter_id,
            expired_on: stock.date,
        });
    }

    if !tx
        .stock_decrement_if_available(vaccine_id, shelter_id, quantity)
        .await?
    {
        debug!(vaccine_id, shelter_id, quantity, on_hand = stock.quantity, "Stock too low");
        return Err(InventoryError::InsufficientStock {
            vaccine_id,
            shelter_id,
            requested: quantity,
        });
    }
    Ok(())
}

fn require_positive(quantity: i32) -> Result<(), InventoryError> {
    if quantity <= 0 {
        return Err(InventoryError::InvalidQuantity { quantity });
    }
    Ok(())
}

fn require_non_negative(quantity: i32) -> Result<(), InventoryError> {
    if quantity < 0 {
        return Err(InventoryError::InvalidQuantity { quantity });
    }
    Ok(())
}

// ============================================================================
// STOCK ADMINISTRATION
// ============================================================================

/// Register a new stock row for `(vaccine_id, shelter_id)`.
pub async fn register_stock<S: TransactionalStore>(
    store: &S,
    ws: &WsState,
    stock: &NewStock,
) -> Result<StockEntry, InventoryError> {
    require_non_negative(stock.quantity)?;

    let mut tx = store.begin().await?;
    let step = async {
        if tx
            .stock_for_update(stock.vaccine_id, stock.shelter_id)
            .await?
            .is_some()
        {
            return Err(InventoryError::StockExists {
                vaccine_id: stock.vaccine_id,
                shelter_id: stock.shelter_id,
            });
        }
        Ok::<_, InventoryError>(tx.stock_insert(stock).await?)
    }
    .await;
    let saved = match step {
        Ok(saved) => saved,
        Err(e) => {
            abort(tx, "register_stock").await;
            return Err(e);
        }
    };
    tx.commit().await?;

    ws.publish(&ChangeEvent::with_record(
        format!("{}-add", STOCK_EVENT_PREFIX),
        &saved,
    ));
    Ok(saved)
}

/// Set the quantity and/or expiry of a stock row.
pub async fn adjust_stock<S: TransactionalStore>(
    store: &S,
    ws: &WsState,
    id: RecordId,
    update: &StockUpdate,
) -> Result<StockEntry, InventoryError> {
    if let Some(quantity) = update.quantity {
        require_non_negative(quantity)?;
    }

    let mut tx = store.begin().await?;
    let saved = match tx.stock_update(id, update).await {
        Ok(Some(saved)) => saved,
        Ok(None) => {
            abort(tx, "adjust_stock").await;
            return Err(InventoryError::StockNotFound { id });
        }
        Err(e) => {
            abort(tx, "adjust_stock").await;
            return Err(e.into());
        }
    };
    tx.commit().await?;

    ws.publish(&ChangeEvent::with_record(
        format!("{}-update", STOCK_EVENT_PREFIX),
        &saved,
    ));
    Ok(saved)
}

pub async fn remove_stock<S: TransactionalStore>(
    store: &S,
    ws: &WsState,
    id: RecordId,
) -> Result<(), InventoryError> {
    let mut tx = store.begin().await?;
    match tx.stock_delete(id).await {
        Ok(true) => {}
        Ok(false) => {
            abort(tx, "remove_stock").await;
            return Err(InventoryError::StockNotFound { id });
        }
        Err(e) => {
            abort(tx, "remove_stock").await;
            return Err(e.into());
        }
    }
    tx.commit().await?;

    ws.publish(&ChangeEvent::deleted(
        format!("{}-delete", STOCK_EVENT_PREFIX),
        id,
    ));
    Ok(())
}
