//! Tests for the change broadcaster.
//!
//! Committed mutations reach every live subscriber as `{event, data}`
//! frames; failed mutations are never announced.

use std::sync::Arc;

use haven_api::events::ChangeEvent;
use haven_api::services::{record_vaccination, register_stock, remove_stock};
use haven_api::ws::WsState;
use haven_test_utils::fixtures::{new_stock, new_vaccination};
use haven_test_utils::InMemoryStore;
use tokio::sync::mpsc::Receiver;

fn next_event(rx: &mut Receiver<Arc<str>>) -> ChangeEvent {
    let frame = rx.try_recv().expect("frame queued");
    serde_json::from_str(&frame).expect("valid frame")
}

#[test]
fn test_every_subscriber_receives_the_event() {
    let ws = WsState::new(4);
    let (_, mut first) = ws.subscribe();
    let (_, mut second) = ws.subscribe();

    let delivered = ws.publish(&ChangeEvent::deleted("pet-delete", 3));

    assert_eq!(delivered, 2);
    assert_eq!(next_event(&mut first).event, "pet-delete");
    assert_eq!(next_event(&mut second).data["id"], 3);
}

#[test]
fn test_full_queue_drops_only_for_slow_subscriber() {
    let ws = WsState::new(1);
    let (_, mut slow) = ws.subscribe();
    ws.publish(&ChangeEvent::deleted("fund-delete", 1));

    let (_, mut fresh) = ws.subscribe();
    let delivered = ws.publish(&ChangeEvent::deleted("fund-delete", 2));

    assert_eq!(delivered, 1);
    assert_eq!(next_event(&mut slow).data["id"], 1);
    assert!(slow.try_recv().is_err());
    assert_eq!(next_event(&mut fresh).data["id"], 2);
    assert_eq!(ws.subscriber_count(), 2);
}

#[test]
fn test_closed_subscriber_is_pruned() {
    let ws = WsState::new(4);
    let (_, rx) = ws.subscribe();
    drop(rx);

    assert_eq!(ws.publish(&ChangeEvent::deleted("feed-delete", 1)), 0);
    assert_eq!(ws.subscriber_count(), 0);
}

#[test]
fn test_unsubscribe() {
    let ws = WsState::new(4);
    let (id, _rx) = ws.subscribe();
    assert!(ws.unsubscribe(id));
    assert!(!ws.unsubscribe(id));
}

#[tokio::test]
async fn test_inventory_events_follow_commits() {
    let store = InMemoryStore::new();
    let ws = WsState::new(16);
    let (_, mut rx) = ws.subscribe();

    let stock = register_stock(&store, &ws, &new_stock(1, 2, 3))
        .await
        .expect("register");
    let added = next_event(&mut rx);
    assert_eq!(added.event, "vaccine-add");
    assert_eq!(added.data["quantity"], 3);

    record_vaccination(&store, &ws, &new_vaccination(5, 1, 2, 2))
        .await
        .expect("booking");
    let booked = next_event(&mut rx);
    assert_eq!(booked.event, "vaccination-add");
    assert_eq!(booked.data["pets_id"], 5);

    assert!(record_vaccination(&store, &ws, &new_vaccination(5, 1, 2, 9))
        .await
        .is_err());
    assert!(rx.try_recv().is_err());

    remove_stock(&store, &ws, stock.id_shelter_vaccine)
        .await
        .expect("remove");
    let removed = next_event(&mut rx);
    assert_eq!(removed.event, "vaccine-delete");
    assert_eq!(removed.data["id"], stock.id_shelter_vaccine);
}
