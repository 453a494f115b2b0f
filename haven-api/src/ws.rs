//! Change Broadcaster
//!
//! Fans committed change events out to every live WebSocket subscriber.
//!
//! ## Architecture
//!
//! - One bounded mpsc queue per connection, registered in a concurrent map
//!   keyed by connection id
//! - Each event is serialized once and shared between subscribers
//! - Delivery is fire-and-forget: a full queue drops the event for that
//!   subscriber, a closed queue unregisters it
//! - Inbound client messages are logged and otherwise ignored

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::events::ChangeEvent;
use crate::telemetry::METRICS;

/// Identity of one subscriber connection.
pub type ConnectionId = Uuid;

/// Subscriber registry shared across the application.
pub struct WsState {
    subscribers: DashMap<ConnectionId, mpsc::Sender<Arc<str>>>,
    capacity: usize,
}

impl WsState {
    /// Create a broadcaster whose subscribers each buffer up to `capacity`
    /// undelivered events.
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Register a new subscriber. Events published from now on are queued
    /// on the returned receiver.
    pub fn subscribe(&self) -> (ConnectionId, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = Uuid::now_v7();
        self.subscribers.insert(id, tx);
        (id, rx)
    }

    pub fn unsubscribe(&self, id: ConnectionId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver `event` to every current subscriber. Returns the number of
    /// subscribers the event was queued for.
    pub fn publish(&self, event: &ChangeEvent) -> usize {
        let frame: Arc<str> = match serde_json::to_string(event) {
            Ok(json) => Arc::from(json),
            Err(e) => {
                error!(event = %event.event, error = %e, "Failed to serialize change event");
                return 0;
            }
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for entry in self.subscribers.iter() {
            match entry.value().try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        connection_id = %entry.key(),
                        event = %event.event,
                        "Subscriber queue full, event dropped"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }
        for id in closed {
            self.subscribers.remove(&id);
            debug!(connection_id = %id, "Removed closed subscriber");
        }

        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_broadcast(&event.event);
        }
        debug!(event = %event.event, receivers = delivered, "Broadcast event");
        delivered
    }
}

/// WebSocket upgrade handler.
///
/// ```text
/// GET /ws
/// Upgrade: websocket
/// ```
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<WsState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Runs for the lifetime of one WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<WsState>) {
    let (connection_id, mut rx) = state.subscribe();
    info!(connection_id = %connection_id, "WebSocket connected");
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.ws_connected();
    }

    let (mut sender, mut receiver) = socket.split();

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    debug!(connection_id = %connection_id, "Client sent close frame");
                    break;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Text(text)) => {
                    info!(
                        connection_id = %connection_id,
                        text = %text.as_str(),
                        "Received text message (ignored)"
                    );
                }
                Ok(Message::Binary(data)) => {
                    debug!(
                        connection_id = %connection_id,
                        len = data.len(),
                        "Received binary message (ignored)"
                    );
                }
                Err(e) => {
                    warn!(connection_id = %connection_id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else {
                    break;
                };
                if let Err(e) = sender.send(Message::Text(frame.to_string().into())).await {
                    warn!(connection_id = %connection_id, error = %e, "Failed to send event, closing connection");
                    break;
                }
            }
            _ = &mut recv_task => {
                debug!(connection_id = %connection_id, "Receiver task finished");
                break;
            }
        }
    }

    recv_task.abort();
    state.unsubscribe(connection_id);
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.ws_disconnected();
    }
    info!(connection_id = %connection_id, "WebSocket disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let state = WsState::new(8);
        let (_a, mut rx_a) = state.subscribe();
        let (_b, mut rx_b) = state.subscribe();

        let delivered = state.publish(&ChangeEvent::new("pets-add", json!({ "id_pets": 1 })));
        assert_eq!(delivered, 2);

        for rx in [&mut rx_a, &mut rx_b] {
            let frame = rx.recv().await.expect("frame");
            let value: serde_json::Value = serde_json::from_str(&frame).expect("json");
            assert_eq!(value["event"], "pets-add");
            assert_eq!(value["data"]["id_pets"], 1);
        }
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let state = WsState::new(8);
        state.publish(&ChangeEvent::new("fund-add", json!({})));
        let (_id, mut rx) = state.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_subscriber_is_removed() {
        let state = WsState::new(8);
        let (_id, rx) = state.subscribe();
        drop(rx);
        assert_eq!(state.publish(&ChangeEvent::new("feed-add", json!({}))), 0);
        assert_eq!(state.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let state = WsState::new(1);
        let (_id, mut rx) = state.subscribe();
        assert_eq!(state.publish(&ChangeEvent::new("a", json!(1))), 1);
        assert_eq!(state.publish(&ChangeEvent::new("b", json!(2))), 0);
        assert_eq!(state.subscriber_count(), 1);
        let frame = rx.recv().await.expect("first frame");
        assert!(frame.contains("\"a\""));
    }

    #[test]
    fn test_unsubscribe() {
        let state = WsState::new(4);
        let (id, _rx) = state.subscribe();
        assert!(state.unsubscribe(id));
        assert!(!state.unsubscribe(id));
    }
}
